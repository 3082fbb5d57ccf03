//! Realtime speech engine connection.
//!
//! The relay speaks the engine's JSON event protocol over one WebSocket per
//! call. Audio is G.711 u-law in both directions so frames pass through
//! without transcoding.
//!
//! # Example
//!
//! ```rust,ignore
//! use callrelay_gateway::core::realtime::{ClientEvent, EngineConnection, RealtimeConfig};
//! use futures::StreamExt;
//!
//! let mut config = RealtimeConfig::default();
//! config.api_key = "sk-...".to_string();
//! config.voice = Some("coral".to_string());
//!
//! let mut conn = EngineConnection::connect(&config).await?;
//! conn.sender
//!     .send(ClientEvent::SessionUpdate { session: config.session_config() })
//!     .await?;
//! while let Some(event) = conn.events.next().await {
//!     println!("{}", event.kind());
//! }
//! ```

mod base;
mod client;
mod config;
mod messages;

pub use base::{RealtimeConfig, RealtimeError, RealtimeResult};
pub use client::{ENGINE_CHANNEL_CAPACITY, EngineConnection};
pub use config::{
    DEFAULT_REALTIME_MODEL, DEFAULT_TRANSCRIPTION_MODEL, Modality, OPENAI_REALTIME_URL,
    OpenAIRealtimeAudioFormat, OpenAIRealtimeVoice,
};
pub use messages::{
    ApiError, AudioConfig, AudioFormat, AudioInputConfig, AudioOutputConfig, ClientEvent,
    ContentPart, ConversationItem, InputAudioTranscription, ResponseInfo, ServerEvent,
    SessionConfig, SessionInfo, TurnDetection,
};
