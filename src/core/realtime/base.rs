//! Base types for the realtime speech engine connection.
//!
//! The relay talks to exactly one engine per call. This module holds the
//! error taxonomy and the per-call connection configuration; the wire types
//! live in [`super::messages`] and the socket plumbing in [`super::client`].

use thiserror::Error;
use zeroize::Zeroize;

use super::config::{
    DEFAULT_REALTIME_MODEL, DEFAULT_TRANSCRIPTION_MODEL, OPENAI_REALTIME_URL, OpenAIRealtimeVoice,
};
use super::messages::SessionConfig;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur while talking to the realtime engine.
#[derive(Debug, Error)]
pub enum RealtimeError {
    /// Connection to the engine failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The outbound channel to the engine writer is closed
    #[error("Not connected")]
    NotConnected,
}

/// Result type for realtime operations.
pub type RealtimeResult<T> = Result<T, RealtimeError>;

// =============================================================================
// Configuration Types
// =============================================================================

/// Per-call configuration for the realtime engine connection.
///
/// The API key is wiped on drop and never printed by `Debug`.
#[derive(Clone)]
pub struct RealtimeConfig {
    /// API key for authentication
    pub api_key: String,

    /// Base WebSocket endpoint (without query string)
    pub url: String,

    /// Model to use (e.g., "gpt-realtime")
    pub model: String,

    /// Voice used for the engine's spoken output
    pub voice: Option<String>,

    /// Behavioral instructions for the session
    pub instructions: Option<String>,

    /// Sampling temperature, passed on the connection URL
    pub temperature: Option<f32>,

    /// Model used to transcribe caller audio
    pub transcription_model: String,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            url: OPENAI_REALTIME_URL.to_string(),
            model: DEFAULT_REALTIME_MODEL.to_string(),
            voice: None,
            instructions: None,
            temperature: None,
            transcription_model: DEFAULT_TRANSCRIPTION_MODEL.to_string(),
        }
    }
}

impl std::fmt::Debug for RealtimeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeConfig")
            .field("api_key", &"[REDACTED]")
            .field("url", &self.url)
            .field("model", &self.model)
            .field("voice", &self.voice)
            .field("instructions", &self.instructions.as_ref().map(String::len))
            .field("temperature", &self.temperature)
            .field("transcription_model", &self.transcription_model)
            .finish()
    }
}

impl Drop for RealtimeConfig {
    fn drop(&mut self) {
        self.api_key.zeroize();
    }
}

impl RealtimeConfig {
    /// Validate the configuration before any connection attempt.
    pub fn validate(&self) -> RealtimeResult<()> {
        if self.api_key.is_empty() {
            return Err(RealtimeError::AuthenticationFailed(
                "API key is required".to_string(),
            ));
        }
        if let Some(t) = self.temperature
            && !(0.0..=2.0).contains(&t)
        {
            return Err(RealtimeError::InvalidConfiguration(format!(
                "temperature must be between 0.0 and 2.0, got {t}"
            )));
        }
        Ok(())
    }

    /// Build the full connection URL including model and temperature.
    pub fn connection_url(&self) -> RealtimeResult<url::Url> {
        let mut url = url::Url::parse(&self.url)
            .map_err(|e| RealtimeError::InvalidConfiguration(format!("{}: {e}", self.url)))?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("model", &self.model);
            if let Some(t) = self.temperature {
                query.append_pair("temperature", &t.to_string());
            }
        }
        Ok(url)
    }

    /// The `session.update` payload for a telephony call on this connection.
    /// A missing voice falls back to the default catalogue voice.
    pub fn session_config(&self) -> SessionConfig {
        let voice = self
            .voice
            .as_deref()
            .unwrap_or(OpenAIRealtimeVoice::default().as_str());
        SessionConfig::telephony(
            &self.model,
            voice,
            self.instructions.clone(),
            &self.transcription_model,
        )
    }
}
