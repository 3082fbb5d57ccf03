//! Realtime engine WebSocket message types.
//!
//! This module defines the client and server event types exchanged with the
//! realtime engine. All events are JSON-encoded and sent over WebSocket.
//!
//! # Protocol Overview
//!
//! Client events (sent to the engine):
//! - session.update - Initialize the session (codec, voice, VAD, instructions)
//! - input_audio_buffer.append - Append caller audio
//! - conversation.item.create - Inject a synthetic conversation turn
//! - conversation.item.truncate - Cut an utterance at the played position
//! - response.create - Ask the engine to respond
//!
//! Server events (received from the engine):
//! - session.created / session.updated
//! - error
//! - input_audio_buffer.speech_started / speech_stopped
//! - response.output_audio.delta - Audio chunk of the current utterance
//! - response.output_text.delta / done - Assistant text
//! - conversation.item.input_audio_transcription.delta / completed
//! - response.done
//!
//! Both naming generations of the engine protocol are accepted on input.
//! Anything else decodes to [`ServerEvent::Unknown`].

use base64::prelude::*;
use serde::{Deserialize, Serialize};

use super::config::{Modality, OpenAIRealtimeAudioFormat};

// =============================================================================
// Session Configuration
// =============================================================================

/// Session configuration sent with `session.update`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionConfig {
    /// Session type, always "realtime"
    #[serde(rename = "type")]
    pub session_type: String,

    /// Model name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Response modalities
    pub output_modalities: Vec<Modality>,

    /// Audio input/output settings
    pub audio: AudioConfig,

    /// Behavioral instructions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

/// Audio settings for both directions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AudioConfig {
    pub input: AudioInputConfig,
    pub output: AudioOutputConfig,
}

/// Caller-side audio settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AudioInputConfig {
    pub format: AudioFormat,
    pub turn_detection: TurnDetection,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcription: Option<InputAudioTranscription>,
}

/// Engine-side audio settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AudioOutputConfig {
    pub format: AudioFormat,
    pub voice: String,
}

/// Audio format descriptor.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct AudioFormat {
    #[serde(rename = "type")]
    pub format_type: OpenAIRealtimeAudioFormat,
}

/// Input audio transcription configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InputAudioTranscription {
    /// Transcription model (e.g., "whisper-1")
    pub model: String,
}

/// Turn detection configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum TurnDetection {
    /// Server-side VAD
    #[serde(rename = "server_vad")]
    ServerVad,
}

impl SessionConfig {
    /// Build the telephony session: u-law both ways, server VAD, transcription on.
    pub fn telephony(
        model: &str,
        voice: &str,
        instructions: Option<String>,
        transcription_model: &str,
    ) -> Self {
        let format = AudioFormat {
            format_type: OpenAIRealtimeAudioFormat::Pcmu,
        };
        Self {
            session_type: "realtime".to_string(),
            model: Some(model.to_string()),
            output_modalities: vec![Modality::Audio, Modality::Text],
            audio: AudioConfig {
                input: AudioInputConfig {
                    format,
                    turn_detection: TurnDetection::ServerVad,
                    transcription: Some(InputAudioTranscription {
                        model: transcription_model.to_string(),
                    }),
                },
                output: AudioOutputConfig {
                    format,
                    voice: voice.to_string(),
                },
            },
            instructions,
        }
    }
}

// =============================================================================
// Conversation Items
// =============================================================================

/// Conversation item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationItem {
    /// Item type
    #[serde(rename = "type")]
    pub item_type: String,
    /// Item role (user, assistant, system)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Content parts
    #[serde(default)]
    pub content: Vec<ContentPart>,
}

/// Content part within a conversation item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContentPart {
    /// Content type (input_text, input_audio, ...)
    #[serde(rename = "type")]
    pub content_type: String,
    /// Text content
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl ConversationItem {
    /// A user-role text message, used for every synthetic prompt.
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            item_type: "message".to_string(),
            role: Some("user".to_string()),
            content: vec![ContentPart {
                content_type: "input_text".to_string(),
                text: Some(text.into()),
            }],
        }
    }

    /// Concatenated text of all content parts.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect::<Vec<_>>()
            .join("")
    }
}

// =============================================================================
// Client Events (sent to the engine)
// =============================================================================

/// Client events sent to the realtime engine.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type")]
pub enum ClientEvent {
    /// Initialize / update session configuration
    #[serde(rename = "session.update")]
    SessionUpdate {
        /// Session configuration
        session: SessionConfig,
    },

    /// Append audio to input buffer
    #[serde(rename = "input_audio_buffer.append")]
    InputAudioBufferAppend {
        /// Base64-encoded audio data
        audio: String,
    },

    /// Create a conversation item
    #[serde(rename = "conversation.item.create")]
    ConversationItemCreate {
        /// Item to create
        item: ConversationItem,
    },

    /// Truncate a conversation item
    #[serde(rename = "conversation.item.truncate")]
    ConversationItemTruncate {
        /// Item ID
        item_id: String,
        /// Content index
        content_index: u32,
        /// Audio end in ms
        audio_end_ms: u64,
    },

    /// Create a response
    #[serde(rename = "response.create")]
    ResponseCreate,
}

impl ClientEvent {
    /// Create an audio append event from raw bytes.
    pub fn audio_append(data: &[u8]) -> Self {
        ClientEvent::InputAudioBufferAppend {
            audio: BASE64_STANDARD.encode(data),
        }
    }

    /// Create a synthetic user turn.
    pub fn user_text(text: impl Into<String>) -> Self {
        ClientEvent::ConversationItemCreate {
            item: ConversationItem::user_text(text),
        }
    }

    /// Truncate the first content part of `item_id` at `audio_end_ms`.
    pub fn truncate(item_id: impl Into<String>, audio_end_ms: u64) -> Self {
        ClientEvent::ConversationItemTruncate {
            item_id: item_id.into(),
            content_index: 0,
            audio_end_ms,
        }
    }

    /// Event type name as it appears on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            ClientEvent::SessionUpdate { .. } => "session.update",
            ClientEvent::InputAudioBufferAppend { .. } => "input_audio_buffer.append",
            ClientEvent::ConversationItemCreate { .. } => "conversation.item.create",
            ClientEvent::ConversationItemTruncate { .. } => "conversation.item.truncate",
            ClientEvent::ResponseCreate => "response.create",
        }
    }
}

// =============================================================================
// Server Events (received from the engine)
// =============================================================================

/// Server events received from the realtime engine.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum ServerEvent {
    /// Error occurred
    #[serde(rename = "error")]
    Error {
        /// Error details
        error: ApiError,
    },

    /// Session created
    #[serde(rename = "session.created")]
    SessionCreated {
        #[serde(default)]
        session: SessionInfo,
    },

    /// Session updated
    #[serde(rename = "session.updated")]
    SessionUpdated {
        #[serde(default)]
        session: SessionInfo,
    },

    /// Caller speech started (VAD)
    #[serde(rename = "input_audio_buffer.speech_started")]
    SpeechStarted {
        #[serde(default)]
        audio_start_ms: u64,
        #[serde(default)]
        item_id: Option<String>,
    },

    /// Caller speech stopped (VAD)
    #[serde(rename = "input_audio_buffer.speech_stopped")]
    SpeechStopped {
        #[serde(default)]
        audio_end_ms: u64,
        #[serde(default)]
        item_id: Option<String>,
    },

    /// Audio chunk of the engine's current utterance
    #[serde(rename = "response.output_audio.delta", alias = "response.audio.delta")]
    AudioDelta {
        #[serde(default)]
        response_id: Option<String>,
        #[serde(default)]
        item_id: Option<String>,
        /// Base64-encoded audio delta
        delta: String,
    },

    /// Assistant text or spoken-transcript chunk
    #[serde(
        rename = "response.output_text.delta",
        alias = "response.text.delta",
        alias = "response.output_audio_transcript.delta",
        alias = "response.audio_transcript.delta"
    )]
    AssistantTextDelta {
        #[serde(default)]
        item_id: Option<String>,
        delta: String,
    },

    /// Assistant text or spoken-transcript complete
    #[serde(
        rename = "response.output_text.done",
        alias = "response.text.done",
        alias = "response.output_audio_transcript.done",
        alias = "response.audio_transcript.done"
    )]
    AssistantTextDone {
        #[serde(default)]
        item_id: Option<String>,
    },

    /// Caller transcription chunk
    #[serde(
        rename = "conversation.item.input_audio_transcription.delta",
        alias = "input_audio_buffer.transcription.delta"
    )]
    CallerTranscriptDelta {
        #[serde(default)]
        item_id: Option<String>,
        delta: String,
    },

    /// Caller transcription complete
    #[serde(
        rename = "conversation.item.input_audio_transcription.completed",
        alias = "input_audio_buffer.transcription.completed",
        alias = "input_audio_buffer.transcription.done"
    )]
    CallerTranscriptDone {
        #[serde(default)]
        item_id: Option<String>,
        /// Full transcript, when the engine sends one
        #[serde(default)]
        transcript: Option<String>,
    },

    /// Response (utterance) complete
    #[serde(rename = "response.done")]
    ResponseDone {
        #[serde(default)]
        response: Option<ResponseInfo>,
    },

    /// Any event type the relay does not act on
    #[serde(other)]
    Unknown,
}

impl ServerEvent {
    /// Decode a text frame from the engine.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Decode base64 audio from an AudioDelta event.
    pub fn decode_audio_delta(delta: &str) -> Result<Vec<u8>, base64::DecodeError> {
        BASE64_STANDARD.decode(delta)
    }

    /// Short name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            ServerEvent::Error { .. } => "error",
            ServerEvent::SessionCreated { .. } => "session.created",
            ServerEvent::SessionUpdated { .. } => "session.updated",
            ServerEvent::SpeechStarted { .. } => "input_audio_buffer.speech_started",
            ServerEvent::SpeechStopped { .. } => "input_audio_buffer.speech_stopped",
            ServerEvent::AudioDelta { .. } => "response.output_audio.delta",
            ServerEvent::AssistantTextDelta { .. } => "response.output_text.delta",
            ServerEvent::AssistantTextDone { .. } => "response.output_text.done",
            ServerEvent::CallerTranscriptDelta { .. } => {
                "conversation.item.input_audio_transcription.delta"
            }
            ServerEvent::CallerTranscriptDone { .. } => {
                "conversation.item.input_audio_transcription.completed"
            }
            ServerEvent::ResponseDone { .. } => "response.done",
            ServerEvent::Unknown => "unknown",
        }
    }
}

// =============================================================================
// Supporting Types
// =============================================================================

/// API error information.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ApiError {
    /// Error type
    #[serde(rename = "type", default)]
    pub error_type: String,
    /// Error code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Error message
    #[serde(default)]
    pub message: String,
}

/// Session information (only the fields the relay logs).
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct SessionInfo {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
}

/// Response information.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ResponseInfo {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

// =============================================================================
// Tests
// =============================================================================
