//! Telephony media-stream message types.
//!
//! Inbound frames are tagged by `event`:
//! - `connected` - socket handshake complete
//! - `start` - stream metadata, carries the stream identifier
//! - `media` - base64 u-law audio with a millisecond timestamp
//! - `mark` - echo of a mark previously sent by the relay
//! - `stop` - stream ended
//!
//! Outbound frames are `media`, `mark` and `clear`, all addressed by
//! `streamSid`.

use std::collections::HashMap;

use base64::prelude::*;
use serde::{Deserialize, Deserializer, Serialize, de};

// =============================================================================
// Inbound
// =============================================================================

/// Frames received from the telephony media stream.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum TelephonyEvent {
    /// Socket connected
    Connected {
        #[serde(default)]
        protocol: Option<String>,
    },

    /// Stream started
    Start { start: StreamStart },

    /// Caller audio
    Media { media: MediaFrame },

    /// Playback acknowledgment
    Mark { mark: MarkLabel },

    /// Stream stopped
    Stop {
        #[serde(rename = "streamSid", default)]
        stream_sid: Option<String>,
    },

    /// Any other event
    #[serde(other)]
    Unknown,
}

impl TelephonyEvent {
    /// Decode a text frame from the telephony socket.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// Metadata carried by the `start` frame.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StreamStart {
    pub stream_sid: String,
    #[serde(default)]
    pub call_sid: Option<String>,
    #[serde(default)]
    pub account_sid: Option<String>,
    #[serde(default)]
    pub custom_parameters: HashMap<String, String>,
}

/// Audio carried by a `media` frame.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct MediaFrame {
    /// Milliseconds since stream start
    #[serde(deserialize_with = "deserialize_millis")]
    pub timestamp: u64,
    /// Base64 audio
    pub payload: String,
    #[serde(default)]
    pub track: Option<String>,
}

impl MediaFrame {
    /// Raw audio bytes.
    pub fn decode_payload(&self) -> Result<Vec<u8>, base64::DecodeError> {
        BASE64_STANDARD.decode(&self.payload)
    }
}

/// Mark name, both directions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MarkLabel {
    pub name: String,
}

/// Accept a millisecond count as either a JSON number or a decimal string.
fn deserialize_millis<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Millis {
        Number(u64),
        Text(String),
    }

    match Millis::deserialize(deserializer)? {
        Millis::Number(n) => Ok(n),
        Millis::Text(s) => s
            .trim()
            .parse()
            .map_err(|_| de::Error::custom(format!("invalid timestamp: {s:?}"))),
    }
}

// =============================================================================
// Outbound
// =============================================================================

/// Frames sent to the telephony media stream.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum TelephonyCommand {
    /// Audio to play to the caller
    Media {
        #[serde(rename = "streamSid")]
        stream_sid: String,
        media: OutboundMedia,
    },

    /// Ask for an acknowledgment once preceding audio is played
    Mark {
        #[serde(rename = "streamSid")]
        stream_sid: String,
        mark: MarkLabel,
    },

    /// Drop any buffered audio
    Clear {
        #[serde(rename = "streamSid")]
        stream_sid: String,
    },
}

/// Outbound audio payload.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct OutboundMedia {
    /// Base64 audio
    pub payload: String,
}

impl TelephonyCommand {
    /// Media frame carrying `audio`, base64-encoded.
    pub fn media(stream_sid: impl Into<String>, audio: &[u8]) -> Self {
        TelephonyCommand::Media {
            stream_sid: stream_sid.into(),
            media: OutboundMedia {
                payload: BASE64_STANDARD.encode(audio),
            },
        }
    }

    pub fn mark(stream_sid: impl Into<String>, name: impl Into<String>) -> Self {
        TelephonyCommand::Mark {
            stream_sid: stream_sid.into(),
            mark: MarkLabel { name: name.into() },
        }
    }

    pub fn clear(stream_sid: impl Into<String>) -> Self {
        TelephonyCommand::Clear {
            stream_sid: stream_sid.into(),
        }
    }
}
