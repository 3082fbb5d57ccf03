//! Realtime engine configuration types.
//!
//! This module contains configuration types for the realtime engine:
//! - Endpoint and model defaults
//! - Voice selection
//! - Audio format configuration

use serde::{Deserialize, Serialize};

/// Realtime API WebSocket endpoint.
pub const OPENAI_REALTIME_URL: &str = "wss://api.openai.com/v1/realtime";

/// Default realtime model.
pub const DEFAULT_REALTIME_MODEL: &str = "gpt-realtime";

/// Default model used to transcribe caller audio.
pub const DEFAULT_TRANSCRIPTION_MODEL: &str = "whisper-1";

// =============================================================================
// Voices
// =============================================================================

/// Available voices for the realtime engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpenAIRealtimeVoice {
    /// Alloy voice (default)
    #[default]
    Alloy,
    Ash,
    Ballad,
    Coral,
    Echo,
    Sage,
    Shimmer,
    Verse,
    Marin,
    Cedar,
}

impl OpenAIRealtimeVoice {
    /// Convert to the API parameter value.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Alloy => "alloy",
            Self::Ash => "ash",
            Self::Ballad => "ballad",
            Self::Coral => "coral",
            Self::Echo => "echo",
            Self::Sage => "sage",
            Self::Shimmer => "shimmer",
            Self::Verse => "verse",
            Self::Marin => "marin",
            Self::Cedar => "cedar",
        }
    }

    /// Parse a voice name, case-insensitively. Unknown names yield `None`.
    pub fn parse(s: &str) -> Option<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|v| v.as_str().eq_ignore_ascii_case(s.trim()))
    }

    /// Parse from string, with fallback to default.
    pub fn from_str_or_default(s: &str) -> Self {
        Self::parse(s).unwrap_or_default()
    }

    /// Get all available voices.
    pub fn all() -> &'static [OpenAIRealtimeVoice] {
        &[
            Self::Alloy,
            Self::Ash,
            Self::Ballad,
            Self::Coral,
            Self::Echo,
            Self::Sage,
            Self::Shimmer,
            Self::Verse,
            Self::Marin,
            Self::Cedar,
        ]
    }

    /// Pick a voice at random.
    ///
    /// Uses the random bits of a v4 UUID so no extra RNG crate is needed.
    pub fn random() -> Self {
        let voices = Self::all();
        let bits = uuid::Uuid::new_v4().as_u128();
        voices[(bits % voices.len() as u128) as usize]
    }
}

impl std::fmt::Display for OpenAIRealtimeVoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Audio Formats
// =============================================================================

/// Audio formats understood by the engine.
///
/// Telephony media streams carry G.711 u-law at 8kHz, so the relay asks the
/// engine for `audio/pcmu` in both directions and never transcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OpenAIRealtimeAudioFormat {
    /// G.711 u-law (default for telephony)
    #[default]
    #[serde(rename = "audio/pcmu")]
    Pcmu,
    /// G.711 a-law
    #[serde(rename = "audio/pcma")]
    Pcma,
    /// PCM 16-bit signed little-endian
    #[serde(rename = "audio/pcm")]
    Pcm,
}

impl OpenAIRealtimeAudioFormat {
    /// Convert to the API parameter value.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pcmu => "audio/pcmu",
            Self::Pcma => "audio/pcma",
            Self::Pcm => "audio/pcm",
        }
    }

    /// Get the sample rate for this format.
    #[inline]
    pub fn sample_rate(&self) -> u32 {
        match self {
            Self::Pcm => 24000,
            Self::Pcmu | Self::Pcma => 8000,
        }
    }
}

impl std::fmt::Display for OpenAIRealtimeAudioFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Modalities
// =============================================================================

/// Output modalities for the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    /// Text output
    Text,
    /// Audio output
    Audio,
}
