//! Barge-in: the caller starts talking over the engine.

use tracing::{info, warn};

use super::session::Session;
use crate::core::realtime::ClientEvent;
use crate::core::telephony::TelephonyCommand;

/// Where to cut the interrupted utterance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Truncation {
    pub utterance_id: String,
    pub audio_end_ms: u64,
}

impl Truncation {
    /// `conversation.item.truncate` for the engine.
    pub fn engine_event(&self) -> ClientEvent {
        ClientEvent::truncate(&self.utterance_id, self.audio_end_ms)
    }
}

/// Milliseconds of the utterance the caller has heard. Clamped at zero.
pub fn elapsed_since_anchor(latest_ms: u64, anchor_ms: u64) -> u64 {
    match latest_ms.checked_sub(anchor_ms) {
        Some(elapsed) => elapsed,
        None => {
            warn!(
                latest_ms,
                anchor_ms, "Playback anchor ahead of media timeline, truncating at 0"
            );
            0
        }
    }
}

/// Handle caller speech start. Cancels the silence watchdog and, if an
/// utterance is playing, ends it and returns where to truncate.
pub fn interrupt(session: &mut Session) -> Option<Truncation> {
    session.watchdog_mut().cancel();

    let latest = session.latest_media_timestamp();
    let playback = session.interrupt_playback()?;
    let audio_end_ms = elapsed_since_anchor(latest, playback.anchor_ms);

    info!(
        utterance_id = %playback.utterance_id,
        audio_end_ms,
        "Caller barged in, truncating engine utterance"
    );

    Some(Truncation {
        utterance_id: playback.utterance_id,
        audio_end_ms,
    })
}

/// Telephony command that drops the audio already buffered downstream.
pub fn clear_command(session: &Session) -> Option<TelephonyCommand> {
    session.stream_id().map(TelephonyCommand::clear)
}
