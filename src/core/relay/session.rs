//! Per-call session state.
//!
//! One [`Session`] exists per telephony connection and is owned by the relay
//! loop. Only `last_dispatched_command` is shared (with dispatch tasks) and
//! sits behind a mutex.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::watchdog::SilenceWatchdog;
use crate::core::realtime::{ClientEvent, OpenAIRealtimeVoice};

/// Prefix of the mark names sent after each audio chunk.
pub const MARK_PREFIX: &str = "responsePart";

/// The engine utterance currently playing to the caller.
///
/// Identity and anchor live together so one is never set without the other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Playback {
    pub utterance_id: String,
    /// Telephony timestamp at which the first chunk went out
    pub anchor_ms: u64,
}

#[derive(Debug)]
pub struct Session {
    voice: OpenAIRealtimeVoice,
    stream_id: Option<String>,
    latest_media_timestamp: u64,
    playback: Option<Playback>,
    /// Engine signalled the current response is complete
    response_done: bool,
    /// Last utterance cut by a barge-in; its late chunks are dropped
    truncated_utterance: Option<String>,
    ack_queue: VecDeque<String>,
    marks_sent: u64,
    assistant_text: String,
    caller_text: String,
    last_dispatched_command: Arc<Mutex<Option<String>>>,
    watchdog: SilenceWatchdog,
}

impl Session {
    pub fn new(voice: OpenAIRealtimeVoice, engine: mpsc::Sender<ClientEvent>) -> Self {
        Self::with_watchdog(voice, SilenceWatchdog::new(engine))
    }

    pub fn with_watchdog(voice: OpenAIRealtimeVoice, watchdog: SilenceWatchdog) -> Self {
        Self {
            voice,
            stream_id: None,
            latest_media_timestamp: 0,
            playback: None,
            response_done: false,
            truncated_utterance: None,
            ack_queue: VecDeque::new(),
            marks_sent: 0,
            assistant_text: String::new(),
            caller_text: String::new(),
            last_dispatched_command: Arc::new(Mutex::new(None)),
            watchdog,
        }
    }

    // -------------------------------------------------------------------------
    // Telephony timeline
    // -------------------------------------------------------------------------

    /// A (re)started telephony stream. Resets the timeline and any playback.
    pub fn start_stream(&mut self, stream_id: impl Into<String>) {
        self.stream_id = Some(stream_id.into());
        self.latest_media_timestamp = 0;
        self.playback = None;
        self.response_done = false;
        self.truncated_utterance = None;
        self.ack_queue.clear();
    }

    /// Advance the timeline. Never moves backwards.
    pub fn record_media(&mut self, timestamp_ms: u64) {
        if timestamp_ms < self.latest_media_timestamp {
            debug!(
                timestamp_ms,
                latest = self.latest_media_timestamp,
                "Out-of-order media timestamp ignored"
            );
            return;
        }
        self.latest_media_timestamp = timestamp_ms;
    }

    // -------------------------------------------------------------------------
    // Engine playback
    // -------------------------------------------------------------------------

    /// Whether a chunk of `utterance_id` belongs to an utterance that was
    /// already truncated.
    pub fn is_truncated(&self, utterance_id: Option<&str>) -> bool {
        matches!(
            (utterance_id, self.truncated_utterance.as_deref()),
            (Some(id), Some(cut)) if id == cut
        )
    }

    /// Book-keeping for one audio chunk sent to telephony. Starts a new
    /// playback when the utterance id changes and returns the name of the
    /// mark to send after the chunk.
    pub fn register_chunk(&mut self, utterance_id: Option<&str>) -> String {
        if let Some(id) = utterance_id {
            let is_new = self
                .playback
                .as_ref()
                .is_none_or(|p| p.utterance_id != id);
            if is_new {
                debug!(
                    utterance_id = %id,
                    anchor_ms = self.latest_media_timestamp,
                    "New engine utterance"
                );
                self.playback = Some(Playback {
                    utterance_id: id.to_string(),
                    anchor_ms: self.latest_media_timestamp,
                });
                self.response_done = false;
            }
        }

        self.marks_sent += 1;
        let name = format!("{MARK_PREFIX}-{}", self.marks_sent);
        self.ack_queue.push_back(name.clone());
        name
    }

    /// Consume the oldest pending mark. Returns what was popped.
    pub fn ack_mark(&mut self, name: &str) -> Option<String> {
        let popped = self.ack_queue.pop_front();
        match &popped {
            Some(expected) if expected != name => {
                warn!(expected = %expected, received = %name, "Mark acknowledged out of order");
            }
            None => debug!(received = %name, "Mark acknowledged with empty queue"),
            _ => {}
        }
        self.settle_playback();
        popped
    }

    /// The engine finished generating the current response.
    pub fn finish_response(&mut self) {
        self.response_done = true;
        self.settle_playback();
    }

    /// Playback ends once the engine is done and every chunk was played.
    fn settle_playback(&mut self) {
        if self.response_done && self.ack_queue.is_empty() && self.playback.is_some() {
            debug!("Engine utterance fully played");
            self.playback = None;
        }
    }

    /// End the current playback for a barge-in. Drops all pending marks.
    pub fn interrupt_playback(&mut self) -> Option<Playback> {
        let playback = self.playback.take()?;
        self.ack_queue.clear();
        self.response_done = false;
        self.truncated_utterance = Some(playback.utterance_id.clone());
        Some(playback)
    }

    // -------------------------------------------------------------------------
    // Transcripts
    // -------------------------------------------------------------------------

    pub fn push_assistant_text(&mut self, delta: &str) {
        self.assistant_text.push_str(delta);
    }

    pub fn take_assistant_text(&mut self) -> String {
        std::mem::take(&mut self.assistant_text)
    }

    pub fn push_caller_text(&mut self, delta: &str) {
        self.caller_text.push_str(delta);
    }

    /// Finalize the caller transcript. The completion event's own
    /// `transcript` wins since deltas of the next item may already be
    /// buffered; the streamed text is the fallback.
    pub fn take_caller_transcript(&mut self, completed: Option<&str>) -> String {
        let streamed = std::mem::take(&mut self.caller_text);
        match completed {
            Some(text) if !text.trim().is_empty() => text.to_string(),
            _ => streamed,
        }
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn voice(&self) -> OpenAIRealtimeVoice {
        self.voice
    }

    /// Assistant text streamed since the last flush.
    pub fn assistant_text(&self) -> &str {
        &self.assistant_text
    }

    pub fn stream_id(&self) -> Option<&str> {
        self.stream_id.as_deref()
    }

    pub fn latest_media_timestamp(&self) -> u64 {
        self.latest_media_timestamp
    }

    pub fn playback(&self) -> Option<&Playback> {
        self.playback.as_ref()
    }

    pub fn active_utterance_id(&self) -> Option<&str> {
        self.playback.as_ref().map(|p| p.utterance_id.as_str())
    }

    pub fn playback_anchor(&self) -> Option<u64> {
        self.playback.as_ref().map(|p| p.anchor_ms)
    }

    pub fn ack_queue(&self) -> &VecDeque<String> {
        &self.ack_queue
    }

    pub fn last_dispatched_command(&self) -> Arc<Mutex<Option<String>>> {
        self.last_dispatched_command.clone()
    }

    pub fn watchdog(&self) -> &SilenceWatchdog {
        &self.watchdog
    }

    pub fn watchdog_mut(&mut self) -> &mut SilenceWatchdog {
        &mut self.watchdog
    }
}
