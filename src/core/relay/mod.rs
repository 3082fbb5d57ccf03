//! Duplex call relay: telephony media stream <-> realtime engine.
//!
//! - `session` - per-call state
//! - `bridge` - the select loop tying both sockets together
//! - `barge_in` - truncation when the caller talks over the engine
//! - `watchdog` - silence timer
//! - `trigger` / `dispatcher` - spoken task commands sent to the task service
//! - `prompts` - synthetic conversation turns

mod barge_in;
mod bridge;
mod dispatcher;
mod prompts;
mod session;
mod trigger;
mod watchdog;

pub use barge_in::{Truncation, clear_command, elapsed_since_anchor, interrupt};
pub use bridge::{CallEnd, CallRelay, GREETING_DELAY};
pub use dispatcher::{DispatchContext, DispatchOutcome, Dispatcher};
pub use prompts::{
    GREETING_PROMPT, MISSING_TASK_PROMPT, SILENCE_FILLER_PROMPT, prompt_events,
    task_created_prompt, task_failed_prompt,
};
pub use session::{MARK_PREFIX, Playback, Session};
pub use trigger::extract_command;
pub use watchdog::{FireGuard, SILENCE_WINDOW, SilenceWatchdog, WatchdogState};
