//! Silence watchdog.
//!
//! A single-shot timer that asks the engine to re-engage the caller when no
//! new speech starts within [`SILENCE_WINDOW`]. Re-arming replaces the
//! pending timer.
//!
//! Cancel and fire race through one atomic slot holding the generation of
//! the armed timer:
//! - the timer fires only if it moves the slot from its own generation to
//!   `FIRING`
//! - cancel moves the slot from any generation to `IDLE`
//! - re-arm swaps in a new generation unconditionally
//!
//! Exactly one of cancel and fire wins for a given generation.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::prompts::{SILENCE_FILLER_PROMPT, prompt_events};
use crate::core::realtime::ClientEvent;

/// Quiet period before the filler prompt.
pub const SILENCE_WINDOW: Duration = Duration::from_secs(15);

const IDLE: u64 = 0;
const FIRING: u64 = u64::MAX;

/// Observable watchdog state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogState {
    Idle,
    Armed,
    Fired,
}

/// The atomic slot shared by the watchdog and its timer task.
#[derive(Debug, Default)]
pub struct FireGuard {
    slot: AtomicU64,
}

impl FireGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm `generation`, discarding whatever was armed before.
    pub fn arm(&self, generation: u64) {
        debug_assert!(generation != IDLE && generation != FIRING);
        self.slot.swap(generation, Ordering::AcqRel);
    }

    /// Disarm. Returns `true` if a pending fire was discarded, `false` if
    /// nothing was armed or a fire is already in flight.
    pub fn cancel(&self) -> bool {
        let mut current = self.slot.load(Ordering::Acquire);
        loop {
            if current == IDLE || current == FIRING {
                return false;
            }
            match self
                .slot
                .compare_exchange(current, IDLE, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    /// Claim the fire for `generation`. Succeeds at most once per arm.
    pub fn try_fire(&self, generation: u64) -> bool {
        self.slot
            .compare_exchange(generation, FIRING, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Return to idle after a fire, unless re-armed meanwhile.
    pub fn finish(&self) {
        let _ = self
            .slot
            .compare_exchange(FIRING, IDLE, Ordering::AcqRel, Ordering::Acquire);
    }

    pub fn state(&self) -> WatchdogState {
        match self.slot.load(Ordering::Acquire) {
            IDLE => WatchdogState::Idle,
            FIRING => WatchdogState::Fired,
            _ => WatchdogState::Armed,
        }
    }
}

/// Restartable single-shot silence timer for one call.
#[derive(Debug)]
pub struct SilenceWatchdog {
    window: Duration,
    guard: Arc<FireGuard>,
    generation: u64,
    timer: Option<CancellationToken>,
    fires: Arc<AtomicU64>,
    engine: mpsc::Sender<ClientEvent>,
}

impl SilenceWatchdog {
    pub fn new(engine: mpsc::Sender<ClientEvent>) -> Self {
        Self::with_window(SILENCE_WINDOW, engine)
    }

    pub fn with_window(window: Duration, engine: mpsc::Sender<ClientEvent>) -> Self {
        Self {
            window,
            guard: Arc::new(FireGuard::new()),
            generation: IDLE,
            timer: None,
            fires: Arc::new(AtomicU64::new(0)),
            engine,
        }
    }

    /// Arm (or re-arm) the timer. `media_ms` is the telephony timeline
    /// position the window is anchored to.
    pub fn start(&mut self, media_ms: u64) {
        self.generation = self.generation.wrapping_add(1);
        if self.generation == FIRING {
            self.generation = 1;
        }
        let generation = self.generation;

        if let Some(previous) = self.timer.take() {
            previous.cancel();
        }
        self.guard.arm(generation);

        let token = CancellationToken::new();
        self.timer = Some(token.clone());

        let window = self.window;
        let guard = self.guard.clone();
        let fires = self.fires.clone();
        let engine = self.engine.clone();

        debug!(
            anchor_ms = media_ms,
            window_ms = window.as_millis() as u64,
            "Silence watchdog armed"
        );

        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(window) => {
                    if !guard.try_fire(generation) {
                        return;
                    }
                    fires.fetch_add(1, Ordering::Relaxed);
                    info!(anchor_ms = media_ms, "Caller silent, prompting the engine to re-engage");
                    for event in prompt_events(SILENCE_FILLER_PROMPT) {
                        if engine.send(event).await.is_err() {
                            debug!("Engine channel closed, filler prompt dropped");
                            break;
                        }
                    }
                    guard.finish();
                }
            }
        });
    }

    /// Discard the pending fire, if any.
    pub fn cancel(&mut self) {
        if self.guard.cancel() {
            debug!("Silence watchdog cancelled");
        }
        if let Some(token) = self.timer.take() {
            token.cancel();
        }
    }

    pub fn state(&self) -> WatchdogState {
        self.guard.state()
    }

    /// Number of filler prompts fired over the watchdog's lifetime.
    pub fn fire_count(&self) -> u64 {
        self.fires.load(Ordering::Relaxed)
    }
}

impl Drop for SilenceWatchdog {
    fn drop(&mut self) {
        self.guard.cancel();
        if let Some(token) = self.timer.take() {
            token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;
    use std::thread;

    fn assert_window_elapsed(started: tokio::time::Instant) {
        let elapsed = started.elapsed();
        assert!(elapsed >= SILENCE_WINDOW, "fired early: {elapsed:?}");
        assert!(elapsed < SILENCE_WINDOW + Duration::from_secs(1), "fired late: {elapsed:?}");
    }

    #[test]
    fn test_guard_cancel_before_fire() {
        let guard = FireGuard::new();
        guard.arm(1);
        assert_eq!(guard.state(), WatchdogState::Armed);
        assert!(guard.cancel());
        assert!(!guard.try_fire(1));
        assert_eq!(guard.state(), WatchdogState::Idle);
    }

    #[test]
    fn test_guard_fire_makes_cancel_noop() {
        let guard = FireGuard::new();
        guard.arm(1);
        assert!(guard.try_fire(1));
        assert_eq!(guard.state(), WatchdogState::Fired);
        assert!(!guard.cancel());
        assert!(!guard.try_fire(1));
        guard.finish();
        assert_eq!(guard.state(), WatchdogState::Idle);
    }

    #[test]
    fn test_guard_rearm_discards_old_generation() {
        let guard = FireGuard::new();
        guard.arm(1);
        guard.arm(2);
        assert!(!guard.try_fire(1));
        assert!(guard.try_fire(2));
    }

    #[test]
    fn test_guard_rearm_during_fire_survives_finish() {
        let guard = FireGuard::new();
        guard.arm(1);
        assert!(guard.try_fire(1));
        guard.arm(2);
        guard.finish();
        assert_eq!(guard.state(), WatchdogState::Armed);
        assert!(guard.try_fire(2));
    }

    #[test]
    fn test_guard_cancel_fire_race_has_one_winner() {
        for round in 1..=500u64 {
            let guard = Arc::new(FireGuard::new());
            guard.arm(round);
            let barrier = Arc::new(Barrier::new(2));

            let fire = {
                let guard = guard.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    guard.try_fire(round)
                })
            };
            let cancel = {
                let guard = guard.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    guard.cancel()
                })
            };

            let fired = fire.join().unwrap();
            let cancelled = cancel.join().unwrap();
            assert!(fired ^ cancelled, "round {round}: fired={fired} cancelled={cancelled}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_once_after_window() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut watchdog = SilenceWatchdog::new(tx);
        watchdog.start(1000);
        assert_eq!(watchdog.state(), WatchdogState::Armed);

        let started = tokio::time::Instant::now();
        let first = rx.recv().await.unwrap();
        assert_window_elapsed(started);
        assert_eq!(first, ClientEvent::user_text(SILENCE_FILLER_PROMPT));
        assert_eq!(rx.recv().await.unwrap(), ClientEvent::ResponseCreate);

        tokio::task::yield_now().await;
        assert_eq!(watchdog.state(), WatchdogState::Idle);
        assert_eq!(watchdog.fire_count(), 1);

        let more = tokio::time::timeout(Duration::from_secs(60), rx.recv()).await;
        assert!(more.is_err(), "watchdog fired twice");
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_timer_never_fires() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut watchdog = SilenceWatchdog::new(tx);
        watchdog.start(0);
        tokio::time::sleep(Duration::from_secs(14)).await;
        watchdog.cancel();
        assert_eq!(watchdog.state(), WatchdogState::Idle);

        let more = tokio::time::timeout(Duration::from_secs(60), rx.recv()).await;
        assert!(more.is_err());
        assert_eq!(watchdog.fire_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_replaces_pending_timer() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut watchdog = SilenceWatchdog::new(tx);
        watchdog.start(0);
        tokio::time::sleep(Duration::from_secs(10)).await;
        watchdog.start(10_000);

        let started = tokio::time::Instant::now();
        rx.recv().await.unwrap();
        rx.recv().await.unwrap();
        assert_window_elapsed(started);

        let more = tokio::time::timeout(Duration::from_secs(60), rx.recv()).await;
        assert!(more.is_err());
        assert_eq!(watchdog.fire_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_timer() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut watchdog = SilenceWatchdog::new(tx);
        watchdog.start(0);
        drop(watchdog);
        assert!(rx.recv().await.is_none());
    }
}
