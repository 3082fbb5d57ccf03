//! The duplex relay loop for one call.
//!
//! A single task owns the [`Session`] and selects over:
//! - inbound telephony frames
//! - inbound engine events
//! - the one-shot greeting timer
//!
//! Outbound traffic goes through two bounded channels drained by the socket
//! writer tasks, so every send preserves order per direction. When either
//! inbound stream ends the loop returns and the session's watchdog is
//! cancelled.

use std::sync::Arc;
use std::time::Duration;

use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::barge_in::{clear_command, interrupt};
use super::dispatcher::{DispatchContext, Dispatcher};
use super::prompts::{GREETING_PROMPT, prompt_events};
use super::session::Session;
use super::trigger::extract_command;
use crate::core::realtime::{ClientEvent, OpenAIRealtimeVoice, ServerEvent, SessionConfig};
use crate::core::tasks::TaskBackend;
use crate::core::telephony::{TelephonyCommand, TelephonyEvent};

/// Delay between the session update and the greeting prompt.
pub const GREETING_DELAY: Duration = Duration::from_secs(2);

/// Which side ended the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallEnd {
    TelephonyClosed,
    EngineClosed,
}

/// Relay for one call.
pub struct CallRelay {
    session: Session,
    session_config: SessionConfig,
    engine: mpsc::Sender<ClientEvent>,
    telephony: mpsc::Sender<TelephonyCommand>,
    dispatcher: Dispatcher,
}

impl CallRelay {
    pub fn new(
        voice: OpenAIRealtimeVoice,
        session_config: SessionConfig,
        engine: mpsc::Sender<ClientEvent>,
        telephony: mpsc::Sender<TelephonyCommand>,
        backend: Arc<dyn TaskBackend>,
    ) -> Self {
        let session = Session::new(voice, engine.clone());
        let dispatcher = Dispatcher::new(
            backend,
            session.last_dispatched_command(),
            engine.clone(),
        );
        Self {
            session,
            session_config,
            engine,
            telephony,
            dispatcher,
        }
    }

    /// Drive the call until either side goes away. Returns the final
    /// session state and which side ended it.
    pub async fn run<T, E>(mut self, mut telephony_in: T, mut engine_in: E) -> (Session, CallEnd)
    where
        T: Stream<Item = TelephonyEvent> + Unpin,
        E: Stream<Item = ServerEvent> + Unpin,
    {
        self.send_engine(ClientEvent::SessionUpdate {
            session: self.session_config.clone(),
        })
        .await;

        let greeting = tokio::time::sleep(GREETING_DELAY);
        tokio::pin!(greeting);
        let mut greeted = false;

        let end = loop {
            tokio::select! {
                frame = telephony_in.next() => match frame {
                    Some(frame) => self.on_telephony(frame).await,
                    None => {
                        info!(stream_id = ?self.session.stream_id(), "Telephony stream closed");
                        break CallEnd::TelephonyClosed;
                    }
                },
                event = engine_in.next() => match event {
                    Some(event) => self.on_engine(event).await,
                    None => {
                        info!(stream_id = ?self.session.stream_id(), "Realtime engine stream closed");
                        break CallEnd::EngineClosed;
                    }
                },
                _ = &mut greeting, if !greeted => {
                    greeted = true;
                    debug!("Sending greeting prompt");
                    for event in prompt_events(GREETING_PROMPT) {
                        self.send_engine(event).await;
                    }
                }
            }
        };

        self.session.watchdog_mut().cancel();
        (self.session, end)
    }

    // -------------------------------------------------------------------------
    // Telephony -> engine
    // -------------------------------------------------------------------------

    async fn on_telephony(&mut self, frame: TelephonyEvent) {
        match frame {
            TelephonyEvent::Connected { protocol } => {
                debug!(protocol = ?protocol, "Telephony connected");
            }
            TelephonyEvent::Start { start } => {
                info!(
                    stream_id = %start.stream_sid,
                    call_sid = ?start.call_sid,
                    "Incoming stream has started"
                );
                self.session.start_stream(start.stream_sid);
            }
            TelephonyEvent::Media { media } => {
                self.session.record_media(media.timestamp);
                match media.decode_payload() {
                    Ok(audio) => self.send_engine(ClientEvent::audio_append(&audio)).await,
                    Err(e) => warn!("Skipping media frame with invalid payload: {}", e),
                }
            }
            TelephonyEvent::Mark { mark } => {
                self.session.ack_mark(&mark.name);
            }
            TelephonyEvent::Stop { stream_sid } => {
                info!(stream_id = ?stream_sid, "Telephony stream stopped");
            }
            TelephonyEvent::Unknown => {
                debug!("Ignoring unknown telephony event");
            }
        }
    }

    // -------------------------------------------------------------------------
    // Engine -> telephony
    // -------------------------------------------------------------------------

    async fn on_engine(&mut self, event: ServerEvent) {
        match event {
            ServerEvent::AudioDelta { item_id, delta, .. } => {
                self.on_audio_delta(item_id.as_deref(), &delta).await;
            }
            ServerEvent::SpeechStarted { audio_start_ms, .. } => {
                debug!(audio_start_ms, "Caller speech started");
                if let Some(cut) = interrupt(&mut self.session) {
                    self.send_engine(cut.engine_event()).await;
                    if let Some(clear) = clear_command(&self.session) {
                        self.send_telephony(clear).await;
                    }
                }
            }
            ServerEvent::SpeechStopped { audio_end_ms, .. } => {
                debug!(audio_end_ms, "Caller speech stopped");
                let now = self.session.latest_media_timestamp();
                self.session.watchdog_mut().start(now);
            }
            ServerEvent::ResponseDone { response } => {
                debug!(
                    response_id = ?response.as_ref().and_then(|r| r.id.as_deref()),
                    status = ?response.as_ref().and_then(|r| r.status.as_deref()),
                    "Engine response done"
                );
                self.flush_assistant_text();
                self.session.finish_response();
                let now = self.session.latest_media_timestamp();
                self.session.watchdog_mut().start(now);
            }
            ServerEvent::AssistantTextDelta { delta, .. } => {
                self.session.push_assistant_text(&delta);
            }
            ServerEvent::AssistantTextDone { .. } => self.flush_assistant_text(),
            ServerEvent::CallerTranscriptDelta { delta, .. } => {
                self.session.push_caller_text(&delta);
            }
            ServerEvent::CallerTranscriptDone { transcript, .. } => {
                let text = self.session.take_caller_transcript(transcript.as_deref());
                let text = text.trim();
                if text.is_empty() {
                    return;
                }
                info!("Caller: {}", text);
                if let Some(command) = extract_command(text) {
                    let context = DispatchContext {
                        voice: self.session.voice().to_string(),
                        stream_id: self.session.stream_id().map(str::to_string),
                    };
                    self.dispatcher.spawn(command, context);
                }
            }
            ServerEvent::Error { error } => {
                error!(
                    error_type = %error.error_type,
                    code = ?error.code,
                    "Realtime engine error: {}",
                    error.message
                );
            }
            ServerEvent::SessionCreated { session } => {
                info!(session_id = ?session.id, model = ?session.model, "Engine session created");
            }
            ServerEvent::SessionUpdated { session } => {
                debug!(session_id = ?session.id, "Engine session updated");
            }
            ServerEvent::Unknown => {}
        }
    }

    /// Log and clear the assistant transcript. Runs on the text `done` event
    /// and again on `response.done` for responses that never sent one.
    fn flush_assistant_text(&mut self) {
        let text = self.session.take_assistant_text();
        if !text.trim().is_empty() {
            info!("Assistant: {}", text.trim());
        }
    }

    async fn on_audio_delta(&mut self, item_id: Option<&str>, delta: &str) {
        let Some(stream_id) = self.session.stream_id().map(str::to_string) else {
            debug!("Engine audio before telephony stream start, dropped");
            return;
        };
        if self.session.is_truncated(item_id) {
            debug!(item_id = ?item_id, "Dropping audio of truncated utterance");
            return;
        }
        let audio = match ServerEvent::decode_audio_delta(delta) {
            Ok(audio) => audio,
            Err(e) => {
                warn!("Skipping engine audio with invalid payload: {}", e);
                return;
            }
        };

        self.send_telephony(TelephonyCommand::media(&stream_id, &audio))
            .await;
        let mark = self.session.register_chunk(item_id);
        self.send_telephony(TelephonyCommand::mark(stream_id, mark))
            .await;
        self.session.watchdog_mut().cancel();
    }

    // -------------------------------------------------------------------------
    // Output
    // -------------------------------------------------------------------------

    async fn send_engine(&self, event: ClientEvent) {
        let kind = event.kind();
        if self.engine.send(event).await.is_err() {
            debug!("Engine channel closed, {} dropped", kind);
        }
    }

    async fn send_telephony(&self, command: TelephonyCommand) {
        if self.telephony.send(command).await.is_err() {
            debug!("Telephony channel closed, frame dropped");
        }
    }
}
