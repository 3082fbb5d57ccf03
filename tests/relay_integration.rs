//! Relay Integration Tests
//!
//! Drives a full `CallRelay` through in-memory channels standing in for the
//! telephony and engine sockets. Time is paused so the greeting delay and
//! the silence window elapse instantly and deterministically.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::channel::mpsc::{UnboundedSender, unbounded};
use parking_lot::Mutex;
use serde_json::json;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, timeout};

use callrelay_gateway::core::realtime::{ClientEvent, OpenAIRealtimeVoice, ServerEvent, SessionConfig};
use callrelay_gateway::core::relay::{
    CallEnd, CallRelay, GREETING_PROMPT, SILENCE_FILLER_PROMPT, SILENCE_WINDOW, Session,
    task_created_prompt,
};
use callrelay_gateway::core::tasks::{TaskBackend, TaskReceipt, TaskRequest, TaskResult};
use callrelay_gateway::core::telephony::{TelephonyCommand, TelephonyEvent};

/// Backend that records every request and answers with a fixed reference.
#[derive(Default)]
struct RecordingBackend {
    requests: Mutex<Vec<TaskRequest>>,
}

#[async_trait]
impl TaskBackend for RecordingBackend {
    async fn create_task(&self, request: &TaskRequest) -> TaskResult<TaskReceipt> {
        self.requests.lock().push(request.clone());
        Ok(TaskReceipt {
            reference: "T-42".to_string(),
        })
    }
}

struct Harness {
    telephony_in: UnboundedSender<TelephonyEvent>,
    engine_in: UnboundedSender<ServerEvent>,
    engine_out: mpsc::Receiver<ClientEvent>,
    telephony_out: mpsc::Receiver<TelephonyCommand>,
    handle: JoinHandle<(Session, CallEnd)>,
}

impl Harness {
    fn start(backend: Arc<dyn TaskBackend>) -> Self {
        let (telephony_in, telephony_rx) = unbounded();
        let (engine_in, engine_rx) = unbounded();
        let (engine_tx, engine_out) = mpsc::channel(64);
        let (telephony_tx, telephony_out) = mpsc::channel(64);

        let voice = OpenAIRealtimeVoice::Sage;
        let session_config = SessionConfig::telephony("gpt-realtime", voice.as_str(), None, "whisper-1");
        let relay = CallRelay::new(voice, session_config, engine_tx, telephony_tx, backend);
        let handle = tokio::spawn(relay.run(telephony_rx, engine_rx));

        Self {
            telephony_in,
            engine_in,
            engine_out,
            telephony_out,
            handle,
        }
    }

    /// Consume the session update and the greeting turn.
    async fn skip_preamble(&mut self) {
        assert!(matches!(
            self.engine_out.recv().await.unwrap(),
            ClientEvent::SessionUpdate { .. }
        ));
        assert_eq!(
            self.engine_out.recv().await.unwrap(),
            ClientEvent::user_text(GREETING_PROMPT)
        );
        assert_eq!(self.engine_out.recv().await.unwrap(), ClientEvent::ResponseCreate);
    }

    fn telephony(&self, frame: serde_json::Value) {
        let event = TelephonyEvent::parse(&frame.to_string()).unwrap();
        self.telephony_in.unbounded_send(event).unwrap();
    }

    fn engine(&self, event: serde_json::Value) {
        let event = ServerEvent::parse(&event.to_string()).unwrap();
        self.engine_in.unbounded_send(event).unwrap();
    }

    /// Send a media frame and wait until the relay forwarded it.
    async fn media(&mut self, timestamp: u64) {
        self.telephony(json!({
            "event": "media",
            "media": { "timestamp": timestamp.to_string(), "payload": "AAAA" }
        }));
        assert_eq!(
            self.engine_out.recv().await.unwrap(),
            ClientEvent::audio_append(&[0, 0, 0])
        );
    }
}

fn audio_delta(item_id: &str) -> serde_json::Value {
    json!({
        "type": "response.output_audio.delta",
        "response_id": "resp_1",
        "item_id": item_id,
        "delta": "AQID"
    })
}

#[tokio::test(start_paused = true)]
async fn test_session_update_then_greeting_after_delay() {
    let mut h = Harness::start(Arc::new(RecordingBackend::default()));
    let started = Instant::now();

    assert!(matches!(
        h.engine_out.recv().await.unwrap(),
        ClientEvent::SessionUpdate { .. }
    ));
    assert_eq!(
        h.engine_out.recv().await.unwrap(),
        ClientEvent::user_text(GREETING_PROMPT)
    );
    assert!(started.elapsed() >= Duration::from_secs(2));
    assert_eq!(h.engine_out.recv().await.unwrap(), ClientEvent::ResponseCreate);
}

#[tokio::test(start_paused = true)]
async fn test_barge_in_truncates_and_clears() {
    let mut h = Harness::start(Arc::new(RecordingBackend::default()));
    h.skip_preamble().await;

    h.telephony(json!({ "event": "start", "start": { "streamSid": "MZ1", "callSid": "CA1" } }));
    h.media(2000).await;

    h.engine(audio_delta("U1"));
    assert_eq!(
        h.telephony_out.recv().await.unwrap(),
        TelephonyCommand::media("MZ1", &[1, 2, 3])
    );
    assert_eq!(
        h.telephony_out.recv().await.unwrap(),
        TelephonyCommand::mark("MZ1", "responsePart-1")
    );

    h.media(5000).await;

    h.engine(json!({ "type": "input_audio_buffer.speech_started", "audio_start_ms": 4900 }));
    assert_eq!(
        h.engine_out.recv().await.unwrap(),
        ClientEvent::truncate("U1", 3000)
    );
    assert_eq!(
        h.telephony_out.recv().await.unwrap(),
        TelephonyCommand::clear("MZ1")
    );

    // Late chunk of the cut utterance is dropped, the next utterance plays.
    h.engine(audio_delta("U1"));
    h.engine(audio_delta("U2"));
    assert_eq!(
        h.telephony_out.recv().await.unwrap(),
        TelephonyCommand::media("MZ1", &[1, 2, 3])
    );
    assert_eq!(
        h.telephony_out.recv().await.unwrap(),
        TelephonyCommand::mark("MZ1", "responsePart-2")
    );

    drop(h.engine_in);
    let (session, end) = h.handle.await.unwrap();
    assert_eq!(end, CallEnd::EngineClosed);
    let playback = session.playback().unwrap();
    assert_eq!(playback.utterance_id, "U2");
    assert_eq!(playback.anchor_ms, 5000);
}

#[tokio::test(start_paused = true)]
async fn test_speech_start_without_playback_sends_nothing() {
    let mut h = Harness::start(Arc::new(RecordingBackend::default()));
    h.skip_preamble().await;

    h.telephony(json!({ "event": "start", "start": { "streamSid": "MZ1" } }));
    h.media(1000).await;
    h.engine(json!({ "type": "input_audio_buffer.speech_started", "audio_start_ms": 900 }));

    assert!(
        timeout(Duration::from_secs(5), h.telephony_out.recv())
            .await
            .is_err()
    );
}

#[tokio::test(start_paused = true)]
async fn test_marks_are_acknowledged_in_order() {
    let mut h = Harness::start(Arc::new(RecordingBackend::default()));
    h.skip_preamble().await;

    h.telephony(json!({ "event": "start", "start": { "streamSid": "MZ1" } }));
    h.media(100).await;

    h.engine(audio_delta("U1"));
    h.engine(audio_delta("U1"));
    for _ in 0..4 {
        h.telephony_out.recv().await.unwrap();
    }

    h.telephony(json!({ "event": "mark", "streamSid": "MZ1", "mark": { "name": "responsePart-1" } }));
    h.telephony(json!({ "event": "stop", "streamSid": "MZ1" }));
    drop(h.telephony_in);

    let (session, end) = h.handle.await.unwrap();
    assert_eq!(end, CallEnd::TelephonyClosed);
    assert_eq!(session.ack_queue().len(), 1);
    assert_eq!(session.ack_queue().front().map(String::as_str), Some("responsePart-2"));
    assert!(session.playback().is_some());
}

#[tokio::test(start_paused = true)]
async fn test_engine_audio_before_stream_start_is_dropped() {
    let mut h = Harness::start(Arc::new(RecordingBackend::default()));
    h.skip_preamble().await;

    h.engine(audio_delta("U1"));
    assert!(
        timeout(Duration::from_secs(1), h.telephony_out.recv())
            .await
            .is_err()
    );
}

#[tokio::test(start_paused = true)]
async fn test_silence_filler_fires_once() {
    let mut h = Harness::start(Arc::new(RecordingBackend::default()));
    h.skip_preamble().await;

    let stopped_at = Instant::now();
    h.engine(json!({ "type": "input_audio_buffer.speech_stopped", "audio_end_ms": 1200 }));

    assert_eq!(
        h.engine_out.recv().await.unwrap(),
        ClientEvent::user_text(SILENCE_FILLER_PROMPT)
    );
    assert_eq!(h.engine_out.recv().await.unwrap(), ClientEvent::ResponseCreate);
    assert!(stopped_at.elapsed() >= SILENCE_WINDOW);

    // Not re-armed until the next trigger
    assert!(
        timeout(SILENCE_WINDOW * 4, h.engine_out.recv())
            .await
            .is_err()
    );

    drop(h.telephony_in);
    let (session, _) = h.handle.await.unwrap();
    assert_eq!(session.watchdog().fire_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_engine_audio_cancels_silence_filler() {
    let mut h = Harness::start(Arc::new(RecordingBackend::default()));
    h.skip_preamble().await;

    h.telephony(json!({ "event": "start", "start": { "streamSid": "MZ1" } }));
    h.media(20).await;
    h.engine(json!({ "type": "response.done", "response": { "id": "resp_1", "status": "completed" } }));
    h.engine(audio_delta("U1"));
    h.telephony_out.recv().await.unwrap();
    h.telephony_out.recv().await.unwrap();

    assert!(
        timeout(SILENCE_WINDOW * 2, h.engine_out.recv())
            .await
            .is_err()
    );
}

#[tokio::test(start_paused = true)]
async fn test_trigger_phrase_dispatches_task_once() {
    let backend = Arc::new(RecordingBackend::default());
    let mut h = Harness::start(backend.clone());
    h.skip_preamble().await;

    h.telephony(json!({ "event": "start", "start": { "streamSid": "MZ7" } }));
    h.media(20).await;
    for _ in 0..2 {
        h.engine(json!({
            "type": "conversation.item.input_audio_transcription.delta",
            "item_id": "I1",
            "delta": "Foxtrot Oscar Tango, "
        }));
        h.engine(json!({
            "type": "conversation.item.input_audio_transcription.delta",
            "item_id": "I1",
            "delta": "build me a report."
        }));
        h.engine(json!({
            "type": "conversation.item.input_audio_transcription.completed",
            "item_id": "I1"
        }));
    }

    assert_eq!(
        h.engine_out.recv().await.unwrap(),
        ClientEvent::user_text(task_created_prompt("build me a report", "T-42"))
    );
    assert_eq!(h.engine_out.recv().await.unwrap(), ClientEvent::ResponseCreate);

    // The repeat is a duplicate: no second confirmation
    assert!(timeout(Duration::from_secs(1), h.engine_out.recv()).await.is_err());

    let requests = backend.requests.lock();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].title, "build me a report");
    assert_eq!(requests[0].metadata.voice, "sage");
    assert_eq!(requests[0].metadata.stream_sid.as_deref(), Some("MZ7"));
}

#[tokio::test(start_paused = true)]
async fn test_telephony_close_ends_call() {
    let h = Harness::start(Arc::new(RecordingBackend::default()));
    drop(h.telephony_in);
    let (session, end) = h.handle.await.unwrap();
    assert_eq!(end, CallEnd::TelephonyClosed);
    assert!(session.stream_id().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_response_done_flushes_assistant_text() {
    let mut h = Harness::start(Arc::new(RecordingBackend::default()));
    h.skip_preamble().await;

    h.engine(json!({ "type": "response.output_audio_transcript.delta", "item_id": "U1", "delta": "Hello, " }));
    h.engine(json!({ "type": "response.output_audio_transcript.delta", "item_id": "U1", "delta": "who is" }));
    h.engine(json!({ "type": "response.done", "response": { "id": "resp_1", "status": "cancelled" } }));
    drop(h.engine_in);

    let (session, end) = h.handle.await.unwrap();
    assert_eq!(end, CallEnd::EngineClosed);
    assert_eq!(session.assistant_text(), "");
}

#[tokio::test(start_paused = true)]
async fn test_completed_transcript_wins_over_interleaved_deltas() {
    let backend = Arc::new(RecordingBackend::default());
    let mut h = Harness::start(backend.clone());
    h.skip_preamble().await;

    h.engine(json!({
        "type": "conversation.item.input_audio_transcription.delta",
        "item_id": "I1",
        "delta": "Foxtrot Oscar Tango build me a report"
    }));
    // Next item starts streaming before the first completes
    h.engine(json!({
        "type": "conversation.item.input_audio_transcription.delta",
        "item_id": "I2",
        "delta": " and also"
    }));
    h.engine(json!({
        "type": "conversation.item.input_audio_transcription.completed",
        "item_id": "I1",
        "transcript": "Foxtrot Oscar Tango, build me a report."
    }));

    assert_eq!(
        h.engine_out.recv().await.unwrap(),
        ClientEvent::user_text(task_created_prompt("build me a report", "T-42"))
    );
    assert_eq!(backend.requests.lock()[0].description, "build me a report");
}
