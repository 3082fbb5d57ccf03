//! Telephony media stream WebSocket handler.
//!
//! One upgrade per call. The handler opens the realtime engine connection,
//! wires both sockets to channels and streams, then hands everything to
//! [`CallRelay`] until either side hangs up.

use std::sync::Arc;

use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures::stream;
use futures::{SinkExt, Stream, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::core::personality::system_instructions;
use crate::core::realtime::{EngineConnection, OpenAIRealtimeVoice};
use crate::core::relay::CallRelay;
use crate::core::telephony::{TelephonyCommand, TelephonyEvent};
use crate::state::AppState;

/// Buffer for outbound telephony frames
const CHANNEL_BUFFER_SIZE: usize = 1024;

/// Maximum WebSocket frame size (10 MB)
const MAX_WS_FRAME_SIZE: usize = 10 * 1024 * 1024;

/// Maximum WebSocket message size (10 MB)
const MAX_WS_MESSAGE_SIZE: usize = 10 * 1024 * 1024;

#[derive(Debug, Deserialize)]
pub struct MediaStreamQuery {
    pub voice: Option<String>,
}

/// Resolve the `voice` query parameter; missing or unknown names pick one at random.
pub fn resolve_voice(requested: Option<&str>) -> OpenAIRealtimeVoice {
    match requested {
        Some(name) => OpenAIRealtimeVoice::parse(name).unwrap_or_else(|| {
            warn!(requested = %name, "Unknown voice requested, picking one at random");
            OpenAIRealtimeVoice::random()
        }),
        None => OpenAIRealtimeVoice::random(),
    }
}

pub async fn media_stream_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<MediaStreamQuery>,
) -> Response {
    let voice = resolve_voice(query.voice.as_deref());
    info!(voice = %voice, "Media stream connection upgrade requested");

    ws.max_frame_size(MAX_WS_FRAME_SIZE)
        .max_message_size(MAX_WS_MESSAGE_SIZE)
        .on_upgrade(move |socket| handle_media_socket(socket, state, voice))
}

async fn handle_media_socket(mut socket: WebSocket, state: Arc<AppState>, voice: OpenAIRealtimeVoice) {
    let realtime = state
        .config
        .realtime_config(voice.as_str(), system_instructions(voice));

    let engine = match EngineConnection::connect(&realtime).await {
        Ok(engine) => engine,
        Err(e) => {
            error!("Failed to connect to realtime engine: {}", e);
            let _ = socket.send(Message::Close(None)).await;
            return;
        }
    };

    let (mut sender, receiver) = socket.split();
    let (telephony_tx, mut telephony_rx) = mpsc::channel::<TelephonyCommand>(CHANNEL_BUFFER_SIZE);

    let telephony_writer = tokio::spawn(async move {
        while let Some(command) = telephony_rx.recv().await {
            let json = match serde_json::to_string(&command) {
                Ok(j) => j,
                Err(e) => {
                    error!("Failed to serialize telephony frame: {}", e);
                    continue;
                }
            };
            if let Err(e) = sender.send(Message::Text(json.into())).await {
                debug!("Telephony socket closed while sending: {}", e);
                break;
            }
        }
        let _ = sender.close().await;
    });

    let relay = CallRelay::new(
        voice,
        realtime.session_config(),
        engine.sender,
        telephony_tx,
        state.task_backend.clone(),
    );

    let (session, end) = relay
        .run(Box::pin(telephony_stream(receiver)), engine.events)
        .await;

    telephony_writer.abort();
    engine.writer.abort();

    info!(
        stream_id = ?session.stream_id(),
        voice = %session.voice(),
        end = ?end,
        "Call ended"
    );
}

/// Typed inbound telephony frames. Malformed and non-text frames are logged
/// and skipped; the stream ends on `Close` or a socket error.
fn telephony_stream<S, E>(receiver: S) -> impl Stream<Item = TelephonyEvent> + Send
where
    S: Stream<Item = Result<Message, E>> + Unpin + Send,
    E: std::fmt::Display + Send,
{
    stream::unfold(receiver, |mut receiver| async move {
        loop {
            match receiver.next().await? {
                Ok(Message::Text(text)) => match TelephonyEvent::parse(text.as_str()) {
                    Ok(event) => return Some((event, receiver)),
                    Err(e) => warn!("Failed to parse telephony frame: {}", e),
                },
                Ok(Message::Close(_)) => {
                    info!("Telephony client disconnected");
                    return None;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("Telephony socket error: {}", e);
                    return None;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(json: &str) -> Result<Message, String> {
        Ok(Message::Text(json.to_string().into()))
    }

    const MEDIA: &str = r#"{"event":"media","media":{"timestamp":"20","payload":"AAAA"}}"#;
    const MARK: &str = r#"{"event":"mark","streamSid":"MZ1","mark":{"name":"responsePart-1"}}"#;

    #[tokio::test]
    async fn test_telephony_stream_skips_malformed_frames() {
        let frames = vec![
            text(MEDIA),
            text("{not json"),
            Ok(Message::Binary(vec![1, 2, 3].into())),
            text(r#"{"event":"media"}"#),
            text(MARK),
        ];
        let events: Vec<TelephonyEvent> = Box::pin(telephony_stream(stream::iter(frames)))
            .collect()
            .await;

        assert_eq!(events.len(), 2);
        assert!(matches!(&events[0], TelephonyEvent::Media { media } if media.timestamp == 20));
        assert!(matches!(&events[1], TelephonyEvent::Mark { mark } if mark.name == "responsePart-1"));
    }

    #[tokio::test]
    async fn test_telephony_stream_ends_on_close() {
        let frames = vec![text(MEDIA), Ok(Message::Close(None)), text(MARK)];
        let events: Vec<TelephonyEvent> = Box::pin(telephony_stream(stream::iter(frames)))
            .collect()
            .await;
        assert_eq!(events.len(), 1);
    }

    #[tokio::test]
    async fn test_telephony_stream_ends_on_socket_error() {
        let frames = vec![text(MEDIA), Err("connection reset".to_string()), text(MARK)];
        let events: Vec<TelephonyEvent> = Box::pin(telephony_stream(stream::iter(frames)))
            .collect()
            .await;
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_resolve_known_voice() {
        assert_eq!(resolve_voice(Some("sage")), OpenAIRealtimeVoice::Sage);
    }

    #[test]
    fn test_resolve_unknown_voice_is_random_catalogue_entry() {
        let voice = resolve_voice(Some("not-a-voice"));
        assert!(OpenAIRealtimeVoice::all().contains(&voice));
        let voice = resolve_voice(None);
        assert!(OpenAIRealtimeVoice::all().contains(&voice));
    }
}
