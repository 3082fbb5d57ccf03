//! Realtime engine WebSocket connection.
//!
//! [`EngineConnection::connect`] opens the socket and splits it in two:
//! - a writer task that drains a bounded channel of [`ClientEvent`]s
//! - a typed stream of [`ServerEvent`]s read from the socket
//!
//! Frames that fail to decode are logged and skipped. The event stream ends
//! when the engine closes the socket or the transport errors.

use futures::stream::{self, BoxStream};
use futures::{SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tracing::{debug, error, info, warn};

use super::base::{RealtimeConfig, RealtimeError, RealtimeResult};
use super::messages::{ClientEvent, ServerEvent};

/// Capacity of the outbound channel to the engine writer task.
pub const ENGINE_CHANNEL_CAPACITY: usize = 1024;

/// A live connection to the realtime engine.
pub struct EngineConnection {
    /// Outbound events; dropped senders close the writer task
    pub sender: mpsc::Sender<ClientEvent>,
    /// Inbound typed events
    pub events: BoxStream<'static, ServerEvent>,
    /// Writer task handle, aborted on teardown
    pub writer: JoinHandle<()>,
}

impl EngineConnection {
    /// Connect to the engine described by `config`.
    pub async fn connect(config: &RealtimeConfig) -> RealtimeResult<Self> {
        config.validate()?;
        let url = config.connection_url()?;

        let mut request = url
            .as_str()
            .into_client_request()
            .map_err(|e| RealtimeError::ConnectionFailed(e.to_string()))?;
        let auth = format!("Bearer {}", config.api_key)
            .parse()
            .map_err(|_| RealtimeError::AuthenticationFailed("invalid API key".to_string()))?;
        request.headers_mut().insert(http::header::AUTHORIZATION, auth);

        let (socket, _response) = tokio_tungstenite::connect_async(request)
            .await
            .map_err(|e| RealtimeError::ConnectionFailed(e.to_string()))?;

        info!(model = %config.model, "Connected to realtime engine");

        let (mut sink, read) = socket.split();
        let (tx, mut rx) = mpsc::channel::<ClientEvent>(ENGINE_CHANNEL_CAPACITY);

        let writer = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                let json = match serde_json::to_string(&event) {
                    Ok(j) => j,
                    Err(e) => {
                        error!("Failed to serialize {}: {}", event.kind(), e);
                        continue;
                    }
                };
                if let Err(e) = sink.send(Message::Text(json.into())).await {
                    error!("Failed to send to realtime engine: {}", e);
                    break;
                }
            }
            let _ = sink.close().await;
            debug!("Engine writer task finished");
        });

        Ok(Self {
            sender: tx,
            events: event_stream(read).boxed(),
            writer,
        })
    }
}

/// Turn the read half of the socket into a stream of typed events.
/// Undecodable and non-text frames are skipped; the stream ends on `Close`
/// or a transport error.
fn event_stream<S, E>(read: S) -> impl Stream<Item = ServerEvent> + Send + 'static
where
    S: Stream<Item = Result<Message, E>> + Unpin + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    stream::unfold(read, |mut read| async move {
        loop {
            match read.next().await? {
                Ok(Message::Text(text)) => match ServerEvent::parse(&text) {
                    Ok(event) => return Some((event, read)),
                    Err(e) => {
                        warn!("Failed to parse engine event: {}", e);
                    }
                },
                Ok(Message::Close(frame)) => {
                    info!("Realtime engine closed the connection: {:?}", frame);
                    return None;
                }
                Ok(_) => {}
                Err(e) => {
                    error!("Realtime engine socket error: {}", e);
                    return None;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_rejects_missing_key() {
        let config = RealtimeConfig::default();
        let result = EngineConnection::connect(&config).await;
        assert!(matches!(result, Err(RealtimeError::AuthenticationFailed(_))));
    }

    #[tokio::test]
    async fn test_connect_unreachable_engine() {
        let mut config = RealtimeConfig::default();
        config.api_key = "sk-test".to_string();
        config.url = "ws://127.0.0.1:1/v1/realtime".to_string();
        let result = EngineConnection::connect(&config).await;
        assert!(matches!(result, Err(RealtimeError::ConnectionFailed(_))));
    }

    fn text(json: &str) -> Result<Message, String> {
        Ok(Message::Text(json.to_string().into()))
    }

    const SPEECH_STARTED: &str =
        r#"{"type":"input_audio_buffer.speech_started","audio_start_ms":100,"item_id":"I1"}"#;
    const RESPONSE_DONE: &str = r#"{"type":"response.done","response":{"id":"resp_1"}}"#;

    #[tokio::test]
    async fn test_event_stream_skips_malformed_frames() {
        let frames = vec![
            text(SPEECH_STARTED),
            text("garbage"),
            Ok(Message::Binary(vec![0u8, 1].into())),
            text(r#"{"type":"response.output_audio.delta"}"#),
            Ok(Message::Ping(Vec::<u8>::new().into())),
            text(RESPONSE_DONE),
        ];
        let events: Vec<ServerEvent> = event_stream(stream::iter(frames)).collect().await;

        assert_eq!(events.len(), 2);
        assert!(matches!(
            events[0],
            ServerEvent::SpeechStarted { audio_start_ms: 100, .. }
        ));
        assert!(matches!(events[1], ServerEvent::ResponseDone { .. }));
    }

    #[tokio::test]
    async fn test_event_stream_keeps_unknown_event_types() {
        let frames = vec![text(r#"{"type":"rate_limits.updated","rate_limits":[]}"#)];
        let events: Vec<ServerEvent> = event_stream(stream::iter(frames)).collect().await;
        assert_eq!(events, vec![ServerEvent::Unknown]);
    }

    #[tokio::test]
    async fn test_event_stream_ends_on_close() {
        let frames = vec![text(SPEECH_STARTED), Ok(Message::Close(None)), text(RESPONSE_DONE)];
        let events: Vec<ServerEvent> = event_stream(stream::iter(frames)).collect().await;
        assert_eq!(events.len(), 1);
    }

    #[tokio::test]
    async fn test_event_stream_ends_on_transport_error() {
        let frames = vec![text(SPEECH_STARTED), Err("reset".to_string()), text(RESPONSE_DONE)];
        let events: Vec<ServerEvent> = event_stream(stream::iter(frames)).collect().await;
        assert_eq!(events.len(), 1);
    }
}
