//! Incoming call webhook.
//!
//! Answers the telephony provider's webhook with TwiML that connects the
//! call to this server's media stream endpoint. A voice is picked at random
//! per call and carried on the stream URL.

use axum::{
    http::{HeaderMap, header},
    response::{IntoResponse, Response},
};
use tracing::info;

use crate::core::realtime::OpenAIRealtimeVoice;
use crate::core::telephony::{TwimlVerb, host_without_port, media_stream_url, render_twiml};
use crate::errors::{AppError, AppResult};

pub async fn incoming_call(headers: HeaderMap) -> AppResult<Response> {
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(host_without_port)
        .filter(|h| !h.is_empty())
        .ok_or_else(|| AppError::BadRequest("missing Host header".to_string()))?;

    let voice = OpenAIRealtimeVoice::random();
    let stream_url = media_stream_url(host, voice.as_str());
    info!(voice = %voice, "Incoming call, connecting media stream to {}", stream_url);

    let body = render_twiml(&[TwimlVerb::Connect { stream_url }]);
    Ok(([(header::CONTENT_TYPE, "application/xml")], body).into_response())
}
