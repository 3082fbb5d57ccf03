use axum::{Router, routing::get};

use crate::handlers::media_stream::media_stream_handler;
use crate::state::AppState;
use std::sync::Arc;

/// Create the media stream WebSocket router
pub fn create_media_router() -> Router<Arc<AppState>> {
    Router::new().route("/media-stream", get(media_stream_handler))
}
