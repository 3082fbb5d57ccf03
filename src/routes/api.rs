use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers::{api, call};
use crate::state::AppState;
use std::sync::Arc;

/// Create the HTTP router: health check and the incoming call webhook
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(api::health_check))
        // The provider may be configured for either method
        .route("/incoming-call", get(call::incoming_call).post(call::incoming_call))
        .layer(TraceLayer::new_for_http())
}
