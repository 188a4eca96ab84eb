//! Relay WebSocket route configuration

use axum::{Router, routing::get};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::handlers::relay_handler;
use crate::state::AppState;

/// Create the relay WebSocket router
///
/// # Endpoint
///
/// `GET /ws` - WebSocket upgrade for a relay session
///
/// # Protocol
///
/// Clients send binary frames of raw 16-bit PCM. The server sends JSON text
/// frames: `{"type": "audio_output", "data": "<base64 WAV>"}` for assistant
/// audio, and every other Hume EVI event unchanged.
pub fn create_relay_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/ws", get(relay_handler))
        .layer(TraceLayer::new_for_http())
}
