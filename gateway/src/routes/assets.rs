//! Static page route

use axum::Router;
use std::path::Path;
use std::sync::Arc;
use tower_http::services::ServeFile;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Create the router serving the demo page at `GET /`.
///
/// The file is read on every request, so a missing file surfaces as a 404
/// rather than a startup failure.
pub fn create_assets_router(index: &Path) -> Router<Arc<AppState>> {
    Router::new()
        .route_service("/", ServeFile::new(index))
        .layer(TraceLayer::new_for_http())
}
