//! HTTP route configuration
//!
//! - `relay` - `GET /ws`, the relay WebSocket
//! - `assets` - `GET /`, the demo page

pub mod assets;
pub mod relay;

use axum::Router;
use std::sync::Arc;

use crate::state::AppState;

/// Combine every route and attach the shared state.
pub fn create_app_router(state: Arc<AppState>) -> Router {
    let index = state.config.static_index_path.clone();

    relay::create_relay_router()
        .merge(assets::create_assets_router(&index))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use std::fs;
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn state_with_index(path: std::path::PathBuf) -> Arc<AppState> {
        let mut config = ServerConfig::with_credentials("api", "secret", "cfg");
        config.static_index_path = path;
        AppState::new(config).unwrap()
    }

    #[tokio::test]
    async fn test_index_is_served() {
        let dir = TempDir::new().unwrap();
        let index = dir.path().join("index.html");
        fs::write(&index, "<html>relay</html>").unwrap();

        let app = create_app_router(state_with_index(index));
        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"<html>relay</html>");
    }

    #[tokio::test]
    async fn test_missing_index_is_not_found() {
        let app = create_app_router(state_with_index("/nonexistent/index.html".into()));
        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_ws_requires_upgrade() {
        let dir = TempDir::new().unwrap();
        let app = create_app_router(state_with_index(dir.path().join("index.html")));
        let response = app
            .oneshot(Request::builder().uri("/ws").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert!(response.status().is_client_error());
    }
}
