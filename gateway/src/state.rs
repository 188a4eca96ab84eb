//! Shared application state.

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::core::realtime::{HumeEVI, RealtimeResult, SharedConnector};

/// Application state shared by every request handler.
///
/// Holds the configuration loaded at startup and the connector used to open
/// one upstream session per client connection.
pub struct AppState {
    pub config: ServerConfig,
    pub connector: SharedConnector,
}

impl AppState {
    /// Build the state with a Hume EVI connector derived from `config`.
    pub fn new(config: ServerConfig) -> RealtimeResult<Arc<Self>> {
        let connector: SharedConnector = Arc::new(HumeEVI::new(config.hume_config())?);
        Ok(Self::with_connector(config, connector))
    }

    /// Build the state around an existing connector.
    pub fn with_connector(config: ServerConfig, connector: SharedConnector) -> Arc<Self> {
        Arc::new(Self { config, connector })
    }
}
