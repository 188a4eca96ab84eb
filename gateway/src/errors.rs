//! Relay-level error type.
//!
//! Each variant belongs to exactly one session. Missing startup configuration
//! is reported by [`ConfigError::Missing`](crate::config::ConfigError::Missing).

use thiserror::Error;

use crate::core::audio::WavError;
use crate::core::realtime::RealtimeError;

#[derive(Debug, Error)]
pub enum RelayError {
    /// The upstream session could not be opened.
    #[error("Failed to open upstream session: {0}")]
    UpstreamConnectFailed(#[from] RealtimeError),

    /// The client closed or dropped its connection.
    #[error("Client disconnected")]
    ClientDisconnected,

    /// The upstream session ended without an error.
    #[error("Upstream session closed")]
    UpstreamClosed,

    /// The upstream transport failed mid-session.
    #[error("Upstream stream error: {0}")]
    UpstreamStreamError(String),

    /// An audio chunk carried parameters that cannot be framed.
    #[error("Invalid audio parameters: {0}")]
    InvalidAudioParameters(#[from] WavError),
}

impl RelayError {
    /// True for the ways a session ends without anything going wrong.
    pub fn is_normal_close(&self) -> bool {
        matches!(self, RelayError::ClientDisconnected | RelayError::UpstreamClosed)
    }
}
