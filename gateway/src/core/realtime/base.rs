//! Base traits and types for upstream realtime voice sessions.
//!
//! A realtime provider is reached through a [`RealtimeConnector`], which opens
//! one [`UpstreamSession`](super::UpstreamSession) per client connection. The
//! session speaks in two directions: raw audio bytes go in, tagged
//! [`InboundEvent`]s come out.

use async_trait::async_trait;
use bytes::Bytes;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use super::session::UpstreamSession;
use crate::core::audio::PcmFormat;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during realtime operations.
#[derive(Debug, Error)]
pub enum RealtimeError {
    /// Connection to the provider failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// WebSocket error
    #[error("WebSocket error: {0}")]
    WebSocketError(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Operation timeout
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Not connected
    #[error("Not connected")]
    NotConnected,
}

/// Result type for realtime operations.
pub type RealtimeResult<T> = Result<T, RealtimeError>;

// =============================================================================
// Connection State
// =============================================================================

/// Connection state of an upstream session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// Not connected to the provider
    #[default]
    Disconnected,
    /// Connected and ready
    Connected,
    /// Close requested, transport shutting down
    Closing,
    /// Connection failed
    Failed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "Disconnected"),
            ConnectionState::Connected => write!(f, "Connected"),
            ConnectionState::Closing => write!(f, "Closing"),
            ConnectionState::Failed => write!(f, "Failed"),
        }
    }
}

// =============================================================================
// Inbound Events
// =============================================================================

/// A chunk of assistant speech received from the provider.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioChunk {
    /// Raw interleaved PCM bytes
    pub pcm: Bytes,
    /// Sample layout declared by the provider, if any
    pub format: Option<PcmFormat>,
    /// Provider-assigned chunk ID
    pub id: Option<String>,
}

impl AudioChunk {
    /// Create a chunk of PCM with no declared format.
    pub fn raw(pcm: impl Into<Bytes>) -> Self {
        Self {
            pcm: pcm.into(),
            format: None,
            id: None,
        }
    }

    /// Declare the sample layout of this chunk.
    pub fn with_format(mut self, format: PcmFormat) -> Self {
        self.format = Some(format);
        self
    }
}

/// An event received from the upstream provider.
///
/// Audio needs framing before it can reach a client. Everything else is
/// passed through as the provider sent it, including event types this crate
/// does not know about.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    /// Assistant speech as raw PCM.
    AudioOutput(AudioChunk),
    /// An `audio_output` event whose payload could not be decoded. Never
    /// forwarded to the client.
    InvalidAudio {
        /// Provider-assigned chunk ID, if the event carried one
        id: Option<String>,
        /// What was wrong with the payload
        reason: String,
    },
    /// Any other event, kept as its full JSON structure.
    Other(serde_json::Value),
}

impl InboundEvent {
    /// The provider's `type` discriminator, when the event carries one.
    pub fn event_type(&self) -> Option<&str> {
        match self {
            InboundEvent::AudioOutput(_) | InboundEvent::InvalidAudio { .. } => {
                Some("audio_output")
            }
            InboundEvent::Other(value) => value.get("type").and_then(|t| t.as_str()),
        }
    }
}

// =============================================================================
// Connector Trait
// =============================================================================

/// Opens upstream sessions against a realtime provider.
///
/// The provider API key belongs to the connector and is fixed when it is
/// built. Each session is authorised with a secret key and bound to a
/// provider-side configuration ID.
///
/// Every session returned by [`open`](RealtimeConnector::open) must be
/// released with [`UpstreamSession::close`]; dropping an unclosed session
/// aborts its transport.
#[async_trait]
pub trait RealtimeConnector: Send + Sync {
    /// Open a new duplex session.
    async fn open(&self, config_id: &str, secret_key: &str) -> RealtimeResult<UpstreamSession>;

    /// Short provider name for logs.
    fn provider_name(&self) -> &'static str;
}

/// Shared connector handle.
pub type SharedConnector = Arc<dyn RealtimeConnector>;
