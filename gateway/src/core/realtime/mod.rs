//! Realtime voice provider module.
//!
//! This module provides the upstream half of the relay: a connector trait for
//! opening duplex sessions and the Hume EVI implementation of it.
//!
//! # Architecture
//!
//! - [`RealtimeConnector`] opens one [`UpstreamSession`] per client
//! - the session exposes `send` (raw audio in) and `receive` (tagged
//!   [`InboundEvent`]s out), and is released with `close`
//! - provider transports run in their own task behind bounded channels
//!
//! # Example
//!
//! ```rust,ignore
//! use evi_relay::core::realtime::{HumeEVI, HumeEVIConfig, RealtimeConnector};
//!
//! let connector = HumeEVI::new(HumeEVIConfig::new("api-key"))?;
//! let mut session = connector.open("config-id", "secret").await?;
//! session.send(audio_bytes).await?;
//! session.close().await?;
//! ```

mod base;
pub mod hume;
mod session;

pub use base::{
    AudioChunk, ConnectionState, InboundEvent, RealtimeConnector, RealtimeError, RealtimeResult,
    SharedConnector,
};
pub use hume::{EVIVersion, HUME_EVI_WEBSOCKET_URL, HumeEVI, HumeEVIConfig};
pub use session::{
    DEFAULT_CLOSE_TIMEOUT, SessionMetadata, UpstreamReceiver, UpstreamSender, UpstreamSession,
};
