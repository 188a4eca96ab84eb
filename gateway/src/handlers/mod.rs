//! HTTP and WebSocket request handlers
//!
//! - `relay` - Client audio WebSocket relayed to Hume EVI

pub mod relay;

pub use relay::relay_handler;
