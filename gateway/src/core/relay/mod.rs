//! Duplex relay between a client socket and an upstream voice session.
//!
//! Two pumps run inside one task:
//!
//! - client → upstream: binary PCM frames are forwarded unchanged
//! - upstream → client: audio is framed as WAV and base64-encoded, every
//!   other event is passed through
//!
//! The first pump to finish ends the session. The other is dropped, the
//! client receives a close frame and the upstream session is closed.

mod messages;
#[allow(clippy::module_inception)]
mod relay;

pub use messages::{AudioOutputFrame, OutboundClientMessage};
pub use relay::{CLIENT_CLOSE_TIMEOUT, Relay, RelayOutcome, RelayState, RelayStats};
