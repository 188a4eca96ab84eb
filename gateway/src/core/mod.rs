pub mod audio;
pub mod realtime;
pub mod relay;

// Re-export commonly used types for convenience
pub use audio::{PcmFormat, WavError, frame_pcm, parse_wav};

pub use realtime::{
    HumeEVI, HumeEVIConfig, InboundEvent, RealtimeConnector, RealtimeError, RealtimeResult,
    UpstreamSession,
};

pub use relay::{OutboundClientMessage, Relay, RelayOutcome, RelayState};
