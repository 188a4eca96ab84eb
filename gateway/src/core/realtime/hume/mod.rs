//! Hume AI Realtime Module - Empathic Voice Interface (EVI).
//!
//! # EVI Versions
//!
//! - **EVI 1/2**: Deprecated, sunset August 30, 2025
//! - **EVI 3**: Current version, English only
//! - **EVI 4-mini**: Multilingual, lower latency
//!
//! # Audio Format
//!
//! - **Input**: Linear16 PCM, announced through `session_settings` when the
//!   layout is configured
//! - **Output**: Base64-encoded WAV inside `audio_output` events
//!
//! # Example
//!
//! ```rust,ignore
//! use evi_relay::core::realtime::hume::{HumeEVI, HumeEVIConfig, EVIVersion};
//!
//! let config = HumeEVIConfig::new("your-api-key")
//!     .with_version(EVIVersion::V3)
//!     .with_input_audio(16000, 1);
//!
//! let evi = HumeEVI::new(config)?;
//! let session = evi.open("your-config-id", "your-secret-key").await?;
//! ```

mod client;
mod config;
pub mod messages;

pub use client::{AUDIO_QUEUE_CAPACITY, EVENT_QUEUE_CAPACITY, HumeEVI};
pub use config::{DEFAULT_CONNECTION_TIMEOUT_SECONDS, EVIVersion, HumeEVIConfig, InputAudio};
pub use messages::{
    AUDIO_OUTPUT_TYPE, AudioEncoding, AudioInput, AudioOutput, AudioSettings, EVIClientMessage,
    EVIServerMessage, HUME_EVI_DEFAULT_CHANNELS, HUME_EVI_DEFAULT_SAMPLE_RATE,
    HUME_EVI_WEBSOCKET_URL, SessionSettings, classify_binary, classify_text,
};
