//! Hume EVI configuration types.
//!
//! # Example
//!
//! ```rust,ignore
//! use evi_relay::core::realtime::hume::{HumeEVIConfig, EVIVersion};
//!
//! let config = HumeEVIConfig::new("your-api-key")
//!     .with_config_id("your-config-id")
//!     .with_secret_key("your-secret-key")
//!     .with_version(EVIVersion::V3);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

use super::messages::{AudioEncoding, AudioSettings, HUME_EVI_WEBSOCKET_URL};

/// Default connection timeout in seconds.
pub const DEFAULT_CONNECTION_TIMEOUT_SECONDS: u64 = 30;

// =============================================================================
// EVI Version
// =============================================================================

/// EVI version to use for the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EVIVersion {
    /// EVI version 1 (deprecated, sunset Aug 30, 2025).
    #[serde(rename = "1")]
    V1,
    /// EVI version 2 (deprecated, sunset Aug 30, 2025).
    #[serde(rename = "2")]
    V2,
    /// EVI version 3 (current, English only).
    #[default]
    #[serde(rename = "3")]
    V3,
    /// EVI version 4-mini (multilingual, lower latency).
    #[serde(rename = "4-mini")]
    V4Mini,
}

impl EVIVersion {
    /// Get the version string for API requests.
    pub fn as_str(&self) -> &'static str {
        match self {
            EVIVersion::V1 => "1",
            EVIVersion::V2 => "2",
            EVIVersion::V3 => "3",
            EVIVersion::V4Mini => "4-mini",
        }
    }

    /// Returns true if this version is deprecated.
    pub fn is_deprecated(&self) -> bool {
        matches!(self, EVIVersion::V1 | EVIVersion::V2)
    }

    /// Logs a deprecation warning if this version is deprecated.
    pub fn warn_if_deprecated(&self) {
        if self.is_deprecated() {
            warn!(
                version = self.as_str(),
                "EVI version {} is deprecated and reached end of support on August 30, 2025. \
                 Please migrate to EVI V3 or V4-mini.",
                self.as_str()
            );
        }
    }
}

impl fmt::Display for EVIVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EVIVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1" | "v1" => Ok(EVIVersion::V1),
            "2" | "v2" => Ok(EVIVersion::V2),
            "3" | "v3" => Ok(EVIVersion::V3),
            "4-mini" | "v4-mini" | "4mini" => Ok(EVIVersion::V4Mini),
            other => Err(format!("unknown EVI version '{other}'")),
        }
    }
}

// =============================================================================
// Input Audio
// =============================================================================

/// Layout of the PCM the client sends, announced to Hume via
/// `session_settings`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputAudio {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Number of interleaved channels.
    pub channels: u16,
}

impl InputAudio {
    /// Session settings payload for this layout.
    pub fn to_settings(self) -> AudioSettings {
        AudioSettings {
            encoding: AudioEncoding::Linear16,
            sample_rate: self.sample_rate,
            channels: self.channels,
        }
    }
}

// =============================================================================
// Hume EVI Configuration
// =============================================================================

/// Configuration for Hume EVI (Empathic Voice Interface).
///
/// The API key is fixed for the lifetime of the connector. The config ID and
/// secret key are normally supplied per session by
/// [`RealtimeConnector::open`](crate::core::realtime::RealtimeConnector::open).
#[derive(Clone, Serialize, Deserialize)]
pub struct HumeEVIConfig {
    /// API key for Hume AI.
    pub api_key: String,

    /// EVI configuration ID (created in Hume dashboard).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_id: Option<String>,

    /// Secret key, forwarded to Hume as-is.
    #[serde(default, skip_serializing)]
    pub secret_key: Option<String>,

    /// EVI version to use.
    #[serde(default)]
    pub evi_version: EVIVersion,

    /// Enable verbose transcription for interim user messages.
    #[serde(default)]
    pub verbose_transcription: bool,

    /// Input audio layout. When unset no `session_settings` is sent and Hume
    /// applies its own defaults.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_audio: Option<InputAudio>,

    /// WebSocket URL (defaults to Hume's production endpoint).
    #[serde(default = "default_websocket_url")]
    pub websocket_url: String,

    /// Connection timeout in seconds.
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout_seconds: u64,
}

fn default_websocket_url() -> String {
    HUME_EVI_WEBSOCKET_URL.to_string()
}

fn default_connection_timeout() -> u64 {
    DEFAULT_CONNECTION_TIMEOUT_SECONDS
}

impl Default for HumeEVIConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            config_id: None,
            secret_key: None,
            evi_version: EVIVersion::default(),
            verbose_transcription: false,
            input_audio: None,
            websocket_url: HUME_EVI_WEBSOCKET_URL.to_string(),
            connection_timeout_seconds: DEFAULT_CONNECTION_TIMEOUT_SECONDS,
        }
    }
}

// Keys stay out of logs.
impl fmt::Debug for HumeEVIConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HumeEVIConfig")
            .field("api_key", &"<redacted>")
            .field("config_id", &self.config_id)
            .field("secret_key", &self.secret_key.as_ref().map(|_| "<redacted>"))
            .field("evi_version", &self.evi_version)
            .field("verbose_transcription", &self.verbose_transcription)
            .field("input_audio", &self.input_audio)
            .field("websocket_url", &self.websocket_url)
            .field("connection_timeout_seconds", &self.connection_timeout_seconds)
            .finish()
    }
}

impl HumeEVIConfig {
    /// Create a new configuration with an API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Default::default()
        }
    }

    /// Set the EVI configuration ID.
    pub fn with_config_id(mut self, config_id: impl Into<String>) -> Self {
        self.config_id = Some(config_id.into());
        self
    }

    /// Set the secret key.
    pub fn with_secret_key(mut self, secret_key: impl Into<String>) -> Self {
        self.secret_key = Some(secret_key.into());
        self
    }

    /// Set the EVI version.
    pub fn with_version(mut self, version: EVIVersion) -> Self {
        self.evi_version = version;
        self
    }

    /// Enable verbose transcription.
    pub fn with_verbose_transcription(mut self) -> Self {
        self.verbose_transcription = true;
        self
    }

    /// Announce the input PCM layout after connecting.
    pub fn with_input_audio(mut self, sample_rate: u32, channels: u16) -> Self {
        self.input_audio = Some(InputAudio {
            sample_rate,
            channels,
        });
        self
    }

    /// Point the client at a different endpoint.
    pub fn with_websocket_url(mut self, url: impl Into<String>) -> Self {
        self.websocket_url = url.into();
        self
    }

    /// Set the connection timeout.
    pub fn with_connection_timeout(mut self, seconds: u64) -> Self {
        self.connection_timeout_seconds = seconds;
        self
    }

    /// Connection timeout as a [`Duration`].
    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_seconds)
    }

    /// Build the WebSocket URL with query parameters.
    pub fn build_websocket_url(&self) -> String {
        let mut url = self.websocket_url.clone();
        let mut params = Vec::new();

        fn encode(s: &str) -> String {
            url::form_urlencoded::byte_serialize(s.as_bytes()).collect()
        }

        params.push(format!("api_key={}", encode(&self.api_key)));

        if let Some(ref config_id) = self.config_id {
            params.push(format!("config_id={}", encode(config_id)));
        }

        if let Some(ref secret_key) = self.secret_key {
            params.push(format!("secret_key={}", encode(secret_key)));
        }

        if self.verbose_transcription {
            params.push("verbose_transcription=true".to_string());
        }

        match self.evi_version {
            EVIVersion::V1 | EVIVersion::V2 => {
                params.push(format!("version={}", self.evi_version.as_str()));
            }
            EVIVersion::V3 | EVIVersion::V4Mini => {
                params.push(format!("evi_version={}", self.evi_version.as_str()));
            }
        }

        url.push(if url.contains('?') { '&' } else { '?' });
        url.push_str(&params.join("&"));
        url
    }

    /// The endpoint without its query string, safe to log.
    pub fn redacted_url(&self) -> &str {
        self.websocket_url
            .split('?')
            .next()
            .unwrap_or(&self.websocket_url)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        self.evi_version.warn_if_deprecated();

        if self.api_key.is_empty() {
            return Err("API key is required".to_string());
        }

        if self.config_id.as_deref().is_some_and(str::is_empty) {
            return Err("Config ID must not be empty".to_string());
        }

        if !self.websocket_url.starts_with("ws://") && !self.websocket_url.starts_with("wss://") {
            return Err(format!(
                "WebSocket URL must use ws:// or wss://, got '{}'",
                self.redacted_url()
            ));
        }

        if self.connection_timeout_seconds == 0 {
            return Err("Connection timeout must be greater than 0".to_string());
        }

        if let Some(input) = self.input_audio {
            if input.sample_rate == 0 {
                return Err("Sample rate must be greater than 0".to_string());
            }
            if input.channels == 0 {
                return Err("Channels must be greater than 0".to_string());
            }
        }

        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
