//! Configuration module for the relay server
//!
//! This module handles server configuration from various sources: .env files, YAML files,
//! and environment variables. Priority: YAML > ENV vars > .env values > defaults.
//!
//! # Modules
//! - `yaml`: YAML configuration file loading
//! - `env`: Environment variable loading
//!
//! # Example
//! ```rust,no_run
//! use evi_relay::config::ServerConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = ServerConfig::from_env()?;
//!
//! // Load from YAML file with environment variable overrides
//! let config_path = PathBuf::from("config.yaml");
//! let config = ServerConfig::from_file(&config_path)?;
//!
//! println!("Server listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

mod env;
mod yaml;

use crate::core::realtime::hume::{
    DEFAULT_CONNECTION_TIMEOUT_SECONDS, EVIVersion, HUME_EVI_DEFAULT_CHANNELS,
    HUME_EVI_DEFAULT_SAMPLE_RATE, HUME_EVI_WEBSOCKET_URL, HumeEVIConfig,
};

/// Default HTML page served at `/`.
pub const DEFAULT_STATIC_INDEX: &str = "static/index.html";

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse YAML config: {0}")]
    ParseYaml(#[from] serde_yaml::Error),

    #[error("Invalid value for {name}: '{value}' ({reason})")]
    InvalidValue {
        name: &'static str,
        value: String,
        reason: String,
    },

    /// A required value was not provided; startup must stop.
    #[error("Missing required configuration: {0}")]
    Missing(&'static str),
}

/// Server configuration
///
/// Built once at startup and shared read-only through `AppState`. Contains:
/// - Server settings (host, port, static page)
/// - Hume EVI credentials and session defaults
/// - Client audio layout
/// - Security settings (CORS)
#[derive(Clone)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,
    pub static_index_path: PathBuf,

    // Hume credentials
    pub hume_api_key: String,
    pub hume_secret_key: String,
    pub hume_config_id: String,

    // Hume session defaults
    pub evi_version: EVIVersion,
    pub hume_websocket_url: String,
    pub hume_connection_timeout_seconds: u64,
    pub hume_verbose_transcription: bool,

    // Client audio layout, announced to Hume when set
    pub input_sample_rate: Option<u32>,
    pub input_channels: Option<u16>,

    // Security configuration
    /// CORS allowed origins (comma-separated list or "*" for all)
    /// Default: None (CORS disabled, same-origin only)
    pub cors_allowed_origins: Option<String>,
}

/// Implement Drop to zeroize all secret fields when ServerConfig is dropped.
impl Drop for ServerConfig {
    fn drop(&mut self) {
        use zeroize::Zeroize;

        self.hume_api_key.zeroize();
        self.hume_secret_key.zeroize();
    }
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("static_index_path", &self.static_index_path)
            .field("hume_api_key", &"<redacted>")
            .field("hume_secret_key", &"<redacted>")
            .field("hume_config_id", &self.hume_config_id)
            .field("evi_version", &self.evi_version)
            .field("hume_websocket_url", &self.hume_websocket_url)
            .field(
                "hume_connection_timeout_seconds",
                &self.hume_connection_timeout_seconds,
            )
            .field("hume_verbose_transcription", &self.hume_verbose_transcription)
            .field("input_sample_rate", &self.input_sample_rate)
            .field("input_channels", &self.input_channels)
            .field("cors_allowed_origins", &self.cors_allowed_origins)
            .finish()
    }
}

impl ServerConfig {
    /// Configuration with the three required Hume values and defaults for the
    /// rest.
    pub fn with_credentials(
        api_key: impl Into<String>,
        secret_key: impl Into<String>,
        config_id: impl Into<String>,
    ) -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            static_index_path: PathBuf::from(DEFAULT_STATIC_INDEX),
            hume_api_key: api_key.into(),
            hume_secret_key: secret_key.into(),
            hume_config_id: config_id.into(),
            evi_version: EVIVersion::default(),
            hume_websocket_url: HUME_EVI_WEBSOCKET_URL.to_string(),
            hume_connection_timeout_seconds: DEFAULT_CONNECTION_TIMEOUT_SECONDS,
            hume_verbose_transcription: false,
            input_sample_rate: None,
            input_channels: None,
            cors_allowed_origins: None,
        }
    }

    /// Load configuration from environment variables
    ///
    /// The .env file is loaded in main.rs, so its values are already part of
    /// the environment here.
    ///
    /// # Errors
    /// Returns an error if a required value is missing or a value is malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        let env = env::EnvConfig::load()?;
        let config = merge(env, None)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file with environment variable base
    ///
    /// Priority order (highest to lowest):
    /// 1. YAML file values
    /// 2. Environment variables (actual ENV vars override .env values)
    /// 3. .env file values
    /// 4. Default values
    ///
    /// # Errors
    /// Returns an error if:
    /// - The YAML file cannot be read or is malformed
    /// - Environment variables have invalid formats
    /// - A required value is missing after merging
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let yaml_config = yaml::YamlConfig::from_file(path)?;
        let env = env::EnvConfig::load()?;
        let config = merge(env, Some(yaml_config))?;
        config.validate()?;
        Ok(config)
    }

    /// Get the server address as a string
    ///
    /// Returns the address in the format "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Client audio layout to announce upstream, if any part of it is set.
    pub fn input_audio(&self) -> Option<(u32, u16)> {
        if self.input_sample_rate.is_none() && self.input_channels.is_none() {
            return None;
        }
        Some((
            self.input_sample_rate.unwrap_or(HUME_EVI_DEFAULT_SAMPLE_RATE),
            self.input_channels.unwrap_or(HUME_EVI_DEFAULT_CHANNELS),
        ))
    }

    /// Connector configuration for Hume EVI.
    ///
    /// The secret key and config ID are not included; they are supplied per
    /// session.
    pub fn hume_config(&self) -> HumeEVIConfig {
        let mut config = HumeEVIConfig::new(self.hume_api_key.clone())
            .with_version(self.evi_version)
            .with_websocket_url(self.hume_websocket_url.clone())
            .with_connection_timeout(self.hume_connection_timeout_seconds);
        if self.hume_verbose_transcription {
            config = config.with_verbose_transcription();
        }
        if let Some((sample_rate, channels)) = self.input_audio() {
            config = config.with_input_audio(sample_rate, channels);
        }
        config
    }

    /// Check required values and value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("HUME_API_KEY", &self.hume_api_key),
            ("HUME_SECRET_KEY", &self.hume_secret_key),
            ("HUME_CONFIG_ID", &self.hume_config_id),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Missing(name));
            }
        }

        if self.input_sample_rate == Some(0) {
            return Err(invalid("INPUT_SAMPLE_RATE", "0", "must be greater than 0"));
        }
        if self.input_channels == Some(0) {
            return Err(invalid("INPUT_CHANNELS", "0", "must be greater than 0"));
        }
        if self.hume_connection_timeout_seconds == 0 {
            return Err(invalid(
                "HUME_CONNECT_TIMEOUT_SECONDS",
                "0",
                "must be greater than 0",
            ));
        }

        self.hume_config()
            .validate()
            .map_err(|reason| ConfigError::InvalidValue {
                name: "hume",
                value: self.hume_config().redacted_url().to_string(),
                reason,
            })
    }
}

fn invalid(name: &'static str, value: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        name,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Merge environment values with YAML overrides and fill in defaults.
fn merge(env: env::EnvConfig, yaml: Option<yaml::YamlConfig>) -> Result<ServerConfig, ConfigError> {
    let yaml = yaml.unwrap_or_default();
    let server = yaml.server.unwrap_or_default();
    let hume = yaml.hume.unwrap_or_default();
    let audio = yaml.audio.unwrap_or_default();
    let security = yaml.security.unwrap_or_default();

    let evi_version = match hume.evi_version.or(env.evi_version) {
        Some(raw) => raw
            .parse::<EVIVersion>()
            .map_err(|reason| ConfigError::InvalidValue {
                name: "HUME_EVI_VERSION",
                value: raw,
                reason,
            })?,
        None => EVIVersion::default(),
    };

    Ok(ServerConfig {
        host: server
            .host
            .or(env.host)
            .unwrap_or_else(|| "0.0.0.0".to_string()),
        port: server.port.or(env.port).unwrap_or(3001),
        static_index_path: PathBuf::from(
            server
                .static_index
                .or(env.static_index)
                .unwrap_or_else(|| DEFAULT_STATIC_INDEX.to_string()),
        ),
        hume_api_key: hume.api_key.or(env.hume_api_key).unwrap_or_default(),
        hume_secret_key: hume.secret_key.or(env.hume_secret_key).unwrap_or_default(),
        hume_config_id: hume.config_id.or(env.hume_config_id).unwrap_or_default(),
        evi_version,
        hume_websocket_url: hume
            .websocket_url
            .or(env.hume_websocket_url)
            .unwrap_or_else(|| HUME_EVI_WEBSOCKET_URL.to_string()),
        hume_connection_timeout_seconds: hume
            .connection_timeout_seconds
            .or(env.connection_timeout_seconds)
            .unwrap_or(DEFAULT_CONNECTION_TIMEOUT_SECONDS),
        hume_verbose_transcription: hume
            .verbose_transcription
            .or(env.verbose_transcription)
            .unwrap_or(false),
        input_sample_rate: audio.input_sample_rate.or(env.input_sample_rate),
        input_channels: audio.input_channels.or(env.input_channels),
        cors_allowed_origins: security.cors_allowed_origins.or(env.cors_allowed_origins),
    })
}
