use serde::Deserialize;
use std::path::Path;

use super::ConfigError;

/// Complete YAML configuration structure
///
/// All fields are optional to allow partial configuration. Values present here
/// take priority over environment variables.
///
/// # Example YAML structure
/// ```yaml
/// server:
///   host: "0.0.0.0"
///   port: 3001
///   static_index: "static/index.html"
///
/// hume:
///   api_key: "your-api-key"
///   secret_key: "your-secret-key"
///   config_id: "your-config-id"
///   evi_version: "3"
///   websocket_url: "wss://api.hume.ai/v0/evi/chat"
///   connection_timeout_seconds: 30
///   verbose_transcription: false
///
/// audio:
///   input_sample_rate: 16000
///   input_channels: 1
///
/// security:
///   cors_allowed_origins: "https://example.com"
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub server: Option<ServerYaml>,
    pub hume: Option<HumeYaml>,
    pub audio: Option<AudioYaml>,
    pub security: Option<SecurityYaml>,
}

/// Server configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServerYaml {
    pub host: Option<String>,
    pub port: Option<u16>,
    /// HTML page served at `/`
    pub static_index: Option<String>,
}

/// Hume EVI settings from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct HumeYaml {
    pub api_key: Option<String>,
    pub secret_key: Option<String>,
    pub config_id: Option<String>,
    /// "1", "2", "3" or "4-mini"
    pub evi_version: Option<String>,
    pub websocket_url: Option<String>,
    pub connection_timeout_seconds: Option<u64>,
    pub verbose_transcription: Option<bool>,
}

/// Client audio layout from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AudioYaml {
    pub input_sample_rate: Option<u32>,
    pub input_channels: Option<u16>,
}

/// Security configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SecurityYaml {
    /// Comma-separated origins, or "*"
    pub cors_allowed_origins: Option<String>,
}

impl YamlConfig {
    /// Load YAML configuration from a file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or the YAML is malformed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;

        let config: YamlConfig = serde_yaml::from_str(&contents)?;
        Ok(config)
    }
}
