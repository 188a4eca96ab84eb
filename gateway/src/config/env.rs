//! Environment variable loading.
//!
//! Every value is optional here; defaults and required-value checks are
//! applied after merging with YAML.

use std::env;
use std::str::FromStr;

use super::ConfigError;

/// Raw values read from the process environment.
#[derive(Debug, Default)]
pub(super) struct EnvConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub static_index: Option<String>,
    pub hume_api_key: Option<String>,
    pub hume_secret_key: Option<String>,
    pub hume_config_id: Option<String>,
    pub evi_version: Option<String>,
    pub hume_websocket_url: Option<String>,
    pub connection_timeout_seconds: Option<u64>,
    pub verbose_transcription: Option<bool>,
    pub input_sample_rate: Option<u32>,
    pub input_channels: Option<u16>,
    pub cors_allowed_origins: Option<String>,
}

impl EnvConfig {
    pub(super) fn load() -> Result<Self, ConfigError> {
        Ok(Self {
            host: read("HOST"),
            port: parse("PORT")?,
            static_index: read("STATIC_INDEX_PATH"),
            hume_api_key: read("HUME_API_KEY"),
            hume_secret_key: read("HUME_SECRET_KEY"),
            hume_config_id: read("HUME_CONFIG_ID"),
            evi_version: read("HUME_EVI_VERSION"),
            hume_websocket_url: read("HUME_EVI_URL"),
            connection_timeout_seconds: parse("HUME_CONNECT_TIMEOUT_SECONDS")?,
            verbose_transcription: parse_bool("HUME_VERBOSE_TRANSCRIPTION")?,
            input_sample_rate: parse("INPUT_SAMPLE_RATE")?,
            input_channels: parse("INPUT_CHANNELS")?,
            cors_allowed_origins: read("CORS_ALLOWED_ORIGINS"),
        })
    }
}

/// Read a variable, treating empty values as unset.
fn read(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse<T>(name: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match read(name) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidValue {
                name,
                value: raw,
                reason: e.to_string(),
            }),
    }
}

fn parse_bool(name: &'static str) -> Result<Option<bool>, ConfigError> {
    match read(name) {
        None => Ok(None),
        Some(raw) => match raw.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(Some(true)),
            "false" | "0" | "no" | "off" => Ok(Some(false)),
            _ => Err(ConfigError::InvalidValue {
                name,
                value: raw,
                reason: "expected true or false".to_string(),
            }),
        },
    }
}
