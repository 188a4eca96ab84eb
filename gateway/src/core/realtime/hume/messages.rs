//! Hume EVI WebSocket message types.
//!
//! This module defines the messages exchanged with Hume's Empathic Voice
//! Interface (EVI) and the classifier that turns raw server frames into
//! [`InboundEvent`]s.
//!
//! # Message Flow
//!
//! ```text
//! Relay → Hume:
//!   - SessionSettings (configure audio format)
//!   - AudioInput (base64-encoded audio chunks)
//!
//! Hume → Relay:
//!   - ChatMetadata (on connection)
//!   - UserMessage / AssistantMessage (transcripts)
//!   - AudioOutput (base64 WAV or PCM)
//!   - AssistantEnd, UserInterruption
//!   - Error
//!   - anything else, passed through untouched
//! ```

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::audio::{PcmFormat, wav};
use crate::core::realtime::base::{AudioChunk, InboundEvent};

// =============================================================================
// Constants
// =============================================================================

/// Hume EVI WebSocket endpoint URL.
pub const HUME_EVI_WEBSOCKET_URL: &str = "wss://api.hume.ai/v0/evi/chat";

/// Default sample rate for EVI audio input (Hz).
pub const HUME_EVI_DEFAULT_SAMPLE_RATE: u32 = 44100;

/// Default number of audio channels (mono).
pub const HUME_EVI_DEFAULT_CHANNELS: u16 = 1;

/// Server event type carrying assistant speech.
pub const AUDIO_OUTPUT_TYPE: &str = "audio_output";

// =============================================================================
// Client → Server Messages
// =============================================================================

/// Messages sent to the Hume EVI server.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EVIClientMessage {
    /// Configure session settings (audio format).
    SessionSettings(SessionSettings),
    /// Send audio input chunk.
    AudioInput(AudioInput),
}

impl EVIClientMessage {
    /// Serialize to the JSON text sent on the socket.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Session settings for configuring audio input format.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSettings {
    /// Audio encoding format.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio: Option<AudioSettings>,
}

/// Audio format settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AudioSettings {
    /// Encoding format.
    pub encoding: AudioEncoding,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Number of channels.
    pub channels: u16,
}

/// Supported audio encodings for EVI input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioEncoding {
    /// Linear 16-bit PCM, little-endian.
    #[default]
    Linear16,
}

/// Audio input message containing base64-encoded audio.
#[derive(Debug, Clone, Serialize)]
pub struct AudioInput {
    /// Base64-encoded audio data.
    pub data: String,
}

impl AudioInput {
    /// Create new AudioInput from raw audio bytes.
    pub fn from_bytes(audio_data: &[u8]) -> Self {
        Self {
            data: BASE64.encode(audio_data),
        }
    }
}

// =============================================================================
// Server → Client Messages
// =============================================================================

/// Typed view of the server events the relay inspects.
///
/// Only used for logging and metadata. Forwarding always works from the raw
/// JSON so that fields this enum does not model survive the trip.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EVIServerMessage {
    /// Chat metadata on connection.
    ChatMetadata(ChatMetadata),
    /// Final or interim transcript of the user.
    UserMessage(TranscriptMessage),
    /// Assistant response text.
    AssistantMessage(TranscriptMessage),
    /// User started speaking over the assistant.
    UserInterruption {},
    /// Audio output chunk.
    AudioOutput(AudioOutput),
    /// End of assistant response.
    AssistantEnd {},
    /// Error message.
    Error(EVIError),
    /// Unknown message type (for forward compatibility).
    #[serde(other)]
    Unknown,
}

impl EVIServerMessage {
    /// Interpret a raw JSON event, falling back to `Unknown` for shapes that
    /// do not match the typed view.
    pub fn from_value(value: &Value) -> Self {
        EVIServerMessage::deserialize(value).unwrap_or(EVIServerMessage::Unknown)
    }
}

/// Chat metadata received on WebSocket connection.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatMetadata {
    /// Chat ID for this session.
    pub chat_id: String,
    /// Chat group ID for resuming conversations.
    pub chat_group_id: String,
    /// Request ID.
    #[serde(default)]
    pub request_id: Option<String>,
}

/// User or assistant transcript.
#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptMessage {
    /// Message content.
    pub message: MessageContent,
    /// Whether this is an interim transcript.
    #[serde(default)]
    pub interim: Option<bool>,
}

/// Role and text of a transcript.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageContent {
    pub role: String,
    pub content: String,
}

/// Audio output chunk from assistant.
#[derive(Debug, Clone, Deserialize)]
pub struct AudioOutput {
    /// Unique ID.
    #[serde(default)]
    pub id: Option<String>,
    /// Base64-encoded audio data.
    pub data: String,
}

impl AudioOutput {
    /// Decode the audio data to bytes.
    pub fn decode_audio(&self) -> Result<Vec<u8>, base64::DecodeError> {
        BASE64.decode(&self.data)
    }
}

/// EVI error message.
#[derive(Debug, Clone, Deserialize)]
pub struct EVIError {
    /// Error code.
    pub code: String,
    /// Error message.
    pub message: String,
}

// =============================================================================
// Classification
// =============================================================================

/// Classify a text frame from the server.
///
/// Text that is not JSON is passed on as a JSON string. An `audio_output`
/// whose payload cannot be decoded becomes [`InboundEvent::InvalidAudio`].
pub fn classify_text(text: &str) -> InboundEvent {
    let value: Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(_) => return InboundEvent::Other(Value::String(text.to_string())),
    };

    if value.get("type").and_then(Value::as_str) != Some(AUDIO_OUTPUT_TYPE) {
        return InboundEvent::Other(value);
    }

    match audio_chunk_from_event(&value) {
        Ok(chunk) => InboundEvent::AudioOutput(chunk),
        Err(reason) => InboundEvent::InvalidAudio {
            id: value.get("id").and_then(Value::as_str).map(str::to_string),
            reason,
        },
    }
}

/// Classify a binary frame from the server as raw PCM.
pub fn classify_binary(data: Bytes) -> InboundEvent {
    InboundEvent::AudioOutput(AudioChunk::raw(data))
}

fn audio_chunk_from_event(value: &Value) -> Result<AudioChunk, String> {
    let output =
        AudioOutput::deserialize(value).map_err(|e| format!("malformed audio_output: {e}"))?;
    let decoded = output
        .decode_audio()
        .map_err(|e| format!("audio data is not base64: {e}"))?;

    // Hume usually ships complete WAV files; keep their declared layout.
    let (pcm, embedded) = if wav::is_wav(&decoded) {
        let (format, pcm) = wav::parse_wav(&decoded).map_err(|e| e.to_string())?;
        (Bytes::copy_from_slice(pcm), Some(format))
    } else {
        (Bytes::from(decoded), None)
    };

    Ok(AudioChunk {
        pcm,
        format: explicit_format(value, embedded).or(embedded),
        id: output.id,
    })
}

/// Apply `sample_rate` / `sample_width` / `channels` fields carried on the
/// event itself, on top of `base` or the default output format.
fn explicit_format(value: &Value, base: Option<PcmFormat>) -> Option<PcmFormat> {
    let sample_rate = read_field(value, "sample_rate");
    let sample_width = read_field(value, "sample_width");
    let channels = read_field(value, "channels");

    if sample_rate.is_none() && sample_width.is_none() && channels.is_none() {
        return None;
    }

    let mut format = base.unwrap_or_default();
    if let Some(rate) = sample_rate {
        format.sample_rate = u32::try_from(rate).unwrap_or(0);
    }
    if let Some(width) = sample_width {
        format.sample_width = u16::try_from(width).unwrap_or(0);
    }
    if let Some(channels) = channels {
        format.channels = u16::try_from(channels).unwrap_or(0);
    }
    Some(format)
}

fn read_field(value: &Value, key: &str) -> Option<u64> {
    value.get(key).and_then(Value::as_u64)
}

// =============================================================================
// Tests
// =============================================================================
