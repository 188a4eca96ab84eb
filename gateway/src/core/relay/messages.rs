//! Messages sent from the relay to the client.
//!
//! Every outbound frame is JSON text. Assistant audio is wrapped in a WAV
//! container and base64-encoded; every other upstream event goes out exactly
//! as it arrived.

use axum::extract::ws::Message;
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use serde::Serialize;
use serde_json::Value;

use crate::core::audio::{PcmFormat, WavError};
use crate::core::realtime::{AudioChunk, InboundEvent};

/// Frame sent to the client.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OutboundClientMessage {
    /// `{"type":"audio_output","data":"<base64 WAV>"}`
    AudioOutput(AudioOutputFrame),
    /// An upstream event, re-serialized unchanged.
    Passthrough(Value),
}

/// Audio frame carrying one complete WAV file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AudioOutputFrame {
    #[serde(rename = "type")]
    pub kind: &'static str,
    /// Base64-encoded WAV container
    pub data: String,
}

impl OutboundClientMessage {
    /// Wrap an already framed WAV buffer.
    pub fn audio(wav: &[u8]) -> Self {
        OutboundClientMessage::AudioOutput(AudioOutputFrame {
            kind: "audio_output",
            data: BASE64.encode(wav),
        })
    }

    /// Frame a PCM chunk with its own format, or `fallback` when it has none.
    ///
    /// Returns `Ok(None)` for an empty chunk; nothing is sent for it.
    pub fn from_audio_chunk(
        chunk: &AudioChunk,
        fallback: PcmFormat,
    ) -> Result<Option<Self>, WavError> {
        if chunk.pcm.is_empty() {
            return Ok(None);
        }
        let format = chunk.format.unwrap_or(fallback);
        let wav = format.frame(&chunk.pcm)?;
        Ok(Some(Self::audio(&wav)))
    }

    /// Map an upstream event to its client frame.
    ///
    /// Undecodable audio maps to `Ok(None)`; it never reaches the client.
    pub fn from_event(event: InboundEvent, fallback: PcmFormat) -> Result<Option<Self>, WavError> {
        match event {
            InboundEvent::AudioOutput(chunk) => Self::from_audio_chunk(&chunk, fallback),
            InboundEvent::InvalidAudio { .. } => Ok(None),
            InboundEvent::Other(value) => Ok(Some(OutboundClientMessage::Passthrough(value))),
        }
    }

    /// Serialize into a WebSocket text frame.
    pub fn to_ws_message(&self) -> Result<Message, serde_json::Error> {
        let json = serde_json::to_string(self)?;
        Ok(Message::Text(json.into()))
    }
}
