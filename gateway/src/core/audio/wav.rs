//! WAV framing for raw PCM audio.
//!
//! Upstream voice services stream assistant speech as bare PCM chunks. Browsers
//! cannot play those directly, so each chunk is wrapped in a minimal
//! RIFF/WAVE container before it is forwarded.
//!
//! # Layout
//!
//! ```text
//! offset  size  field
//! 0       4     "RIFF"
//! 4       4     36 + data size (LE)
//! 8       4     "WAVE"
//! 12      4     "fmt "
//! 16      4     16 (PCM fmt chunk size)
//! 20      2     1 (PCM)
//! 22      2     channels
//! 24      4     sample rate
//! 28      4     byte rate
//! 32      2     block align
//! 34      2     bits per sample
//! 36      4     "data"
//! 40      4     data size (LE)
//! 44      ..    PCM payload
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Size of the canonical PCM WAV header produced by [`frame_pcm`].
pub const HEADER_SIZE: usize = 44;

/// Default sample rate of assistant audio (Hz).
pub const DEFAULT_OUTPUT_SAMPLE_RATE: u32 = 24000;

/// Default sample width of assistant audio (bytes per sample).
pub const DEFAULT_OUTPUT_SAMPLE_WIDTH: u16 = 2;

/// Default channel count of assistant audio.
pub const DEFAULT_OUTPUT_CHANNELS: u16 = 1;

const WAVE_FORMAT_PCM: u16 = 1;
const WAVE_FORMAT_EXTENSIBLE: u16 = 0xFFFE;

/// Errors raised when audio parameters or containers are invalid.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WavError {
    #[error("Sample rate cannot be zero")]
    ZeroSampleRate,

    #[error("Sample width cannot be zero")]
    ZeroSampleWidth,

    #[error("Number of channels cannot be zero")]
    ZeroChannels,

    #[error("PCM data exceeds maximum WAV file size (4GB)")]
    DataTooLarge,

    #[error("Malformed WAV container: {0}")]
    Malformed(&'static str),
}

/// PCM sample layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PcmFormat {
    /// Frames per second.
    pub sample_rate: u32,
    /// Bytes per sample.
    pub sample_width: u16,
    /// Interleaved channel count.
    pub channels: u16,
}

impl Default for PcmFormat {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_OUTPUT_SAMPLE_RATE,
            sample_width: DEFAULT_OUTPUT_SAMPLE_WIDTH,
            channels: DEFAULT_OUTPUT_CHANNELS,
        }
    }
}

impl PcmFormat {
    pub fn new(sample_rate: u32, sample_width: u16, channels: u16) -> Self {
        Self {
            sample_rate,
            sample_width,
            channels,
        }
    }

    /// Check that every field is usable in a WAV header.
    pub fn validate(&self) -> Result<(), WavError> {
        if self.sample_rate == 0 {
            return Err(WavError::ZeroSampleRate);
        }
        if self.sample_width == 0 {
            return Err(WavError::ZeroSampleWidth);
        }
        if self.channels == 0 {
            return Err(WavError::ZeroChannels);
        }
        // bits_per_sample is a u16 field
        if u32::from(self.sample_width) * 8 > u32::from(u16::MAX) {
            return Err(WavError::Malformed("sample width too large"));
        }
        Ok(())
    }

    /// Bytes per interleaved frame.
    pub fn block_align(&self) -> u32 {
        u32::from(self.channels) * u32::from(self.sample_width)
    }

    /// Bytes per second of audio.
    pub fn byte_rate(&self) -> u64 {
        u64::from(self.sample_rate) * u64::from(self.block_align())
    }

    /// Frame this format's PCM into a WAV container.
    pub fn frame(&self, pcm: &[u8]) -> Result<Vec<u8>, WavError> {
        frame_pcm(pcm, self.sample_rate, self.sample_width, self.channels)
    }
}

/// Wrap raw interleaved PCM into a complete WAV container.
///
/// The payload is copied verbatim after a 44-byte header declaring
/// `channels`, `sample_width * 8` bits per sample and `sample_rate`.
/// An empty payload yields a valid header-only container.
pub fn frame_pcm(
    pcm: &[u8],
    sample_rate: u32,
    sample_width: u16,
    channels: u16,
) -> Result<Vec<u8>, WavError> {
    let format = PcmFormat::new(sample_rate, sample_width, channels);
    format.validate()?;

    let data_size = u32::try_from(pcm.len()).map_err(|_| WavError::DataTooLarge)?;
    let riff_size = data_size
        .checked_add((HEADER_SIZE - 8) as u32)
        .ok_or(WavError::DataTooLarge)?;
    let block_align =
        u16::try_from(format.block_align()).map_err(|_| WavError::Malformed("block align"))?;
    let byte_rate =
        u32::try_from(format.byte_rate()).map_err(|_| WavError::Malformed("byte rate"))?;
    let bits_per_sample = sample_width * 8;

    let mut wav = Vec::with_capacity(HEADER_SIZE + pcm.len());

    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&riff_size.to_le_bytes());
    wav.extend_from_slice(b"WAVE");

    wav.extend_from_slice(b"fmt ");
    wav.extend_from_slice(&16u32.to_le_bytes());
    wav.extend_from_slice(&WAVE_FORMAT_PCM.to_le_bytes());
    wav.extend_from_slice(&channels.to_le_bytes());
    wav.extend_from_slice(&sample_rate.to_le_bytes());
    wav.extend_from_slice(&byte_rate.to_le_bytes());
    wav.extend_from_slice(&block_align.to_le_bytes());
    wav.extend_from_slice(&bits_per_sample.to_le_bytes());

    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&data_size.to_le_bytes());
    wav.extend_from_slice(pcm);

    Ok(wav)
}

/// Returns true when `data` starts with a RIFF/WAVE signature.
pub fn is_wav(data: &[u8]) -> bool {
    data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WAVE"
}

/// Parse a PCM WAV container into its format and payload.
///
/// Chunks other than `fmt ` and `data` are skipped. A `data` size larger than
/// the buffer (streamed WAVs often declare `0xFFFFFFFF`) is clamped to the
/// bytes actually present.
pub fn parse_wav(data: &[u8]) -> Result<(PcmFormat, &[u8]), WavError> {
    if !is_wav(data) {
        return Err(WavError::Malformed("missing RIFF/WAVE signature"));
    }

    let mut format: Option<PcmFormat> = None;
    let mut offset = 12;

    while offset + 8 <= data.len() {
        let id = &data[offset..offset + 4];
        let size = read_u32(data, offset + 4) as usize;
        let body_start = offset + 8;

        match id {
            b"fmt " => {
                if size < 16 || body_start + 16 > data.len() {
                    return Err(WavError::Malformed("truncated fmt chunk"));
                }
                let audio_format = read_u16(data, body_start);
                if audio_format != WAVE_FORMAT_PCM && audio_format != WAVE_FORMAT_EXTENSIBLE {
                    return Err(WavError::Malformed("unsupported sample encoding"));
                }
                let channels = read_u16(data, body_start + 2);
                let sample_rate = read_u32(data, body_start + 4);
                let bits_per_sample = read_u16(data, body_start + 14);
                if bits_per_sample % 8 != 0 {
                    return Err(WavError::Malformed("bits per sample not byte aligned"));
                }
                let parsed = PcmFormat::new(sample_rate, bits_per_sample / 8, channels);
                parsed.validate()?;
                format = Some(parsed);
            }
            b"data" => {
                let format = format.ok_or(WavError::Malformed("data chunk before fmt chunk"))?;
                let end = body_start.saturating_add(size).min(data.len());
                return Ok((format, &data[body_start..end]));
            }
            _ => {}
        }

        // Chunks are word aligned.
        offset = body_start.saturating_add(size).saturating_add(size & 1);
    }

    Err(WavError::Malformed("missing data chunk"))
}

fn read_u16(data: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([data[at], data[at + 1]])
}

fn read_u32(data: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
}
