//! Audio Test Fixtures
//!
//! Generated audio keeps inputs reproducible and avoids external files.
//!
//! Audio formats:
//! - Client input: 16kHz, 16-bit signed PCM, mono
//! - EVI output: 24kHz, 16-bit signed PCM, mono (the relay's default)

use std::f32::consts::PI;
use std::io::Cursor;

/// Client microphone sample rate used in tests
pub const INPUT_SAMPLE_RATE: u32 = 16000;

/// Sample rate of generated EVI output clips
pub const OUTPUT_SAMPLE_RATE: u32 = 24000;

/// 20ms of 16kHz mono audio
pub const FRAME_20MS: usize = 320;

/// Generate a sine wave tone
pub fn generate_sine_wave(
    duration_samples: usize,
    sample_rate: u32,
    frequency: f32,
    amplitude: f32,
) -> Vec<i16> {
    let max_amplitude = amplitude * i16::MAX as f32;
    let angular_freq = 2.0 * PI * frequency / sample_rate as f32;

    (0..duration_samples)
        .map(|i| ((angular_freq * i as f32).sin() * max_amplitude) as i16)
        .collect()
}

/// Generate a sine wave tone as little-endian PCM bytes
pub fn generate_sine_bytes(duration_samples: usize, sample_rate: u32, frequency: f32) -> Vec<u8> {
    samples_to_bytes(&generate_sine_wave(duration_samples, sample_rate, frequency, 0.5))
}

/// Convert i16 samples to little-endian bytes
pub fn samples_to_bytes(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

/// Convert little-endian bytes to i16 samples
pub fn bytes_to_samples(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}

/// Encode samples as a WAV file with `hound`.
pub fn encode_wav(samples: &[i16], sample_rate: u32, channels: u16) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for sample in samples {
            writer.write_sample(*sample).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

/// Decode a 16-bit WAV file with `hound`.
pub fn decode_wav(bytes: &[u8]) -> (hound::WavSpec, Vec<i16>) {
    let mut reader = hound::WavReader::new(Cursor::new(bytes)).unwrap();
    let spec = reader.spec();
    let samples = reader.samples::<i16>().map(|s| s.unwrap()).collect();
    (spec, samples)
}
