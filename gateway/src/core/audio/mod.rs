//! Audio container utilities.
//!
//! The relay never decodes or encodes audio samples. It only wraps raw PCM
//! into a WAV container so that every chunk handed to a browser is playable
//! on its own.

pub mod wav;

pub use wav::{PcmFormat, WavError, frame_pcm, parse_wav};
