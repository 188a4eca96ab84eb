//! Test Fixtures Module
//!
//! Programmatically generated audio for relay tests.

// Allow dead code in test fixtures - not every test binary uses every helper
#![allow(dead_code)]

pub mod audio_fixtures;

pub use audio_fixtures::*;
