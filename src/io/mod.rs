//! File input: WAV decoding and JSON configuration.

pub mod config;
pub mod wav;
