//! Minimal RIFF/WAVE reader for offline detection.
//!
//! Supports 16- and 24-bit integer PCM and 32-bit IEEE float, mono or
//! stereo. Unknown chunks are skipped.

use std::path::Path;

use crate::core::types::{AudioBuffer, Channels, Sample};
use crate::error::DetectorError;

const WAV_FORMAT_PCM: u16 = 1;
const WAV_FORMAT_IEEE_FLOAT: u16 = 3;
const WAV_FORMAT_EXTENSIBLE: u16 = 0xFFFE;

/// Sample encodings the reader understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleFormat {
    Pcm16,
    Pcm24,
    Float32,
}

impl SampleFormat {
    fn from_header(format_code: u16, bits_per_sample: u16) -> Result<Self, DetectorError> {
        match (format_code, bits_per_sample) {
            (WAV_FORMAT_PCM, 16) => Ok(SampleFormat::Pcm16),
            (WAV_FORMAT_PCM, 24) => Ok(SampleFormat::Pcm24),
            (WAV_FORMAT_IEEE_FLOAT, 32) => Ok(SampleFormat::Float32),
            (code, bits) => Err(invalid(format!(
                "unsupported WAV encoding: format code {}, {} bits",
                code, bits
            ))),
        }
    }

    fn bytes_per_sample(self) -> usize {
        match self {
            SampleFormat::Pcm16 => 2,
            SampleFormat::Pcm24 => 3,
            SampleFormat::Float32 => 4,
        }
    }

    fn decode(self, bytes: &[u8]) -> Sample {
        match self {
            SampleFormat::Pcm16 => i16::from_le_bytes([bytes[0], bytes[1]]) as f32 / 32768.0,
            SampleFormat::Pcm24 => {
                // Place the 24 bits at the top of an i32 so the shift sign-extends
                let raw = i32::from_le_bytes([0, bytes[0], bytes[1], bytes[2]]) >> 8;
                raw as f32 / 8_388_608.0
            }
            SampleFormat::Float32 => f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
        }
    }
}

/// Parsed `fmt ` chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavHeader {
    pub sample_rate: u32,
    pub channels: Channels,
    pub format: SampleFormat,
}

fn invalid(msg: impl Into<String>) -> DetectorError {
    DetectorError::InvalidFormat(msg.into())
}

fn read_u16_le(data: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([data[offset], data[offset + 1]])
}

fn read_u32_le(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ])
}

fn parse_fmt(chunk: &[u8]) -> Result<WavHeader, DetectorError> {
    if chunk.len() < 16 {
        return Err(invalid("fmt chunk too short"));
    }
    let mut format_code = read_u16_le(chunk, 0);
    let num_channels = read_u16_le(chunk, 2);
    let sample_rate = read_u32_le(chunk, 4);
    let bits_per_sample = read_u16_le(chunk, 14);

    // WAVE_FORMAT_EXTENSIBLE stores the real code in the sub-format GUID
    if format_code == WAV_FORMAT_EXTENSIBLE && chunk.len() >= 26 {
        format_code = read_u16_le(chunk, 24);
    }

    let channels = match num_channels {
        1 => Channels::Mono,
        2 => Channels::Stereo,
        n => return Err(invalid(format!("unsupported channel count: {}", n))),
    };
    if sample_rate == 0 {
        return Err(invalid("sample rate is zero"));
    }

    Ok(WavHeader {
        sample_rate,
        channels,
        format: SampleFormat::from_header(format_code, bits_per_sample)?,
    })
}

/// Decodes a WAV file held in memory.
pub fn read_wav(data: &[u8]) -> Result<AudioBuffer, DetectorError> {
    if data.len() < 12 {
        return Err(invalid("WAV file too short"));
    }
    if &data[0..4] != b"RIFF" {
        return Err(invalid("missing RIFF header"));
    }
    if &data[8..12] != b"WAVE" {
        return Err(invalid("missing WAVE identifier"));
    }

    let mut header: Option<WavHeader> = None;
    let mut payload: Option<&[u8]> = None;
    let mut cursor = 12;

    while cursor + 8 <= data.len() {
        let id = &data[cursor..cursor + 4];
        let size = read_u32_le(data, cursor + 4) as usize;
        let start = cursor + 8;
        // A truncated final chunk keeps whatever bytes are present
        let end = start.saturating_add(size).min(data.len());
        let body = &data[start..end];

        match id {
            b"fmt " => header = Some(parse_fmt(body)?),
            b"data" => payload = Some(body),
            _ => {}
        }

        // Chunks are word-aligned
        cursor = start.saturating_add(size).saturating_add(size & 1);
    }

    let header = header.ok_or_else(|| invalid("no fmt chunk found"))?;
    let payload = payload.ok_or_else(|| invalid("no data chunk found"))?;

    let width = header.format.bytes_per_sample();
    let samples: Vec<Sample> = payload
        .chunks_exact(width)
        .map(|bytes| header.format.decode(bytes))
        .collect();

    Ok(AudioBuffer::new(samples, header.sample_rate, header.channels))
}

/// Reads and decodes a WAV file from disk.
pub fn read_wav_file(path: impl AsRef<Path>) -> Result<AudioBuffer, DetectorError> {
    let data = std::fs::read(path.as_ref())?;
    read_wav(&data)
}
