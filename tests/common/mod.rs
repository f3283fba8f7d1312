#![allow(dead_code)]

use std::f32::consts::PI;

use pod_onset::{DetectorConfig, OnsetDetector, OnsetEvent, OnsetMap};

pub const SR: u32 = 44_100;

pub fn gen_sine<F>(freq_hz: f32, sr: u32, n: usize, amp_fn: F) -> Vec<f32>
where
    F: Fn(usize) -> f32,
{
    (0..n)
        .map(|i| {
            let phase = 2.0 * PI * freq_hz * i as f32 / sr as f32;
            amp_fn(i) * phase.sin()
        })
        .collect()
}

pub fn gen_silence(n: usize) -> Vec<f32> {
    vec![0.0; n]
}

/// Silence for `silent` samples, then a steady tone starting at zero phase.
pub fn gen_silence_then_tone(freq_hz: f32, amp: f32, sr: u32, silent: usize, tone: usize) -> Vec<f32> {
    let mut out = gen_silence(silent);
    out.extend(gen_sine(freq_hz, sr, tone, |_| amp));
    out
}

/// Like [`gen_silence_then_tone`], with a raised-cosine attack of `ramp`
/// samples so the start carries no broadband click.
pub fn gen_silence_then_ramped_tone(
    freq_hz: f32,
    amp: f32,
    sr: u32,
    silent: usize,
    tone: usize,
    ramp: usize,
) -> Vec<f32> {
    let mut out = gen_silence(silent);
    out.extend(gen_sine(freq_hz, sr, tone, |i| {
        if i < ramp {
            amp * 0.5 * (1.0 - (PI * i as f32 / ramp as f32).cos())
        } else {
            amp
        }
    }));
    out
}

/// Single-sample clicks at the given positions.
pub fn gen_clicks(n: usize, positions: &[usize], amp: f32) -> Vec<f32> {
    let mut out = gen_silence(n);
    for &p in positions {
        if p < n {
            out[p] += amp;
        }
    }
    out
}

pub fn gen_impulse_train(period: usize, n: usize, amp: f32) -> Vec<f32> {
    let mut out = vec![0.0f32; n];
    if period == 0 {
        return out;
    }
    for i in (0..n).step_by(period) {
        out[i] = amp;
    }
    out
}

/// Exponentially decaying tone burst added into `signal` at `start`.
pub fn add_tone_burst(signal: &mut [f32], start: usize, freq_hz: f32, amp: f32, sr: u32, len: usize) {
    let tau = 0.01 * sr as f32;
    for i in 0..len {
        let Some(s) = signal.get_mut(start + i) else {
            break;
        };
        let env = (-(i as f32) / tau).exp();
        *s += amp * env * (2.0 * PI * freq_hz * i as f32 / sr as f32).sin();
    }
}

pub fn ms_to_samples(ms: f32, sr: u32) -> usize {
    (ms * sr as f32 / 1000.0) as usize
}

/// Streams `signal` through a new detector in `block` sized chunks.
pub fn run_detector(signal: &[f32], config: DetectorConfig, block: usize) -> (OnsetDetector, OnsetMap) {
    let mut detector = OnsetDetector::new(config).unwrap();
    let mut map = OnsetMap::new(detector.config().hop_size, detector.config().sample_rate);
    for chunk in signal.chunks(block) {
        detector.process_into(chunk, &mut map);
    }
    (detector, map)
}

pub fn onset_peaks(onsets: &[OnsetEvent]) -> Vec<u64> {
    onsets.iter().map(|o| o.peak_sample_position).collect()
}

/// Encodes interleaved samples as a 16-bit PCM WAV file.
pub fn encode_wav_16bit(samples: &[f32], sample_rate: u32, channels: u16) -> Vec<u8> {
    let data_len = samples.len() * 2;
    let block_align = channels * 2;
    let mut out = Vec::with_capacity(44 + data_len);
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_len as u32).to_le_bytes());
    out.extend_from_slice(b"WAVE");
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&channels.to_le_bytes());
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&(sample_rate * block_align as u32).to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&16u16.to_le_bytes());
    out.extend_from_slice(b"data");
    out.extend_from_slice(&(data_len as u32).to_le_bytes());
    for &s in samples {
        let v = (s.clamp(-1.0, 1.0) * 32767.0).round() as i16;
        out.extend_from_slice(&v.to_le_bytes());
    }
    out
}

/// Encodes interleaved samples as a 32-bit float WAV file.
pub fn encode_wav_float(samples: &[f32], sample_rate: u32, channels: u16) -> Vec<u8> {
    let data_len = samples.len() * 4;
    let block_align = channels * 4;
    let mut out = Vec::with_capacity(44 + data_len);
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_len as u32).to_le_bytes());
    out.extend_from_slice(b"WAVE");
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&3u16.to_le_bytes());
    out.extend_from_slice(&channels.to_le_bytes());
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&(sample_rate * block_align as u32).to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&32u16.to_le_bytes());
    out.extend_from_slice(b"data");
    out.extend_from_slice(&(data_len as u32).to_le_bytes());
    for &s in samples {
        out.extend_from_slice(&s.to_le_bytes());
    }
    out
}
