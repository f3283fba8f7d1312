use serde::{Deserialize, Serialize};

use crate::core::window::WindowType;

/// A single audio sample (32-bit float, range -1.0 to 1.0).
pub type Sample = f32;

/// Default analysis frame length in samples.
pub const DEFAULT_WINDOW_SIZE: usize = 1024;
/// Default hop length in samples.
pub const DEFAULT_HOP_SIZE: usize = 256;
/// Default sample rate in Hz.
pub const DEFAULT_SAMPLE_RATE: f32 = 44100.0;
/// Smallest accepted analysis frame.
pub const MIN_WINDOW_SIZE: usize = 16;

/// Default hops a candidate may wait for a higher peak.
pub const DEFAULT_DEBOUNCE_THRESHOLD: u32 = 3;
/// Default flux level that opens a candidate.
pub const DEFAULT_UPPER_THRESHOLD: f32 = 0.001;
/// Default flux level under which a candidate is confirmed.
pub const DEFAULT_LOWER_THRESHOLD: f32 = 0.0002;
/// Default multiplier of the running mean for the upper threshold.
pub const DEFAULT_UPPER_SCALE: f32 = 4.0;
/// Default multiplier of the running mean for the lower threshold.
pub const DEFAULT_LOWER_SCALE: f32 = 1.0;
/// Default hold-off after a confirmed onset.
pub const DEFAULT_CONSECUTIVE_ONSET_MS: f32 = 30.0;
/// Default post-onset masking duration.
pub const DEFAULT_MASKING_MS: f32 = 100.0;
/// Default per-hop decay of the masking level.
pub const DEFAULT_MASKING_DECAY: f32 = 0.6;

/// Channel layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channels {
    Mono,
    Stereo,
}

impl Channels {
    /// Returns the number of channels.
    pub fn count(&self) -> usize {
        match self {
            Channels::Mono => 1,
            Channels::Stereo => 2,
        }
    }
}

/// Buffer holding audio samples in interleaved format.
///
/// For mono audio, samples are stored sequentially: `[s0, s1, s2, ...]`
/// For stereo audio, samples are interleaved: `[L0, R0, L1, R1, ...]`
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    /// Raw interleaved sample data.
    pub data: Vec<Sample>,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Channel layout.
    pub channels: Channels,
}

impl AudioBuffer {
    /// Create a new audio buffer.
    pub fn new(data: Vec<Sample>, sample_rate: u32, channels: Channels) -> Self {
        Self {
            data,
            sample_rate,
            channels,
        }
    }

    /// Create a mono buffer.
    pub fn from_mono(data: Vec<Sample>, sample_rate: u32) -> Self {
        Self::new(data, sample_rate, Channels::Mono)
    }

    /// Create a stereo buffer from interleaved data.
    pub fn from_stereo(data: Vec<Sample>, sample_rate: u32) -> Self {
        Self::new(data, sample_rate, Channels::Stereo)
    }

    /// Number of frames in the buffer (total samples / channels).
    pub fn num_frames(&self) -> usize {
        self.data.len() / self.channels.count()
    }

    /// Duration of the audio in seconds.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.num_frames() as f64 / self.sample_rate as f64
    }

    /// Returns true if the buffer contains no samples.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Averages all channels into a mono signal.
    pub fn to_mono(&self) -> Vec<Sample> {
        match self.channels {
            Channels::Mono => self.data.clone(),
            Channels::Stereo => self
                .data
                .chunks_exact(2)
                .map(|frame| 0.5 * (frame[0] + frame[1]))
                .collect(),
        }
    }
}

/// Every tunable of the onset detector.
///
/// Values are taken as given; [`DetectorConfig::sanitized`] replaces the
/// invalid ones with documented defaults before a detector uses them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Analysis frame length in samples; a power of two (default: 1024).
    pub window_size: usize,
    /// Samples between analysis frames; a power of two (default: 256).
    pub hop_size: usize,
    /// Sample rate in Hz (default: 44100).
    pub sample_rate: f32,
    /// Analysis window function (default: Hann).
    pub window_type: WindowType,
    /// Hops a candidate peak is held before it is confirmed (default: 3).
    pub debounce_threshold: u32,
    /// Manual upper threshold on flux.
    pub upper_threshold: f32,
    /// Manual lower threshold on flux.
    pub lower_threshold: f32,
    /// Running-mean multiplier for the upper threshold. Setting either scale
    /// switches thresholds to automatic mode.
    pub upper_scale: Option<f32>,
    /// Running-mean multiplier for the lower threshold.
    pub lower_scale: Option<f32>,
    /// Hold-off after a confirmed onset, in milliseconds (default: 30).
    pub consecutive_onset_ms: f32,
    /// Post-onset masking duration, in milliseconds (default: 100).
    pub masking_ms: f32,
    /// Per-hop decay of the masking level, in `[0, 1)` (default: 0.6).
    pub masking_decay: f32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            hop_size: DEFAULT_HOP_SIZE,
            sample_rate: DEFAULT_SAMPLE_RATE,
            window_type: WindowType::Hann,
            debounce_threshold: DEFAULT_DEBOUNCE_THRESHOLD,
            upper_threshold: DEFAULT_UPPER_THRESHOLD,
            lower_threshold: DEFAULT_LOWER_THRESHOLD,
            upper_scale: None,
            lower_scale: None,
            consecutive_onset_ms: DEFAULT_CONSECUTIVE_ONSET_MS,
            masking_ms: DEFAULT_MASKING_MS,
            masking_decay: DEFAULT_MASKING_DECAY,
        }
    }
}

impl DetectorConfig {
    /// Creates a configuration with all defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the analysis frame length.
    pub fn with_window_size(mut self, window_size: usize) -> Self {
        self.window_size = window_size;
        self
    }

    /// Set the hop length.
    pub fn with_hop_size(mut self, hop_size: usize) -> Self {
        self.hop_size = hop_size;
        self
    }

    /// Set the sample rate.
    pub fn with_sample_rate(mut self, sample_rate: f32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    /// Set the window function.
    pub fn with_window_type(mut self, window_type: WindowType) -> Self {
        self.window_type = window_type;
        self
    }

    /// Set the debounce hold in hops.
    pub fn with_debounce_threshold(mut self, hops: u32) -> Self {
        self.debounce_threshold = hops;
        self
    }

    /// Set manual upper and lower thresholds.
    pub fn with_thresholds(mut self, upper: f32, lower: f32) -> Self {
        self.upper_threshold = upper;
        self.lower_threshold = lower;
        self.upper_scale = None;
        self.lower_scale = None;
        self
    }

    /// Set running-mean scale factors (enables automatic thresholds).
    pub fn with_threshold_scales(mut self, upper_scale: f32, lower_scale: f32) -> Self {
        self.upper_scale = Some(upper_scale);
        self.lower_scale = Some(lower_scale);
        self
    }

    /// Set the consecutive-onset hold-off in milliseconds.
    pub fn with_consecutive_onset_ms(mut self, ms: f32) -> Self {
        self.consecutive_onset_ms = ms;
        self
    }

    /// Set the masking duration in milliseconds.
    pub fn with_masking_ms(mut self, ms: f32) -> Self {
        self.masking_ms = ms;
        self
    }

    /// Set the masking decay.
    pub fn with_masking_decay(mut self, decay: f32) -> Self {
        self.masking_decay = decay;
        self
    }

    /// Duration of one hop in milliseconds.
    pub fn hop_ms(&self) -> f32 {
        self.hop_size as f32 * 1000.0 / self.sample_rate
    }

    /// Converts a duration to whole hops (rounded down).
    pub fn ms_to_hops(&self, ms: f32) -> u32 {
        let hop_ms = self.hop_ms();
        if !hop_ms.is_finite() || hop_ms <= 0.0 || !ms.is_finite() || ms <= 0.0 {
            return 0;
        }
        (ms / hop_ms).floor() as u32
    }

    /// Returns a copy with every invalid field replaced by its default.
    ///
    /// Each substitution is reported with `log::warn!`.
    pub fn sanitized(&self) -> Self {
        let mut out = self.clone();
        out.window_size = sanitize_window_size(self.window_size);
        out.hop_size = sanitize_hop_size(self.hop_size);
        out.sample_rate = sanitize_sample_rate(self.sample_rate);
        out.upper_scale = self.upper_scale.map(|s| sanitize_scale(s, DEFAULT_UPPER_SCALE, "upper"));
        out.lower_scale = self.lower_scale.map(|s| sanitize_scale(s, DEFAULT_LOWER_SCALE, "lower"));
        out.upper_threshold =
            sanitize_threshold(self.upper_threshold, DEFAULT_UPPER_THRESHOLD, "upper");
        out.lower_threshold =
            sanitize_threshold(self.lower_threshold, DEFAULT_LOWER_THRESHOLD, "lower");
        out.consecutive_onset_ms = sanitize_ms(
            self.consecutive_onset_ms,
            DEFAULT_CONSECUTIVE_ONSET_MS,
            "consecutive onset window",
        );
        out.masking_ms = sanitize_ms(self.masking_ms, DEFAULT_MASKING_MS, "masking window");
        out.masking_decay = sanitize_masking_decay(self.masking_decay);
        out
    }
}

/// Returns true for positive powers of two.
#[inline]
pub fn is_power_of_two(value: usize) -> bool {
    value != 0 && value & (value - 1) == 0
}

/// Falls back to [`DEFAULT_WINDOW_SIZE`] for non-powers of two and frames
/// shorter than [`MIN_WINDOW_SIZE`].
pub fn sanitize_window_size(window_size: usize) -> usize {
    if is_power_of_two(window_size) && window_size >= MIN_WINDOW_SIZE {
        window_size
    } else {
        log::warn!(
            "window size {} is not a power of two >= {}, using {}",
            window_size,
            MIN_WINDOW_SIZE,
            DEFAULT_WINDOW_SIZE
        );
        DEFAULT_WINDOW_SIZE
    }
}

/// Falls back to [`DEFAULT_HOP_SIZE`] for non-powers of two.
pub fn sanitize_hop_size(hop_size: usize) -> usize {
    if is_power_of_two(hop_size) {
        hop_size
    } else {
        log::warn!(
            "hop size {} is not a power of two, using {}",
            hop_size,
            DEFAULT_HOP_SIZE
        );
        DEFAULT_HOP_SIZE
    }
}

/// Falls back to [`DEFAULT_SAMPLE_RATE`] for non-finite or non-positive rates.
pub fn sanitize_sample_rate(sample_rate: f32) -> f32 {
    if sample_rate.is_finite() && sample_rate > 0.0 {
        sample_rate
    } else {
        log::warn!(
            "sample rate {} is invalid, using {}",
            sample_rate,
            DEFAULT_SAMPLE_RATE
        );
        DEFAULT_SAMPLE_RATE
    }
}

/// Scale factors must be finite and strictly positive.
pub fn sanitize_scale(scale: f32, default: f32, which: &str) -> f32 {
    if scale.is_finite() && scale > 0.0 {
        scale
    } else {
        log::warn!("{} threshold scale {} is invalid, using {}", which, scale, default);
        default
    }
}

/// Thresholds must be finite and non-negative.
pub fn sanitize_threshold(value: f32, default: f32, which: &str) -> f32 {
    if value.is_finite() && value >= 0.0 {
        value
    } else {
        log::warn!("{} threshold {} is invalid, using {}", which, value, default);
        default
    }
}

/// Durations must be finite and non-negative.
pub fn sanitize_ms(ms: f32, default: f32, what: &str) -> f32 {
    if ms.is_finite() && ms >= 0.0 {
        ms
    } else {
        log::warn!("{} of {} ms is invalid, using {} ms", what, ms, default);
        default
    }
}

/// Masking decay must lie in `[0, 1)`.
pub fn sanitize_masking_decay(decay: f32) -> f32 {
    if decay.is_finite() && (0.0..1.0).contains(&decay) {
        decay
    } else {
        log::warn!(
            "masking decay {} is outside [0, 1), using {}",
            decay,
            DEFAULT_MASKING_DECAY
        );
        DEFAULT_MASKING_DECAY
    }
}
