#![forbid(unsafe_code)]
//! Real-time psychoacoustic onset detection.
//!
//! `pod_onset` finds the start of new acoustic events (drum hits, note
//! attacks) in a live audio stream. Samples pass through an outer/middle ear
//! filter into a sliding analysis window; every hop the window is transformed
//! to a magnitude spectrum, reduced to 24 Bark-band energies, and differenced
//! against the previous hop into a spectral-flux value. A peak picker with
//! debounce, consecutive-onset suppression and post-onset masking turns the
//! flux stream into onset events, against fixed or running-mean thresholds.
//!
//! # Quick Start
//!
//! ```
//! use pod_onset::{DetectorConfig, OnsetDetector, OnsetEvent};
//!
//! let mut detector = OnsetDetector::new(DetectorConfig::default()).unwrap();
//! let mut onsets: Vec<OnsetEvent> = Vec::new();
//!
//! // Host callback: blocks of any length
//! let block = [0.0f32; 64];
//! for _ in 0..100 {
//!     detector.process_into(&block, &mut onsets);
//! }
//! assert!(onsets.is_empty());
//! ```
//!
//! # Offline use
//!
//! ```
//! use pod_onset::DetectorConfig;
//!
//! let silence = vec![0.0f32; 44100];
//! let map = pod_onset::detect_onsets(&silence, &DetectorConfig::default(), 256).unwrap();
//! assert!(map.onsets.is_empty());
//! assert!(map.flux.iter().all(|&f| f == 0.0));
//! ```

pub mod analysis;
pub mod core;
pub mod error;
pub mod io;
pub mod stream;

pub use analysis::bark::NUM_BARK_BANDS;
pub use analysis::peak_picker::PeakFlag;
pub use core::types::{AudioBuffer, Channels, DetectorConfig, Sample};
pub use core::window::WindowType;
pub use error::DetectorError;
pub use stream::{EventSink, HopOutcome, OnsetDetector, OnsetEvent, OnsetMap};

/// Streams a mono signal through a fresh detector in `block_size` chunks.
///
/// A `block_size` of zero uses the configured hop size. Blocks longer than
/// the hop still analyze only once each.
///
/// # Errors
///
/// Returns [`DetectorError::AllocationFailed`] if the detector's buffers
/// cannot be reserved.
pub fn detect_onsets(
    samples: &[f32],
    config: &DetectorConfig,
    block_size: usize,
) -> Result<OnsetMap, DetectorError> {
    let mut detector = OnsetDetector::new(config.clone())?;
    let active = detector.config();
    let mut map = OnsetMap::new(active.hop_size, active.sample_rate);
    let block_size = if block_size == 0 {
        active.hop_size
    } else {
        block_size
    };

    for block in samples.chunks(block_size) {
        detector.process_into(block, &mut map);
    }
    log::debug!(
        "detected {} onsets over {} hops",
        map.onsets.len(),
        detector.hops_processed()
    );
    Ok(map)
}

/// Runs [`detect_onsets`] on an audio buffer, mixing stereo down to mono
/// and taking the sample rate from the buffer.
pub fn detect_onsets_buffer(
    buffer: &AudioBuffer,
    config: &DetectorConfig,
    block_size: usize,
) -> Result<OnsetMap, DetectorError> {
    let effective = config.clone().with_sample_rate(buffer.sample_rate as f32);
    detect_onsets(&buffer.to_mono(), &effective, block_size)
}
