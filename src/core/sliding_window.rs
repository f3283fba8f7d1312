//! Sliding analysis window fed by the ear filter.

use crate::core::ear_filter::EarFilter;
use crate::error::{try_zeroed, DetectorError};

/// Fixed-length shifting buffer of filtered samples plus the hop counter
/// that decides when a new analysis frame is due.
///
/// The buffer never allocates after construction. Each block shifts the
/// contents left by the block length and appends the filtered block at the
/// tail, so consecutive frames overlap whenever `hop_size < window_size`.
#[derive(Debug, Clone)]
pub struct AnalysisWindow {
    samples: Vec<f32>,
    hop_size: usize,
    hop_counter: usize,
    filter: EarFilter,
}

impl AnalysisWindow {
    /// Creates a zero-filled window of `window_size` samples.
    pub fn new(window_size: usize, hop_size: usize) -> Result<Self, DetectorError> {
        Ok(Self {
            samples: try_zeroed(window_size, "analysis window")?,
            hop_size,
            hop_counter: 0,
            filter: EarFilter::new(),
        })
    }

    /// Filters `block` into the window.
    ///
    /// Returns `true` when the hop counter reached `hop_size` during this
    /// block; the counter is then reset to zero. At most one hop is reported
    /// per call, even if `block.len()` spans several hops.
    pub fn push_block(&mut self, block: &[f32]) -> bool {
        let size = self.samples.len();
        let n = block.len();
        if n == 0 || size == 0 {
            return false;
        }

        if n < size {
            self.samples.copy_within(n.., 0);
            self.filter.filter_into(block, &mut self.samples[size - n..]);
        } else {
            // Everything older is discarded; run the leading samples through
            // the filter only to keep its history continuous.
            let skip = n - size;
            for &x in &block[..skip] {
                self.filter.filter_sample(x);
            }
            self.filter.filter_into(&block[skip..], &mut self.samples);
        }

        self.hop_counter += n;
        if self.hop_counter >= self.hop_size {
            self.hop_counter = 0;
            true
        } else {
            false
        }
    }

    /// Current window contents, oldest sample first.
    #[inline]
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Window length in samples.
    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns true for a zero-length window.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Samples accumulated towards the next hop.
    #[inline]
    pub fn hop_counter(&self) -> usize {
        self.hop_counter
    }

    /// Clears contents, hop counter and filter history.
    pub fn reset(&mut self) {
        self.samples.fill(0.0);
        self.hop_counter = 0;
        self.filter.reset();
    }
}
