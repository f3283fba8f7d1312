//! Bark-scale triangular filterbank and critical-band energy reduction.
//!
//! The magnitude spectrum is weighted by 24 overlapping triangular filters,
//! one per critical band, and then folded into 24 band energies. Adjacent
//! triangles overlap, so even and odd bands are stored in separate weight
//! arrays; within one array the supports only touch at shared edges.

use crate::error::{try_zeroed, DetectorError};

/// Number of critical bands.
pub const NUM_BARK_BANDS: usize = 24;

/// Triangle corner frequencies in Hz. Band `i` rises from `BARK_BOUNDS[i]`,
/// peaks at `BARK_BOUNDS[i + 1]` and falls back to zero at `BARK_BOUNDS[i + 2]`.
pub const BARK_BOUNDS: [f32; NUM_BARK_BANDS + 2] = [
    0.0, 50.0, 150.0, 250.0, 350.0, 450.0, 570.0, 700.0, 840.0, 1000.0, 1170.0, 1370.0, 1600.0,
    1850.0, 2150.0, 2500.0, 2900.0, 3400.0, 4000.0, 4800.0, 5800.0, 7000.0, 8500.0, 10500.0,
    13500.0, 15500.0,
];

/// Per-band loudness weights: the 40-phon equal-loudness contour at each
/// band center, as linear amplitude relative to 1 kHz.
pub const LOUDNESS_WEIGHTS: [f32; NUM_BARK_BANDS] = [
    0.0129, 0.1301, 0.3020, 0.4768, 0.6338, 0.7870, 0.9146, 0.9944, 0.9988, 0.8626, 0.7874,
    0.7490, 0.9576, 1.2094, 1.4945, 1.5973, 1.5954, 1.4706, 1.0721, 0.6496, 0.3774, 0.2379,
    0.2073, 0.2664,
];

/// Center frequency of a band in Hz.
#[inline]
pub fn band_center(band: usize) -> f32 {
    BARK_BOUNDS[band + 1]
}

/// Half-open frequency range `[low, high)` folded into `band`.
///
/// Ranges split the spectrum halfway between neighbouring centers, so every
/// covered bin belongs to exactly one band.
pub fn band_range(band: usize) -> (f32, f32) {
    let low = if band == 0 {
        BARK_BOUNDS[0]
    } else {
        0.5 * (BARK_BOUNDS[band] + BARK_BOUNDS[band + 1])
    };
    let high = if band == NUM_BARK_BANDS - 1 {
        BARK_BOUNDS[NUM_BARK_BANDS + 1]
    } else {
        0.5 * (BARK_BOUNDS[band + 1] + BARK_BOUNDS[band + 2])
    };
    (low, high)
}

/// Band containing `freq`, if it lies under the filterbank.
pub fn band_for_frequency(freq: f32) -> Option<usize> {
    (0..NUM_BARK_BANDS).find(|&band| {
        let (low, high) = band_range(band);
        freq >= low && freq < high
    })
}

/// Triangular weights and per-band bin ranges for one frame length.
#[derive(Debug, Clone)]
pub struct BarkFilterbank {
    /// `weights[0]` holds even bands, `weights[1]` odd bands.
    weights: [Vec<f32>; 2],
    /// Bin index range `[start, end)` summed into each band.
    bin_ranges: [(usize, usize); NUM_BARK_BANDS],
    resolution: f32,
}

impl BarkFilterbank {
    /// Builds the filterbank for `window_size`-sample frames at `sample_rate`.
    pub fn new(window_size: usize, sample_rate: f32) -> Result<Self, DetectorError> {
        let num_bins = window_size / 2;
        let resolution = sample_rate / window_size as f32;
        let mut weights = [
            try_zeroed(num_bins, "even band weights")?,
            try_zeroed(num_bins, "odd band weights")?,
        ];

        for band in 0..NUM_BARK_BANDS {
            let start = BARK_BOUNDS[band];
            let center = BARK_BOUNDS[band + 1];
            let end = BARK_BOUNDS[band + 2];
            let rise = 1.0 / (center - start);
            let fall = -1.0 / (end - center);
            let target = &mut weights[band % 2];

            for (bin, w) in target.iter_mut().enumerate() {
                let freq = bin as f32 * resolution;
                if freq >= start && freq < center {
                    *w = (freq - start) * rise;
                } else if freq >= center && freq < end {
                    *w = 1.0 + (freq - center) * fall;
                }
            }
        }

        let mut bin_ranges = [(0usize, 0usize); NUM_BARK_BANDS];
        for (band, range) in bin_ranges.iter_mut().enumerate() {
            let (low, high) = band_range(band);
            let first = (0..num_bins).find(|&bin| bin as f32 * resolution >= low);
            let start = first.unwrap_or(num_bins);
            let end = (start..num_bins)
                .find(|&bin| bin as f32 * resolution >= high)
                .unwrap_or(num_bins);
            *range = (start, end);
        }

        Ok(Self {
            weights,
            bin_ranges,
            resolution,
        })
    }

    /// Number of spectrum bins the filterbank covers.
    #[inline]
    pub fn num_bins(&self) -> usize {
        self.weights[0].len()
    }

    /// Frequency spacing of adjacent bins in Hz.
    #[inline]
    pub fn resolution(&self) -> f32 {
        self.resolution
    }

    /// Weight array holding bands of the given parity (0 = even, 1 = odd).
    #[inline]
    pub fn weights(&self, parity: usize) -> &[f32] {
        &self.weights[parity & 1]
    }

    /// Bin index range `[start, end)` folded into `band`.
    #[inline]
    pub fn bin_range(&self, band: usize) -> (usize, usize) {
        self.bin_ranges[band]
    }

    /// Weights `magnitudes` in place by both parity arrays and sums the two
    /// contributions.
    pub fn apply(&self, magnitudes: &mut [f32]) {
        for ((m, &even), &odd) in magnitudes
            .iter_mut()
            .zip(self.weights[0].iter())
            .zip(self.weights[1].iter())
        {
            *m = *m * even + *m * odd;
        }
    }

    /// Folds a weighted spectrum into loudness-weighted band energies.
    pub fn condense(&self, magnitudes: &[f32], bands: &mut [f32; NUM_BARK_BANDS]) {
        for (band, energy) in bands.iter_mut().enumerate() {
            let (start, end) = self.bin_ranges[band];
            let end = end.min(magnitudes.len());
            let start = start.min(end);
            let sum: f32 = magnitudes[start..end].iter().sum();
            *energy = sum * LOUDNESS_WEIGHTS[band];
        }
    }

    /// Runs [`apply`] then [`condense`].
    ///
    /// [`apply`]: BarkFilterbank::apply
    /// [`condense`]: BarkFilterbank::condense
    pub fn process(&self, magnitudes: &mut [f32], bands: &mut [f32; NUM_BARK_BANDS]) {
        self.apply(magnitudes);
        self.condense(magnitudes, bands);
    }
}
