//! Bark-band spectral flux.

use crate::analysis::bark::NUM_BARK_BANDS;

/// Half-wave rectification: negative values become zero.
#[inline]
pub fn halfwave_rectify(value: f32) -> f32 {
    (value + value.abs()) * 0.5
}

/// Sum of rectified band-energy increases between two frames.
pub fn spectral_flux(current: &[f32; NUM_BARK_BANDS], previous: &[f32; NUM_BARK_BANDS]) -> f32 {
    current
        .iter()
        .zip(previous.iter())
        .map(|(&c, &p)| halfwave_rectify(c.abs() - p.abs()))
        .sum()
}

/// Current and previous band energies.
///
/// The first frame only primes the history: [`BarkBins::advance`] returns
/// `None` until a previous frame exists.
#[derive(Debug, Clone, PartialEq)]
pub struct BarkBins {
    current: [f32; NUM_BARK_BANDS],
    previous: [f32; NUM_BARK_BANDS],
    primed: bool,
}

impl Default for BarkBins {
    fn default() -> Self {
        Self::new()
    }
}

impl BarkBins {
    pub fn new() -> Self {
        Self {
            current: [0.0; NUM_BARK_BANDS],
            previous: [0.0; NUM_BARK_BANDS],
            primed: false,
        }
    }

    /// Buffer to fill with this hop's band energies.
    #[inline]
    pub fn current_mut(&mut self) -> &mut [f32; NUM_BARK_BANDS] {
        &mut self.current
    }

    /// This hop's band energies.
    #[inline]
    pub fn current(&self) -> &[f32; NUM_BARK_BANDS] {
        &self.current
    }

    /// Last hop's band energies.
    #[inline]
    pub fn previous(&self) -> &[f32; NUM_BARK_BANDS] {
        &self.previous
    }

    /// Differences the current frame against the previous one, then makes
    /// the current frame the new history.
    pub fn advance(&mut self) -> Option<f32> {
        let flux = if self.primed {
            Some(spectral_flux(&self.current, &self.previous))
        } else {
            None
        };
        self.previous = self.current;
        self.primed = true;
        flux
    }

    /// Per-band rectified differences for the current hop.
    ///
    /// Only meaningful before [`BarkBins::advance`] is called for the hop.
    pub fn band_contributions(&self, out: &mut [f32; NUM_BARK_BANDS]) {
        for ((o, &c), &p) in out
            .iter_mut()
            .zip(self.current.iter())
            .zip(self.previous.iter())
        {
            *o = halfwave_rectify(c.abs() - p.abs());
        }
    }

    /// True once a previous frame exists.
    #[inline]
    pub fn is_primed(&self) -> bool {
        self.primed
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}
