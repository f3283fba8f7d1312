//! Outer- and middle-ear transfer model.
//!
//! Two fixed second-order sections run in series on every incoming sample.
//! Each section owns its delay lines, so independent detectors never share
//! filter history.

/// Outer-ear section coefficients (a pure two-tap FIR in practice).
const OUTER_B0: f32 = 0.0;
const OUTER_B1: f32 = 0.7221;
const OUTER_B2: f32 = -0.6918;
const OUTER_A1: f32 = 0.0;
const OUTER_A2: f32 = 0.0;

/// Middle-ear section coefficients.
const MIDDLE_B0: f32 = 0.8383;
const MIDDLE_B1: f32 = 0.0;
const MIDDLE_B2: f32 = -0.8383;
const MIDDLE_A1: f32 = 1.6456;
const MIDDLE_A2: f32 = 0.6791;

/// A single biquad (second-order IIR) filter section.
///
/// Implements the Direct Form I difference equation:
///   y[n] = b0*x[n] + b1*x[n-1] + b2*x[n-2] - a1*y[n-1] - a2*y[n-2]
#[derive(Debug, Clone, PartialEq)]
pub struct Biquad {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
    // Input delay line
    x1: f32,
    x2: f32,
    // Output delay line
    y1: f32,
    y2: f32,
}

impl Biquad {
    /// Creates a section from raw coefficients with cleared history.
    pub fn new(b0: f32, b1: f32, b2: f32, a1: f32, a2: f32) -> Self {
        Self {
            b0,
            b1,
            b2,
            a1,
            a2,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        }
    }

    /// Processes a single sample through the Direct Form I equation.
    #[inline]
    pub fn process_sample(&mut self, input: f32) -> f32 {
        let output = self.b0 * input + self.b1 * self.x1 + self.b2 * self.x2
            - self.a1 * self.y1
            - self.a2 * self.y2;
        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = output;
        output
    }

    /// Processes a single sample through the middle-ear form of the section.
    ///
    /// The feedback term only reads the second output tap, and the returned
    /// sample is the section output scaled by `a2`:
    ///   v[n] = b0*x[n] + b1*x[n-1] + b2*x[n-2] - a2*v[n-1]
    ///   y[n] = a2 * v[n]
    /// `y2` holds the unscaled `v[n-1]`; `y1` holds the last scaled output.
    #[inline]
    pub fn process_sample_scaled(&mut self, input: f32) -> f32 {
        let v = self.b0 * input + self.b1 * self.x1 + self.b2 * self.x2 - self.a2 * self.y2;
        let output = self.a2 * v;
        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = v;
        self.y1 = output;
        output
    }

    /// Resets all delay line state to zero.
    pub fn reset(&mut self) {
        self.x1 = 0.0;
        self.x2 = 0.0;
        self.y1 = 0.0;
        self.y2 = 0.0;
    }
}

/// Per-instance outer + middle ear filter state.
#[derive(Debug, Clone, PartialEq)]
pub struct EarFilter {
    outer: Biquad,
    middle: Biquad,
}

impl Default for EarFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl EarFilter {
    /// Creates the filter pair with the fixed ear-model coefficients.
    pub fn new() -> Self {
        Self {
            outer: Biquad::new(OUTER_B0, OUTER_B1, OUTER_B2, OUTER_A1, OUTER_A2),
            middle: Biquad::new(MIDDLE_B0, MIDDLE_B1, MIDDLE_B2, MIDDLE_A1, MIDDLE_A2),
        }
    }

    /// Filters one sample: outer ear first, then middle ear.
    #[inline]
    pub fn filter_sample(&mut self, input: f32) -> f32 {
        let outer = self.outer.process_sample(input);
        self.middle.process_sample_scaled(outer)
    }

    /// Filters `input` into `output` sample by sample.
    ///
    /// Only `min(input.len(), output.len())` samples are processed.
    #[inline]
    pub fn filter_into(&mut self, input: &[f32], output: &mut [f32]) {
        for (out, &x) in output.iter_mut().zip(input.iter()) {
            *out = self.filter_sample(x);
        }
    }

    /// Clears both delay lines.
    pub fn reset(&mut self) {
        self.outer.reset();
        self.middle.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outer_impulse_response() {
        let mut outer = Biquad::new(OUTER_B0, OUTER_B1, OUTER_B2, OUTER_A1, OUTER_A2);
        let response: Vec<f32> = [1.0, 0.0, 0.0, 0.0]
            .iter()
            .map(|&x| outer.process_sample(x))
            .collect();
        assert_eq!(response[0], 0.0);
        assert!((response[1] - 0.7221).abs() < 1e-7);
        assert!((response[2] + 0.6918).abs() < 1e-7);
        assert_eq!(response[3], 0.0);
    }

    #[test]
    fn test_middle_impulse_response() {
        let mut middle = Biquad::new(MIDDLE_B0, MIDDLE_B1, MIDDLE_B2, MIDDLE_A1, MIDDLE_A2);
        let y0 = middle.process_sample_scaled(1.0);
        let y1 = middle.process_sample_scaled(0.0);
        let y2 = middle.process_sample_scaled(0.0);
        // v0 = b0
        let v0 = MIDDLE_B0;
        assert!((y0 - MIDDLE_A2 * v0).abs() < 1e-6);
        // v1 = -a2 * v0 (b1 = 0)
        let v1 = -MIDDLE_A2 * v0;
        assert!((y1 - MIDDLE_A2 * v1).abs() < 1e-6);
        // v2 = b2 - a2 * v1
        let v2 = MIDDLE_B2 - MIDDLE_A2 * v1;
        assert!((y2 - MIDDLE_A2 * v2).abs() < 1e-6);
    }

    #[test]
    fn test_silence_stays_silent() {
        let mut filter = EarFilter::new();
        for _ in 0..1000 {
            assert_eq!(filter.filter_sample(0.0), 0.0);
        }
    }

    #[test]
    fn test_dc_is_rejected() {
        let mut filter = EarFilter::new();
        let mut last = 0.0;
        for _ in 0..20_000 {
            last = filter.filter_sample(1.0);
        }
        assert!(last.abs() < 1e-3, "DC should decay, got {}", last);
    }

    #[test]
    fn test_stable_on_full_scale_noise() {
        let mut filter = EarFilter::new();
        let mut state = 12345u32;
        for _ in 0..100_000 {
            state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            let x = (state >> 8) as f32 / (1u32 << 24) as f32 * 2.0 - 1.0;
            let y = filter.filter_sample(x);
            assert!(y.is_finite() && y.abs() < 10.0);
        }
    }

    #[test]
    fn test_instances_do_not_share_history() {
        let mut a = EarFilter::new();
        let mut b = EarFilter::new();
        a.filter_sample(1.0);
        a.filter_sample(0.5);
        // b has seen nothing, so its first outputs match a fresh filter
        let mut fresh = EarFilter::new();
        assert_eq!(b.filter_sample(0.25), fresh.filter_sample(0.25));
        assert_eq!(b.filter_sample(0.0), fresh.filter_sample(0.0));
        assert_ne!(a, b);
    }

    #[test]
    fn test_reset_clears_history() {
        let mut filter = EarFilter::new();
        filter.filter_sample(1.0);
        filter.filter_sample(-1.0);
        filter.reset();
        assert_eq!(filter, EarFilter::new());
    }

    #[test]
    fn test_filter_into_matches_per_sample() {
        let input: Vec<f32> = (0..64).map(|i| (i as f32 * 0.3).sin()).collect();
        let mut a = EarFilter::new();
        let mut b = EarFilter::new();
        let mut out = vec![0.0; 64];
        a.filter_into(&input, &mut out);
        for (i, &x) in input.iter().enumerate() {
            assert_eq!(out[i], b.filter_sample(x));
        }
    }
}
