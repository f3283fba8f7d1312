//! Adaptive thresholds driven by the running mean of flux.
//!
//! In manual mode the upper and lower thresholds are fixed values. Setting a
//! scale factor switches to automatic mode, where every update recomputes
//! `upper = mean * upper_scale` and `lower = mean * lower_scale`. Setting a
//! threshold directly switches back to manual mode.

use crate::core::types::{
    sanitize_scale, sanitize_threshold, DEFAULT_LOWER_SCALE, DEFAULT_LOWER_THRESHOLD,
    DEFAULT_UPPER_SCALE, DEFAULT_UPPER_THRESHOLD,
};

#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdEstimator {
    upper_threshold: f32,
    lower_threshold: f32,
    upper_scale: f32,
    lower_scale: f32,
    automatic: bool,
    running_mean: f64,
    num_values: u64,
}

impl Default for ThresholdEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_UPPER_THRESHOLD, DEFAULT_LOWER_THRESHOLD)
    }
}

impl ThresholdEstimator {
    /// Creates an estimator in manual mode.
    pub fn new(upper_threshold: f32, lower_threshold: f32) -> Self {
        Self {
            upper_threshold,
            lower_threshold,
            upper_scale: DEFAULT_UPPER_SCALE,
            lower_scale: DEFAULT_LOWER_SCALE,
            automatic: false,
            running_mean: 0.0,
            num_values: 0,
        }
    }

    /// Folds one flux value into the running mean and, in automatic mode,
    /// recomputes both thresholds.
    pub fn update(&mut self, flux: f32) {
        let k = self.num_values as f64;
        self.running_mean = (self.running_mean * k + flux as f64) / (k + 1.0);
        self.num_values += 1;
        if self.automatic {
            self.recompute();
        }
    }

    fn recompute(&mut self) {
        let mean = self.running_mean as f32;
        self.upper_threshold = mean * self.upper_scale;
        self.lower_threshold = mean * self.lower_scale;
    }

    /// Sets a fixed upper threshold and leaves automatic mode.
    pub fn set_upper_threshold(&mut self, value: f32) {
        self.upper_threshold = sanitize_threshold(value, DEFAULT_UPPER_THRESHOLD, "upper");
        self.automatic = false;
    }

    /// Sets a fixed lower threshold and leaves automatic mode.
    pub fn set_lower_threshold(&mut self, value: f32) {
        self.lower_threshold = sanitize_threshold(value, DEFAULT_LOWER_THRESHOLD, "lower");
        self.automatic = false;
    }

    /// Sets the upper scale factor and enters automatic mode.
    ///
    /// Zero, negative and non-finite factors fall back to the default.
    pub fn set_upper_scale(&mut self, value: f32) {
        self.upper_scale = sanitize_scale(value, DEFAULT_UPPER_SCALE, "upper");
        self.automatic = true;
        self.recompute();
    }

    /// Sets the lower scale factor and enters automatic mode.
    pub fn set_lower_scale(&mut self, value: f32) {
        self.lower_scale = sanitize_scale(value, DEFAULT_LOWER_SCALE, "lower");
        self.automatic = true;
        self.recompute();
    }

    /// Forgets all accumulated flux values.
    pub fn reset_running_mean(&mut self) {
        self.running_mean = 0.0;
        self.num_values = 0;
        if self.automatic {
            self.recompute();
        }
    }

    #[inline]
    pub fn upper_threshold(&self) -> f32 {
        self.upper_threshold
    }

    #[inline]
    pub fn lower_threshold(&self) -> f32 {
        self.lower_threshold
    }

    #[inline]
    pub fn upper_scale(&self) -> f32 {
        self.upper_scale
    }

    #[inline]
    pub fn lower_scale(&self) -> f32 {
        self.lower_scale
    }

    #[inline]
    pub fn is_automatic(&self) -> bool {
        self.automatic
    }

    #[inline]
    pub fn running_mean(&self) -> f32 {
        self.running_mean as f32
    }

    /// Number of flux values folded into the mean since the last reset.
    #[inline]
    pub fn num_values(&self) -> u64 {
        self.num_values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_mean_matches_average() {
        let values = [0.5f32, 0.1, 0.9, 0.0, 2.0, 0.3];
        let mut est = ThresholdEstimator::default();
        for &v in &values {
            est.update(v);
        }
        let avg = values.iter().sum::<f32>() / values.len() as f32;
        assert!((est.running_mean() - avg).abs() < 1e-6);
        assert_eq!(est.num_values(), 6);
    }

    #[test]
    fn test_running_mean_order_independent() {
        let values = [0.5f32, 0.1, 0.9, 0.0, 2.0, 0.3];
        let mut forward = ThresholdEstimator::default();
        let mut backward = ThresholdEstimator::default();
        for &v in &values {
            forward.update(v);
        }
        for &v in values.iter().rev() {
            backward.update(v);
        }
        assert!((forward.running_mean() - backward.running_mean()).abs() < 1e-6);
    }

    #[test]
    fn test_reset_running_mean() {
        let mut est = ThresholdEstimator::default();
        est.update(4.0);
        est.update(2.0);
        est.reset_running_mean();
        assert_eq!(est.num_values(), 0);
        assert_eq!(est.running_mean(), 0.0);
        est.update(0.125);
        assert_eq!(est.running_mean(), 0.125);
    }

    #[test]
    fn test_scale_enables_automatic_thresholds() {
        let mut est = ThresholdEstimator::new(1.0, 0.5);
        assert!(!est.is_automatic());
        est.set_upper_scale(3.0);
        assert!(est.is_automatic());
        est.update(2.0);
        assert!((est.upper_threshold() - 6.0).abs() < 1e-6);
        assert!((est.lower_threshold() - 2.0 * DEFAULT_LOWER_SCALE).abs() < 1e-6);
    }

    #[test]
    fn test_manual_threshold_disables_automatic() {
        let mut est = ThresholdEstimator::default();
        est.set_lower_scale(0.5);
        assert!(est.is_automatic());
        est.set_upper_threshold(0.25);
        assert!(!est.is_automatic());
        est.update(10.0);
        assert_eq!(est.upper_threshold(), 0.25);

        est.set_upper_scale(2.0);
        est.set_lower_threshold(0.1);
        assert!(!est.is_automatic());
    }

    #[test]
    fn test_zero_scale_falls_back() {
        let mut est = ThresholdEstimator::default();
        est.set_upper_scale(0.0);
        assert_eq!(est.upper_scale(), DEFAULT_UPPER_SCALE);
        est.set_lower_scale(f32::NAN);
        assert_eq!(est.lower_scale(), DEFAULT_LOWER_SCALE);
        assert!(est.is_automatic());
    }

    #[test]
    fn test_negative_threshold_falls_back() {
        let mut est = ThresholdEstimator::default();
        est.set_upper_threshold(-1.0);
        assert_eq!(est.upper_threshold(), DEFAULT_UPPER_THRESHOLD);
    }

    #[test]
    fn test_manual_mode_ignores_mean() {
        let mut est = ThresholdEstimator::new(0.7, 0.2);
        for _ in 0..10 {
            est.update(5.0);
        }
        assert_eq!(est.upper_threshold(), 0.7);
        assert_eq!(est.lower_threshold(), 0.2);
        assert!((est.running_mean() - 5.0).abs() < 1e-6);
    }
}
