//! Windowed magnitude spectrum of one analysis frame.

use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};

use crate::core::window::{apply_window_into, fill_window, WindowType};
use crate::error::{try_zeroed, DetectorError};

/// Zero-valued complex number, used for FFT buffer initialization.
pub const COMPLEX_ZERO: Complex<f32> = Complex::new(0.0, 0.0);

/// Computes `window_size / 2` magnitudes from a real frame.
///
/// The transform result is kept in the packed real layout: index `i` holds
/// the real part of bin `i` for `0 <= i <= N/2`, and index `N - i` holds its
/// imaginary part for `0 < i < N/2`. DC and Nyquist are zeroed, every
/// coefficient is divided by `N`, and the magnitude of bin `i` is
/// `sqrt(packed[i]^2 + packed[N - i]^2)`.
///
/// All buffers are allocated in [`SpectrumAnalyzer::new`]; [`analyze`]
/// performs no heap allocation.
///
/// [`analyze`]: SpectrumAnalyzer::analyze
pub struct SpectrumAnalyzer {
    fft: Arc<dyn Fft<f32>>,
    window_type: WindowType,
    window: Vec<f32>,
    frame: Vec<f32>,
    fft_buffer: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
    packed: Vec<f32>,
    magnitudes: Vec<f32>,
}

impl std::fmt::Debug for SpectrumAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpectrumAnalyzer")
            .field("window_size", &self.window.len())
            .field("window_type", &self.window_type)
            .finish()
    }
}

impl SpectrumAnalyzer {
    /// Plans the FFT and allocates every buffer for `window_size` samples.
    pub fn new(window_size: usize, window_type: WindowType) -> Result<Self, DetectorError> {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(window_size);
        let scratch_len = fft.get_inplace_scratch_len();

        let mut window = try_zeroed(window_size, "window function")?;
        fill_window(window_type, &mut window);

        Ok(Self {
            fft,
            window_type,
            window,
            frame: try_zeroed(window_size, "windowed frame")?,
            fft_buffer: try_complex(window_size, "fft buffer")?,
            scratch: try_complex(scratch_len, "fft scratch")?,
            packed: try_zeroed(window_size, "packed spectrum")?,
            magnitudes: try_zeroed(window_size / 2, "magnitude spectrum")?,
        })
    }

    /// Frame length in samples.
    #[inline]
    pub fn window_size(&self) -> usize {
        self.window.len()
    }

    /// Active window function.
    #[inline]
    pub fn window_type(&self) -> WindowType {
        self.window_type
    }

    /// Recomputes the window function in place.
    pub fn set_window_type(&mut self, window_type: WindowType) {
        if window_type != self.window_type {
            self.window_type = window_type;
            fill_window(window_type, &mut self.window);
        }
    }

    /// Windows `samples`, transforms them and returns the magnitude spectrum.
    ///
    /// `samples` must hold exactly `window_size` values.
    pub fn analyze(&mut self, samples: &[f32]) -> &[f32] {
        debug_assert_eq!(samples.len(), self.window.len());
        let n = self.window.len();
        if n < 2 {
            return &self.magnitudes;
        }
        let half = n / 2;

        apply_window_into(samples, &self.window, &mut self.frame);
        for (c, &s) in self.fft_buffer.iter_mut().zip(self.frame.iter()) {
            *c = Complex::new(s, 0.0);
        }
        self.fft
            .process_with_scratch(&mut self.fft_buffer, &mut self.scratch);

        self.packed[0] = self.fft_buffer[0].re;
        self.packed[half] = self.fft_buffer[half].re;
        for i in 1..half {
            self.packed[i] = self.fft_buffer[i].re;
            self.packed[n - i] = self.fft_buffer[i].im;
        }

        // DC and Nyquist have no real/imaginary pairing in this layout
        self.packed[0] = 0.0;
        self.packed[half] = 0.0;

        let norm = 1.0 / n as f32;
        for v in self.packed.iter_mut() {
            *v *= norm;
        }

        self.magnitudes[0] = self.packed[0].abs();
        for i in 1..half {
            let re = self.packed[i];
            let im = self.packed[n - i];
            self.magnitudes[i] = (re * re + im * im).sqrt();
        }

        &self.magnitudes
    }

    /// Packed, normalized spectrum from the last call to [`analyze`].
    ///
    /// [`analyze`]: SpectrumAnalyzer::analyze
    #[inline]
    pub fn packed(&self) -> &[f32] {
        &self.packed
    }

    /// Magnitude spectrum from the last call to [`analyze`].
    ///
    /// [`analyze`]: SpectrumAnalyzer::analyze
    #[inline]
    pub fn magnitudes(&self) -> &[f32] {
        &self.magnitudes
    }

    /// Mutable view of the magnitude spectrum, for in-place weighting.
    #[inline]
    pub fn magnitudes_mut(&mut self) -> &mut [f32] {
        &mut self.magnitudes
    }
}

fn try_complex(len: usize, buffer: &'static str) -> Result<Vec<Complex<f32>>, DetectorError> {
    let mut data = Vec::new();
    data.try_reserve_exact(len)
        .map_err(|_| DetectorError::AllocationFailed { buffer, len })?;
    data.resize(len, COMPLEX_ZERO);
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn sine(freq: f32, sample_rate: f32, n: usize, amp: f32) -> Vec<f32> {
        (0..n)
            .map(|i| amp * (2.0 * PI * freq * i as f32 / sample_rate).sin())
            .collect()
    }

    #[test]
    fn test_silence_has_zero_spectrum() {
        let mut analyzer = SpectrumAnalyzer::new(1024, WindowType::Hann).unwrap();
        let mags = analyzer.analyze(&vec![0.0; 1024]);
        assert_eq!(mags.len(), 512);
        assert!(mags.iter().all(|&m| m == 0.0));
    }

    #[test]
    fn test_dc_and_nyquist_are_zeroed() {
        let mut analyzer = SpectrumAnalyzer::new(256, WindowType::Hann).unwrap();
        let dc = vec![1.0; 256];
        analyzer.analyze(&dc);
        assert_eq!(analyzer.packed()[0], 0.0);
        assert_eq!(analyzer.packed()[128], 0.0);
        assert_eq!(analyzer.magnitudes()[0], 0.0);
    }

    #[test]
    fn test_bin_centered_sine_peak() {
        let n = 1024;
        let sr = 44100.0;
        let bin = 64;
        let freq = bin as f32 * sr / n as f32;
        let mut analyzer = SpectrumAnalyzer::new(n, WindowType::Hann).unwrap();
        let mags = analyzer.analyze(&sine(freq, sr, n, 1.0)).to_vec();

        let (peak_bin, &peak) = mags
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .unwrap();
        assert_eq!(peak_bin, bin);
        // Hann coherent gain 0.5, single-sided amplitude 0.5
        assert!((peak - 0.25).abs() < 0.01, "peak magnitude {}", peak);
        // Far-away bins carry almost nothing
        assert!(mags[bin + 20] < peak * 1e-3);
    }

    #[test]
    fn test_packed_layout_matches_magnitudes() {
        let n = 64;
        let mut analyzer = SpectrumAnalyzer::new(n, WindowType::Hamming).unwrap();
        let input: Vec<f32> = (0..n).map(|i| ((i * 7 % 13) as f32 - 6.0) / 6.0).collect();
        analyzer.analyze(&input);
        let packed = analyzer.packed();
        let mags = analyzer.magnitudes();
        for i in 1..n / 2 {
            let expected = (packed[i] * packed[i] + packed[n - i] * packed[n - i]).sqrt();
            assert!((mags[i] - expected).abs() < 1e-7);
        }
    }

    #[test]
    fn test_window_type_switch() {
        let n = 128;
        let input = sine(3000.0, 44100.0, n, 1.0);
        let mut analyzer = SpectrumAnalyzer::new(n, WindowType::Hann).unwrap();
        let hann = analyzer.analyze(&input).to_vec();
        analyzer.set_window_type(WindowType::Hamming);
        assert_eq!(analyzer.window_type(), WindowType::Hamming);
        let hamming = analyzer.analyze(&input).to_vec();
        assert_ne!(hann, hamming);
    }
}
