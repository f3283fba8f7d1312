//! Window functions for framed spectral analysis.
//!
//! The analysis frame is tapered by a Hann or Hamming window before the FFT.
//! The window is computed once per window type and size and reused for every
//! hop.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Hamming window coefficients.
const HAMMING_A0: f64 = 0.54;
const HAMMING_A1: f64 = 0.46;

/// Window function types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowType {
    #[default]
    Hann,
    Hamming,
}

impl WindowType {
    /// Maps a host-style integer selector to a window type.
    ///
    /// `0` is Hann, `1` is Hamming. Anything else yields `None`.
    pub fn from_index(index: i64) -> Option<Self> {
        match index {
            0 => Some(WindowType::Hann),
            1 => Some(WindowType::Hamming),
            _ => None,
        }
    }
}

/// Generates a window function of the specified type and size.
pub fn generate_window(window_type: WindowType, size: usize) -> Vec<f32> {
    let mut window = vec![0.0f32; size];
    fill_window(window_type, &mut window);
    window
}

/// Overwrites `out` with the window of the given type, sized to `out.len()`.
pub fn fill_window(window_type: WindowType, out: &mut [f32]) {
    let size = out.len();
    match size {
        0 => return,
        1 => {
            out[0] = 1.0;
            return;
        }
        _ => {}
    }
    let n = size as f64;
    for (i, w) in out.iter_mut().enumerate() {
        let x = (2.0 * PI * i as f64) / (n - 1.0);
        *w = match window_type {
            WindowType::Hann => 0.5 * (1.0 - x.cos()),
            WindowType::Hamming => HAMMING_A0 - HAMMING_A1 * x.cos(),
        } as f32;
    }
}

/// Writes `data * window` into `out`, element-wise.
#[inline]
pub fn apply_window_into(data: &[f32], window: &[f32], out: &mut [f32]) {
    for ((o, &d), &w) in out.iter_mut().zip(data.iter()).zip(window.iter()) {
        *o = d * w;
    }
}
