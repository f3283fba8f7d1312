//! Core types, window functions, ear filter and framed spectral analysis.

pub mod ear_filter;
pub mod fft;
pub mod sliding_window;
pub mod types;
pub mod window;

pub use types::*;
pub use window::{apply_window_into, fill_window, generate_window, WindowType};
