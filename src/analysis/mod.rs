//! Critical-band reduction, spectral flux, adaptive thresholds and peak picking.

pub mod bark;
pub mod flux;
pub mod peak_picker;
pub mod threshold;
