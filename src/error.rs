//! Error types for the onset detector.

use std::fmt;

/// Errors that can occur while building a detector or loading its inputs.
///
/// Configuration mistakes (non-power-of-two sizes, bad scale factors, ...) are
/// not errors: they are replaced by defaults and reported through `log::warn!`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetectorError {
    /// A fixed-size analysis buffer could not be reserved.
    AllocationFailed { buffer: &'static str, len: usize },
    /// Invalid audio file format.
    InvalidFormat(String),
    /// A serialized configuration could not be parsed or written.
    InvalidConfig(String),
    /// I/O error.
    IoError(String),
}

impl fmt::Display for DetectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetectorError::AllocationFailed { buffer, len } => {
                write!(
                    f,
                    "allocation failed: could not reserve {} elements for {}",
                    len, buffer
                )
            }
            DetectorError::InvalidFormat(msg) => write!(f, "invalid format: {}", msg),
            DetectorError::InvalidConfig(msg) => write!(f, "invalid config: {}", msg),
            DetectorError::IoError(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for DetectorError {}

impl From<std::io::Error> for DetectorError {
    fn from(err: std::io::Error) -> Self {
        DetectorError::IoError(err.to_string())
    }
}

/// Allocates a zero-filled buffer of `len` elements, reporting failure
/// instead of aborting.
pub(crate) fn try_zeroed<T: Copy + Default>(
    len: usize,
    buffer: &'static str,
) -> Result<Vec<T>, DetectorError> {
    let mut data = Vec::new();
    data.try_reserve_exact(len)
        .map_err(|_| DetectorError::AllocationFailed { buffer, len })?;
    data.resize(len, T::default());
    Ok(data)
}
