//! Block-driven streaming detector and its event surface.

pub mod detector;
pub mod events;

pub use detector::OnsetDetector;
pub use events::{EventSink, HopOutcome, OnsetEvent, OnsetMap};
