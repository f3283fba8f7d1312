//! Events produced by the detector and the sinks that receive them.

use serde::{Deserialize, Serialize};

/// A confirmed onset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OnsetEvent {
    /// Hop on which the onset was confirmed (the bootstrap hop is 0).
    pub hop_index: u64,
    /// Samples consumed when the onset was confirmed.
    pub sample_position: u64,
    /// Hop on which the confirmed peak was recorded.
    pub peak_hop_index: u64,
    /// Samples consumed when the confirmed peak was recorded.
    pub peak_sample_position: u64,
    /// Flux of the confirmed peak, after masking.
    pub peak_magnitude: f32,
}

impl OnsetEvent {
    /// Peak position in seconds.
    pub fn peak_time_secs(&self, sample_rate: f32) -> f64 {
        if sample_rate <= 0.0 {
            return 0.0;
        }
        self.peak_sample_position as f64 / sample_rate as f64
    }
}

/// Result of a block that crossed a hop boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HopOutcome {
    pub hop_index: u64,
    /// `None` on the bootstrap hop.
    pub flux: Option<f32>,
    pub onset: Option<OnsetEvent>,
}

/// Receiver for detector output.
///
/// Implementations called from the audio thread must not block or allocate.
pub trait EventSink {
    /// Called once per hop that produced a flux value.
    fn on_flux(&mut self, _hop_index: u64, _flux: f32) {}

    /// Called once per confirmed onset.
    fn on_onset(&mut self, event: &OnsetEvent);
}

/// Discards everything.
impl EventSink for () {
    fn on_onset(&mut self, _event: &OnsetEvent) {}
}

/// Collects onsets. Grows the vector, so offline use only.
impl EventSink for Vec<OnsetEvent> {
    fn on_onset(&mut self, event: &OnsetEvent) {
        self.push(*event);
    }
}

impl<S: EventSink + ?Sized> EventSink for &mut S {
    fn on_flux(&mut self, hop_index: u64, flux: f32) {
        (**self).on_flux(hop_index, flux);
    }

    fn on_onset(&mut self, event: &OnsetEvent) {
        (**self).on_onset(event);
    }
}

/// Onsets and flux curve of a whole signal.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OnsetMap {
    pub onsets: Vec<OnsetEvent>,
    /// One value per hop after the bootstrap hop.
    #[serde(default)]
    pub flux: Vec<f32>,
    pub hop_size: usize,
    pub sample_rate: f32,
}

impl OnsetMap {
    pub fn new(hop_size: usize, sample_rate: f32) -> Self {
        Self {
            onsets: Vec::new(),
            flux: Vec::new(),
            hop_size,
            sample_rate,
        }
    }

    /// Peak positions in seconds.
    pub fn onset_times_secs(&self) -> Vec<f64> {
        self.onsets
            .iter()
            .map(|o| o.peak_time_secs(self.sample_rate))
            .collect()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.onsets.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.onsets.is_empty()
    }
}

impl EventSink for OnsetMap {
    fn on_flux(&mut self, _hop_index: u64, flux: f32) {
        self.flux.push(flux);
    }

    fn on_onset(&mut self, event: &OnsetEvent) {
        self.onsets.push(*event);
    }
}
