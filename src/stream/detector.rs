use crate::analysis::bark::{BarkFilterbank, NUM_BARK_BANDS};
use crate::analysis::flux::BarkBins;
use crate::analysis::peak_picker::{PeakFlag, PeakPicker, Transition};
use crate::analysis::threshold::ThresholdEstimator;
use crate::core::fft::SpectrumAnalyzer;
use crate::core::sliding_window::AnalysisWindow;
use crate::core::types::{
    sanitize_hop_size, sanitize_masking_decay, sanitize_ms, sanitize_sample_rate,
    sanitize_window_size, DetectorConfig, DEFAULT_CONSECUTIVE_ONSET_MS, DEFAULT_MASKING_MS,
};
use crate::core::window::WindowType;
use crate::error::DetectorError;
use crate::stream::events::{EventSink, HopOutcome, OnsetEvent};

/// Buffers rebuilt whenever the frame geometry changes.
struct Frame {
    window: AnalysisWindow,
    spectrum: SpectrumAnalyzer,
    filterbank: BarkFilterbank,
}

impl Frame {
    fn new(config: &DetectorConfig) -> Result<Self, DetectorError> {
        Ok(Self {
            window: AnalysisWindow::new(config.window_size, config.hop_size)?,
            spectrum: SpectrumAnalyzer::new(config.window_size, config.window_type)?,
            filterbank: BarkFilterbank::new(config.window_size, config.sample_rate)?,
        })
    }
}

/// Streaming onset detector.
///
/// Feed host blocks of any length through [`process_block`] or
/// [`process_into`]. Every time the hop counter crosses `hop_size`, the
/// current window is analyzed and the resulting flux drives the peak picker.
/// All buffers are allocated in [`OnsetDetector::new`] and
/// [`OnsetDetector::configure`]; the per-block path never allocates.
///
/// [`process_block`]: OnsetDetector::process_block
/// [`process_into`]: OnsetDetector::process_into
pub struct OnsetDetector {
    config: DetectorConfig,
    window: AnalysisWindow,
    spectrum: SpectrumAnalyzer,
    filterbank: BarkFilterbank,
    bins: BarkBins,
    band_flux: [f32; NUM_BARK_BANDS],
    threshold: ThresholdEstimator,
    picker: PeakPicker,
    last_flux: Option<f32>,
    hops_processed: u64,
    samples_processed: u64,
    peak_hop_index: u64,
    peak_sample_position: u64,
}

impl std::fmt::Debug for OnsetDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnsetDetector")
            .field("config", &self.config)
            .field("peak_flag", &self.picker.flag())
            .field("hops_processed", &self.hops_processed)
            .finish()
    }
}

impl OnsetDetector {
    /// Builds a detector from `config`, substituting defaults for invalid
    /// fields.
    ///
    /// # Errors
    ///
    /// Returns [`DetectorError::AllocationFailed`] if an analysis buffer
    /// cannot be reserved.
    pub fn new(config: DetectorConfig) -> Result<Self, DetectorError> {
        let config = config.sanitized();
        let frame = Frame::new(&config)?;

        let mut threshold = ThresholdEstimator::new(config.upper_threshold, config.lower_threshold);
        if let Some(scale) = config.upper_scale {
            threshold.set_upper_scale(scale);
        }
        if let Some(scale) = config.lower_scale {
            threshold.set_lower_scale(scale);
        }

        let picker = PeakPicker::new(
            config.debounce_threshold,
            config.ms_to_hops(config.consecutive_onset_ms),
            config.ms_to_hops(config.masking_ms),
            config.masking_decay,
        );

        let detector = Self {
            window: frame.window,
            spectrum: frame.spectrum,
            filterbank: frame.filterbank,
            bins: BarkBins::new(),
            band_flux: [0.0; NUM_BARK_BANDS],
            threshold,
            picker,
            last_flux: None,
            hops_processed: 0,
            samples_processed: 0,
            peak_hop_index: 0,
            peak_sample_position: 0,
            config,
        };
        detector.log_geometry();
        Ok(detector)
    }

    /// Rebuilds every buffer for a new frame geometry and clears all
    /// streaming state. Threshold settings are kept.
    ///
    /// Non-power-of-two sizes fall back to 1024 / 256. On error the detector
    /// is left unchanged.
    pub fn configure(
        &mut self,
        window_size: usize,
        hop_size: usize,
        sample_rate: f32,
    ) -> Result<(), DetectorError> {
        let mut config = self.config.clone();
        config.window_size = sanitize_window_size(window_size);
        config.hop_size = sanitize_hop_size(hop_size);
        config.sample_rate = sanitize_sample_rate(sample_rate);

        let frame = Frame::new(&config)?;
        self.window = frame.window;
        self.spectrum = frame.spectrum;
        self.filterbank = frame.filterbank;
        self.picker
            .set_consecutive_onset_threshold(config.ms_to_hops(config.consecutive_onset_ms));
        self.picker
            .set_mask_threshold(config.ms_to_hops(config.masking_ms));
        self.config = config;
        self.reset();
        self.log_geometry();
        Ok(())
    }

    fn log_geometry(&self) {
        log::debug!(
            "onset detector: window {} hop {} at {} Hz ({:.2} ms/hop), suppression {} hops, masking {} hops",
            self.config.window_size,
            self.config.hop_size,
            self.config.sample_rate,
            self.config.hop_ms(),
            self.picker.consecutive_onset_threshold(),
            self.picker.mask_threshold()
        );
    }

    /// Consumes one host block.
    ///
    /// Returns `Some` when the block completed a hop. At most one hop is
    /// analyzed per block, however long the block is.
    pub fn process_block(&mut self, block: &[f32]) -> Option<HopOutcome> {
        self.samples_processed += block.len() as u64;
        if !self.window.push_block(block) {
            return None;
        }
        Some(self.analyze_hop())
    }

    /// Consumes one host block and routes its output to `sink`.
    pub fn process_into<S: EventSink>(&mut self, block: &[f32], sink: &mut S) {
        if let Some(outcome) = self.process_block(block) {
            if let Some(flux) = outcome.flux {
                sink.on_flux(outcome.hop_index, flux);
            }
            if let Some(onset) = outcome.onset.as_ref() {
                sink.on_onset(onset);
            }
        }
    }

    fn analyze_hop(&mut self) -> HopOutcome {
        let hop_index = self.hops_processed;
        self.hops_processed += 1;

        self.spectrum.analyze(self.window.samples());
        self.filterbank
            .process(self.spectrum.magnitudes_mut(), self.bins.current_mut());

        if self.bins.is_primed() {
            self.bins.band_contributions(&mut self.band_flux);
        } else {
            self.band_flux = [0.0; NUM_BARK_BANDS];
        }

        let Some(flux) = self.bins.advance() else {
            self.last_flux = None;
            return HopOutcome {
                hop_index,
                flux: None,
                onset: None,
            };
        };
        self.last_flux = Some(flux);

        self.threshold.update(flux);
        let peak = self.picker.step(
            flux,
            self.threshold.upper_threshold(),
            self.threshold.lower_threshold(),
        );

        if matches!(
            self.picker.last_transition(),
            Transition::Open | Transition::Raise
        ) {
            self.peak_hop_index = hop_index;
            self.peak_sample_position = self.samples_processed;
        }

        let onset = peak.map(|peak_magnitude| OnsetEvent {
            hop_index,
            sample_position: self.samples_processed,
            peak_hop_index: self.peak_hop_index,
            peak_sample_position: self.peak_sample_position,
            peak_magnitude,
        });

        HopOutcome {
            hop_index,
            flux: Some(flux),
            onset,
        }
    }

    /// Selects the analysis window function.
    pub fn set_window_type(&mut self, window_type: WindowType) {
        self.config.window_type = window_type;
        self.spectrum.set_window_type(window_type);
    }

    /// Selects the window function by index (0 Hann, 1 Hamming).
    pub fn set_window_type_index(&mut self, index: i64) {
        let window_type = WindowType::from_index(index).unwrap_or_else(|| {
            log::warn!("window type index {} is out of range, using hann", index);
            WindowType::Hann
        });
        self.set_window_type(window_type);
    }

    /// Hops a candidate waits for a higher peak before it is confirmed.
    pub fn set_debounce_threshold(&mut self, hops: u32) {
        self.config.debounce_threshold = hops;
        self.picker.set_debounce_threshold(hops);
    }

    /// Fixes the upper threshold and disables automatic thresholds.
    pub fn set_upper_threshold(&mut self, value: f32) {
        self.threshold.set_upper_threshold(value);
        self.config.upper_threshold = self.threshold.upper_threshold();
        self.sync_scales();
    }

    /// Fixes the lower threshold and disables automatic thresholds.
    pub fn set_lower_threshold(&mut self, value: f32) {
        self.threshold.set_lower_threshold(value);
        self.config.lower_threshold = self.threshold.lower_threshold();
        self.sync_scales();
    }

    /// Sets the running-mean multiplier of the upper threshold and enables
    /// automatic thresholds.
    pub fn set_upper_threshold_scale(&mut self, value: f32) {
        self.threshold.set_upper_scale(value);
        self.sync_scales();
    }

    /// Sets the running-mean multiplier of the lower threshold and enables
    /// automatic thresholds.
    pub fn set_lower_threshold_scale(&mut self, value: f32) {
        self.threshold.set_lower_scale(value);
        self.sync_scales();
    }

    fn sync_scales(&mut self) {
        if self.threshold.is_automatic() {
            self.config.upper_scale = Some(self.threshold.upper_scale());
            self.config.lower_scale = Some(self.threshold.lower_scale());
        } else {
            self.config.upper_scale = None;
            self.config.lower_scale = None;
        }
    }

    /// Hold-off after an onset, in milliseconds.
    pub fn set_consecutive_onset_window(&mut self, ms: f32) {
        let ms = sanitize_ms(ms, DEFAULT_CONSECUTIVE_ONSET_MS, "consecutive onset window");
        self.config.consecutive_onset_ms = ms;
        self.picker
            .set_consecutive_onset_threshold(self.config.ms_to_hops(ms));
    }

    /// Hold-off after an onset, in hops. Replaced on the next `configure`.
    pub fn set_consecutive_onset_hops(&mut self, hops: u32) {
        self.picker.set_consecutive_onset_threshold(hops);
    }

    /// Masking duration after an onset, in milliseconds.
    pub fn set_masking_window(&mut self, ms: f32) {
        let ms = sanitize_ms(ms, DEFAULT_MASKING_MS, "masking window");
        self.config.masking_ms = ms;
        self.picker.set_mask_threshold(self.config.ms_to_hops(ms));
    }

    /// Masking duration after an onset, in hops. Replaced on the next
    /// `configure`.
    pub fn set_masking_hops(&mut self, hops: u32) {
        self.picker.set_mask_threshold(hops);
    }

    /// Per-hop decay of the masking level, in `[0, 1)`.
    pub fn set_masking_decay(&mut self, decay: f32) {
        let decay = sanitize_masking_decay(decay);
        self.config.masking_decay = decay;
        self.picker.set_mask_decay(decay);
    }

    /// Forgets every flux value seen so far.
    pub fn reset_running_mean(&mut self) {
        self.threshold.reset_running_mean();
    }

    /// Clears filter history, window contents, Bark history, peak picker and
    /// running mean. Settings are kept.
    pub fn reset(&mut self) {
        self.window.reset();
        self.bins.reset();
        self.band_flux = [0.0; NUM_BARK_BANDS];
        self.picker.reset();
        self.threshold.reset_running_mean();
        self.last_flux = None;
        self.hops_processed = 0;
        self.samples_processed = 0;
        self.peak_hop_index = 0;
        self.peak_sample_position = 0;
    }

    /// Peak-picker flag as an integer: `0` Idle, `1` Candidate.
    pub fn diagnostic_state(&self) -> i32 {
        self.picker.flag().as_int()
    }

    pub fn peak_flag(&self) -> PeakFlag {
        self.picker.flag()
    }

    pub fn peak_picker(&self) -> &PeakPicker {
        &self.picker
    }

    pub fn running_mean(&self) -> f32 {
        self.threshold.running_mean()
    }

    /// Flux values folded into the running mean.
    pub fn num_values(&self) -> u64 {
        self.threshold.num_values()
    }

    pub fn is_automatic(&self) -> bool {
        self.threshold.is_automatic()
    }

    pub fn upper_threshold(&self) -> f32 {
        self.threshold.upper_threshold()
    }

    pub fn lower_threshold(&self) -> f32 {
        self.threshold.lower_threshold()
    }

    /// Flux of the most recent hop; `None` before the first differenced hop.
    pub fn last_flux(&self) -> Option<f32> {
        self.last_flux
    }

    /// Band energies of the most recent hop.
    pub fn bark_bins(&self) -> &[f32; NUM_BARK_BANDS] {
        self.bins.previous()
    }

    /// Per-band share of the most recent flux value.
    pub fn band_flux(&self) -> &[f32; NUM_BARK_BANDS] {
        &self.band_flux
    }

    /// Active, sanitized configuration.
    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Length of the analysis frame in samples.
    pub fn latency_samples(&self) -> usize {
        self.config.window_size
    }

    /// Hops analyzed since construction or the last reset, bootstrap included.
    pub fn hops_processed(&self) -> u64 {
        self.hops_processed
    }

    pub fn samples_processed(&self) -> u64 {
        self.samples_processed
    }
}
