//! Peak picking over the flux stream.
//!
//! A two-state automaton (`Idle`, `Candidate`) tracks the highest flux since
//! the upper threshold was crossed and confirms it as an onset once the flux
//! falls under the lower threshold or the debounce hold runs out. After each
//! onset, consecutive-onset suppression blocks new candidates for a fixed
//! number of hops and masking attenuates the flux with a decaying level.
//!
//! The transition rules live in [`next_transition`] so they can be checked
//! in isolation from the timers and the DSP path.

/// Peak-picker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PeakFlag {
    #[default]
    Idle,
    Candidate,
}

impl PeakFlag {
    /// Host-facing integer form: `0` Idle, `1` Candidate.
    pub fn as_int(self) -> i32 {
        match self {
            PeakFlag::Idle => 0,
            PeakFlag::Candidate => 1,
        }
    }
}

/// What one hop does to the automaton.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Idle and nothing crosses the upper threshold.
    Stay,
    /// `Idle -> Candidate`: flux crossed the upper threshold.
    Open,
    /// `Candidate -> Candidate`: a higher peak replaces the held one.
    Raise,
    /// `Candidate -> Idle`: the held peak is an onset.
    Confirm,
    /// `Candidate -> Candidate`: keep holding, advance the debounce counter.
    Wait,
}

/// Inputs to a single transition decision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransitionInput {
    pub flux: f32,
    pub peak_value: f32,
    pub debounce_counter: u32,
    pub debounce_threshold: u32,
    pub upper_threshold: f32,
    pub lower_threshold: f32,
    /// New candidates and peak updates are blocked.
    pub suppressed: bool,
}

/// Pure transition function of the peak picker.
pub fn next_transition(flag: PeakFlag, input: &TransitionInput) -> Transition {
    match flag {
        PeakFlag::Idle => {
            if !input.suppressed && input.flux > input.upper_threshold {
                Transition::Open
            } else {
                Transition::Stay
            }
        }
        PeakFlag::Candidate => {
            if !input.suppressed && input.flux > input.peak_value {
                Transition::Raise
            } else if input.debounce_counter > input.debounce_threshold
                || input.flux < input.lower_threshold
            {
                Transition::Confirm
            } else {
                Transition::Wait
            }
        }
    }
}

/// Peak-picker state with its debounce, suppression and masking timers.
#[derive(Debug, Clone, PartialEq)]
pub struct PeakPicker {
    flag: PeakFlag,
    debounce_counter: u32,
    debounce_threshold: u32,
    peak_value: f32,
    consecutive_onset_flag: bool,
    consecutive_onset_counter: u32,
    consecutive_onset_threshold: u32,
    mask_flag: bool,
    mask_counter: u32,
    mask_threshold: u32,
    mask_decay: f32,
    mask_level: f32,
    last_transition: Transition,
}

impl PeakPicker {
    /// Creates an idle picker.
    ///
    /// `consecutive_onset_threshold` and `mask_threshold` are in hops.
    pub fn new(
        debounce_threshold: u32,
        consecutive_onset_threshold: u32,
        mask_threshold: u32,
        mask_decay: f32,
    ) -> Self {
        Self {
            flag: PeakFlag::Idle,
            debounce_counter: 0,
            debounce_threshold,
            peak_value: 0.0,
            consecutive_onset_flag: false,
            consecutive_onset_counter: 0,
            consecutive_onset_threshold,
            mask_flag: false,
            mask_counter: 0,
            mask_threshold,
            mask_decay,
            mask_level: 0.0,
            last_transition: Transition::Stay,
        }
    }

    /// Runs one hop. Returns the confirmed peak value when an onset fires.
    pub fn step(&mut self, flux: f32, upper_threshold: f32, lower_threshold: f32) -> Option<f32> {
        let effective = self.tick_timers(flux);

        let input = TransitionInput {
            flux: effective,
            peak_value: self.peak_value,
            debounce_counter: self.debounce_counter,
            debounce_threshold: self.debounce_threshold,
            upper_threshold,
            lower_threshold,
            suppressed: self.consecutive_onset_flag,
        };
        let transition = next_transition(self.flag, &input);
        self.last_transition = transition;

        match transition {
            Transition::Stay => None,
            Transition::Open | Transition::Raise => {
                self.flag = PeakFlag::Candidate;
                self.peak_value = effective;
                self.debounce_counter = 1;
                None
            }
            Transition::Wait => {
                self.debounce_counter = self.debounce_counter.saturating_add(1);
                None
            }
            Transition::Confirm => {
                self.flag = PeakFlag::Idle;
                self.debounce_counter = 0;
                self.consecutive_onset_counter = self.consecutive_onset_threshold;
                self.mask_counter = self.mask_threshold;
                self.mask_level = 1.0;
                log::trace!("onset confirmed with peak {}", self.peak_value);
                Some(self.peak_value)
            }
        }
    }

    /// Updates both suppression timers for this hop and returns the flux as
    /// seen through the current masking level.
    fn tick_timers(&mut self, flux: f32) -> f32 {
        self.consecutive_onset_flag = self.consecutive_onset_counter > 0;
        self.consecutive_onset_counter = self.consecutive_onset_counter.saturating_sub(1);

        self.mask_flag = self.mask_counter > 0;
        self.mask_counter = self.mask_counter.saturating_sub(1);
        if self.mask_flag {
            self.mask_level *= self.mask_decay;
            flux * (1.0 - self.mask_level)
        } else {
            self.mask_level = 0.0;
            flux
        }
    }

    /// Returns to idle and clears every timer, keeping the settings.
    pub fn reset(&mut self) {
        *self = Self::new(
            self.debounce_threshold,
            self.consecutive_onset_threshold,
            self.mask_threshold,
            self.mask_decay,
        );
    }

    #[inline]
    pub fn flag(&self) -> PeakFlag {
        self.flag
    }

    #[inline]
    pub fn peak_value(&self) -> f32 {
        self.peak_value
    }

    #[inline]
    pub fn debounce_counter(&self) -> u32 {
        self.debounce_counter
    }

    #[inline]
    pub fn debounce_threshold(&self) -> u32 {
        self.debounce_threshold
    }

    pub fn set_debounce_threshold(&mut self, hops: u32) {
        self.debounce_threshold = hops;
    }

    /// True while new candidates are blocked after an onset.
    #[inline]
    pub fn is_suppressed(&self) -> bool {
        self.consecutive_onset_counter > 0
    }

    #[inline]
    pub fn consecutive_onset_threshold(&self) -> u32 {
        self.consecutive_onset_threshold
    }

    pub fn set_consecutive_onset_threshold(&mut self, hops: u32) {
        self.consecutive_onset_threshold = hops;
        self.consecutive_onset_counter = self.consecutive_onset_counter.min(hops);
    }

    /// True while the flux is attenuated after an onset.
    #[inline]
    pub fn is_masking(&self) -> bool {
        self.mask_counter > 0
    }

    #[inline]
    pub fn mask_threshold(&self) -> u32 {
        self.mask_threshold
    }

    pub fn set_mask_threshold(&mut self, hops: u32) {
        self.mask_threshold = hops;
        self.mask_counter = self.mask_counter.min(hops);
    }

    #[inline]
    pub fn mask_decay(&self) -> f32 {
        self.mask_decay
    }

    pub fn set_mask_decay(&mut self, decay: f32) {
        self.mask_decay = decay;
    }

    /// Transition taken on the most recent hop.
    #[inline]
    pub fn last_transition(&self) -> Transition {
        self.last_transition
    }
}
