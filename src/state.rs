//! Coil re-initialization state machine
//!
//! Strong fields can leave the sensor magnetized. After an overflow, or when the
//! field drifts too far from the reading taken right after the last coil
//! initialization, the session waits for the field to settle, re-initializes the
//! coil and records a fresh baseline:
//!
//! ```text
//!            drift / overflow              timeout elapsed
//!  Normal ─────────────────────▶ InitCoil ─────────────────▶ RecordData
//!    ▲                                                          │
//!    └──────────────────── first sample without "bad" ──────────┘
//! ```
//!
//! The first good sample in `RecordData` becomes the baseline and is evaluated
//! as a `Normal` sample within the same call.

use crate::sample::OverflowMask;

/// Measurement validity state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MeasurementState {
    /// Samples are compared against the baseline
    #[default]
    Normal,
    /// Waiting for the re-initialization timeout
    InitCoil,
    /// Waiting for the first good sample after a coil initialization
    RecordData,
}

/// Outcome of one state machine step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Verdict {
    /// Sample matches the baseline
    Valid,
    /// Sample overflowed or drifted; the session moved to `InitCoil`
    Invalid,
    /// The coil was re-initialized on this sample
    CoilReinitialized,
    /// No evaluation (timeout pending, or device still flags bad data)
    Pending,
}

/// Coil re-initialization tracker
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CoilMonitor {
    state: MeasurementState,
    invalid_data: bool,
    onset_ms: u32,
    baseline: [u16; 3],
    timeout_ms: u32,
    threshold: u16,
}

impl CoilMonitor {
    /// Create a tracker in `Normal` with a zero baseline
    #[must_use]
    pub const fn new(timeout_ms: u32, threshold: u16) -> Self {
        Self {
            state: MeasurementState::Normal,
            invalid_data: false,
            onset_ms: 0,
            baseline: [0; 3],
            timeout_ms,
            threshold,
        }
    }

    /// Return to `Normal`, clear the invalid flag and the baseline
    pub fn reset(&mut self, now_ms: u32) {
        self.state = MeasurementState::Normal;
        self.invalid_data = false;
        self.onset_ms = now_ms;
        self.baseline = [0; 3];
    }

    /// Expect a new baseline (the coil was just initialized)
    pub fn rearm(&mut self) {
        self.state = MeasurementState::RecordData;
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> MeasurementState {
        self.state
    }

    /// The last evaluated sample was invalid
    #[must_use]
    pub const fn invalid_data(&self) -> bool {
        self.invalid_data
    }

    /// Time the current invalid period started (or the last coil initialization)
    #[must_use]
    pub const fn onset_ms(&self) -> u32 {
        self.onset_ms
    }

    /// Corrected sample recorded after the last coil initialization
    #[must_use]
    pub const fn baseline(&self) -> [u16; 3] {
        self.baseline
    }

    /// Process one non-busy sample
    ///
    /// `reinit` writes the coil initialization command; the state only moves to
    /// `RecordData` once it succeeded.
    ///
    /// # Errors
    ///
    /// Returns the error of `reinit`.
    pub fn process<E>(
        &mut self,
        corrected: &[u16; 3],
        bad: bool,
        overflow: OverflowMask,
        now_ms: u32,
        reinit: impl FnOnce() -> Result<(), E>,
    ) -> Result<Verdict, E> {
        loop {
            match self.state {
                MeasurementState::InitCoil => {
                    if now_ms.wrapping_sub(self.onset_ms) < self.timeout_ms {
                        return Ok(Verdict::Pending);
                    }
                    reinit()?;
                    self.onset_ms = now_ms;
                    self.state = MeasurementState::RecordData;
                    return Ok(Verdict::CoilReinitialized);
                }
                MeasurementState::RecordData => {
                    if bad {
                        return Ok(Verdict::Pending);
                    }
                    self.baseline = *corrected;
                    self.state = MeasurementState::Normal;
                }
                MeasurementState::Normal => {
                    if !overflow.is_empty() || self.drifted(corrected) {
                        if !self.invalid_data {
                            self.onset_ms = now_ms;
                        }
                        self.invalid_data = true;
                        self.state = MeasurementState::InitCoil;
                        return Ok(Verdict::Invalid);
                    }
                    self.invalid_data = false;
                    return Ok(Verdict::Valid);
                }
            }
        }
    }

    fn drifted(&self, corrected: &[u16; 3]) -> bool {
        corrected
            .iter()
            .zip(self.baseline.iter())
            .any(|(&cur, &last)| cur.abs_diff(last) > self.threshold)
    }
}
