//! Session configuration
//!
//! Averaging trades conversion latency for noise: the device averages 32 to 256
//! internal samples per output sample, and the driver sleeps for the worst-case
//! conversion time of the selected level before reading a single-shot result.
//!
//! Delay and averaging are programmed into the device during the reset sequence,
//! so changing them on an enabled session toggles it off and on again.

use crate::Error;
use crate::convert::MountPosition;

/// Default sampling delay in milliseconds
pub const DEFAULT_DELAY_MS: u32 = 50;

/// Default time the coil stays flagged before it is re-initialized
pub const DEFAULT_COIL_TIMEOUT_MS: u32 = 1000;

/// Default per-axis drift limit against the post-coil baseline (raw units)
pub const DEFAULT_DRIFT_THRESHOLD: u16 = 1500;

/// Longest programmable interval in microseconds (255 steps of 6.15 ms)
const MAX_INTERVAL_US: u32 = 1_568_250;

/// Length of one interval step in microseconds
const INTERVAL_STEP_US: u32 = 6150;

/// Number of internal samples averaged per output sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Averaging {
    /// 32 samples (2 ms worst-case conversion)
    #[default]
    Samples32 = 0,
    /// 64 samples (4 ms)
    Samples64 = 1,
    /// 128 samples (8 ms)
    Samples128 = 2,
    /// 256 samples (16 ms)
    Samples256 = 3,
}

impl Averaging {
    /// Worst-case conversion time in microseconds
    #[must_use]
    pub const fn measure_time_us(self) -> u32 {
        match self {
            Self::Samples32 => 2000,
            Self::Samples64 => 4000,
            Self::Samples128 => 8000,
            Self::Samples256 => 16000,
        }
    }

    /// Number of averaged samples
    #[must_use]
    pub const fn samples(self) -> u16 {
        32 << (self as u16)
    }

    /// Level index as written to the `AVRR` register
    #[must_use]
    pub const fn level(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for Averaging {
    type Error = Error<()>;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Samples32),
            1 => Ok(Self::Samples64),
            2 => Ok(Self::Samples128),
            3 => Ok(Self::Samples256),
            _ => Err(Error::InvalidArgument),
        }
    }
}

/// Magnetometer session configuration
///
/// `init()` resets the session to these values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MagConfig {
    /// Sampling delay in milliseconds
    pub delay_ms: u32,
    /// Averaging level
    pub averaging: Averaging,
    /// Mounting position
    pub position: MountPosition,
    /// Time an invalid field must persist before the coil is re-initialized
    pub coil_timeout_ms: u32,
    /// Per-axis drift limit against the post-coil baseline (raw units)
    pub drift_threshold: u16,
}

impl Default for MagConfig {
    fn default() -> Self {
        Self {
            delay_ms: DEFAULT_DELAY_MS,
            averaging: Averaging::Samples32,
            position: MountPosition::P2,
            coil_timeout_ms: DEFAULT_COIL_TIMEOUT_MS,
            drift_threshold: DEFAULT_DRIFT_THRESHOLD,
        }
    }
}

/// Compute the `INTRVLR` value for a sampling delay
///
/// The continuous-mode period is the conversion time plus `value * 6.15 ms`.
/// Delays beyond the longest programmable interval are clamped; the register
/// never goes below 1.
#[must_use]
pub fn interval_register(delay_ms: u32, averaging: Averaging) -> u8 {
    let measure_us = averaging.measure_time_us();
    let period_us = if (MAX_INTERVAL_US + measure_us) / 1000 < delay_ms {
        MAX_INTERVAL_US + measure_us
    } else {
        delay_ms * 1000
    };

    let steps = period_us.saturating_sub(measure_us) / INTERVAL_STEP_US;
    if steps == 0 {
        1
    } else {
        u8::try_from(steps).unwrap_or(u8::MAX)
    }
}
