#![no_std]
#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

pub mod calibration;
pub mod clock;
pub mod config;
pub mod convert;
pub mod device;
pub mod diagnostics;
pub mod interface;
pub mod registers;
pub mod sample;
pub mod state;

// Re-export main types
pub use calibration::{Calibration, CorrectionModel, Coefficients, RegisterWrite};
pub use clock::{LogicalTime, TimeSource};
pub use config::{Averaging, MagConfig};
pub use convert::{AxisStatus, Measurement, MountPosition};
pub use device::Yas537Driver;
pub use diagnostics::{ExtCommand, ExtResponse, SelfTestResult};
pub use interface::{DeviceBus, I2cInterface};
pub use sample::{OverflowMask, RawSample};
pub use state::{CoilMonitor, MeasurementState, Verdict};

/// YAS537 7-bit I2C address
pub const I2C_ADDRESS: u8 = 0x2E;

/// Expected value of the device ID register (`DIDR`)
pub const DEVICE_ID: u8 = 0x07;

/// Driver errors
#[derive(Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// Communication error with the device
    Bus(E),
    /// Operation requires `init()` first
    NotInitialized,
    /// `init()` called twice without `terminate()`
    AlreadyInitialized,
    /// Argument out of range
    InvalidArgument,
    /// Device ID register mismatch (contains the actual value read)
    ChipIdMismatch(u8),
    /// Calibration block is empty or carries an unknown version
    CalibrationInvalid,
    /// The device is still converting; retry the read later
    Busy,
    /// Self-test produced an all-zero field vector
    DirectionCalcFailed,
    /// A magnetic channel saturated high
    OverflowDetected,
    /// A magnetic channel saturated low
    UnderflowDetected,
}

impl<E> From<E> for Error<E> {
    fn from(error: E) -> Self {
        Self::Bus(error)
    }
}
