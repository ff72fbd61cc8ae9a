//! Register definitions for the YAS537
//!
//! Single-byte control registers are declared through the `device-driver` DSL.
//! Multi-byte regions (the measurement result, the calibration block) and the
//! trim, offset and clock registers written during calibration are accessed through
//! the raw interface using the address constants below.
//!
//! `OCR` (0x9E) is also the last byte of the `MTCR` bank: a version 0 calibration
//! writes it as part of the bank, a version 1 calibration programs it on its own.

/// `OXR` - X offset register, first of the three offset registers (0x84..=0x86)
pub const OXR: u8 = 0x84;

/// `MTCR` - first of the twelve trim registers (0x93..=0x9E)
pub const MTCR: u8 = 0x93;

/// `HCKR` - high clock trim
pub const HCKR: u8 = 0x88;

/// `LCKR` - low clock trim
pub const LCKR: u8 = 0x89;

/// `OCR` - offset calibration
pub const OCR: u8 = 0x9E;

/// `DATAR` - measurement result, 8 bytes
pub const DATAR: u8 = 0xB0;

/// Length of the measurement result in bytes
pub const DATAR_LEN: usize = 8;

/// `CALR` - factory calibration block, 17 bytes
pub const CALR: u8 = 0xC0;

/// Length of the calibration block in bytes
pub const CALR_LEN: usize = 17;

/// `SRSTR` value requesting a soft reset
pub const SOFT_RESET: u8 = 0x02;

/// `CONFR` value that (re)initializes the drive coil
pub const COIL_INIT: u8 = 0x08;

device_driver::create_device!(
    device_name: Yas537,
    dsl: {
        config {
            type RegisterAddressType = u8;
            type DefaultByteOrder = BE;
        }

        /// DIDR - Device ID (0x80)
        /// Expected value: 0x07
        register Didr {
            const ADDRESS = 0x80;
            const SIZE_BITS = 8;

            /// Device ID (should read 0x07)
            device_id: uint = 0..8,
        },

        /// CMDR - Measurement command (0x81)
        register Cmdr {
            const ADDRESS = 0x81;
            const SIZE_BITS = 8;

            /// Start a measurement
            start: bool = 0,
            /// Coil drive (used by the sensitivity measurement)
            ldtc: bool = 1,
            /// Forced coil polarity
            fors: bool = 2,
            reserved_4_3: uint = 3..5,
            /// Continuous measurement mode
            cont: bool = 5,
            reserved_7_6: uint = 6..8,
        },

        /// CONFR - Configuration (0x82)
        register Confr {
            const ADDRESS = 0x82;
            const SIZE_BITS = 8;

            /// Raw configuration value (0x08 initializes the coil)
            value: uint = 0..8,
        },

        /// INTRVLR - Continuous measurement interval (0x83)
        /// Interval = value * 6.15 ms after the conversion time
        register Intrvlr {
            const ADDRESS = 0x83;
            const SIZE_BITS = 8;

            /// Interval in 6.15 ms steps
            interval: uint = 0..8,
        },

        /// AVRR - Averaging (0x87)
        register Avrr {
            const ADDRESS = 0x87;
            const SIZE_BITS = 8;

            /// Averaging level (0 = 32 samples .. 3 = 256 samples)
            average: uint = 0..2,
            reserved_3_2: uint = 2..4,
            /// ADC mode, always 0b111
            adc_mode: uint = 4..7,
            reserved_7: uint = 7..8,
        },

        /// SRSTR - Soft reset (0x90)
        register Srstr {
            const ADDRESS = 0x90;
            const SIZE_BITS = 8;

            /// Raw reset command (0x02 requests a reset)
            value: uint = 0..8,
        },

        /// ADCCALR - ADC calibration, high byte (0x91)
        register Adccalr {
            const ADDRESS = 0x91;
            const SIZE_BITS = 8;

            /// ADC calibration value
            value: uint = 0..8,
        },

        /// ADCCALR+1 - ADC calibration, low byte (0x92)
        register AdccalrLow {
            const ADDRESS = 0x92;
            const SIZE_BITS = 8;

            /// ADC calibration value
            value: uint = 0..8,
        },

        /// TRMR - Trim enable (0x9F)
        register Trmr {
            const ADDRESS = 0x9F;
            const SIZE_BITS = 8;

            /// Raw trim value (0xFF after calibration)
            value: uint = 0..8,
        }
    }
);

pub use Yas537 as RegisterDevice;
