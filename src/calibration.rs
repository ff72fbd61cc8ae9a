//! Factory calibration decoding
//!
//! The YAS537 stores a 17-byte calibration block at `CALR`. The version tag sits in
//! the top two bits of the last byte:
//!
//! - **Version 0**: no linear correction. The block is copied verbatim into the
//!   trim (`MTCR`), offset (`OXR`..) and clock trim registers.
//! - **Version 1**: bytes 3..=11 pack nine signed correction coefficients into
//!   overlapping bit fields; only part of the block is written back, with the clock
//!   and offset-calibration registers derived from bytes 15 and 16.
//!
//! Decoding is pure: it yields the correction model, the hardware offset snapshot
//! and the ordered list of register writes. The driver issues the writes.

use crate::Error;
use crate::registers::{CALR_LEN, HCKR, LCKR, MTCR, OCR, OXR};

/// Largest trim program (version 0 writes every byte of the block)
pub const MAX_TRIM_WRITES: usize = CALR_LEN;

/// A single register write issued while applying a calibration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RegisterWrite {
    /// Register address
    pub address: u8,
    /// Value to write
    pub value: u8,
}

/// Linear correction coefficients (calibration version 1)
///
/// The first row of the correction matrix is fixed at 128; the remaining eight
/// entries and the gain `k` come from the calibration block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Coefficients {
    /// Row 0, y1 term (7-bit field, bias 64)
    pub a2: i8,
    /// Row 0, y2 term (7-bit field, bias 64)
    pub a3: i8,
    /// Row 1, x term (8-bit field, bias 128)
    pub a4: i8,
    /// Row 1, y1 term (9-bit field, bias 112)
    pub a5: i16,
    /// Row 1, y2 term (7-bit field, bias 64)
    pub a6: i8,
    /// Row 2, x term (8-bit field, bias 128)
    pub a7: i8,
    /// Row 2, y1 term (7-bit field, bias 64)
    pub a8: i8,
    /// Row 2, y2 term (9-bit field, bias 112)
    pub a9: i16,
    /// Gain (7 bits)
    pub k: u8,
}

impl Coefficients {
    /// Extract the coefficients from a version 1 calibration block
    // Every field is at most 9 bits wide, so the narrowing casts are lossless
    #[allow(clippy::cast_possible_truncation)]
    #[must_use]
    pub fn from_block(b: &[u8; CALR_LEN]) -> Self {
        let byte = |i: usize| i32::from(b[i]);

        let a2 = (((byte(3) << 2) & 0x7C) | (byte(4) >> 6)) - 64;
        let a3 = (((byte(4) << 1) & 0x7E) | (byte(5) >> 7)) - 64;
        let a4 = (((byte(5) << 1) & 0xFE) | (byte(6) >> 7)) - 128;
        let a5 = (((byte(6) << 2) & 0x1FC) | (byte(7) >> 6)) - 112;
        let a6 = (((byte(7) << 1) & 0x7E) | (byte(8) >> 7)) - 64;
        let a7 = (((byte(8) << 1) & 0xFE) | (byte(9) >> 7)) - 128;
        let a8 = (byte(9) & 0x7F) - 64;
        let a9 = (((byte(10) << 1) & 0x1FE) | (byte(11) >> 7)) - 112;

        Self {
            a2: a2 as i8,
            a3: a3 as i8,
            a4: a4 as i8,
            a5: a5 as i16,
            a6: a6 as i8,
            a7: a7 as i8,
            a8: a8 as i8,
            a9: a9 as i16,
            k: b[11] & 0x7F,
        }
    }
}

/// Correction model selected by the calibration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CorrectionModel {
    /// Version 0: samples pass through unchanged
    #[default]
    Identity,
    /// Version 1: fixed-point linear correction
    Linear(Coefficients),
}

impl CorrectionModel {
    /// Calibration version tag of this model
    #[must_use]
    pub const fn version(&self) -> u8 {
        match self {
            Self::Identity => 0,
            Self::Linear(_) => 1,
        }
    }

    /// Linear coefficients, if any
    #[must_use]
    pub const fn coefficients(&self) -> Option<&Coefficients> {
        match self {
            Self::Identity => None,
            Self::Linear(c) => Some(c),
        }
    }
}

/// Decoded calibration block
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Calibration {
    /// Correction applied to every sample
    pub model: CorrectionModel,
    /// Hardware offset snapshot (bytes 12..15, informational)
    pub hard_offset: [i8; 3],
    /// Register writes that program the device with this calibration, in order
    pub trim: heapless::Vec<RegisterWrite, MAX_TRIM_WRITES>,
}

impl Calibration {
    /// Decode a raw calibration block
    ///
    /// # Errors
    ///
    /// Returns `CalibrationInvalid` if the block is blank (no bit set in bytes
    /// 0..16 nor in the low 6 bits of byte 16) or carries a version other than
    /// 0 or 1.
    pub fn decode(block: &[u8; CALR_LEN]) -> Result<Self, Error<()>> {
        let version = block[16] >> 6;

        let blank = block[..16].iter().all(|&b| b == 0) && block[16] & 0x3F == 0;
        if blank {
            return Err(Error::CalibrationInvalid);
        }

        let hard_offset = [
            i8::from_ne_bytes([block[12]]),
            i8::from_ne_bytes([block[13]]),
            i8::from_ne_bytes([block[14]]),
        ];

        let mut trim = heapless::Vec::new();
        let model = match version {
            0 => {
                for (i, &value) in block.iter().enumerate() {
                    // Indices are bounded by CALR_LEN
                    #[allow(clippy::cast_possible_truncation)]
                    let i = i as u8;
                    let address = match i {
                        0..12 => MTCR + i,
                        12..15 => OXR + i - 12,
                        // Bytes 15 and 16 land on HCKR/LCKR
                        _ => OXR + i - 11,
                    };
                    push(&mut trim, address, value)?;
                }
                CorrectionModel::Identity
            }
            1 => {
                for i in 0..3u8 {
                    push(&mut trim, MTCR + i, block[usize::from(i)])?;
                    push(&mut trim, OXR + i, block[usize::from(i) + 12])?;
                }
                push(&mut trim, MTCR + 3, (block[3] & 0xE0) | 0x10)?;
                push(&mut trim, HCKR, (block[15] >> 3) & 0x1E)?;
                push(&mut trim, LCKR, (block[15] << 1) & 0x1E)?;
                push(&mut trim, OCR, block[16] & 0x3F)?;
                CorrectionModel::Linear(Coefficients::from_block(block))
            }
            _ => return Err(Error::CalibrationInvalid),
        };

        Ok(Self {
            model,
            hard_offset,
            trim,
        })
    }
}

fn push(
    trim: &mut heapless::Vec<RegisterWrite, MAX_TRIM_WRITES>,
    address: u8,
    value: u8,
) -> Result<(), Error<()>> {
    trim.push(RegisterWrite { address, value })
        .map_err(|_| Error::CalibrationInvalid)
}
