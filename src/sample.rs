//! Raw samples and the correction transform
//!
//! A measurement result is eight bytes read from `DATAR`:
//!
//! | Byte | Content                                  |
//! |------|------------------------------------------|
//! | 0-1  | Temperature (big-endian)                 |
//! | 2    | bit 7 busy, bit 6 bad, bits 5..0 X high  |
//! | 3    | X low                                    |
//! | 4-5  | Y1 (big-endian)                          |
//! | 6-7  | Y2 (big-endian)                          |
//!
//! Magnetic channels are 14-bit unsigned words centred on 8192. `0` means the
//! channel underflowed and `16383` that it overflowed.

use crate::calibration::{Coefficients, CorrectionModel};
use crate::registers::DATAR_LEN;

/// Midpoint of the 14-bit magnetic range
pub const CENTER: i32 = 8192;

/// Underflow marker value
pub const DATA_UNDERFLOW: u16 = 0;

/// Overflow marker value (and saturation limit)
pub const DATA_OVERFLOW: u16 = 16383;

/// One measurement result as read from the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawSample {
    /// Temperature word
    pub t: u16,
    /// Magnetic channels `[x, y1, y2]`
    pub xy1y2: [u16; 3],
    /// The device is still converting
    pub busy: bool,
    /// The device flagged the data as invalid
    pub bad: bool,
}

impl RawSample {
    /// Parse the eight `DATAR` bytes
    #[must_use]
    pub const fn from_bytes(data: [u8; DATAR_LEN]) -> Self {
        Self {
            t: u16::from_be_bytes([data[0], data[1]]),
            xy1y2: [
                u16::from_be_bytes([data[2] & 0x3F, data[3]]),
                u16::from_be_bytes([data[4], data[5]]),
                u16::from_be_bytes([data[6], data[7]]),
            ],
            busy: data[2] & 0x80 != 0,
            bad: data[2] & 0x40 != 0,
        }
    }

    /// Channels and temperature as cached for diagnostics: `[x, y1, y2, t]`
    #[must_use]
    pub const fn raw_data(&self) -> [u16; 4] {
        [self.xy1y2[0], self.xy1y2[1], self.xy1y2[2], self.t]
    }
}

/// Per-channel overflow/underflow flags
///
/// Bit layout: channel 0 overflow, channel 0 underflow, channel 1 overflow,
/// channel 1 underflow, channel 2 overflow, channel 2 underflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OverflowMask(u8);

impl OverflowMask {
    /// Overflow bits of all channels
    pub const OVERFLOW: u8 = 0b01_0101;
    /// Underflow bits of all channels
    pub const UNDERFLOW: u8 = 0b10_1010;

    /// Derive the flags from (corrected) channel values
    #[must_use]
    pub fn from_channels(xy1y2: &[u16; 3]) -> Self {
        let mut bits = 0;
        for (i, &value) in xy1y2.iter().enumerate() {
            if value >= DATA_OVERFLOW {
                bits |= 1 << (i * 2);
            }
            if value == DATA_UNDERFLOW {
                bits |= 1 << (i * 2 + 1);
            }
        }
        Self(bits)
    }

    /// Build a mask from its raw bits (upper bits are dropped)
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & (Self::OVERFLOW | Self::UNDERFLOW))
    }

    /// Raw bits
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// No flag set
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Channel `axis` overflowed
    #[must_use]
    pub const fn overflow(self, axis: usize) -> bool {
        self.0 & (1 << (axis * 2)) != 0
    }

    /// Channel `axis` underflowed
    #[must_use]
    pub const fn underflow(self, axis: usize) -> bool {
        self.0 & (1 << (axis * 2 + 1)) != 0
    }

    /// Any channel overflowed
    #[must_use]
    pub const fn any_overflow(self) -> bool {
        self.0 & Self::OVERFLOW != 0
    }

    /// Any channel underflowed
    #[must_use]
    pub const fn any_underflow(self) -> bool {
        self.0 & Self::UNDERFLOW != 0
    }
}

impl core::ops::BitOr for OverflowMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl CorrectionModel {
    /// Apply the correction to the three magnetic channels
    ///
    /// The identity model returns its input. The linear model recentres every
    /// channel, applies the coefficient matrix scaled by `k / 8192` (integer
    /// division truncating toward zero), saturates to `[-8192, 8191]` and shifts
    /// back, so the result always lies in `[0, 16383]`.
    #[must_use]
    pub fn apply(&self, xy1y2: [u16; 3]) -> [u16; 3] {
        match self {
            Self::Identity => xy1y2,
            Self::Linear(c) => correct(c, xy1y2),
        }
    }
}

// Results are clamped to [0, 16383] before the cast
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn correct(c: &Coefficients, xy1y2: [u16; 3]) -> [u16; 3] {
    // Y words are 16 bits on the wire, so widen before the products
    let s = xy1y2.map(|v| i64::from(v) - i64::from(CENTER));
    let k = i64::from(c.k);
    let a = |v: i8| i64::from(v);

    let h = [
        k * (128 * s[0] + a(c.a2) * s[1] + a(c.a3) * s[2]) / 8192,
        k * (a(c.a4) * s[0] + i64::from(c.a5) * s[1] + a(c.a6) * s[2]) / 8192,
        k * (a(c.a7) * s[0] + a(c.a8) * s[1] + i64::from(c.a9) * s[2]) / 8192,
    ];

    let lo = i64::from(-CENTER);
    let hi = i64::from(CENTER - 1);
    h.map(|v| (v.clamp(lo, hi) + i64::from(CENTER)) as u16)
}
