//! Coordinate conversion
//!
//! Corrected channel words become a three-axis vector in the device's native
//! scale, are rotated into the host frame according to the mounting position and
//! truncated to a multiple of 10. Per-axis validity is kept next to the value;
//! [`Measurement::packed`] folds it back into the low decimal digit for consumers
//! that expect the register-protocol layout.

use crate::Error;
use crate::sample::{CENTER, OverflowMask};

/// Scale of the x axis and of the z axis (per LSB)
const AXIS_SCALE: i32 = 300;

/// Scale of the y axis, `sqrt(3) * 1000`, divided by 10 after the product
const Y_SCALE: i32 = 1732;

/// Rotation/sign matrices, row-major, indexed by mounting position
const TRANSFORMATION: [[[i8; 3]; 3]; 8] = [
    [[-1, 0, 0], [0, -1, 0], [0, 0, 1]],
    [[0, -1, 0], [1, 0, 0], [0, 0, 1]],
    [[1, 0, 0], [0, 1, 0], [0, 0, 1]],
    [[0, 1, 0], [-1, 0, 0], [0, 0, 1]],
    [[1, 0, 0], [0, -1, 0], [0, 0, -1]],
    [[0, 1, 0], [1, 0, 0], [0, 0, -1]],
    [[-1, 0, 0], [0, 1, 0], [0, 0, -1]],
    [[0, -1, 0], [-1, 0, 0], [0, 0, -1]],
];

/// Mounting position of the sensor package relative to the host frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MountPosition {
    /// Rotated 180° around z
    P0 = 0,
    /// Rotated 90° around z
    P1 = 1,
    /// Identity (no transform)
    #[default]
    P2 = 2,
    /// Rotated 270° around z
    P3 = 3,
    /// Upside down, x kept
    P4 = 4,
    /// Upside down, x and y swapped
    P5 = 5,
    /// Upside down, y kept
    P6 = 6,
    /// Upside down, x and y swapped and negated
    P7 = 7,
}

impl MountPosition {
    /// Position index (0..=7)
    #[must_use]
    pub const fn index(self) -> u8 {
        self as u8
    }

    /// Transformation matrix, `None` for the identity position
    #[must_use]
    pub const fn transform(self) -> Option<&'static [[i8; 3]; 3]> {
        match self {
            Self::P2 => None,
            _ => Some(&TRANSFORMATION[self as usize]),
        }
    }

    /// Rotate a vector into the host frame
    #[must_use]
    pub fn apply(self, xyz: [i32; 3]) -> [i32; 3] {
        let Some(m) = self.transform() else {
            return xyz;
        };
        m.map(|row| {
            row.iter()
                .zip(xyz.iter())
                .map(|(&a, &v)| i32::from(a) * v)
                .sum::<i32>()
        })
    }
}

impl TryFrom<u8> for MountPosition {
    type Error = Error<()>;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::P0),
            1 => Ok(Self::P1),
            2 => Ok(Self::P2),
            3 => Ok(Self::P3),
            4 => Ok(Self::P4),
            5 => Ok(Self::P5),
            6 => Ok(Self::P6),
            7 => Ok(Self::P7),
            _ => Err(Error::InvalidArgument),
        }
    }
}

/// Convert `[x, y1, y2]` channel words to the device-frame vector
///
/// The two Y elements sit 120° apart; their difference and sum rebuild the
/// orthogonal y and z axes.
#[must_use]
pub fn to_physical(xy1y2: [u16; 3]) -> [i32; 3] {
    let [x, y1, y2] = xy1y2.map(i32::from);
    [
        (x - CENTER) * AXIS_SCALE,
        (y1 - y2) * Y_SCALE / 10,
        (2 * CENTER - y1 - y2) * AXIS_SCALE,
    ]
}

/// Drop the low decimal digit (truncating toward zero)
#[must_use]
pub const fn quantize(value: i32) -> i32 {
    value - value % 10
}

/// Validity of one output axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AxisStatus {
    /// Good sample
    #[default]
    Valid,
    /// The matching raw channel saturated high
    Overflow,
    /// The matching raw channel saturated low
    Underflow,
    /// Field drifted from the post-coil baseline; the coil is due for re-initialization
    InvalidField,
}

impl AxisStatus {
    /// Low-digit code used by the packed form
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::Valid => 0,
            Self::Overflow => 1,
            Self::Underflow => 2,
            Self::InvalidField => 3,
        }
    }
}

/// One converted magnetometer reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Measurement {
    /// Field vector in the host frame, truncated to a multiple of 10
    pub xyz: [i32; 3],
    /// Per-axis validity
    pub status: [AxisStatus; 3],
    /// Raw channel flags after correction
    pub overflow: OverflowMask,
    /// Sample time, when the time source is a real clock
    pub timestamp_ms: Option<u32>,
}

impl Measurement {
    /// Build a reading from corrected channel words
    ///
    /// Flags of raw channel `i` land on output axis `i` regardless of the
    /// mounting transform.
    #[must_use]
    pub fn from_corrected(xy1y2: [u16; 3], overflow: OverflowMask, position: MountPosition) -> Self {
        let xyz = position.apply(to_physical(xy1y2)).map(quantize);
        let status = core::array::from_fn(|axis| {
            if overflow.overflow(axis) {
                AxisStatus::Overflow
            } else if overflow.underflow(axis) {
                AxisStatus::Underflow
            } else {
                AxisStatus::Valid
            }
        });

        Self {
            xyz,
            status,
            overflow,
            timestamp_ms: None,
        }
    }

    /// Flag every axis as drifted
    ///
    /// Only applies to readings without raw overflow; saturated axes keep their
    /// overflow status.
    pub fn mark_invalid_field(&mut self) {
        if self.overflow.is_empty() {
            self.status = [AxisStatus::InvalidField; 3];
        }
    }

    /// Every axis is valid
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.status.iter().all(|&s| s == AxisStatus::Valid)
    }

    /// Values with the status folded into the low decimal digit
    ///
    /// `+1` overflow, `+2` underflow, `+3` drifted field.
    #[must_use]
    pub fn packed(&self) -> [i32; 3] {
        core::array::from_fn(|i| self.xyz[i] + self.status[i].code())
    }

    /// Euclidean norm of the field vector
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn magnitude(&self) -> f32 {
        let [x, y, z] = self.xyz.map(|v| v as f32);
        libm::sqrtf(x * x + y * y + z * z)
    }
}
