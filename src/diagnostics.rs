//! Self-test and extension commands

use crate::calibration::Coefficients;
use crate::config::Averaging;
use crate::sample::CENTER;

/// Reference core voltage in millivolts
pub const VCORE: i32 = 1800;

/// `dir` value of a self-test result; the direction is not computed
pub const DIRECTION_NOT_COMPUTED: i8 = 99;

/// Result of [`Yas537Driver::self_test`](crate::Yas537Driver::self_test)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SelfTestResult {
    /// Device ID read during `init()`
    pub id: u8,
    /// Direction (always [`DIRECTION_NOT_COMPUTED`])
    pub dir: i8,
    /// X sensitivity
    pub sx: i32,
    /// Y sensitivity
    pub sy: i32,
    /// Field vector in the device frame, in thousandths of the measurement scale
    pub xyz: [i32; 3],
}

/// Extension command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ExtCommand {
    /// Identity and sensitivity check
    SelfTest,
    /// Raw deviation of one live sample
    SelfTestNoise,
    /// Last raw `[x, y1, y2, t]`
    GetLastRawData,
    /// Current averaging level
    GetAverageSample,
    /// Change the averaging level (0..=3)
    SetAverageSample(u8),
    /// Hardware offset snapshot from the calibration block
    GetHardwareOffset,
}

/// Response to an [`ExtCommand`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ExtResponse {
    /// Self-test passed
    SelfTest(SelfTestResult),
    /// Raw deviations from center
    Noise([i32; 3]),
    /// Last raw `[x, y1, y2, t]`
    LastRawData([u16; 4]),
    /// Current averaging level
    AverageSample(Averaging),
    /// Command applied
    Done,
    /// Hardware offset snapshot
    HardwareOffset([i8; 3]),
}

/// Sensitivity from two raw samples taken with opposite forced coil polarity
///
/// `plus` and `minus` are the pre-correction `[x, y1, y2]` channels. Returns
/// `(sx, sy)`.
// Inputs are 16-bit and coefficients at most 9 bits, so the scaled results fit i32
#[allow(clippy::cast_possible_truncation)]
#[must_use]
pub fn sensitivity(c: &Coefficients, plus: &[u16; 3], minus: &[u16; 3]) -> (i32, i32) {
    let d = core::array::from_fn::<i64, 3, _>(|i| i64::from(plus[i]) - i64::from(minus[i]));
    let k = i64::from(c.k);
    let vcore = i64::from(VCORE);

    let sx = k * 128 * d[0] / 8192 * 300 / vcore;
    let sy = k * (i64::from(c.a5) * d[1] - i64::from(c.a9) * d[2]) / 8192 * 1732 / vcore / 10;
    (sx as i32, sy as i32)
}

/// Raw deviation from center of a cached `[x, y1, y2, t]` sample
#[must_use]
pub fn noise_deviation(raw: &[u16; 4]) -> [i32; 3] {
    let [x, y1, y2, _] = raw.map(i32::from);
    [x - CENTER, y1 - y2, 2 * CENTER - y1 - y2]
}
