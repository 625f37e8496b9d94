//! Percentage to fan speed quantization
//!
//! Home Assistant drives fans with a 0-100 percentage. The fixture has six
//! speeds (1 fastest, 6 slowest) plus stop. The percentage is snapped to the
//! nearest of seven evenly spaced levels, `level = round((100 - p) / 100 * 6)`,
//! where level 6 means OFF and level `l < 6` is `speed{l+1}`.
//!
//! Rounding is round-half-to-even and computed in integers, so the two exact
//! ties (25% and 75%) land on levels 4 and 2.

use std::fmt;

use crate::command::FanCommand;

/// Number of discrete levels above OFF
const LEVELS: u32 = 6;

/// Quantized fan speed, 0 (fastest) through 6 (off)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpeedLevel(u8);

impl SpeedLevel {
    /// The OFF sentinel
    pub const OFF: SpeedLevel = SpeedLevel(6);

    /// Fastest speed
    pub const MAX: SpeedLevel = SpeedLevel(0);

    /// Create a level, or None if above 6
    pub fn new(level: u8) -> Option<Self> {
        (u32::from(level) <= LEVELS).then_some(Self(level))
    }

    /// Raw level value
    pub fn value(&self) -> u8 {
        self.0
    }

    /// Returns true for the OFF sentinel
    pub fn is_off(&self) -> bool {
        *self == Self::OFF
    }

    /// Snap a percentage to a level
    ///
    /// Percentages above 100 are treated as 100.
    pub fn from_percentage(percentage: u8) -> Self {
        let p = u32::from(percentage.min(100));
        let scaled = (100 - p) * LEVELS;
        let (quotient, remainder) = (scaled / 100, scaled % 100);

        let level = match remainder {
            r if r > 50 => quotient + 1,
            50 if quotient % 2 == 1 => quotient + 1,
            _ => quotient,
        };
        // level <= 6 because scaled <= 600
        Self(level.min(LEVELS) as u8)
    }

    /// Snap a signed percentage to a level, clamping to 0..=100 first
    pub fn from_percentage_clamped(percentage: i64) -> Self {
        Self::from_percentage(percentage.clamp(0, 100) as u8)
    }

    /// Canonical percentage reported for this level
    ///
    /// `round(100 - level * 100 / 6)`, with OFF reporting 0.
    pub fn to_percentage(&self) -> u8 {
        if self.is_off() {
            return 0;
        }
        // 100 - l*100/6 == (600 - 100*l) / 6; never a tie for l in 0..6
        let numerator = 600 - 100 * u32::from(self.0);
        ((numerator + LEVELS / 2) / LEVELS) as u8
    }

    /// Command that puts the fan at this level
    pub fn command(&self) -> FanCommand {
        FanCommand::speed(self.0 + 1).unwrap_or(FanCommand::Stop)
    }
}

impl fmt::Display for SpeedLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_off() {
            f.write_str("off")
        } else {
            write!(f, "speed{}", self.0 + 1)
        }
    }
}
