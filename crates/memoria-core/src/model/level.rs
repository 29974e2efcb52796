use core::fmt;

use serde::Serialize;

use super::error::ParamError;

/// Gate level selecting a row of the visitor schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(into = "u8")]
pub struct GateLevel(u8);

impl GateLevel {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 40;

    pub fn new(value: i64) -> Result<Self, ParamError> {
        if (i64::from(Self::MIN)..=i64::from(Self::MAX)).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(ParamError::InvalidLevel(value))
        }
    }

    pub const fn get(self) -> u8 {
        self.0
    }

    /// Zero-based row index into the schedule.
    pub const fn index(self) -> usize {
        (self.0 - Self::MIN) as usize
    }

    pub fn all() -> impl Iterator<Item = GateLevel> {
        (Self::MIN..=Self::MAX).map(GateLevel)
    }
}

impl TryFrom<i64> for GateLevel {
    type Error = ParamError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<GateLevel> for u8 {
    fn from(level: GateLevel) -> Self {
        level.0
    }
}

impl fmt::Display for GateLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Lv{}", self.0)
    }
}
