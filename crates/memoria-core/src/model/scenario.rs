use serde::Serialize;

use super::error::ParamError;
use super::level::GateLevel;
use super::unit::UnitSize;

/// Validated (level, unit size, invite) triple shared by every model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Scenario {
    pub level: GateLevel,
    pub unit_size: UnitSize,
    pub invited: bool,
}

impl Scenario {
    pub const fn new(level: GateLevel, unit_size: UnitSize, invited: bool) -> Self {
        Self {
            level,
            unit_size,
            invited,
        }
    }

    /// Validate raw integers; the level is checked before the unit size.
    pub fn try_new(level: i64, unit_size: i64, invited: bool) -> Result<Self, ParamError> {
        let level = GateLevel::new(level)?;
        let unit_size = UnitSize::new(unit_size)?;
        Ok(Self::new(level, unit_size, invited))
    }
}

pub fn checked_days(days: i64) -> Result<u32, ParamError> {
    u32::try_from(days).map_err(|_| ParamError::InvalidDays(days))
}

pub fn checked_runs(runs: i64) -> Result<usize, ParamError> {
    usize::try_from(runs).map_err(|_| ParamError::InvalidRuns(runs))
}
