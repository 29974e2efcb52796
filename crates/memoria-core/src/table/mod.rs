//! Gate level → visitor/drop probability tables.
//!
//! Each level row holds percentage weights for 2, 3, 4 and 5 outcomes. Up to
//! level 30 the weight of the smallest outcome drains into the upper two; past
//! level 30 the 3-outcome weight drains into the 5-outcome weight.

mod distribution;

pub use distribution::{DropDistribution, DropOutcome, PROBABILITY_TOLERANCE};

use crate::model::{GateLevel, ParamError};

pub const OUTCOMES: [u32; 4] = [2, 3, 4, 5];
pub const LEVEL_COUNT: usize = GateLevel::MAX as usize;
/// Extra drops credited to every attempt while an invite is active.
pub const INVITE_BONUS_DROPS: u32 = 1;

const PIVOT_LEVEL: u32 = 30;
const WEIGHT_SCALE: f64 = 100.0;

/// Percentage weights per level, indexed by [`GateLevel::index`].
pub const SCHEDULE: [[u32; 4]; LEVEL_COUNT] = build_schedule();

const fn build_schedule() -> [[u32; 4]; LEVEL_COUNT] {
    let mut rows = [[0u32; 4]; LEVEL_COUNT];
    let mut idx = 0;
    while idx < LEVEL_COUNT {
        let lv = idx as u32 + 1;
        rows[idx] = if lv <= PIVOT_LEVEL {
            [60 - 2 * lv, 30, 10 + lv, lv]
        } else {
            let d = lv - PIVOT_LEVEL;
            [0, 30 - d, 40, 30 + d]
        };
        idx += 1;
    }
    rows
}

pub fn weights(level: GateLevel) -> [u32; 4] {
    SCHEDULE[level.index()]
}

/// Base distribution for a level, before any invite bonus.
pub fn base_table(level: GateLevel) -> DropDistribution {
    let outcomes = OUTCOMES
        .iter()
        .zip(weights(level))
        .map(|(&drops, weight)| DropOutcome {
            drops,
            probability: f64::from(weight) / WEIGHT_SCALE,
        })
        .collect();
    DropDistribution::from_outcomes(outcomes)
}

/// Shift every outcome up by [`INVITE_BONUS_DROPS`], keeping its probability.
pub fn apply_invite(table: &DropDistribution) -> DropDistribution {
    let outcomes = table
        .outcomes()
        .iter()
        .map(|outcome| DropOutcome {
            drops: outcome.drops + INVITE_BONUS_DROPS,
            probability: outcome.probability,
        })
        .collect();
    DropDistribution::from_outcomes(outcomes)
}

pub fn build_table(level: GateLevel, invited: bool) -> DropDistribution {
    let base = base_table(level);
    if invited { apply_invite(&base) } else { base }
}

pub fn try_build_table(level: i64, invited: bool) -> Result<DropDistribution, ParamError> {
    Ok(build_table(GateLevel::new(level)?, invited))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn level(value: i64) -> GateLevel {
        GateLevel::new(value).unwrap()
    }

    #[test]
    fn every_row_sums_to_one_hundred() {
        for (idx, row) in SCHEDULE.iter().enumerate() {
            assert_eq!(row.iter().sum::<u32>(), 100, "level {}", idx + 1);
        }
    }

    #[test]
    fn known_rows_match_reference_values() {
        assert_eq!(weights(level(1)), [58, 30, 11, 1]);
        assert_eq!(weights(level(10)), [40, 30, 20, 10]);
        assert_eq!(weights(level(30)), [0, 30, 40, 30]);
        assert_eq!(weights(level(32)), [0, 28, 40, 32]);
        assert_eq!(weights(level(40)), [0, 20, 40, 40]);
    }

    #[test]
    fn invite_shifts_support_and_keeps_mass() {
        let base = base_table(level(10));
        let invited = apply_invite(&base);
        assert_eq!(invited.probability_of(3), base.probability_of(2));
        assert_eq!(invited.probability_of(6), base.probability_of(5));
        assert!((invited.mean() - base.mean() - 1.0).abs() < 1e-12);
        assert!((invited.variance() - base.variance()).abs() < 1e-12);
    }

    #[test]
    fn try_build_table_rejects_out_of_range() {
        assert_eq!(try_build_table(0, false), Err(ParamError::InvalidLevel(0)));
        assert_eq!(try_build_table(41, true), Err(ParamError::InvalidLevel(41)));
        assert!(try_build_table(40, true).is_ok());
    }
}
