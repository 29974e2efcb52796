//! Session-visit model.
//!
//! A day has [`SESSIONS_PER_DAY`] sessions. Each session draws a visitor count
//! from the level's base table and picks that many distinct members. A member
//! seen at least once that day earns one memoria. With an invite, member 0 is
//! the invited character: it always earns [`INVITED_DAILY_MEMORIA`] and takes
//! one visitor slot in every session, so the remaining slots are filled from
//! the other members only.

use rand::RngCore;
use rand::distributions::Distribution;
use rand::seq::index;
use serde::Serialize;

use crate::engine::MemoriaModel;
use crate::model::{ParamError, Scenario};
use crate::table::{DropDistribution, OUTCOMES, base_table};

pub const SESSIONS_PER_DAY: usize = 2;
pub const INVITED_DAILY_MEMORIA: u32 = 2;
pub const INVITED_MEMBER: usize = 0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PerCharacter {
    All { all: f64 },
    Invited { invited: f64, others: f64 },
}

impl PerCharacter {
    fn scaled(self, days: f64) -> Self {
        match self {
            PerCharacter::All { all } => PerCharacter::All { all: all * days },
            PerCharacter::Invited { invited, others } => PerCharacter::Invited {
                invited: invited * days,
                others: others * days,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VisitExpectation {
    pub total: f64,
    pub per_character: PerCharacter,
}

/// Outcome of one simulated day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisitDay {
    pub total: u32,
    pub per_character: Vec<u32>,
}

#[derive(Debug, Clone)]
pub struct VisitModel {
    scenario: Scenario,
    visitors: DropDistribution,
}

impl VisitModel {
    /// A unit must be able to host the largest visitor count in one session.
    pub const MIN_UNIT_SIZE: u32 = OUTCOMES[OUTCOMES.len() - 1];

    pub fn new(scenario: Scenario) -> Result<Self, ParamError> {
        let unit_size = scenario.unit_size.get();
        if unit_size < Self::MIN_UNIT_SIZE {
            return Err(ParamError::UnitTooSmall {
                unit_size,
                required: Self::MIN_UNIT_SIZE,
            });
        }
        Ok(Self {
            scenario,
            visitors: base_table(scenario.level),
        })
    }

    pub fn try_new(level: i64, unit_size: i64, invited: bool) -> Result<Self, ParamError> {
        Self::new(Scenario::try_new(level, unit_size, invited)?)
    }

    /// Probability that a given non-invited member is missed by one session.
    fn session_miss_probability(&self) -> f64 {
        let members = self.scenario.unit_size.as_f64();
        let pool = if self.scenario.invited {
            members - 1.0
        } else {
            members
        };
        self.visitors
            .outcomes()
            .iter()
            .map(|outcome| outcome.probability * (members - f64::from(outcome.drops)) / pool)
            .sum()
    }

    pub fn expectation(&self) -> VisitExpectation {
        let members = self.scenario.unit_size.as_f64();
        let visited = 1.0 - self.session_miss_probability().powi(SESSIONS_PER_DAY as i32);
        if self.scenario.invited {
            let invited = f64::from(INVITED_DAILY_MEMORIA);
            VisitExpectation {
                total: invited + (members - 1.0) * visited,
                per_character: PerCharacter::Invited {
                    invited,
                    others: visited,
                },
            }
        } else {
            VisitExpectation {
                total: members * visited,
                per_character: PerCharacter::All { all: visited },
            }
        }
    }

    pub fn expectation_after_days(&self, days: u32) -> VisitExpectation {
        let daily = self.expectation();
        let days = f64::from(days);
        VisitExpectation {
            total: daily.total * days,
            per_character: daily.per_character.scaled(days),
        }
    }

    pub fn simulate_visit_day(&self, rng: &mut dyn RngCore) -> VisitDay {
        let members = self.scenario.unit_size.get() as usize;
        let mut gains = vec![0u32; members];

        for _ in 0..SESSIONS_PER_DAY {
            let visitors = self.visitors.sample(rng) as usize;
            if self.scenario.invited {
                gains[INVITED_MEMBER] = INVITED_DAILY_MEMORIA;
                let slots = visitors.saturating_sub(1);
                for idx in index::sample(rng, members - 1, slots).iter() {
                    gains[idx + 1] = 1;
                }
            } else {
                for idx in index::sample(rng, members, visitors).iter() {
                    gains[idx] = 1;
                }
            }
        }

        VisitDay {
            total: gains.iter().sum(),
            per_character: gains,
        }
    }
}

impl MemoriaModel for VisitModel {
    fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    fn table(&self) -> &DropDistribution {
        &self.visitors
    }

    fn daily_total(&self) -> f64 {
        self.expectation().total
    }

    fn simulate_day(&self, rng: &mut dyn RngCore) -> u64 {
        u64::from(self.simulate_visit_day(rng).total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    /// Explicit double sum over both sessions' visitor counts.
    fn paired_visit_probability(model: &VisitModel) -> f64 {
        let members = model.scenario.unit_size.as_f64();
        let pool = if model.scenario.invited {
            members - 1.0
        } else {
            members
        };
        let outcomes = model.visitors.outcomes();
        let mut total = 0.0;
        for first in outcomes {
            for second in outcomes {
                let miss_first = (members - f64::from(first.drops)) / pool;
                let miss_second = (members - f64::from(second.drops)) / pool;
                total += first.probability * second.probability * (1.0 - miss_first * miss_second);
            }
        }
        total
    }

    #[test]
    fn rejects_units_smaller_than_a_full_session() {
        assert_eq!(
            VisitModel::try_new(10, 4, false).err(),
            Some(ParamError::UnitTooSmall {
                unit_size: 4,
                required: 5
            })
        );
        assert!(VisitModel::try_new(10, 5, true).is_ok());
    }

    #[test]
    fn closed_form_matches_paired_sum() {
        for invited in [false, true] {
            for level in [1, 10, 30, 32, 40] {
                let model = VisitModel::try_new(level, 6, invited).unwrap();
                let visited = match model.expectation().per_character {
                    PerCharacter::All { all } => all,
                    PerCharacter::Invited { others, .. } => others,
                };
                assert!((visited - paired_visit_probability(&model)).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn invited_character_always_earns_two() {
        let model = VisitModel::try_new(32, 6, true).unwrap();
        let mut rng = StdRng::seed_from_u64(2024);
        for _ in 0..500 {
            let day = model.simulate_visit_day(&mut rng);
            assert_eq!(day.per_character[INVITED_MEMBER], INVITED_DAILY_MEMORIA);
            assert!(day.per_character[1..].iter().all(|&gain| gain <= 1));
            assert_eq!(day.total, day.per_character.iter().sum::<u32>());
        }
    }

    #[test]
    fn daily_total_is_bounded_by_session_draws() {
        // Level 40 draws 3..=5 visitors per session.
        let model = VisitModel::try_new(40, 5, false).unwrap();
        let mut rng = StdRng::seed_from_u64(8);
        for _ in 0..200 {
            let day = model.simulate_visit_day(&mut rng);
            assert!((3..=5).contains(&day.total), "total {}", day.total);
        }
    }

    #[test]
    fn after_days_scales_breakdown() {
        let model = VisitModel::try_new(20, 7, true).unwrap();
        let daily = model.expectation();
        let month = model.expectation_after_days(30);
        assert!((month.total - daily.total * 30.0).abs() < 1e-9);
        match month.per_character {
            PerCharacter::Invited { invited, .. } => assert!((invited - 60.0).abs() < 1e-12),
            PerCharacter::All { .. } => panic!("invited breakdown expected"),
        }
    }
}
