use rand::RngCore;
use rand::distributions::Distribution;
use serde::Serialize;

use super::MemoriaModel;
use crate::model::Scenario;
use crate::table::{DropDistribution, build_table};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Expectation {
    pub total: f64,
    pub per_member: f64,
}

impl Expectation {
    pub const ZERO: Expectation = Expectation {
        total: 0.0,
        per_member: 0.0,
    };

    pub fn scaled(self, days: u32) -> Self {
        let days = f64::from(days);
        Self {
            total: self.total * days,
            per_member: self.per_member * days,
        }
    }
}

/// Every member draws once per day from the level table; draws are independent.
#[derive(Debug, Clone)]
pub struct DropModel {
    scenario: Scenario,
    table: DropDistribution,
}

impl DropModel {
    pub fn new(scenario: Scenario) -> Self {
        let table = build_table(scenario.level, scenario.invited);
        Self { scenario, table }
    }

    pub fn daily_expectation(&self) -> Expectation {
        let per_member = self.table.mean();
        Expectation {
            total: per_member * self.scenario.unit_size.as_f64(),
            per_member,
        }
    }

    pub fn expectation_after_days(&self, days: u32) -> Expectation {
        if days == 0 {
            return Expectation::ZERO;
        }
        self.daily_expectation().scaled(days)
    }

    /// Variance of a single day's party total.
    pub fn daily_variance(&self) -> f64 {
        self.table.variance() * self.scenario.unit_size.as_f64()
    }
}

impl MemoriaModel for DropModel {
    fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    fn table(&self) -> &DropDistribution {
        &self.table
    }

    fn daily_total(&self) -> f64 {
        self.daily_expectation().total
    }

    fn simulate_day(&self, rng: &mut dyn RngCore) -> u64 {
        (0..self.scenario.unit_size.get())
            .map(|_| u64::from(self.table.sample(rng)))
            .sum()
    }
}
