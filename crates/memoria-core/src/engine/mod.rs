mod expectation;
mod simulation;

pub use expectation::{DropModel, Expectation};
pub use simulation::{run_seeds, run_simulations_with, simulate_seeded};

use rand::Rng;

use crate::model::{ParamError, Scenario, checked_days, checked_runs};
use crate::table::DropDistribution;

/// Shared surface of the per-member drop model and the session-visit model.
pub trait MemoriaModel: Send + Sync {
    fn scenario(&self) -> &Scenario;

    /// Distribution the model samples from on every draw.
    fn table(&self) -> &DropDistribution;

    /// Analytical party total for a single day.
    fn daily_total(&self) -> f64;

    fn expected_total(&self, days: u32) -> f64 {
        self.daily_total() * f64::from(days)
    }

    /// Simulate one day and return the party total.
    fn simulate_day(&self, rng: &mut dyn rand::RngCore) -> u64;

    fn simulate_run(&self, days: u32, rng: &mut dyn rand::RngCore) -> u64 {
        (0..days).map(|_| self.simulate_day(rng)).sum()
    }
}

pub fn daily_expectation(
    level: i64,
    unit_size: i64,
    invited: bool,
) -> Result<Expectation, ParamError> {
    let scenario = Scenario::try_new(level, unit_size, invited)?;
    Ok(DropModel::new(scenario).daily_expectation())
}

pub fn expectation_after_days(
    days: i64,
    level: i64,
    unit_size: i64,
    invited: bool,
) -> Result<Expectation, ParamError> {
    let scenario = Scenario::try_new(level, unit_size, invited)?;
    let days = checked_days(days)?;
    Ok(DropModel::new(scenario).expectation_after_days(days))
}

/// Cumulative totals of `runs` independent runs of `days` days each.
pub fn run_simulations<R: Rng + ?Sized>(
    runs: i64,
    days: i64,
    level: i64,
    unit_size: i64,
    invited: bool,
    rng: &mut R,
) -> Result<Vec<u64>, ParamError> {
    let scenario = Scenario::try_new(level, unit_size, invited)?;
    let days = checked_days(days)?;
    let runs = checked_runs(runs)?;
    Ok(run_simulations_with(
        &DropModel::new(scenario),
        runs,
        days,
        rng,
    ))
}
