use rand::Rng;
use rand::distributions::Distribution;
use serde::Serialize;

/// Tolerance used when checking that a distribution is normalised.
pub const PROBABILITY_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DropOutcome {
    pub drops: u32,
    pub probability: f64,
}

/// Discrete distribution over drop counts, ordered by ascending `drops`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DropDistribution {
    outcomes: Vec<DropOutcome>,
}

impl DropDistribution {
    pub(crate) fn from_outcomes(outcomes: Vec<DropOutcome>) -> Self {
        debug_assert!(outcomes.windows(2).all(|pair| pair[0].drops < pair[1].drops));
        Self { outcomes }
    }

    pub fn outcomes(&self) -> &[DropOutcome] {
        &self.outcomes
    }

    pub fn probability_of(&self, drops: u32) -> f64 {
        self.outcomes
            .iter()
            .find(|outcome| outcome.drops == drops)
            .map_or(0.0, |outcome| outcome.probability)
    }

    pub fn total_probability(&self) -> f64 {
        self.outcomes.iter().map(|outcome| outcome.probability).sum()
    }

    pub fn is_normalized(&self) -> bool {
        self.outcomes.iter().all(|outcome| outcome.probability >= 0.0)
            && (self.total_probability() - 1.0).abs() <= PROBABILITY_TOLERANCE
    }

    pub fn mean(&self) -> f64 {
        self.outcomes
            .iter()
            .map(|outcome| f64::from(outcome.drops) * outcome.probability)
            .sum()
    }

    pub fn variance(&self) -> f64 {
        let mean = self.mean();
        self.outcomes
            .iter()
            .map(|outcome| (f64::from(outcome.drops) - mean).powi(2) * outcome.probability)
            .sum()
    }

    pub fn max_drops(&self) -> u32 {
        self.outcomes
            .iter()
            .rev()
            .find(|outcome| outcome.probability > 0.0)
            .map_or(0, |outcome| outcome.drops)
    }
}

/// Inverse-CDF draw. Rounding slack past the last cumulative step falls back to
/// the largest outcome with positive mass.
impl Distribution<u32> for DropDistribution {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> u32 {
        let roll: f64 = rng.gen_range(0.0..1.0);
        let mut cumulative = 0.0;
        for outcome in &self.outcomes {
            cumulative += outcome.probability;
            if roll < cumulative {
                return outcome.drops;
            }
        }
        self.max_drops()
    }
}
