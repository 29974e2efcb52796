#![deny(warnings)]
pub mod engine;
pub mod model;
pub mod table;
pub mod visit;

pub use engine::{
    DropModel, Expectation, MemoriaModel, daily_expectation, expectation_after_days,
    run_simulations,
};
pub use model::{GateLevel, ParamError, Scenario, UnitSize};
pub use table::{DropDistribution, DropOutcome, build_table, try_build_table};
pub use visit::{PerCharacter, VisitExpectation, VisitModel};

pub struct AppInfo;

impl AppInfo {
    pub const fn name() -> &'static str {
        "memoria"
    }

    pub const fn version() -> &'static str {
        env!("CARGO_PKG_VERSION")
    }
}

#[cfg(test)]
mod tests {
    use super::AppInfo;

    #[test]
    fn exposes_static_metadata() {
        assert_eq!(AppInfo::name(), "memoria");
        assert!(!AppInfo::version().is_empty());
    }
}
