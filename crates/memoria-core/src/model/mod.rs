pub mod error;
pub mod level;
pub mod scenario;
pub mod unit;

pub use error::ParamError;
pub use level::GateLevel;
pub use scenario::{Scenario, checked_days, checked_runs};
pub use unit::UnitSize;
