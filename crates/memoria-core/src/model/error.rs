use core::fmt;

/// Input validation failures. Every check runs before any computation starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamError {
    InvalidLevel(i64),
    InvalidUnitSize(i64),
    InvalidDays(i64),
    InvalidRuns(i64),
    UnitTooSmall { unit_size: u32, required: u32 },
}

impl fmt::Display for ParamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamError::InvalidLevel(level) => {
                write!(f, "gate level {level} is outside 1..=40")
            }
            ParamError::InvalidUnitSize(size) => {
                write!(f, "unit size {size} must be at least 1")
            }
            ParamError::InvalidDays(days) => write!(f, "days {days} must not be negative"),
            ParamError::InvalidRuns(runs) => write!(f, "runs {runs} must not be negative"),
            ParamError::UnitTooSmall {
                unit_size,
                required,
            } => write!(
                f,
                "unit size {unit_size} cannot host {required} visitors in one session"
            ),
        }
    }
}

impl std::error::Error for ParamError {}
