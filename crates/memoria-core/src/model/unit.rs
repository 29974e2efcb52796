use serde::Serialize;

use super::error::ParamError;

/// Number of party members, each an independent source of drops per day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(into = "u32")]
pub struct UnitSize(u32);

impl UnitSize {
    pub fn new(value: i64) -> Result<Self, ParamError> {
        match u32::try_from(value) {
            Ok(size) if size >= 1 => Ok(Self(size)),
            _ => Err(ParamError::InvalidUnitSize(value)),
        }
    }

    pub const fn get(self) -> u32 {
        self.0
    }

    pub fn as_f64(self) -> f64 {
        f64::from(self.0)
    }
}

impl TryFrom<i64> for UnitSize {
    type Error = ParamError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<UnitSize> for u32 {
    fn from(size: UnitSize) -> Self {
        size.0
    }
}

#[cfg(test)]
mod tests {
    use super::UnitSize;
    use crate::model::ParamError;

    #[test]
    fn rejects_empty_and_negative_units() {
        assert_eq!(UnitSize::new(0), Err(ParamError::InvalidUnitSize(0)));
        assert_eq!(UnitSize::new(-2), Err(ParamError::InvalidUnitSize(-2)));
        assert_eq!(UnitSize::new(6).unwrap().get(), 6);
    }
}
