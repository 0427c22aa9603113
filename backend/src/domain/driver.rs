//! Driver identity as issued by the account subsystem.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Validation errors for [`DriverId`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DriverIdValidationError {
    #[error("driver id must not be empty")]
    Empty,
    #[error("driver id must be a valid UUID")]
    Invalid,
}

/// Account identifier of a driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DriverId(Uuid);

impl DriverId {
    /// Parse an identifier; whitespace around the UUID is rejected.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, DriverIdValidationError> {
        let raw = raw.as_ref();
        if raw.is_empty() {
            return Err(DriverIdValidationError::Empty);
        }
        if raw.trim() != raw {
            return Err(DriverIdValidationError::Invalid);
        }
        Uuid::parse_str(raw)
            .map(Self)
            .map_err(|_| DriverIdValidationError::Invalid)
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for DriverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<DriverId> for String {
    fn from(value: DriverId) -> Self {
        value.0.to_string()
    }
}

impl TryFrom<String> for DriverId {
    type Error = DriverIdValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn parses_uuid() {
        let id = DriverId::new("3fa85f64-5717-4562-b3fc-2c963f66afa6").expect("valid id");
        assert_eq!(id.to_string(), "3fa85f64-5717-4562-b3fc-2c963f66afa6");
    }

    #[rstest]
    #[case("", DriverIdValidationError::Empty)]
    #[case(" 3fa85f64-5717-4562-b3fc-2c963f66afa6", DriverIdValidationError::Invalid)]
    #[case("driver-7", DriverIdValidationError::Invalid)]
    fn rejects_invalid_input(#[case] raw: &str, #[case] expected: DriverIdValidationError) {
        assert_eq!(DriverId::new(raw), Err(expected));
    }
}
