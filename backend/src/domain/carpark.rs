//! Carpark data model.
//!
//! A carpark is created once from the static registry and afterwards only its
//! lot availability and interested-driver counter change.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::coordinates::{GeoPoint, Svy21Point};

/// Maximum length of a carpark identifier, matching the `carparks` key column.
pub const CAR_PARK_NO_MAX: usize = 16;

/// Validation errors for [`CarparkId`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CarparkIdValidationError {
    #[error("carpark number must not be empty")]
    Empty,
    #[error("carpark number must be at most {max} characters")]
    TooLong { max: usize },
    #[error("carpark number may only contain ASCII letters and digits")]
    InvalidCharacters,
}

/// Registry identifier of a carpark, such as `ACB` or `HE12`.
///
/// # Examples
/// ```
/// use carpark_backend::domain::CarparkId;
///
/// let id = CarparkId::new(" ACB ").expect("valid id");
/// assert_eq!(id.as_ref(), "ACB");
/// assert!(CarparkId::new("A B").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CarparkId(String);

impl CarparkId {
    /// Validate and construct an identifier; surrounding whitespace is trimmed.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, CarparkIdValidationError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(CarparkIdValidationError::Empty);
        }
        if trimmed.len() > CAR_PARK_NO_MAX {
            return Err(CarparkIdValidationError::TooLong {
                max: CAR_PARK_NO_MAX,
            });
        }
        if !trimmed.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(CarparkIdValidationError::InvalidCharacters);
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl AsRef<str> for CarparkId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for CarparkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<CarparkId> for String {
    fn from(value: CarparkId) -> Self {
        value.0
    }
}

impl TryFrom<String> for CarparkId {
    type Error = CarparkIdValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Static attributes copied from the registry when a carpark is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarparkProfile {
    pub car_park_type: String,
    pub type_of_parking_system: String,
    pub short_term_parking: String,
    pub free_parking: String,
    pub night_parking: bool,
    pub car_park_decks: u32,
    pub gantry_height: f64,
    pub car_park_basement: bool,
}

/// Dynamic lot information, empty until the first availability sync.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotStatus {
    pub total_lots: Option<u32>,
    pub lots_available: Option<u32>,
    pub lot_type: Option<String>,
    pub last_updated: Option<String>,
}

impl LotStatus {
    /// Capacity pair when both counts are known and the carpark has lots.
    pub fn known_capacity(&self) -> Option<(u32, u32)> {
        match (self.total_lots, self.lots_available) {
            (Some(total), Some(available)) if total > 0 => Some((total, available)),
            _ => None,
        }
    }
}

/// A carpark as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Carpark {
    pub id: CarparkId,
    pub address: String,
    pub planar: Svy21Point,
    pub location: GeoPoint,
    pub profile: CarparkProfile,
    pub lots: LotStatus,
    pub interested_driver_count: u32,
}

/// Insert payload for a carpark seen for the first time.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCarpark {
    pub id: CarparkId,
    pub address: String,
    pub planar: Svy21Point,
    pub location: GeoPoint,
    pub profile: CarparkProfile,
}

impl NewCarpark {
    /// Materialise the stored form with no lot data and no interest.
    pub fn into_carpark(self) -> Carpark {
        Carpark {
            id: self.id,
            address: self.address,
            planar: self.planar,
            location: self.location,
            profile: self.profile,
            lots: LotStatus::default(),
            interested_driver_count: 0,
        }
    }
}

/// One validated availability record from the live feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailabilityRecord {
    pub id: CarparkId,
    pub total_lots: u32,
    pub lots_available: u32,
    pub lot_type: String,
    pub updated_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("ACB", "ACB")]
    #[case("  HE12\t", "HE12")]
    #[case("Y49HV", "Y49HV")]
    fn accepts_registry_identifiers(#[case] raw: &str, #[case] expected: &str) {
        let id = CarparkId::new(raw).expect("valid id");
        assert_eq!(id.as_str(), expected);
    }

    #[rstest]
    #[case("", CarparkIdValidationError::Empty)]
    #[case("   ", CarparkIdValidationError::Empty)]
    #[case("AB-1", CarparkIdValidationError::InvalidCharacters)]
    #[case("ABCDEFGHIJKLMNOPQ", CarparkIdValidationError::TooLong { max: CAR_PARK_NO_MAX })]
    fn rejects_malformed_identifiers(
        #[case] raw: &str,
        #[case] expected: CarparkIdValidationError,
    ) {
        assert_eq!(CarparkId::new(raw), Err(expected));
    }

    #[rstest]
    fn identifiers_order_lexicographically() {
        let mut ids = vec![
            CarparkId::new("AM14").expect("id"),
            CarparkId::new("ACB").expect("id"),
            CarparkId::new("AK19").expect("id"),
        ];
        ids.sort();
        let ordered: Vec<&str> = ids.iter().map(CarparkId::as_str).collect();
        assert_eq!(ordered, ["ACB", "AK19", "AM14"]);
    }

    #[rstest]
    #[case(LotStatus { total_lots: Some(50), lots_available: Some(10), ..LotStatus::default() }, Some((50, 10)))]
    #[case(LotStatus { total_lots: Some(0), lots_available: Some(0), ..LotStatus::default() }, None)]
    #[case(LotStatus { total_lots: None, lots_available: Some(3), ..LotStatus::default() }, None)]
    #[case(LotStatus { total_lots: Some(8), lots_available: None, ..LotStatus::default() }, None)]
    fn known_capacity_requires_both_counts_and_lots(
        #[case] lots: LotStatus,
        #[case] expected: Option<(u32, u32)>,
    ) {
        assert_eq!(lots.known_capacity(), expected);
    }
}
