//! Row types for the carpark store.

use diesel::prelude::*;
use uuid::Uuid;

use super::schema::{carparks, drivers};
use crate::domain::coordinates::{GeoPoint, Svy21Point};
use crate::domain::{Carpark, CarparkId, CarparkProfile, LotStatus, NewCarpark};

/// Full carpark row.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = carparks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct CarparkRow {
    pub car_park_no: String,
    pub address: String,
    pub x_coord: f64,
    pub y_coord: f64,
    pub latitude: f64,
    pub longitude: f64,
    pub car_park_type: String,
    pub type_of_parking_system: String,
    pub short_term_parking: String,
    pub free_parking: String,
    pub night_parking: bool,
    pub car_park_decks: i32,
    pub gantry_height: f64,
    pub car_park_basement: bool,
    pub total_lots: Option<i32>,
    pub lots_available: Option<i32>,
    pub lot_type: Option<String>,
    pub lot_info_last_updated: Option<String>,
    pub interested_driver_count: i32,
}

/// Stored values that cannot be represented in the domain model.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("carpark row {car_park_no:?} is invalid: {reason}")]
pub(crate) struct InvalidCarparkRow {
    pub car_park_no: String,
    pub reason: String,
}

fn non_negative(
    car_park_no: &str,
    column: &str,
    value: i32,
) -> Result<u32, InvalidCarparkRow> {
    u32::try_from(value).map_err(|_| InvalidCarparkRow {
        car_park_no: car_park_no.to_owned(),
        reason: format!("{column} is negative ({value})"),
    })
}

impl TryFrom<CarparkRow> for Carpark {
    type Error = InvalidCarparkRow;

    fn try_from(row: CarparkRow) -> Result<Self, Self::Error> {
        let id = CarparkId::new(&row.car_park_no).map_err(|err| InvalidCarparkRow {
            car_park_no: row.car_park_no.clone(),
            reason: err.to_string(),
        })?;
        let key = row.car_park_no.as_str();
        let total_lots = row
            .total_lots
            .map(|value| non_negative(key, "total_lots", value))
            .transpose()?;
        let lots_available = row
            .lots_available
            .map(|value| non_negative(key, "lots_available", value))
            .transpose()?;
        let car_park_decks = non_negative(key, "car_park_decks", row.car_park_decks)?;
        let interested_driver_count =
            non_negative(key, "interested_driver_count", row.interested_driver_count)?;

        Ok(Carpark {
            id,
            address: row.address,
            planar: Svy21Point::new(row.x_coord, row.y_coord),
            location: GeoPoint::new(row.latitude, row.longitude),
            profile: CarparkProfile {
                car_park_type: row.car_park_type,
                type_of_parking_system: row.type_of_parking_system,
                short_term_parking: row.short_term_parking,
                free_parking: row.free_parking,
                night_parking: row.night_parking,
                car_park_decks,
                gantry_height: row.gantry_height,
                car_park_basement: row.car_park_basement,
            },
            lots: LotStatus {
                total_lots,
                lots_available,
                lot_type: row.lot_type,
                last_updated: row.lot_info_last_updated,
            },
            interested_driver_count,
        })
    }
}

/// Insert payload; dynamic columns keep their defaults.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = carparks)]
pub(crate) struct NewCarparkRow<'a> {
    pub car_park_no: &'a str,
    pub address: &'a str,
    pub x_coord: f64,
    pub y_coord: f64,
    pub latitude: f64,
    pub longitude: f64,
    pub car_park_type: &'a str,
    pub type_of_parking_system: &'a str,
    pub short_term_parking: &'a str,
    pub free_parking: &'a str,
    pub night_parking: bool,
    pub car_park_decks: i32,
    pub gantry_height: f64,
    pub car_park_basement: bool,
}

impl<'a> NewCarparkRow<'a> {
    /// Borrow a row from `carpark`; `None` when decks overflow the column.
    pub fn from_domain(carpark: &'a NewCarpark) -> Option<Self> {
        Some(Self {
            car_park_no: carpark.id.as_str(),
            address: carpark.address.as_str(),
            x_coord: carpark.planar.easting,
            y_coord: carpark.planar.northing,
            latitude: carpark.location.latitude,
            longitude: carpark.location.longitude,
            car_park_type: carpark.profile.car_park_type.as_str(),
            type_of_parking_system: carpark.profile.type_of_parking_system.as_str(),
            short_term_parking: carpark.profile.short_term_parking.as_str(),
            free_parking: carpark.profile.free_parking.as_str(),
            night_parking: carpark.profile.night_parking,
            car_park_decks: i32::try_from(carpark.profile.car_park_decks).ok()?,
            gantry_height: carpark.profile.gantry_height,
            car_park_basement: carpark.profile.car_park_basement,
        })
    }
}

/// Driver columns touched by interest tracking.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = drivers)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct DriverRow {
    pub id: Uuid,
    pub interested_carpark: Option<String>,
    pub points: i32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn row() -> CarparkRow {
        CarparkRow {
            car_park_no: "ACB".to_owned(),
            address: "BLK 270/271 ALBERT CENTRE".to_owned(),
            x_coord: 30_314.7936,
            y_coord: 31_490.4942,
            latitude: 1.3011,
            longitude: 103.8541,
            car_park_type: "BASEMENT CAR PARK".to_owned(),
            type_of_parking_system: "ELECTRONIC PARKING".to_owned(),
            short_term_parking: "WHOLE DAY".to_owned(),
            free_parking: "NO".to_owned(),
            night_parking: true,
            car_park_decks: 1,
            gantry_height: 1.8,
            car_park_basement: true,
            total_lots: Some(105),
            lots_available: Some(12),
            lot_type: Some("C".to_owned()),
            lot_info_last_updated: Some("2024-03-01T10:15:02".to_owned()),
            interested_driver_count: 3,
        }
    }

    #[rstest]
    fn converts_a_synced_row() {
        let carpark = Carpark::try_from(row()).expect("valid row");
        assert_eq!(carpark.id.as_str(), "ACB");
        assert_eq!(carpark.lots.known_capacity(), Some((105, 12)));
        assert_eq!(carpark.interested_driver_count, 3);
    }

    #[rstest]
    fn rejects_negative_counts() {
        let mut bad = row();
        bad.lots_available = Some(-1);
        let error = Carpark::try_from(bad).expect_err("invalid row");
        assert!(error.reason.contains("lots_available"));
    }
}
