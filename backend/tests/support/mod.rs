//! Shared helper utilities for backend integration tests.
//!
//! Integration tests compile as separate crates under `backend/tests/`, so
//! each suite pulls this module in with `mod support;`.
#![allow(dead_code)]

pub mod cluster_skip;
pub mod embedded_postgres;

use carpark_backend::domain::coordinates::{Svy21Point, svy21_to_wgs84};
use carpark_backend::domain::{AvailabilityRecord, CarparkId, CarparkProfile, NewCarpark};

pub use cluster_skip::handle_cluster_setup_failure;
pub use embedded_postgres::TestDatabase;

/// Render a `postgres` error with enough detail to be useful in CI logs.
///
/// The `Display` implementation collapses database errors to `db error`,
/// hiding the message and SQLSTATE.
pub fn format_postgres_error(error: &postgres::Error) -> String {
    let Some(db_error) = error.as_db_error() else {
        return error.to_string();
    };

    let mut summary = format!(
        "postgres error {:?}: {}",
        db_error.code(),
        db_error.message()
    );
    if let Some(detail) = db_error.detail() {
        summary.push_str("; detail: ");
        summary.push_str(detail);
    }
    if let Some(hint) = db_error.hint() {
        summary.push_str("; hint: ");
        summary.push_str(hint);
    }
    summary
}

pub fn carpark_id(raw: &str) -> CarparkId {
    CarparkId::new(raw).expect("fixture carpark id is valid")
}

/// Registry carpark near Ang Mo Kio with no lot data.
pub fn new_carpark(raw: &str) -> NewCarpark {
    let planar = Svy21Point::new(30314.7936, 31490.4942);
    NewCarpark {
        id: carpark_id(raw),
        address: format!("BLK 270/271 ALBERT CENTRE BASEMENT CAR PARK ({raw})"),
        planar,
        location: svy21_to_wgs84(planar),
        profile: CarparkProfile {
            car_park_type: "BASEMENT CAR PARK".to_owned(),
            type_of_parking_system: "ELECTRONIC PARKING".to_owned(),
            short_term_parking: "WHOLE DAY".to_owned(),
            free_parking: "NO".to_owned(),
            night_parking: true,
            car_park_decks: 1,
            gantry_height: 1.8,
            car_park_basement: true,
        },
    }
}

pub fn availability(raw: &str, total: u32, available: u32) -> AvailabilityRecord {
    AvailabilityRecord {
        id: carpark_id(raw),
        total_lots: total,
        lots_available: available,
        lot_type: "C".to_owned(),
        updated_at: "2024-03-01T10:15:02".to_owned(),
    }
}
