//! Shared test doubles and builders.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Local, TimeDelta, TimeZone, Utc};
use mockable::Clock;

use crate::domain::coordinates::{GeoPoint, Svy21Point};
use crate::domain::{CarparkId, CarparkProfile, NewCarpark};

/// Clock whose time only moves when a test advances it.
#[derive(Debug)]
pub struct MutableClock(Mutex<DateTime<Utc>>);

impl MutableClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    /// Start at a fixed, arbitrary instant.
    pub fn at_epoch() -> Self {
        Self::new(
            Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0)
                .single()
                .unwrap_or_else(Utc::now),
        )
    }

    pub fn advance(&self, delta: Duration) {
        let delta = TimeDelta::from_std(delta).expect("duration fits in TimeDelta");
        *self.lock_clock() += delta;
    }

    fn lock_clock(&self) -> MutexGuard<'_, DateTime<Utc>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Clock for MutableClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.lock_clock()
    }
}

/// A registry carpark with plausible static attributes.
pub fn new_carpark(car_park_no: &str) -> NewCarpark {
    NewCarpark {
        id: CarparkId::new(car_park_no).expect("carpark id"),
        address: format!("BLK {car_park_no} TEST STREET"),
        planar: Svy21Point::new(30_314.7936, 31_490.4942),
        location: GeoPoint::new(1.3011, 103.8541),
        profile: CarparkProfile {
            car_park_type: "MULTI-STOREY CAR PARK".to_owned(),
            type_of_parking_system: "ELECTRONIC PARKING".to_owned(),
            short_term_parking: "WHOLE DAY".to_owned(),
            free_parking: "NO".to_owned(),
            night_parking: true,
            car_park_decks: 4,
            gantry_height: 2.15,
            car_park_basement: false,
        },
    }
}
