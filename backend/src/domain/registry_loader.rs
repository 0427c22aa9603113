//! Insert-only ingestion of the static carpark registry.
//!
//! Each row is decoded on its own; a bad row is logged and counted without
//! affecting its neighbours. Rows whose identifier is already stored are left
//! untouched, and coordinates are only converted for rows that will be
//! inserted. All inserts of one run share a transaction in the repository.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::Error;
use super::carpark::{CarparkId, CarparkIdValidationError, CarparkProfile, NewCarpark};
use super::coordinates::{Svy21Point, svy21_to_wgs84};
use super::ports::{
    CarparkRegistrySource, CarparkRegistrySourceError, CarparkRepository, CarparkRepositoryError,
    RawRegistryRecord,
};

/// Reasons a registry row is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryRowError {
    #[error("invalid car_park_no {value:?}: {source}")]
    Identifier {
        value: String,
        source: CarparkIdValidationError,
    },
    #[error("column {column} is not a number: {value:?}")]
    Number { column: &'static str, value: String },
    #[error("column {column} has unrecognised value {value:?}")]
    Sentinel { column: &'static str, value: String },
    #[error("duplicate car_park_no {value:?} in dataset")]
    Duplicate { value: String },
}

/// A decoded registry row, before coordinate conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistryEntry {
    pub id: CarparkId,
    pub address: String,
    pub planar: Svy21Point,
    pub profile: CarparkProfile,
}

impl RegistryEntry {
    /// Convert the planar position and build the insert payload.
    pub fn into_new_carpark(self) -> NewCarpark {
        let location = svy21_to_wgs84(self.planar);
        NewCarpark {
            id: self.id,
            address: self.address,
            planar: self.planar,
            location,
            profile: self.profile,
        }
    }
}

fn parse_f64(column: &'static str, raw: &str) -> Result<f64, RegistryRowError> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| RegistryRowError::Number {
            column,
            value: raw.to_owned(),
        })
}

fn parse_u32(column: &'static str, raw: &str) -> Result<u32, RegistryRowError> {
    raw.trim()
        .parse::<u32>()
        .map_err(|_| RegistryRowError::Number {
            column,
            value: raw.to_owned(),
        })
}

fn parse_sentinel(
    column: &'static str,
    raw: &str,
    yes: &str,
    no: &str,
) -> Result<bool, RegistryRowError> {
    match raw.trim() {
        value if value == yes => Ok(true),
        value if value == no => Ok(false),
        _ => Err(RegistryRowError::Sentinel {
            column,
            value: raw.to_owned(),
        }),
    }
}

/// Decode one raw registry row.
///
/// Night parking uses `YES`/`NO` and basement uses `Y`/`N`; anything else
/// rejects the row.
pub fn decode_registry_row(raw: &RawRegistryRecord) -> Result<RegistryEntry, RegistryRowError> {
    let id = CarparkId::new(&raw.car_park_no).map_err(|source| RegistryRowError::Identifier {
        value: raw.car_park_no.clone(),
        source,
    })?;
    let planar = Svy21Point::new(
        parse_f64("x_coord", &raw.x_coord)?,
        parse_f64("y_coord", &raw.y_coord)?,
    );
    let profile = CarparkProfile {
        car_park_type: raw.car_park_type.trim().to_owned(),
        type_of_parking_system: raw.type_of_parking_system.trim().to_owned(),
        short_term_parking: raw.short_term_parking.trim().to_owned(),
        free_parking: raw.free_parking.trim().to_owned(),
        night_parking: parse_sentinel("night_parking", &raw.night_parking, "YES", "NO")?,
        car_park_decks: parse_u32("car_park_decks", &raw.car_park_decks)?,
        gantry_height: parse_f64("gantry_height", &raw.gantry_height)?,
        car_park_basement: parse_sentinel("car_park_basement", &raw.car_park_basement, "Y", "N")?,
    };
    Ok(RegistryEntry {
        id,
        address: raw.address.trim().to_owned(),
        planar,
        profile,
    })
}

/// Outcome of one registry load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RegistryLoadReport {
    /// Rows present in the dataset, readable or not.
    pub total: usize,
    pub inserted: usize,
    /// Rows whose identifier was already stored.
    pub existing: usize,
    pub rejected: usize,
}

fn map_source_error(error: CarparkRegistrySourceError) -> Error {
    match error {
        CarparkRegistrySourceError::Io { message } => {
            Error::service_unavailable(format!("registry dataset unavailable: {message}"))
        }
        CarparkRegistrySourceError::Format { message } => {
            Error::invalid_request(format!("registry dataset malformed: {message}"))
        }
    }
}

pub(crate) fn map_carpark_repository_error(error: CarparkRepositoryError) -> Error {
    match error {
        CarparkRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("carpark store unavailable: {message}"))
        }
        CarparkRepositoryError::Query { message } => {
            Error::internal(format!("carpark store error: {message}"))
        }
    }
}

/// Loads the registry dataset into the carpark store.
#[derive(Clone)]
pub struct CarparkRegistryLoader {
    source: Arc<dyn CarparkRegistrySource>,
    carparks: Arc<dyn CarparkRepository>,
}

impl CarparkRegistryLoader {
    pub fn new(source: Arc<dyn CarparkRegistrySource>, carparks: Arc<dyn CarparkRepository>) -> Self {
        Self { source, carparks }
    }

    /// Read the dataset and insert carparks not yet stored.
    ///
    /// A failure reading the dataset or writing the batch leaves the store
    /// unchanged.
    pub async fn load(&self) -> Result<RegistryLoadReport, Error> {
        let batch = self
            .source
            .read_registry()
            .await
            .map_err(map_source_error)?;

        let mut report = RegistryLoadReport {
            total: batch.records.len() + batch.unreadable_rows,
            rejected: batch.unreadable_rows,
            ..RegistryLoadReport::default()
        };

        let mut seen = HashSet::with_capacity(batch.records.len());
        let mut entries = Vec::with_capacity(batch.records.len());
        for (index, raw) in batch.records.iter().enumerate() {
            let decoded = decode_registry_row(raw).and_then(|entry| {
                if seen.insert(entry.id.clone()) {
                    Ok(entry)
                } else {
                    Err(RegistryRowError::Duplicate {
                        value: raw.car_park_no.clone(),
                    })
                }
            });
            match decoded {
                Ok(entry) => entries.push(entry),
                Err(error) => {
                    warn!(row = index + 1, car_park_no = %raw.car_park_no, %error, "registry row rejected");
                    report.rejected += 1;
                }
            }
        }

        let ids: Vec<CarparkId> = entries.iter().map(|entry| entry.id.clone()).collect();
        let existing = self
            .carparks
            .existing_ids(&ids)
            .await
            .map_err(map_carpark_repository_error)?;

        let new_carparks: Vec<NewCarpark> = entries
            .into_iter()
            .filter(|entry| {
                let known = existing.contains(&entry.id);
                if known {
                    debug!(car_park_no = %entry.id, "registry row already stored");
                }
                !known
            })
            .map(RegistryEntry::into_new_carpark)
            .collect();

        report.inserted = if new_carparks.is_empty() {
            0
        } else {
            self.carparks
                .insert_new(&new_carparks)
                .await
                .map_err(map_carpark_repository_error)?
        };
        // Rows inserted concurrently by another loader count as existing.
        report.existing = existing.len() + new_carparks.len().saturating_sub(report.inserted);

        info!(
            total = report.total,
            inserted = report.inserted,
            existing = report.existing,
            rejected = report.rejected,
            "registry load finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
#[path = "registry_loader_tests.rs"]
mod tests;
