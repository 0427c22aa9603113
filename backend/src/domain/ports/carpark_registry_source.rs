//! Driven port for reading the static carpark registry.
//!
//! The adapter only splits the dataset into raw rows. Sentinel decoding,
//! number parsing and coordinate conversion belong to the loader so the same
//! rules apply whichever source produced the rows.

use async_trait::async_trait;

use super::define_port_error;

/// One registry row with every column still in its textual form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRegistryRecord {
    pub car_park_no: String,
    pub address: String,
    pub x_coord: String,
    pub y_coord: String,
    pub car_park_type: String,
    pub type_of_parking_system: String,
    pub short_term_parking: String,
    pub free_parking: String,
    pub night_parking: String,
    pub car_park_decks: String,
    pub gantry_height: String,
    pub car_park_basement: String,
}

/// Rows read from one registry dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryBatch {
    pub records: Vec<RawRegistryRecord>,
    /// Rows the source could not split into columns.
    pub unreadable_rows: usize,
}

define_port_error! {
    /// Errors raised while reading the registry dataset.
    pub enum CarparkRegistrySourceError {
        /// The dataset could not be opened or read.
        Io { message: String } => "registry dataset unreadable: {message}",
        /// The dataset is not in the expected tabular layout.
        Format { message: String } => "registry dataset malformed: {message}",
    }
}

/// Port for reading the registry dataset in full.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CarparkRegistrySource: Send + Sync {
    async fn read_registry(&self) -> Result<RegistryBatch, CarparkRegistrySourceError>;
}

/// Fixture source returning an empty dataset.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixtureCarparkRegistrySource;

#[async_trait]
impl CarparkRegistrySource for FixtureCarparkRegistrySource {
    async fn read_registry(&self) -> Result<RegistryBatch, CarparkRegistrySourceError> {
        Ok(RegistryBatch::default())
    }
}
