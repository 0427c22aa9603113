//! Reads the carpark registry from a CSV export.
//!
//! Rows the CSV reader cannot split into the expected columns are counted and
//! skipped. Field validation happens in the loader.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use cap_std::{ambient_authority, fs::Dir};
use csv::{ReaderBuilder, Trim};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::domain::ports::{
    CarparkRegistrySource, CarparkRegistrySourceError, RawRegistryRecord, RegistryBatch,
};

const REQUIRED_COLUMNS: [&str; 12] = [
    "car_park_no",
    "address",
    "x_coord",
    "y_coord",
    "car_park_type",
    "type_of_parking_system",
    "short_term_parking",
    "free_parking",
    "night_parking",
    "car_park_decks",
    "gantry_height",
    "car_park_basement",
];

#[derive(Debug, Deserialize)]
struct RegistryCsvRow {
    car_park_no: String,
    address: String,
    x_coord: String,
    y_coord: String,
    car_park_type: String,
    type_of_parking_system: String,
    short_term_parking: String,
    free_parking: String,
    night_parking: String,
    car_park_decks: String,
    gantry_height: String,
    car_park_basement: String,
}

impl From<RegistryCsvRow> for RawRegistryRecord {
    fn from(row: RegistryCsvRow) -> Self {
        Self {
            car_park_no: row.car_park_no,
            address: row.address,
            x_coord: row.x_coord,
            y_coord: row.y_coord,
            car_park_type: row.car_park_type,
            type_of_parking_system: row.type_of_parking_system,
            short_term_parking: row.short_term_parking,
            free_parking: row.free_parking,
            night_parking: row.night_parking,
            car_park_decks: row.car_park_decks,
            gantry_height: row.gantry_height,
            car_park_basement: row.car_park_basement,
        }
    }
}

/// Parse a registry export held in memory.
pub(crate) fn parse_registry(bytes: &[u8]) -> Result<RegistryBatch, CarparkRegistrySourceError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(bytes);

    let headers = reader
        .headers()
        .map_err(|err| CarparkRegistrySourceError::format(format!("header row: {err}")))?
        .clone();
    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|column| !headers.iter().any(|header| header == *column))
        .collect();
    if !missing.is_empty() {
        return Err(CarparkRegistrySourceError::format(format!(
            "missing columns: {}",
            missing.join(", ")
        )));
    }

    let mut batch = RegistryBatch::default();
    for result in reader.deserialize::<RegistryCsvRow>() {
        match result {
            Ok(row) => batch.records.push(row.into()),
            Err(err) => {
                let line = err.position().map(csv::Position::line);
                warn!(?line, error = %err, "skipping unreadable registry row");
                batch.unreadable_rows += 1;
            }
        }
    }
    Ok(batch)
}

/// Registry source reading a CSV file from disk.
#[derive(Debug, Clone)]
pub struct CsvRegistrySource {
    path: PathBuf,
}

impl CsvRegistrySource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_bytes(path: &Path) -> Result<Vec<u8>, CarparkRegistrySourceError> {
        let io_error = |err: io::Error| {
            CarparkRegistrySourceError::io(format!("{}: {err}", path.display()))
        };
        let file_name = path
            .file_name()
            .ok_or_else(|| CarparkRegistrySourceError::io(format!("{} is not a file", path.display())))?;
        let parent = path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let directory = Dir::open_ambient_dir(parent, ambient_authority()).map_err(io_error)?;
        directory.read(file_name).map_err(io_error)
    }
}

#[async_trait]
impl CarparkRegistrySource for CsvRegistrySource {
    async fn read_registry(&self) -> Result<RegistryBatch, CarparkRegistrySourceError> {
        let path = self.path.clone();
        let batch = tokio::task::spawn_blocking(move || {
            let bytes = Self::read_bytes(&path)?;
            parse_registry(&bytes)
        })
        .await
        .map_err(|err| CarparkRegistrySourceError::io(format!("registry read task failed: {err}")))??;
        debug!(
            path = %self.path.display(),
            records = batch.records.len(),
            unreadable = batch.unreadable_rows,
            "registry dataset read"
        );
        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    const HEADER: &str = "car_park_no,address,x_coord,y_coord,car_park_type,type_of_parking_system,short_term_parking,free_parking,night_parking,car_park_decks,gantry_height,car_park_basement";

    #[rstest]
    fn trims_quoted_fields() {
        let csv = format!(
            "{HEADER}\n\" ACB \",\"BLK 270/271 ALBERT CENTRE\",\"30314.7936\",\"31490.4942\",BASEMENT CAR PARK,ELECTRONIC PARKING,WHOLE DAY,NO, YES ,1,1.80,Y\n"
        );

        let batch = parse_registry(csv.as_bytes()).expect("parse");

        assert_eq!(batch.unreadable_rows, 0);
        let record = batch.records.first().expect("record");
        assert_eq!(record.car_park_no, "ACB");
        assert_eq!(record.night_parking, "YES");
        assert_eq!(record.gantry_height, "1.80");
    }

    #[rstest]
    fn counts_rows_with_the_wrong_shape() {
        let csv = format!(
            "{HEADER}\nACB,ADDR,1,2,T,S,WHOLE DAY,NO,YES,1,1.8,Y\nBROKEN,ROW\n"
        );

        let batch = parse_registry(csv.as_bytes()).expect("parse");

        assert_eq!(batch.records.len(), 1);
        assert_eq!(batch.unreadable_rows, 1);
    }

    #[rstest]
    fn missing_columns_are_a_format_error() {
        let error = parse_registry(b"car_park_no,address\nACB,ADDR\n").expect_err("format");

        assert!(matches!(error, CarparkRegistrySourceError::Format { .. }));
        assert!(error.to_string().contains("x_coord"));
    }

    #[rstest]
    #[tokio::test]
    async fn reads_the_bundled_fixture() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/hdb-carpark-information.csv");
        let source = CsvRegistrySource::new(path);

        let batch = source.read_registry().await.expect("read");

        assert_eq!(batch.records.len(), 6);
        assert_eq!(batch.unreadable_rows, 0);
    }

    #[rstest]
    #[tokio::test]
    async fn missing_file_is_an_io_error() {
        let temp = TempDir::new().expect("tempdir");
        let source = CsvRegistrySource::new(temp.path().join("absent.csv"));

        let error = source.read_registry().await.expect_err("io");

        assert!(matches!(error, CarparkRegistrySourceError::Io { .. }));
    }
}
