//! Map snapshot generation.
//!
//! The snapshot is a pure function of stored carpark state: one feature per
//! carpark with known capacity, ordered by identifier, replaced wholesale on
//! every regeneration.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use utoipa::ToSchema;

use super::Error;
use super::carpark::Carpark;
use super::ports::{CarparkRepository, SnapshotStore, SnapshotStoreError};
use super::registry_loader::map_carpark_repository_error;

/// One carpark as rendered on the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CarparkFeature {
    /// `[longitude, latitude]`.
    #[schema(example = json!([103.8541, 1.3011]))]
    pub coordinates: [f64; 2],
    #[schema(example = "ACB")]
    pub car_park_no: String,
    pub address: String,
    pub total_lots: u32,
    pub lots_available: u32,
    /// Whole percentage of free lots, 0 to 100.
    pub vacancy_percentage: u8,
    pub lot_type: Option<String>,
    pub lot_info_last_updated: Option<String>,
    pub car_park_type: String,
    pub type_of_parking_system: String,
    pub short_term_parking: String,
    pub free_parking: String,
    pub night_parking: bool,
    pub no_of_interested_drivers: u32,
}

/// `floor(available * 100 / total)` clamped to `0..=100`, or `None` without
/// capacity.
///
/// # Examples
/// ```
/// use carpark_backend::domain::snapshot::vacancy_percentage;
///
/// assert_eq!(vacancy_percentage(10, 50), Some(20));
/// assert_eq!(vacancy_percentage(3, 0), None);
/// ```
pub fn vacancy_percentage(available: u32, total: u32) -> Option<u8> {
    if total == 0 {
        return None;
    }
    let percent = (u64::from(available) * 100 / u64::from(total)).min(100);
    u8::try_from(percent).ok()
}

impl CarparkFeature {
    /// Build the feature for `carpark`, or `None` when capacity is unknown.
    pub fn from_carpark(carpark: &Carpark) -> Option<Self> {
        let (total, available) = carpark.lots.known_capacity()?;
        let vacancy = vacancy_percentage(available, total)?;
        Some(Self {
            coordinates: [carpark.location.longitude, carpark.location.latitude],
            car_park_no: carpark.id.to_string(),
            address: carpark.address.clone(),
            total_lots: total,
            lots_available: available,
            vacancy_percentage: vacancy,
            lot_type: carpark.lots.lot_type.clone(),
            lot_info_last_updated: carpark.lots.last_updated.clone(),
            car_park_type: carpark.profile.car_park_type.clone(),
            type_of_parking_system: carpark.profile.type_of_parking_system.clone(),
            short_term_parking: carpark.profile.short_term_parking.clone(),
            free_parking: carpark.profile.free_parking.clone(),
            night_parking: carpark.profile.night_parking,
            no_of_interested_drivers: carpark.interested_driver_count,
        })
    }
}

/// Build the ordered feature collection from stored carparks.
pub fn build_features(carparks: &[Carpark]) -> Vec<CarparkFeature> {
    let mut features: Vec<CarparkFeature> =
        carparks.iter().filter_map(CarparkFeature::from_carpark).collect();
    features.sort_by(|lhs, rhs| lhs.car_park_no.cmp(&rhs.car_park_no));
    features
}

pub(crate) fn map_snapshot_store_error(error: SnapshotStoreError) -> Error {
    match error {
        SnapshotStoreError::Io { message } => {
            Error::service_unavailable(format!("snapshot store unavailable: {message}"))
        }
        SnapshotStoreError::Encode { message } | SnapshotStoreError::Decode { message } => {
            Error::internal(format!("snapshot store error: {message}"))
        }
    }
}

/// Regenerates and publishes the map snapshot.
#[derive(Clone)]
pub struct SnapshotGenerator {
    carparks: Arc<dyn CarparkRepository>,
    store: Arc<dyn SnapshotStore>,
}

impl SnapshotGenerator {
    pub fn new(carparks: Arc<dyn CarparkRepository>, store: Arc<dyn SnapshotStore>) -> Self {
        Self { carparks, store }
    }

    /// Rebuild the collection from the store and publish it.
    ///
    /// Concurrent calls are safe; the last publish wins.
    pub async fn regenerate(&self) -> Result<Vec<CarparkFeature>, Error> {
        let carparks = self
            .carparks
            .list_all()
            .await
            .map_err(map_carpark_repository_error)?;
        let features = build_features(&carparks);
        self.store.publish(&features).await.map_err(|error| {
            warn!(%error, "snapshot publish failed");
            map_snapshot_store_error(error)
        })?;
        info!(
            carparks = carparks.len(),
            features = features.len(),
            "snapshot regenerated"
        );
        Ok(features)
    }

    /// The last published collection; empty before the first publish.
    pub async fn latest(&self) -> Result<Vec<CarparkFeature>, Error> {
        self.store
            .read_latest()
            .await
            .map(Option::unwrap_or_default)
            .map_err(map_snapshot_store_error)
    }
}
