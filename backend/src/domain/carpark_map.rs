//! Read side of the map view.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::Error;
use super::ports::CarparkMapQuery;
use super::snapshot::{CarparkFeature, SnapshotGenerator};
use super::sync_scheduler::{RefreshOutcome, SyncScheduler};

/// Snapshot served to the map view.
#[derive(Debug, Clone, PartialEq)]
pub struct CarparkMap {
    pub carparks: Vec<CarparkFeature>,
    pub refresh: RefreshOutcome,
    pub last_synced_at: Option<DateTime<Utc>>,
}

/// Serves the published snapshot after a bounded freshness check.
#[derive(Clone)]
pub struct CarparkMapService {
    scheduler: SyncScheduler,
    snapshots: SnapshotGenerator,
}

impl CarparkMapService {
    pub fn new(scheduler: SyncScheduler, snapshots: SnapshotGenerator) -> Self {
        Self {
            scheduler,
            snapshots,
        }
    }
}

#[async_trait]
impl CarparkMapQuery for CarparkMapService {
    async fn carpark_map(&self) -> Result<CarparkMap, Error> {
        let refresh = self.scheduler.refresh_if_stale().await;
        let carparks = self.snapshots.latest().await?;
        Ok(CarparkMap {
            carparks,
            refresh,
            last_synced_at: self.scheduler.last_synced_at(),
        })
    }
}
