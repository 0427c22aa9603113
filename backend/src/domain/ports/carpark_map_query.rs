//! Driving port serving the map view's carpark collection.

use async_trait::async_trait;

use crate::domain::{CarparkMap, Error, RefreshOutcome};

/// Use-case port for reading the published carpark map.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CarparkMapQuery: Send + Sync {
    /// Refresh stale availability within the bounded wait, then return the
    /// current snapshot.
    async fn carpark_map(&self) -> Result<CarparkMap, Error>;
}

/// Fixture query returning an empty, fresh map.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureCarparkMapQuery;

#[async_trait]
impl CarparkMapQuery for FixtureCarparkMapQuery {
    async fn carpark_map(&self) -> Result<CarparkMap, Error> {
        Ok(CarparkMap {
            carparks: Vec::new(),
            refresh: RefreshOutcome::Fresh,
            last_synced_at: None,
        })
    }
}
