//! Driven port for carpark persistence used by the sync services.

use std::collections::HashSet;

use async_trait::async_trait;

use super::define_port_error;
use crate::domain::{AvailabilityRecord, Carpark, CarparkId, NewCarpark};

define_port_error! {
    /// Errors raised by carpark repositories.
    pub enum CarparkRepositoryError {
        /// The store could not be reached.
        Connection { message: String } => "carpark store connection failed: {message}",
        /// A statement failed; nothing from the batch was committed.
        Query { message: String } => "carpark store query failed: {message}",
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CarparkRepository: Send + Sync {
    /// Identifiers from `ids` that are already stored.
    async fn existing_ids(
        &self,
        ids: &[CarparkId],
    ) -> Result<HashSet<CarparkId>, CarparkRepositoryError>;

    /// Insert carparks in one transaction, skipping identifiers that already
    /// exist. Returns the number of rows actually inserted.
    async fn insert_new(&self, carparks: &[NewCarpark]) -> Result<usize, CarparkRepositoryError>;

    /// Overwrite lot data for known carparks in one transaction. Records for
    /// unknown identifiers are ignored. Returns the number of rows updated.
    async fn apply_availability(
        &self,
        records: &[AvailabilityRecord],
    ) -> Result<usize, CarparkRepositoryError>;

    /// Every stored carpark ordered by identifier.
    async fn list_all(&self) -> Result<Vec<Carpark>, CarparkRepositoryError>;
}

/// Fixture repository with no carparks that accepts and drops writes.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixtureCarparkRepository;

#[async_trait]
impl CarparkRepository for FixtureCarparkRepository {
    async fn existing_ids(
        &self,
        _ids: &[CarparkId],
    ) -> Result<HashSet<CarparkId>, CarparkRepositoryError> {
        Ok(HashSet::new())
    }

    async fn insert_new(&self, carparks: &[NewCarpark]) -> Result<usize, CarparkRepositoryError> {
        Ok(carparks.len())
    }

    async fn apply_availability(
        &self,
        _records: &[AvailabilityRecord],
    ) -> Result<usize, CarparkRepositoryError> {
        Ok(0)
    }

    async fn list_all(&self) -> Result<Vec<Carpark>, CarparkRepositoryError> {
        Ok(Vec::new())
    }
}
