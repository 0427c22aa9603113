//! Driver interest tracking.
//!
//! Each driver points at no more than one carpark, and each carpark counts
//! the drivers pointing at it. Adapters apply an [`InterestPlan`] under row
//! locks inside one transaction; the helpers here decide what to change and
//! refuse any counter update that would leave the pairing inconsistent.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use utoipa::ToSchema;

use super::Error;
use super::carpark::CarparkId;
use super::driver::DriverId;
use super::ports::{CarparkInterestCommand, InterestRepository, InterestRepositoryError};
use super::snapshot::{CarparkFeature, SnapshotGenerator};

/// Result of toggling interest in a carpark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum InterestOutcome {
    Added,
    Removed,
}

/// Committed effect of a toggle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterestChange {
    pub outcome: InterestOutcome,
    pub carpark: CarparkId,
    /// Carpark the driver moved away from, when switching targets.
    pub previous: Option<CarparkId>,
    /// Counter of the target carpark after the change.
    pub interested_driver_count: u32,
}

/// Committed effect of releasing interest on parking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterestRelease {
    pub released: Option<CarparkId>,
    /// Loyalty balance after crediting the reward.
    pub points: u32,
}

/// Result returned to callers of [`InterestTracker::set_interest`].
#[derive(Debug, Clone, PartialEq)]
pub struct InterestToggle {
    pub outcome: InterestOutcome,
    pub carpark: CarparkId,
    /// Regenerated snapshot; `None` when regeneration failed after commit.
    pub carparks: Option<Vec<CarparkFeature>>,
}

/// Row changes needed to toggle interest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterestPlan {
    pub outcome: InterestOutcome,
    /// Value of the driver's pointer after the change.
    pub pointer: Option<CarparkId>,
    pub decrement: Option<CarparkId>,
    pub increment: Option<CarparkId>,
}

impl InterestPlan {
    /// Carparks whose rows must be locked, in lock order.
    pub fn locked_carparks(&self) -> Vec<CarparkId> {
        let mut ids: Vec<CarparkId> = self
            .decrement
            .iter()
            .chain(self.increment.iter())
            .cloned()
            .collect();
        ids.sort();
        ids.dedup();
        ids
    }
}

/// Decide the changes for toggling interest from `current` to `target`.
///
/// Selecting the current carpark again clears the pointer. Selecting a
/// different carpark moves the pointer and both counters.
///
/// # Examples
/// ```
/// use carpark_backend::domain::{CarparkId, InterestOutcome, plan_toggle};
///
/// let acb = CarparkId::new("ACB").expect("id");
/// let plan = plan_toggle(Some(&acb), &acb);
/// assert_eq!(plan.outcome, InterestOutcome::Removed);
/// assert_eq!(plan.pointer, None);
/// ```
pub fn plan_toggle(current: Option<&CarparkId>, target: &CarparkId) -> InterestPlan {
    match current {
        Some(current) if current == target => InterestPlan {
            outcome: InterestOutcome::Removed,
            pointer: None,
            decrement: Some(target.clone()),
            increment: None,
        },
        other => InterestPlan {
            outcome: InterestOutcome::Added,
            pointer: Some(target.clone()),
            decrement: other.cloned(),
            increment: Some(target.clone()),
        },
    }
}

/// Decrement a carpark's counter, refusing to go below zero.
pub fn decrement_interest(carpark: &CarparkId, count: u32) -> Result<u32, InterestRepositoryError> {
    count.checked_sub(1).ok_or_else(|| {
        InterestRepositoryError::invariant_violation(format!(
            "carpark {carpark} has no interested drivers to remove"
        ))
    })
}

/// Increment a carpark's counter.
pub fn increment_interest(carpark: &CarparkId, count: u32) -> Result<u32, InterestRepositoryError> {
    count
        .checked_add(1)
        .filter(|next| i32::try_from(*next).is_ok())
        .ok_or_else(|| {
            InterestRepositoryError::invariant_violation(format!(
                "carpark {carpark} interest counter overflow"
            ))
        })
}

/// Credit reward points to a balance.
pub fn credit_points(points: u32, reward: u32) -> Result<u32, InterestRepositoryError> {
    points
        .checked_add(reward)
        .filter(|next| i32::try_from(*next).is_ok())
        .ok_or_else(|| InterestRepositoryError::invariant_violation("points balance overflow"))
}

fn map_interest_error(error: InterestRepositoryError, driver: &DriverId) -> Error {
    match error {
        InterestRepositoryError::DriverNotFound { driver_id } => {
            Error::not_found(format!("driver {driver_id} not found"))
        }
        InterestRepositoryError::CarparkNotFound { car_park_no } => {
            Error::not_found(format!("carpark {car_park_no} not found"))
        }
        InterestRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("interest store unavailable: {message}"))
        }
        InterestRepositoryError::Contended { message } => {
            Error::service_unavailable(format!("interest store busy: {message}"))
        }
        InterestRepositoryError::Query { message } => {
            Error::internal(format!("interest store error: {message}"))
        }
        InterestRepositoryError::InvariantViolation { message } => {
            error!(driver_id = %driver, %message, "interest invariant violation; change rolled back");
            Error::internal(format!("interest invariant violated: {message}"))
        }
    }
}

/// Service pairing interest changes with snapshot regeneration.
#[derive(Clone)]
pub struct InterestTracker {
    repository: Arc<dyn InterestRepository>,
    snapshots: SnapshotGenerator,
}

impl InterestTracker {
    pub fn new(repository: Arc<dyn InterestRepository>, snapshots: SnapshotGenerator) -> Self {
        Self {
            repository,
            snapshots,
        }
    }

    /// Toggle interest and regenerate the snapshot.
    ///
    /// A committed change is reported even when the snapshot cannot be
    /// regenerated; the next scheduled pass republishes it.
    pub async fn set_interest(
        &self,
        driver: &DriverId,
        carpark: &CarparkId,
    ) -> Result<InterestToggle, Error> {
        let change = self
            .repository
            .toggle_interest(driver, carpark)
            .await
            .map_err(|err| {
                warn!(driver_id = %driver, car_park_no = %carpark, error = %err, "interest toggle refused");
                map_interest_error(err, driver)
            })?;
        info!(
            driver_id = %driver,
            car_park_no = %change.carpark,
            previous = ?change.previous.as_ref().map(CarparkId::as_str),
            outcome = ?change.outcome,
            interested = change.interested_driver_count,
            "interest toggled"
        );
        let carparks = self.regenerate_after_change().await;
        Ok(InterestToggle {
            outcome: change.outcome,
            carpark: change.carpark,
            carparks,
        })
    }

    /// Clear interest and credit points, then regenerate the snapshot.
    pub async fn release_interest(
        &self,
        driver: &DriverId,
        reward_points: u32,
    ) -> Result<InterestRelease, Error> {
        let release = self
            .repository
            .release_interest(driver, reward_points)
            .await
            .map_err(|err| map_interest_error(err, driver))?;
        info!(
            driver_id = %driver,
            released = ?release.released.as_ref().map(CarparkId::as_str),
            points = release.points,
            "interest released"
        );
        if release.released.is_some() {
            self.regenerate_after_change().await;
        }
        Ok(release)
    }

    async fn regenerate_after_change(&self) -> Option<Vec<CarparkFeature>> {
        match self.snapshots.regenerate().await {
            Ok(features) => Some(features),
            Err(error) => {
                warn!(%error, "snapshot regeneration after interest change failed");
                None
            }
        }
    }
}

#[async_trait]
impl CarparkInterestCommand for InterestTracker {
    async fn set_interest(
        &self,
        driver: &DriverId,
        carpark: &CarparkId,
    ) -> Result<InterestToggle, Error> {
        InterestTracker::set_interest(self, driver, carpark).await
    }

    async fn release_interest(
        &self,
        driver: &DriverId,
        reward_points: u32,
    ) -> Result<InterestRelease, Error> {
        InterestTracker::release_interest(self, driver, reward_points).await
    }
}

#[cfg(test)]
#[path = "interest_tests.rs"]
mod tests;
