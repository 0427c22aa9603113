//! Driven port pairing a driver's interest pointer with carpark counters.
//!
//! Implementations apply each operation atomically: the pointer update and
//! every counter adjustment commit together or not at all.

use async_trait::async_trait;

use super::define_port_error;
use crate::domain::{CarparkId, DriverId, InterestChange, InterestRelease};

define_port_error! {
    /// Errors raised by interest repositories.
    pub enum InterestRepositoryError {
        /// The store could not be reached.
        Connection { message: String } => "interest store connection failed: {message}",
        /// Concurrent writers kept aborting the transaction.
        Contended { message: String } => "interest store contended: {message}",
        /// A statement failed and the transaction was rolled back.
        Query { message: String } => "interest store query failed: {message}",
        /// No driver row exists for the identifier.
        DriverNotFound { driver_id: String } => "driver {driver_id} not found",
        /// No carpark row exists for the identifier.
        CarparkNotFound { car_park_no: String } => "carpark {car_park_no} not found",
        /// Applying the change would break the pointer/counter pairing.
        InvariantViolation { message: String } => "interest invariant violated: {message}",
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InterestRepository: Send + Sync {
    /// Toggle `driver`'s interest in `carpark`.
    async fn toggle_interest(
        &self,
        driver: &DriverId,
        carpark: &CarparkId,
    ) -> Result<InterestChange, InterestRepositoryError>;

    /// Clear `driver`'s interest and credit `reward_points`.
    async fn release_interest(
        &self,
        driver: &DriverId,
        reward_points: u32,
    ) -> Result<InterestRelease, InterestRepositoryError>;
}
