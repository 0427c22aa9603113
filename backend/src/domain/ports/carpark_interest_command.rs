//! Driving port for driver interest changes.

use async_trait::async_trait;

use crate::domain::{
    CarparkId, DriverId, Error, InterestOutcome, InterestRelease, InterestToggle,
};

/// Use-case port for toggling and releasing a driver's carpark interest.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CarparkInterestCommand: Send + Sync {
    /// Toggle interest in `carpark` and return the regenerated snapshot.
    async fn set_interest(
        &self,
        driver: &DriverId,
        carpark: &CarparkId,
    ) -> Result<InterestToggle, Error>;

    /// Clear the driver's interest and credit `reward_points`.
    async fn release_interest(
        &self,
        driver: &DriverId,
        reward_points: u32,
    ) -> Result<InterestRelease, Error>;
}

/// Fixture command that always reports an added interest.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureCarparkInterestCommand;

#[async_trait]
impl CarparkInterestCommand for FixtureCarparkInterestCommand {
    async fn set_interest(
        &self,
        _driver: &DriverId,
        carpark: &CarparkId,
    ) -> Result<InterestToggle, Error> {
        Ok(InterestToggle {
            outcome: InterestOutcome::Added,
            carpark: carpark.clone(),
            carparks: Some(Vec::new()),
        })
    }

    async fn release_interest(
        &self,
        _driver: &DriverId,
        reward_points: u32,
    ) -> Result<InterestRelease, Error> {
        Ok(InterestRelease {
            released: None,
            points: reward_points,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[tokio::test]
    async fn fixture_echoes_requested_carpark() {
        let command = FixtureCarparkInterestCommand;
        let carpark = CarparkId::new("ACB").expect("carpark id");
        let toggle = command
            .set_interest(&DriverId::random(), &carpark)
            .await
            .expect("toggle");
        assert_eq!(toggle.outcome, InterestOutcome::Added);
        assert_eq!(toggle.carpark, carpark);
    }
}
