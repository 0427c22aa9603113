//! Tests for interest planning and the interest tracker service.

use std::sync::Arc;

use rstest::rstest;

use super::*;
use crate::domain::ErrorCode;
use crate::domain::ports::{MockCarparkRepository, MockInterestRepository, MockSnapshotStore};

fn id(value: &str) -> CarparkId {
    CarparkId::new(value).expect("carpark id")
}

fn tracker_with(
    repository: MockInterestRepository,
    carparks: MockCarparkRepository,
    store: MockSnapshotStore,
) -> InterestTracker {
    InterestTracker::new(
        Arc::new(repository),
        SnapshotGenerator::new(Arc::new(carparks), Arc::new(store)),
    )
}

fn publishing_snapshot() -> (MockCarparkRepository, MockSnapshotStore) {
    let mut carparks = MockCarparkRepository::new();
    carparks
        .expect_list_all()
        .times(1)
        .return_once(|| Ok(Vec::new()));
    let mut store = MockSnapshotStore::new();
    store.expect_publish().times(1).return_once(|_| Ok(()));
    (carparks, store)
}

#[rstest]
fn first_selection_adds_without_decrement() {
    let plan = plan_toggle(None, &id("ACB"));
    assert_eq!(plan.outcome, InterestOutcome::Added);
    assert_eq!(plan.pointer, Some(id("ACB")));
    assert_eq!(plan.decrement, None);
    assert_eq!(plan.increment, Some(id("ACB")));
}

#[rstest]
fn reselecting_removes() {
    let plan = plan_toggle(Some(&id("ACB")), &id("ACB"));
    assert_eq!(plan.outcome, InterestOutcome::Removed);
    assert_eq!(plan.pointer, None);
    assert_eq!(plan.decrement, Some(id("ACB")));
    assert_eq!(plan.increment, None);
}

#[rstest]
fn switching_moves_both_counters() {
    let plan = plan_toggle(Some(&id("AM14")), &id("ACB"));
    assert_eq!(plan.outcome, InterestOutcome::Added);
    assert_eq!(plan.decrement, Some(id("AM14")));
    assert_eq!(plan.increment, Some(id("ACB")));
    assert_eq!(plan.locked_carparks(), vec![id("ACB"), id("AM14")]);
}

#[rstest]
fn decrement_below_zero_is_an_invariant_violation() {
    let error = decrement_interest(&id("ACB"), 0).expect_err("violation");
    assert!(matches!(
        error,
        InterestRepositoryError::InvariantViolation { .. }
    ));
    assert_eq!(decrement_interest(&id("ACB"), 3), Ok(2));
}

#[rstest]
#[case(0, Some(1))]
#[case(41, Some(42))]
#[case(i32::MAX as u32, None)]
fn increment_stays_within_column_range(#[case] count: u32, #[case] expected: Option<u32>) {
    assert_eq!(increment_interest(&id("ACB"), count).ok(), expected);
}

#[rstest]
#[case(10, 5, Some(15))]
#[case(i32::MAX as u32, 1, None)]
fn credit_points_checks_overflow(#[case] points: u32, #[case] reward: u32, #[case] expected: Option<u32>) {
    assert_eq!(credit_points(points, reward).ok(), expected);
}

#[rstest]
#[tokio::test]
async fn set_interest_returns_regenerated_snapshot() {
    let driver = DriverId::random();
    let mut repository = MockInterestRepository::new();
    repository
        .expect_toggle_interest()
        .times(1)
        .return_once(|_, carpark| {
            Ok(InterestChange {
                outcome: InterestOutcome::Added,
                carpark: carpark.clone(),
                previous: None,
                interested_driver_count: 1,
            })
        });
    let (carparks, store) = publishing_snapshot();

    let toggle = tracker_with(repository, carparks, store)
        .set_interest(&driver, &id("ACB"))
        .await
        .expect("toggle succeeds");
    assert_eq!(toggle.outcome, InterestOutcome::Added);
    assert_eq!(toggle.carparks, Some(Vec::new()));
}

#[rstest]
#[tokio::test]
async fn committed_toggle_survives_snapshot_failure() {
    let mut repository = MockInterestRepository::new();
    repository
        .expect_toggle_interest()
        .times(1)
        .return_once(|_, carpark| {
            Ok(InterestChange {
                outcome: InterestOutcome::Removed,
                carpark: carpark.clone(),
                previous: None,
                interested_driver_count: 0,
            })
        });
    let mut carparks = MockCarparkRepository::new();
    carparks.expect_list_all().times(1).return_once(|| Ok(Vec::new()));
    let mut store = MockSnapshotStore::new();
    store
        .expect_publish()
        .times(1)
        .return_once(|_| Err(crate::domain::ports::SnapshotStoreError::io("disk full")));

    let toggle = tracker_with(repository, carparks, store)
        .set_interest(&DriverId::random(), &id("ACB"))
        .await
        .expect("toggle succeeds");
    assert_eq!(toggle.outcome, InterestOutcome::Removed);
    assert!(toggle.carparks.is_none());
}

#[rstest]
#[case(InterestRepositoryError::carpark_not_found("ZZZ"), ErrorCode::NotFound)]
#[case(InterestRepositoryError::driver_not_found("d"), ErrorCode::NotFound)]
#[case(InterestRepositoryError::invariant_violation("negative"), ErrorCode::InternalError)]
#[case(InterestRepositoryError::connection("refused"), ErrorCode::ServiceUnavailable)]
#[case(InterestRepositoryError::contended("deadlock detected"), ErrorCode::ServiceUnavailable)]
#[tokio::test]
async fn refused_toggles_do_not_regenerate(
    #[case] failure: InterestRepositoryError,
    #[case] expected: ErrorCode,
) {
    let mut repository = MockInterestRepository::new();
    repository
        .expect_toggle_interest()
        .times(1)
        .return_once(move |_, _| Err(failure));
    let mut carparks = MockCarparkRepository::new();
    carparks.expect_list_all().never();

    let error = tracker_with(repository, carparks, MockSnapshotStore::new())
        .set_interest(&DriverId::random(), &id("ZZZ"))
        .await
        .expect_err("toggle refused");
    assert_eq!(error.code(), expected);
}

#[rstest]
#[tokio::test]
async fn release_without_interest_skips_regeneration() {
    let mut repository = MockInterestRepository::new();
    repository
        .expect_release_interest()
        .withf(|_, reward| *reward == 25)
        .times(1)
        .return_once(|_, reward| {
            Ok(InterestRelease {
                released: None,
                points: 100 + reward,
            })
        });
    let mut carparks = MockCarparkRepository::new();
    carparks.expect_list_all().never();

    let release = tracker_with(repository, carparks, MockSnapshotStore::new())
        .release_interest(&DriverId::random(), 25)
        .await
        .expect("release succeeds");
    assert_eq!(release.points, 125);
    assert_eq!(release.released, None);
}

#[rstest]
#[tokio::test]
async fn release_with_interest_regenerates() {
    let mut repository = MockInterestRepository::new();
    repository
        .expect_release_interest()
        .times(1)
        .return_once(|_, reward| {
            Ok(InterestRelease {
                released: Some(id("ACB")),
                points: reward,
            })
        });
    let (carparks, store) = publishing_snapshot();

    let release = tracker_with(repository, carparks, store)
        .release_interest(&DriverId::random(), 10)
        .await
        .expect("release succeeds");
    assert_eq!(release.released, Some(id("ACB")));
}
