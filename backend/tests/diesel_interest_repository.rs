//! Integration tests for `DieselInterestRepository` against embedded
//! PostgreSQL, covering pointer/counter pairing under concurrency.

use std::sync::Arc;

use carpark_backend::domain::ports::{
    CarparkRepository, InterestRepository, InterestRepositoryError,
};
use carpark_backend::domain::{DriverId, InterestOutcome};
use carpark_backend::outbound::persistence::{DieselCarparkRepository, DieselInterestRepository};
use futures::future::join_all;
use rstest::{fixture, rstest};

mod support;

use support::{
    TestDatabase, availability, carpark_id, handle_cluster_setup_failure, new_carpark,
};

struct Seeded {
    db: TestDatabase,
    repo: DieselInterestRepository,
}

#[fixture]
fn seeded() -> Option<Seeded> {
    let db = match TestDatabase::provision() {
        Ok(database) => database,
        Err(reason) => return handle_cluster_setup_failure(reason),
    };
    let carparks = DieselCarparkRepository::new(db.pool.clone());
    db.runtime
        .block_on(carparks.insert_new(&[
            new_carpark("ACB"),
            new_carpark("ACM"),
            new_carpark("AK19"),
        ]))
        .expect("seed carparks");
    let repo = DieselInterestRepository::new(db.pool.clone());
    Some(Seeded { db, repo })
}

#[rstest]
fn first_toggle_adds_and_second_removes(seeded: Option<Seeded>) {
    let Some(Seeded { db, repo }) = seeded else { return };
    let driver = db.seed_driver(0);
    let acb = carpark_id("ACB");

    let added = db
        .runtime
        .block_on(repo.toggle_interest(&driver, &acb))
        .expect("add");
    assert_eq!(added.outcome, InterestOutcome::Added);
    assert_eq!(added.interested_driver_count, 1);
    assert_eq!(db.driver_interest(&driver).as_deref(), Some("ACB"));

    let removed = db
        .runtime
        .block_on(repo.toggle_interest(&driver, &acb))
        .expect("remove");
    assert_eq!(removed.outcome, InterestOutcome::Removed);
    assert_eq!(removed.interested_driver_count, 0);
    assert_eq!(db.driver_interest(&driver), None);
    assert!(db.mismatched_counters().is_empty());
}

#[rstest]
fn switching_moves_the_count(seeded: Option<Seeded>) {
    let Some(Seeded { db, repo }) = seeded else { return };
    let driver = db.seed_driver(0);

    db.runtime
        .block_on(repo.toggle_interest(&driver, &carpark_id("ACB")))
        .expect("add");
    let switched = db
        .runtime
        .block_on(repo.toggle_interest(&driver, &carpark_id("ACM")))
        .expect("switch");

    assert_eq!(switched.outcome, InterestOutcome::Added);
    assert_eq!(switched.previous, Some(carpark_id("ACB")));
    assert_eq!(db.interest_count(&carpark_id("ACB")), 0);
    assert_eq!(db.interest_count(&carpark_id("ACM")), 1);
    assert!(db.mismatched_counters().is_empty());
}

#[rstest]
fn unknown_rows_are_reported_without_changes(seeded: Option<Seeded>) {
    let Some(Seeded { db, repo }) = seeded else { return };
    let driver = db.seed_driver(0);
    db.runtime
        .block_on(repo.toggle_interest(&driver, &carpark_id("ACB")))
        .expect("add");

    let missing_carpark = db
        .runtime
        .block_on(repo.toggle_interest(&driver, &carpark_id("ZZZ")));
    let missing_driver = db
        .runtime
        .block_on(repo.toggle_interest(&DriverId::random(), &carpark_id("ACB")));

    assert!(matches!(
        missing_carpark,
        Err(InterestRepositoryError::CarparkNotFound { .. })
    ));
    assert!(matches!(
        missing_driver,
        Err(InterestRepositoryError::DriverNotFound { .. })
    ));
    assert_eq!(db.driver_interest(&driver).as_deref(), Some("ACB"));
    assert_eq!(db.interest_count(&carpark_id("ACB")), 1);
}

#[rstest]
fn release_clears_interest_and_credits_points(seeded: Option<Seeded>) {
    let Some(Seeded { db, repo }) = seeded else { return };
    let driver = db.seed_driver(5);
    db.runtime
        .block_on(repo.toggle_interest(&driver, &carpark_id("AK19")))
        .expect("add");

    let release = db
        .runtime
        .block_on(repo.release_interest(&driver, 10))
        .expect("release");

    assert_eq!(release.released, Some(carpark_id("AK19")));
    assert_eq!(release.points, 15);
    assert_eq!(db.driver_points(&driver), 15);
    assert_eq!(db.driver_interest(&driver), None);
    assert_eq!(db.interest_count(&carpark_id("AK19")), 0);
}

#[rstest]
fn concurrent_adds_count_every_driver(seeded: Option<Seeded>) {
    let Some(Seeded { db, repo }) = seeded else { return };
    let drivers: Vec<DriverId> = (0..12).map(|_| db.seed_driver(0)).collect();
    let repo = Arc::new(repo);
    let acb = carpark_id("ACB");

    let results = db.runtime.block_on(async {
        let tasks = drivers.iter().copied().map(|driver| {
            let repo = Arc::clone(&repo);
            let acb = acb.clone();
            tokio::spawn(async move { repo.toggle_interest(&driver, &acb).await })
        });
        join_all(tasks).await
    });

    for result in results {
        let change = result.expect("task joined").expect("toggle");
        assert_eq!(change.outcome, InterestOutcome::Added);
    }
    assert_eq!(db.interest_count(&acb), 12);
    assert!(db.mismatched_counters().is_empty());
}

#[rstest]
fn concurrent_mixed_toggles_keep_counters_paired(seeded: Option<Seeded>) {
    let Some(Seeded { db, repo }) = seeded else { return };
    let drivers: Vec<DriverId> = (0..6).map(|_| db.seed_driver(0)).collect();
    let targets = [carpark_id("ACB"), carpark_id("ACM"), carpark_id("AK19")];
    let repo = Arc::new(repo);

    let results = db.runtime.block_on(async {
        let tasks = drivers.iter().copied().flat_map(|driver| {
            targets.iter().cloned().map(move |target| (driver, target))
        });
        let tasks = tasks.map(|(driver, target)| {
            let repo = Arc::clone(&repo);
            tokio::spawn(async move { repo.toggle_interest(&driver, &target).await })
        });
        join_all(tasks).await
    });

    for result in results {
        result.expect("task joined").expect("toggle");
    }
    assert!(db.mismatched_counters().is_empty());
}

#[rstest]
fn availability_sync_runs_alongside_interest_moves(seeded: Option<Seeded>) {
    let Some(Seeded { db, repo }) = seeded else { return };
    // Insert in descending order so physical row order opposes identifier order.
    let ids: Vec<String> = (0..120).rev().map(|n| format!("S{n:03}")).collect();
    let carparks = Arc::new(DieselCarparkRepository::new(db.pool.clone()));
    let registry: Vec<_> = ids.iter().map(|raw| new_carpark(raw)).collect();
    db.runtime
        .block_on(carparks.insert_new(&registry))
        .expect("seed carparks");
    let feed: Vec<_> = ids.iter().map(|raw| availability(raw, 100, 40)).collect();
    let drivers: Vec<DriverId> = (0..10).map(|_| db.seed_driver(0)).collect();
    let repo = Arc::new(repo);

    let (sync_results, toggle_results) = db.runtime.block_on(async {
        let sync = {
            let carparks = Arc::clone(&carparks);
            tokio::spawn(async move {
                let mut results = Vec::new();
                for _ in 0..40 {
                    results.push(carparks.apply_availability(&feed).await);
                }
                results
            })
        };
        let toggles = drivers.iter().copied().enumerate().map(|(index, driver)| {
            let repo = Arc::clone(&repo);
            let ids = ids.clone();
            tokio::spawn(async move {
                let mut results = Vec::new();
                for step in 0..20 {
                    let target = carpark_id(&ids[(index * 37 + step * 53) % ids.len()]);
                    results.push(repo.toggle_interest(&driver, &target).await);
                }
                results
            })
        });
        let toggles = join_all(toggles).await;
        (sync.await.expect("sync task joined"), toggles)
    });

    for result in sync_results {
        assert_eq!(result.expect("availability applied"), 120);
    }
    for task in toggle_results {
        for result in task.expect("toggle task joined") {
            result.expect("toggle");
        }
    }
    assert!(db.mismatched_counters().is_empty());
}
