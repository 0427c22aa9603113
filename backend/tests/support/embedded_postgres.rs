//! Embedded PostgreSQL databases for the Diesel adapter suites.
//!
//! Each test gets a fresh database on the shared cluster, migrated with the
//! same `run_migrations` the server uses at start-up. Seeding and assertions
//! go through `postgres` so they never share a Diesel transaction with the
//! code under test.

use std::any::Any;
use std::panic;
use std::time::Duration;

use carpark_backend::domain::{CarparkId, DriverId};
use carpark_backend::outbound::persistence::{DbPool, PoolConfig, run_migrations};
use pg_embedded_setup_unpriv::{ClusterHandle, TemporaryDatabase};
use postgres::{Client, NoTls};
use tokio::runtime::Runtime;
use uuid::Uuid;

use super::format_postgres_error;

const SHARED_CLUSTER_RETRIES: usize = 3;
const SHARED_CLUSTER_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Render a setup panic payload; the harness panics with a message string.
fn panic_reason(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| (*message).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "cluster setup panicked".to_owned())
}

/// Acquire the shared cluster, turning setup panics into errors.
///
/// The harness panics rather than returning `Err` when it cannot start the
/// cluster at all (for example as root without a worker binary).
fn shared_cluster_handle() -> Result<&'static ClusterHandle, String> {
    panic::catch_unwind(pg_embedded_setup_unpriv::test_support::shared_cluster_handle)
        .map_err(|payload| panic_reason(payload.as_ref()))?
        .map_err(|error| format!("{error:?}"))
}

fn shared_cluster() -> Result<&'static ClusterHandle, String> {
    let mut attempt = 1;
    loop {
        match shared_cluster_handle() {
            Ok(handle) => return Ok(handle),
            Err(error) if attempt >= SHARED_CLUSTER_RETRIES => {
                return Err(format!("shared cluster: {error}"));
            }
            Err(_) => {
                std::thread::sleep(SHARED_CLUSTER_RETRY_DELAY);
                attempt += 1;
            }
        }
    }
}

/// A migrated database plus the runtime its pool lives on.
pub struct TestDatabase {
    /// Reused for every async call; tests themselves stay synchronous.
    pub runtime: Runtime,
    pub pool: DbPool,
    url: String,
    _database: TemporaryDatabase,
}

impl TestDatabase {
    pub fn provision() -> Result<Self, String> {
        let runtime = Runtime::new().map_err(|err| err.to_string())?;
        let cluster = shared_cluster()?;
        let database = cluster
            .temporary_database(format!("carpark_test_{}", Uuid::new_v4().simple()))
            .map_err(|err| format!("create database: {err:?}"))?;
        let url = database.url().to_owned();

        runtime
            .block_on(run_migrations(&url))
            .map_err(|err| err.to_string())?;
        let config = PoolConfig::new(&url).with_max_size(8).with_min_idle(Some(1));
        let pool = runtime
            .block_on(DbPool::new(config))
            .map_err(|err| err.to_string())?;

        Ok(Self {
            runtime,
            pool,
            url,
            _database: database,
        })
    }

    fn client(&self) -> Client {
        Client::connect(&self.url, NoTls)
            .unwrap_or_else(|err| panic!("connect: {}", format_postgres_error(&err)))
    }

    /// Insert a driver row with no interest and the given balance.
    pub fn seed_driver(&self, points: i32) -> DriverId {
        let id = Uuid::new_v4();
        self.client()
            .execute(
                "INSERT INTO drivers (id, points) VALUES ($1, $2)",
                &[&id, &points],
            )
            .unwrap_or_else(|err| panic!("seed driver: {}", format_postgres_error(&err)));
        DriverId::from_uuid(id)
    }

    pub fn driver_interest(&self, driver: &DriverId) -> Option<String> {
        self.client()
            .query_one(
                "SELECT interested_carpark FROM drivers WHERE id = $1",
                &[driver.as_uuid()],
            )
            .unwrap_or_else(|err| panic!("load driver: {}", format_postgres_error(&err)))
            .get(0)
    }

    pub fn driver_points(&self, driver: &DriverId) -> i32 {
        self.client()
            .query_one("SELECT points FROM drivers WHERE id = $1", &[driver.as_uuid()])
            .unwrap_or_else(|err| panic!("load driver: {}", format_postgres_error(&err)))
            .get(0)
    }

    pub fn interest_count(&self, carpark: &CarparkId) -> i32 {
        self.client()
            .query_one(
                "SELECT interested_driver_count FROM carparks WHERE car_park_no = $1",
                &[&carpark.as_str()],
            )
            .unwrap_or_else(|err| panic!("load carpark: {}", format_postgres_error(&err)))
            .get(0)
    }

    /// Carparks whose counter disagrees with the drivers pointing at them.
    pub fn mismatched_counters(&self) -> Vec<(String, i32, i64)> {
        self.client()
            .query(
                "SELECT c.car_park_no, c.interested_driver_count, COUNT(d.id) \
                 FROM carparks c LEFT JOIN drivers d ON d.interested_carpark = c.car_park_no \
                 GROUP BY c.car_park_no, c.interested_driver_count \
                 HAVING c.interested_driver_count <> COUNT(d.id)",
                &[],
            )
            .unwrap_or_else(|err| panic!("audit counters: {}", format_postgres_error(&err)))
            .into_iter()
            .map(|row| (row.get(0), row.get(1), row.get(2)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    //! Setup panics must reach the skip policy as ordinary errors.

    use super::*;

    #[test]
    fn setup_panics_become_skip_reasons() {
        let payload = panic::catch_unwind(|| {
            panic!("SKIP-TEST-CLUSTER: PG_EMBEDDED_WORKER is not set");
        })
        .expect_err("closure panics");

        assert_eq!(
            panic_reason(payload.as_ref()),
            "SKIP-TEST-CLUSTER: PG_EMBEDDED_WORKER is not set"
        );
    }

    #[test]
    fn formatted_panics_keep_their_message() {
        let worker = "pg_worker";
        let payload = panic::catch_unwind(|| {
            panic!("{worker} binary was not found");
        })
        .expect_err("closure panics");

        assert_eq!(panic_reason(payload.as_ref()), "pg_worker binary was not found");
    }
}
