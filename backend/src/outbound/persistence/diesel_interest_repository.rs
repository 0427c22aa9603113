//! PostgreSQL-backed interest repository.
//!
//! Every operation runs in one transaction that locks the driver row first
//! and then the affected carpark rows in identifier order. The availability
//! update locks carpark rows in the same order before writing. A transaction
//! that still loses a lock race (deadlock or serialization failure) is re-run
//! a bounded number of times before the conflict is reported.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use diesel::OptionalExtension;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt as _;
use diesel_async::{AsyncConnection as _, AsyncPgConnection, RunQueryDsl};
use tokio::time::sleep;
use tracing::debug;
use uuid::Uuid;

use crate::domain::ports::{InterestRepository, InterestRepositoryError};
use crate::domain::{
    CarparkId, DriverId, InterestChange, InterestOutcome, InterestRelease, credit_points,
    decrement_interest, increment_interest, plan_toggle,
};

use super::diesel_error_mapping::{interest_diesel_error, interest_pool_error, is_lock_conflict};
use super::models::DriverRow;
use super::pool::DbPool;
use super::schema::{carparks, drivers};

const MAX_TX_ATTEMPTS: u32 = 3;
const RETRY_BACKOFF: Duration = Duration::from_millis(25);

/// Failure inside an interest transaction.
#[derive(Debug)]
enum InterestTxError {
    Diesel(diesel::result::Error),
    Refused(InterestRepositoryError),
}

impl From<diesel::result::Error> for InterestTxError {
    fn from(value: diesel::result::Error) -> Self {
        Self::Diesel(value)
    }
}

impl From<InterestRepositoryError> for InterestTxError {
    fn from(value: InterestRepositoryError) -> Self {
        Self::Refused(value)
    }
}

impl InterestTxError {
    fn is_retryable(&self) -> bool {
        matches!(self, Self::Diesel(error) if is_lock_conflict(error))
    }

    fn into_repository_error(self, operation: &str) -> InterestRepositoryError {
        match self {
            Self::Diesel(error) => interest_diesel_error(error, operation),
            Self::Refused(error) => error,
        }
    }
}

fn stored_carpark_id(raw: &str) -> Result<CarparkId, InterestRepositoryError> {
    CarparkId::new(raw).map_err(|err| {
        InterestRepositoryError::invariant_violation(format!("stored carpark id {raw:?}: {err}"))
    })
}

fn to_column(value: u32, column: &str) -> Result<i32, InterestRepositoryError> {
    i32::try_from(value)
        .map_err(|_| InterestRepositoryError::invariant_violation(format!("{column} overflow")))
}

async fn lock_driver(
    conn: &mut AsyncPgConnection,
    driver: Uuid,
) -> Result<DriverRow, InterestTxError> {
    drivers::table
        .find(driver)
        .select(DriverRow::as_select())
        .for_update()
        .first(conn)
        .await
        .optional()?
        .ok_or_else(|| InterestRepositoryError::driver_not_found(driver.to_string()).into())
}

/// Lock carpark rows in identifier order and return their counters.
async fn lock_carparks(
    conn: &mut AsyncPgConnection,
    ids: &[CarparkId],
) -> Result<HashMap<CarparkId, u32>, InterestTxError> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let keys: Vec<&str> = ids.iter().map(CarparkId::as_str).collect();
    let rows: Vec<(String, i32)> = carparks::table
        .filter(carparks::car_park_no.eq_any(keys))
        .select((carparks::car_park_no, carparks::interested_driver_count))
        .order_by(carparks::car_park_no.asc())
        .for_update()
        .load(conn)
        .await?;
    let mut counts = HashMap::with_capacity(rows.len());
    for (raw, count) in rows {
        let id = stored_carpark_id(&raw)?;
        let count = u32::try_from(count).map_err(|_| {
            InterestRepositoryError::invariant_violation(format!(
                "carpark {raw} has negative interest counter {count}"
            ))
        })?;
        counts.insert(id, count);
    }
    Ok(counts)
}

fn locked_count(
    counts: &HashMap<CarparkId, u32>,
    id: &CarparkId,
) -> Result<u32, InterestRepositoryError> {
    counts.get(id).copied().ok_or_else(|| {
        InterestRepositoryError::invariant_violation(format!(
            "driver points at carpark {id} which could not be locked"
        ))
    })
}

async fn write_count(
    conn: &mut AsyncPgConnection,
    id: &CarparkId,
    count: u32,
) -> Result<(), InterestTxError> {
    diesel::update(carparks::table.find(id.as_str()))
        .set(carparks::interested_driver_count.eq(to_column(count, "interested_driver_count")?))
        .execute(conn)
        .await?;
    Ok(())
}

/// Run `attempt` until it succeeds, fails for a non-retryable reason, or
/// loses [`MAX_TX_ATTEMPTS`] lock races.
async fn retry_lock_conflicts<T, F, Fut>(
    operation: &str,
    mut attempt: F,
) -> Result<T, InterestRepositoryError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, InterestTxError>>,
{
    let mut tries = 1;
    loop {
        match attempt().await {
            Err(error) if error.is_retryable() && tries < MAX_TX_ATTEMPTS => {
                debug!(%operation, attempt = tries, "interest transaction conflicted; retrying");
                sleep(RETRY_BACKOFF * tries).await;
                tries += 1;
            }
            result => return result.map_err(|err| err.into_repository_error(operation)),
        }
    }
}

async fn toggle_in_transaction(
    conn: &mut AsyncPgConnection,
    driver_id: Uuid,
    target: CarparkId,
) -> Result<InterestChange, InterestTxError> {
    let row = lock_driver(conn, driver_id).await?;
    let current = row
        .interested_carpark
        .as_deref()
        .map(stored_carpark_id)
        .transpose()?;
    let plan = plan_toggle(current.as_ref(), &target);

    let mut counts = lock_carparks(conn, &plan.locked_carparks()).await?;
    if !counts.contains_key(&target) {
        return Err(InterestRepositoryError::carpark_not_found(target.to_string()).into());
    }
    if let Some(id) = &plan.decrement {
        let next = decrement_interest(id, locked_count(&counts, id)?)?;
        write_count(conn, id, next).await?;
        counts.insert(id.clone(), next);
    }
    if let Some(id) = &plan.increment {
        let next = increment_interest(id, locked_count(&counts, id)?)?;
        write_count(conn, id, next).await?;
        counts.insert(id.clone(), next);
    }
    diesel::update(drivers::table.find(driver_id))
        .set(drivers::interested_carpark.eq(plan.pointer.as_ref().map(CarparkId::as_str)))
        .execute(conn)
        .await?;

    let interested_driver_count = locked_count(&counts, &target)?;
    let previous = match plan.outcome {
        InterestOutcome::Added => plan.decrement,
        InterestOutcome::Removed => None,
    };
    Ok(InterestChange {
        outcome: plan.outcome,
        carpark: target,
        previous,
        interested_driver_count,
    })
}

async fn release_in_transaction(
    conn: &mut AsyncPgConnection,
    driver_id: Uuid,
    reward_points: u32,
) -> Result<InterestRelease, InterestTxError> {
    let row = lock_driver(conn, driver_id).await?;
    let released = row
        .interested_carpark
        .as_deref()
        .map(stored_carpark_id)
        .transpose()?;
    if let Some(id) = &released {
        let counts = lock_carparks(conn, std::slice::from_ref(id)).await?;
        let next = decrement_interest(id, locked_count(&counts, id)?)?;
        write_count(conn, id, next).await?;
    }

    let balance = u32::try_from(row.points).map_err(|_| {
        InterestRepositoryError::invariant_violation(format!(
            "driver {driver_id} has negative points {}",
            row.points
        ))
    })?;
    let points = credit_points(balance, reward_points)?;
    diesel::update(drivers::table.find(driver_id))
        .set((
            drivers::interested_carpark.eq(None::<&str>),
            drivers::points.eq(to_column(points, "points")?),
        ))
        .execute(conn)
        .await?;
    Ok(InterestRelease { released, points })
}

/// Diesel implementation of [`InterestRepository`].
#[derive(Clone)]
pub struct DieselInterestRepository {
    pool: DbPool,
}

impl DieselInterestRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InterestRepository for DieselInterestRepository {
    async fn toggle_interest(
        &self,
        driver: &DriverId,
        carpark: &CarparkId,
    ) -> Result<InterestChange, InterestRepositoryError> {
        let driver_id = *driver.as_uuid();
        let pool = &self.pool;
        retry_lock_conflicts("toggle interest", || {
            let target = carpark.clone();
            async move {
                let mut conn = pool
                    .get()
                    .await
                    .map_err(|err| InterestTxError::Refused(interest_pool_error(err)))?;
                conn.transaction::<_, InterestTxError, _>(|conn| {
                    toggle_in_transaction(conn, driver_id, target).scope_boxed()
                })
                .await
            }
        })
        .await
    }

    async fn release_interest(
        &self,
        driver: &DriverId,
        reward_points: u32,
    ) -> Result<InterestRelease, InterestRepositoryError> {
        let driver_id = *driver.as_uuid();
        let pool = &self.pool;
        retry_lock_conflicts("release interest", || async move {
            let mut conn = pool
                .get()
                .await
                .map_err(|err| InterestTxError::Refused(interest_pool_error(err)))?;
            conn.transaction::<_, InterestTxError, _>(|conn| {
                release_in_transaction(conn, driver_id, reward_points).scope_boxed()
            })
            .await
        })
        .await
    }
}
