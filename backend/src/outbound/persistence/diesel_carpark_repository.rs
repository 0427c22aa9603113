//! PostgreSQL-backed carpark repository.

use std::collections::HashSet;

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::sql_query;
use diesel::sql_types::{Array, Integer, Text};
use diesel_async::RunQueryDsl;
use tracing::warn;

use crate::domain::ports::{CarparkRepository, CarparkRepositoryError};
use crate::domain::{AvailabilityRecord, Carpark, CarparkId, NewCarpark};

use super::diesel_error_mapping::{carpark_diesel_error, carpark_pool_error};
use super::models::{CarparkRow, NewCarparkRow};
use super::pool::DbPool;
use super::schema::carparks;

/// Rows per INSERT statement; keeps bind counts well under the protocol limit.
const INSERT_CHUNK: usize = 500;

const APPLY_AVAILABILITY_SQL: &str = r#"
UPDATE carparks AS target
SET
    total_lots = feed.total_lots,
    lots_available = feed.lots_available,
    lot_type = feed.lot_type,
    lot_info_last_updated = feed.updated_at
FROM unnest(
    $1::text[],
    $2::integer[],
    $3::integer[],
    $4::text[],
    $5::text[]
) AS feed(car_park_no, total_lots, lots_available, lot_type, updated_at)
WHERE target.car_park_no = feed.car_park_no
"#;

/// Column-oriented availability batch for the `unnest` update.
#[derive(Debug, Default, PartialEq, Eq)]
struct AvailabilityColumns {
    ids: Vec<String>,
    totals: Vec<i32>,
    available: Vec<i32>,
    lot_types: Vec<String>,
    updated_at: Vec<String>,
}

fn to_columns(records: &[AvailabilityRecord]) -> Result<AvailabilityColumns, CarparkRepositoryError> {
    let mut columns = AvailabilityColumns::default();
    for record in records {
        let total = i32::try_from(record.total_lots).map_err(|_| {
            CarparkRepositoryError::query(format!("total_lots out of range for {}", record.id))
        })?;
        let available = i32::try_from(record.lots_available).map_err(|_| {
            CarparkRepositoryError::query(format!("lots_available out of range for {}", record.id))
        })?;
        columns.ids.push(record.id.to_string());
        columns.totals.push(total);
        columns.available.push(available);
        columns.lot_types.push(record.lot_type.clone());
        columns.updated_at.push(record.updated_at.clone());
    }
    Ok(columns)
}

/// Diesel implementation of [`CarparkRepository`].
#[derive(Clone)]
pub struct DieselCarparkRepository {
    pool: DbPool,
}

impl DieselCarparkRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CarparkRepository for DieselCarparkRepository {
    async fn existing_ids(
        &self,
        ids: &[CarparkId],
    ) -> Result<HashSet<CarparkId>, CarparkRepositoryError> {
        if ids.is_empty() {
            return Ok(HashSet::new());
        }
        let keys: Vec<&str> = ids.iter().map(CarparkId::as_str).collect();
        let mut conn = self.pool.get().await.map_err(carpark_pool_error)?;
        let found: Vec<String> = carparks::table
            .filter(carparks::car_park_no.eq_any(keys))
            .select(carparks::car_park_no)
            .load(&mut conn)
            .await
            .map_err(|err| carpark_diesel_error(err, "load existing carpark ids"))?;
        Ok(found
            .into_iter()
            .filter_map(|value| CarparkId::new(value).ok())
            .collect())
    }

    async fn insert_new(&self, carparks: &[NewCarpark]) -> Result<usize, CarparkRepositoryError> {
        use diesel_async::AsyncConnection as _;
        use diesel_async::scoped_futures::ScopedFutureExt as _;

        let rows = carparks
            .iter()
            .map(|carpark| {
                NewCarparkRow::from_domain(carpark).ok_or_else(|| {
                    CarparkRepositoryError::query(format!(
                        "car_park_decks out of range for {}",
                        carpark.id
                    ))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        if rows.is_empty() {
            return Ok(0);
        }

        let mut conn = self.pool.get().await.map_err(carpark_pool_error)?;
        conn.transaction::<_, diesel::result::Error, _>(|conn| {
            async move {
                let mut inserted = 0;
                for chunk in rows.chunks(INSERT_CHUNK) {
                    inserted += diesel::insert_into(carparks::table)
                        .values(chunk)
                        .on_conflict(carparks::car_park_no)
                        .do_nothing()
                        .execute(conn)
                        .await?;
                }
                Ok(inserted)
            }
            .scope_boxed()
        })
        .await
        .map_err(|err| carpark_diesel_error(err, "insert registry carparks"))
    }

    async fn apply_availability(
        &self,
        records: &[AvailabilityRecord],
    ) -> Result<usize, CarparkRepositoryError> {
        use diesel_async::AsyncConnection as _;
        use diesel_async::scoped_futures::ScopedFutureExt as _;

        if records.is_empty() {
            return Ok(0);
        }
        let columns = to_columns(records)?;
        let mut conn = self.pool.get().await.map_err(carpark_pool_error)?;
        // Lock in identifier order, as the interest transactions do, before
        // the UPDATE touches rows in scan order.
        conn.transaction::<_, diesel::result::Error, _>(|conn| {
            async move {
                carparks::table
                    .filter(carparks::car_park_no.eq_any(&columns.ids))
                    .select(carparks::car_park_no)
                    .order_by(carparks::car_park_no.asc())
                    .for_update()
                    .load::<String>(conn)
                    .await?;
                sql_query(APPLY_AVAILABILITY_SQL)
                    .bind::<Array<Text>, _>(&columns.ids)
                    .bind::<Array<Integer>, _>(&columns.totals)
                    .bind::<Array<Integer>, _>(&columns.available)
                    .bind::<Array<Text>, _>(&columns.lot_types)
                    .bind::<Array<Text>, _>(&columns.updated_at)
                    .execute(conn)
                    .await
            }
            .scope_boxed()
        })
        .await
        .map_err(|err| carpark_diesel_error(err, "apply availability"))
    }

    async fn list_all(&self) -> Result<Vec<Carpark>, CarparkRepositoryError> {
        let mut conn = self.pool.get().await.map_err(carpark_pool_error)?;
        let rows: Vec<CarparkRow> = carparks::table
            .select(CarparkRow::as_select())
            .order_by(carparks::car_park_no.asc())
            .load(&mut conn)
            .await
            .map_err(|err| carpark_diesel_error(err, "list carparks"))?;
        Ok(rows
            .into_iter()
            .filter_map(|row| match Carpark::try_from(row) {
                Ok(carpark) => Some(carpark),
                Err(error) => {
                    warn!(%error, "skipping unreadable carpark row");
                    None
                }
            })
            .collect())
    }
}
