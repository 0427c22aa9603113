//! Carpark and driver state held behind one mutex.
//!
//! Each port call takes the lock once and validates every change before
//! writing any of them, which gives the same all-or-nothing behaviour as
//! the PostgreSQL transaction.
//!
//! No account subsystem feeds this store, so a session driver it has not
//! seen starts with no interest and a zero balance. The account is only
//! recorded once an operation on it succeeds.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::domain::ports::{
    CarparkRepository, CarparkRepositoryError, InterestRepository, InterestRepositoryError,
};
use crate::domain::{
    AvailabilityRecord, Carpark, CarparkId, DriverId, InterestChange, InterestOutcome,
    InterestRelease, LotStatus, NewCarpark, credit_points, decrement_interest, increment_interest,
    plan_toggle,
};

/// Interest pointer and loyalty balance for one driver.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DriverAccount {
    pub interested_carpark: Option<CarparkId>,
    pub points: u32,
}

#[derive(Debug, Default)]
struct StoreState {
    carparks: BTreeMap<CarparkId, Carpark>,
    drivers: HashMap<DriverId, DriverAccount>,
}

impl StoreState {
    fn interest_count(&self, id: &CarparkId) -> Result<u32, InterestRepositoryError> {
        self.carparks
            .get(id)
            .map(|carpark| carpark.interested_driver_count)
            .ok_or_else(|| {
                InterestRepositoryError::invariant_violation(format!(
                    "driver points at unknown carpark {id}"
                ))
            })
    }

    fn decremented(&self, id: &CarparkId) -> Result<u32, InterestRepositoryError> {
        decrement_interest(id, self.interest_count(id)?)
    }

    fn incremented(&self, id: &CarparkId) -> Result<u32, InterestRepositoryError> {
        increment_interest(id, self.interest_count(id)?)
    }

    fn set_interest_count(&mut self, id: &CarparkId, count: u32) {
        if let Some(carpark) = self.carparks.get_mut(id) {
            carpark.interested_driver_count = count;
        }
    }
}

/// In-memory implementation of the carpark and interest ports.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCarparkStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryCarparkStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn driver(&self, driver: &DriverId) -> Option<DriverAccount> {
        self.lock().drivers.get(driver).cloned()
    }

    pub fn carpark(&self, id: &CarparkId) -> Option<Carpark> {
        self.lock().carparks.get(id).cloned()
    }
}

#[async_trait]
impl CarparkRepository for InMemoryCarparkStore {
    async fn existing_ids(
        &self,
        ids: &[CarparkId],
    ) -> Result<HashSet<CarparkId>, CarparkRepositoryError> {
        let state = self.lock();
        Ok(ids
            .iter()
            .filter(|id| state.carparks.contains_key(*id))
            .cloned()
            .collect())
    }

    async fn insert_new(&self, carparks: &[NewCarpark]) -> Result<usize, CarparkRepositoryError> {
        let mut state = self.lock();
        let mut inserted = 0;
        for carpark in carparks {
            if state.carparks.contains_key(&carpark.id) {
                continue;
            }
            state
                .carparks
                .insert(carpark.id.clone(), carpark.clone().into_carpark());
            inserted += 1;
        }
        Ok(inserted)
    }

    async fn apply_availability(
        &self,
        records: &[AvailabilityRecord],
    ) -> Result<usize, CarparkRepositoryError> {
        let mut state = self.lock();
        let mut updated = 0;
        for record in records {
            let Some(carpark) = state.carparks.get_mut(&record.id) else {
                continue;
            };
            carpark.lots = LotStatus {
                total_lots: Some(record.total_lots),
                lots_available: Some(record.lots_available),
                lot_type: Some(record.lot_type.clone()),
                last_updated: Some(record.updated_at.clone()),
            };
            updated += 1;
        }
        Ok(updated)
    }

    async fn list_all(&self) -> Result<Vec<Carpark>, CarparkRepositoryError> {
        Ok(self.lock().carparks.values().cloned().collect())
    }
}

#[async_trait]
impl InterestRepository for InMemoryCarparkStore {
    async fn toggle_interest(
        &self,
        driver: &DriverId,
        carpark: &CarparkId,
    ) -> Result<InterestChange, InterestRepositoryError> {
        let mut state = self.lock();
        let account = state.drivers.get(driver).cloned().unwrap_or_default();
        if !state.carparks.contains_key(carpark) {
            return Err(InterestRepositoryError::carpark_not_found(
                carpark.to_string(),
            ));
        }

        let plan = plan_toggle(account.interested_carpark.as_ref(), carpark);
        let mut writes = Vec::with_capacity(2);
        if let Some(id) = &plan.decrement {
            writes.push((id.clone(), state.decremented(id)?));
        }
        if let Some(id) = &plan.increment {
            writes.push((id.clone(), state.incremented(id)?));
        }

        for (id, count) in writes {
            state.set_interest_count(&id, count);
        }
        state.drivers.entry(*driver).or_default().interested_carpark = plan.pointer.clone();

        let interested_driver_count = state.interest_count(carpark)?;
        let previous = match plan.outcome {
            InterestOutcome::Added => plan.decrement,
            InterestOutcome::Removed => None,
        };
        Ok(InterestChange {
            outcome: plan.outcome,
            carpark: carpark.clone(),
            previous,
            interested_driver_count,
        })
    }

    async fn release_interest(
        &self,
        driver: &DriverId,
        reward_points: u32,
    ) -> Result<InterestRelease, InterestRepositoryError> {
        let mut state = self.lock();
        let account = state.drivers.get(driver).cloned().unwrap_or_default();
        let points = credit_points(account.points, reward_points)?;
        if let Some(id) = &account.interested_carpark {
            let count = state.decremented(id)?;
            state.set_interest_count(id, count);
        }
        state.drivers.insert(
            *driver,
            DriverAccount {
                interested_carpark: None,
                points,
            },
        );
        Ok(InterestRelease {
            released: account.interested_carpark,
            points,
        })
    }
}

#[cfg(test)]
#[path = "carpark_store_tests.rs"]
mod tests;
