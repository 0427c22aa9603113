//! Process-local adapters used when no database is configured and in tests.

mod carpark_store;

pub use carpark_store::{DriverAccount, InMemoryCarparkStore};
