//! PostgreSQL persistence adapters using Diesel ORM.
//!
//! Repository implementations translate between Diesel row structs and domain
//! types. Row structs (`models.rs`) and table definitions (`schema.rs`) stay
//! private to this module; callers only see the domain ports.
//!
//! # Example
//!
//! ```ignore
//! use carpark_backend::outbound::persistence::{DbPool, DieselCarparkRepository, PoolConfig};
//!
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/carparks")).await?;
//! let carparks = DieselCarparkRepository::new(pool);
//! ```

mod diesel_carpark_repository;
mod diesel_error_mapping;
mod diesel_interest_repository;
mod migrations;
mod models;
mod pool;
mod schema;

pub use diesel_carpark_repository::DieselCarparkRepository;
pub use diesel_interest_repository::DieselInterestRepository;
pub use migrations::{MigrationError, run_migrations};
pub use pool::{DbPool, PoolConfig, PoolError};
