//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **availability**: reqwest client for the live lot availability feed
//! - **memory**: process-local carpark and interest store
//! - **persistence**: PostgreSQL-backed repositories using Diesel ORM
//! - **registry**: CSV reader for the static carpark registry
//! - **snapshot**: JSON snapshot publication on the local filesystem
//!
//! Adapters translate between domain types and infrastructure
//! representations. They contain no business logic.

pub mod availability;
pub mod memory;
pub mod persistence;
pub mod registry;
pub mod snapshot;
