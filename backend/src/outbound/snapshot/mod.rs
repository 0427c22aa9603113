//! Snapshot publication adapters.

mod file_store;

pub use file_store::{FileSnapshotStore, SNAPSHOT_FILENAME};
