//! Driven port for the published map snapshot.

use async_trait::async_trait;

use super::define_port_error;
use crate::domain::CarparkFeature;

define_port_error! {
    /// Errors raised by snapshot stores.
    pub enum SnapshotStoreError {
        /// Reading or replacing the artifact failed.
        Io { message: String } => "snapshot io failed: {message}",
        /// The features could not be encoded.
        Encode { message: String } => "snapshot encode failed: {message}",
        /// The stored artifact could not be decoded.
        Decode { message: String } => "snapshot decode failed: {message}",
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Replace the published collection as a whole.
    async fn publish(&self, features: &[CarparkFeature]) -> Result<(), SnapshotStoreError>;

    /// The last published collection, if any has been written.
    async fn read_latest(&self) -> Result<Option<Vec<CarparkFeature>>, SnapshotStoreError>;
}
