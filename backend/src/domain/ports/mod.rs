//! Domain ports for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod availability_feed;
mod carpark_interest_command;
mod carpark_map_query;
mod carpark_registry_source;
mod carpark_repository;
mod interest_repository;
mod snapshot_store;

#[cfg(test)]
pub use availability_feed::MockAvailabilityFeed;
pub use availability_feed::{
    AvailabilityBatch, AvailabilityFeed, AvailabilityFeedError, FixtureAvailabilityFeed,
};
#[cfg(test)]
pub use carpark_interest_command::MockCarparkInterestCommand;
pub use carpark_interest_command::{CarparkInterestCommand, FixtureCarparkInterestCommand};
#[cfg(test)]
pub use carpark_map_query::MockCarparkMapQuery;
pub use carpark_map_query::{CarparkMapQuery, FixtureCarparkMapQuery};
#[cfg(test)]
pub use carpark_registry_source::MockCarparkRegistrySource;
pub use carpark_registry_source::{
    CarparkRegistrySource, CarparkRegistrySourceError, FixtureCarparkRegistrySource,
    RawRegistryRecord, RegistryBatch,
};
#[cfg(test)]
pub use carpark_repository::MockCarparkRepository;
pub use carpark_repository::{
    CarparkRepository, CarparkRepositoryError, FixtureCarparkRepository,
};
#[cfg(test)]
pub use interest_repository::MockInterestRepository;
pub use interest_repository::{InterestRepository, InterestRepositoryError};
#[cfg(test)]
pub use snapshot_store::MockSnapshotStore;
pub use snapshot_store::{SnapshotStore, SnapshotStoreError};
