//! Carpark domain: model, sync services and ports.

pub mod availability_sync;
pub mod carpark;
pub mod carpark_map;
pub mod coordinates;
pub mod driver;
pub mod error;
pub mod interest;
pub mod ports;
pub mod registry_loader;
pub mod snapshot;
pub mod sync_scheduler;
pub mod trace_id;

pub use self::availability_sync::{AvailabilitySync, AvailabilitySyncReport};
pub use self::carpark::{
    AvailabilityRecord, Carpark, CarparkId, CarparkIdValidationError, CarparkProfile, LotStatus,
    NewCarpark,
};
pub use self::carpark_map::{CarparkMap, CarparkMapService};
pub use self::driver::{DriverId, DriverIdValidationError};
pub use self::error::{Error, ErrorCode, TRACE_ID_HEADER};
pub use self::interest::{
    InterestChange, InterestOutcome, InterestPlan, InterestRelease, InterestToggle,
    InterestTracker, credit_points, decrement_interest, increment_interest, plan_toggle,
};
pub use self::registry_loader::{CarparkRegistryLoader, RegistryLoadReport};
pub use self::snapshot::{CarparkFeature, SnapshotGenerator};
pub use self::sync_scheduler::{
    PassTrigger, RefreshOutcome, SyncPassReport, SyncScheduler, SyncSettings,
};
pub use self::trace_id::TraceId;
