//! Carpark data synchronisation and driver interest tracking.
//!
//! The crate is laid out hexagonally: `domain` owns the carpark model, the
//! sync services and the port traits; `outbound` adapts those ports to
//! PostgreSQL, the availability feed, the registry CSV and the snapshot file;
//! `inbound` exposes the map and interest operations over HTTP.

pub mod doc;
pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;
pub mod settings;
#[cfg(test)]
pub mod test_support;

pub use domain::TraceId;
pub use middleware::Trace;
