//! Shared HTTP adapter state.
//!
//! Handlers receive this through `web::Data` and only depend on the driving
//! ports, which keeps them testable without I/O.

use std::sync::Arc;

use crate::domain::ports::{CarparkInterestCommand, CarparkMapQuery};

/// Values exposed to the map view as configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MapViewConfig {
    pub api_key: Option<String>,
}

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub carparks: Arc<dyn CarparkMapQuery>,
    pub interest: Arc<dyn CarparkInterestCommand>,
    pub map_view: MapViewConfig,
}

impl HttpState {
    pub fn new(
        carparks: Arc<dyn CarparkMapQuery>,
        interest: Arc<dyn CarparkInterestCommand>,
        map_view: MapViewConfig,
    ) -> Self {
        Self {
            carparks,
            interest,
            map_view,
        }
    }
}
