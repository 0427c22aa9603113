//! Runtime configuration loaded via OrthoConfig.
//!
//! Values layer from configuration files, `CARPARK_*` environment variables
//! and command-line flags. Unset values fall back to the defaults exposed by
//! the accessors below.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;

use crate::domain::SyncSettings;

const DEFAULT_REGISTRY_PATH: &str = "fixtures/hdb-carpark-information.csv";
const DEFAULT_AVAILABILITY_URL: &str =
    "https://api.data.gov.sg/v1/transport/carpark-availability";
const DEFAULT_AVAILABILITY_TIMEOUT_SECS: u64 = 15;
const DEFAULT_SYNC_INTERVAL_SECS: u64 = 300;
const DEFAULT_FRESHNESS_SECS: u64 = 60;
const DEFAULT_ON_DEMAND_WAIT_MILLIS: u64 = 2_000;
const DEFAULT_SNAPSHOT_DIR: &str = "static";
const DEFAULT_BIND_ADDR: SocketAddr =
    SocketAddr::new(std::net::IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED), 8080);

/// Configuration for the sync engine and its HTTP surface.
#[derive(Debug, Clone, Default, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "CARPARK")]
pub struct CarparkSettings {
    /// PostgreSQL connection string; the in-memory store is used when unset.
    pub database_url: Option<String>,
    /// Path of the registry CSV export.
    pub registry_path: Option<PathBuf>,
    /// Endpoint of the live availability feed.
    pub availability_url: Option<String>,
    pub availability_timeout_secs: Option<u64>,
    pub sync_interval_secs: Option<u64>,
    /// How old the last successful sync may be before a map request triggers one.
    pub freshness_secs: Option<u64>,
    pub on_demand_wait_millis: Option<u64>,
    /// Directory receiving the published snapshot.
    pub snapshot_dir: Option<PathBuf>,
    pub bind_addr: Option<SocketAddr>,
    /// Map-rendering API key handed to the map view.
    pub map_api_key: Option<String>,
}

impl CarparkSettings {
    pub fn database_url(&self) -> Option<&str> {
        self.database_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    pub fn registry_path(&self) -> PathBuf {
        self.registry_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_REGISTRY_PATH))
    }

    pub fn availability_url(&self) -> &str {
        self.availability_url
            .as_deref()
            .unwrap_or(DEFAULT_AVAILABILITY_URL)
    }

    pub fn availability_timeout(&self) -> Duration {
        Duration::from_secs(
            self.availability_timeout_secs
                .unwrap_or(DEFAULT_AVAILABILITY_TIMEOUT_SECS)
                .max(1),
        )
    }

    /// Scheduler timing derived from the configured values.
    pub fn sync_settings(&self) -> SyncSettings {
        SyncSettings::default()
            .with_interval(Duration::from_secs(
                self.sync_interval_secs.unwrap_or(DEFAULT_SYNC_INTERVAL_SECS),
            ))
            .with_freshness(Duration::from_secs(
                self.freshness_secs.unwrap_or(DEFAULT_FRESHNESS_SECS),
            ))
            .with_on_demand_wait(Duration::from_millis(
                self.on_demand_wait_millis
                    .unwrap_or(DEFAULT_ON_DEMAND_WAIT_MILLIS),
            ))
    }

    pub fn snapshot_dir(&self) -> PathBuf {
        self.snapshot_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SNAPSHOT_DIR))
    }

    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr.unwrap_or(DEFAULT_BIND_ADDR)
    }

    pub fn map_api_key(&self) -> Option<&str> {
        self.map_api_key.as_deref().filter(|key| !key.is_empty())
    }
}
