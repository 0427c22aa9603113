//! Builds the sync engine and HTTP state from settings.
//!
//! A configured database selects the Diesel adapters after migrating the
//! schema; otherwise both carpark and interest ports share one in-memory
//! store.

use std::io;
use std::sync::Arc;

use carpark_backend::domain::ports::{CarparkRepository, InterestRepository};
use carpark_backend::domain::{
    AvailabilitySync, CarparkMapService, CarparkRegistryLoader, InterestTracker,
    SnapshotGenerator, SyncScheduler,
};
use carpark_backend::inbound::http::state::{HttpState, MapViewConfig};
use carpark_backend::outbound::availability::AvailabilityHttpFeed;
use carpark_backend::outbound::memory::InMemoryCarparkStore;
use carpark_backend::outbound::persistence::{
    DbPool, DieselCarparkRepository, DieselInterestRepository, PoolConfig, run_migrations,
};
use carpark_backend::outbound::registry::CsvRegistrySource;
use carpark_backend::outbound::snapshot::FileSnapshotStore;
use carpark_backend::settings::CarparkSettings;
use mockable::DefaultClock;
use reqwest::Url;
use tracing::{info, warn};

struct Stores {
    carparks: Arc<dyn CarparkRepository>,
    interest: Arc<dyn InterestRepository>,
}

async fn build_stores(settings: &CarparkSettings) -> io::Result<Stores> {
    let Some(url) = settings.database_url() else {
        warn!("no database configured; carpark and interest state live in memory");
        let store = InMemoryCarparkStore::new();
        return Ok(Stores {
            carparks: Arc::new(store.clone()),
            interest: Arc::new(store),
        });
    };

    run_migrations(url).await.map_err(io::Error::other)?;
    let pool = DbPool::new(PoolConfig::new(url))
        .await
        .map_err(|err| io::Error::other(format!("database pool: {err}")))?;
    info!("using PostgreSQL carpark store");
    Ok(Stores {
        carparks: Arc::new(DieselCarparkRepository::new(pool.clone())),
        interest: Arc::new(DieselInterestRepository::new(pool)),
    })
}

/// Services shared between the scheduler and the HTTP workers.
pub struct Engine {
    pub scheduler: SyncScheduler,
    pub loader: CarparkRegistryLoader,
    pub http_state: HttpState,
}

pub async fn build_engine(settings: &CarparkSettings) -> io::Result<Engine> {
    let stores = build_stores(settings).await?;

    let endpoint = Url::parse(settings.availability_url()).map_err(|err| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("invalid availability url {}: {err}", settings.availability_url()),
        )
    })?;
    let feed = AvailabilityHttpFeed::new(endpoint, settings.availability_timeout())
        .map_err(|err| io::Error::other(format!("availability client: {err}")))?;

    let snapshots = SnapshotGenerator::new(
        stores.carparks.clone(),
        Arc::new(FileSnapshotStore::new(settings.snapshot_dir())),
    );
    let loader = CarparkRegistryLoader::new(
        Arc::new(CsvRegistrySource::new(settings.registry_path())),
        stores.carparks.clone(),
    );
    let scheduler = SyncScheduler::new(
        AvailabilitySync::new(Arc::new(feed), stores.carparks),
        snapshots.clone(),
        Arc::new(DefaultClock),
        settings.sync_settings(),
    );
    let http_state = HttpState::new(
        Arc::new(CarparkMapService::new(scheduler.clone(), snapshots.clone())),
        Arc::new(InterestTracker::new(stores.interest, snapshots)),
        MapViewConfig {
            api_key: settings.map_api_key().map(str::to_owned),
        },
    );

    Ok(Engine {
        scheduler,
        loader,
        http_state,
    })
}
