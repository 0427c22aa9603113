//! One-shot load of the carpark registry CSV into PostgreSQL.
//!
//! Settings come from the same `CARPARK_*` environment as the server; the
//! flags below override the database and dataset location.
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::Arc;

use carpark_backend::domain::CarparkRegistryLoader;
use carpark_backend::outbound::persistence::{
    DbPool, DieselCarparkRepository, PoolConfig, run_migrations,
};
use carpark_backend::outbound::registry::CsvRegistrySource;
use carpark_backend::settings::CarparkSettings;
use clap::Parser;
use color_eyre::eyre::{Context, Result, eyre};
use ortho_config::OrthoConfig;
use tokio::runtime::Builder;
use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt};

/// `load-registry` command arguments.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "load-registry",
    about = "Insert carparks from the registry CSV that are not yet stored",
    version
)]
struct CliArgs {
    /// Registry CSV path. Falls back to `CARPARK_REGISTRY_PATH`.
    #[arg(long = "registry-path", value_name = "path")]
    registry_path: Option<PathBuf>,
    /// Database connection URL. Falls back to `CARPARK_DATABASE_URL`.
    #[arg(long = "database-url", value_name = "url")]
    database_url: Option<String>,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    if let Err(error) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init()
    {
        warn!(%error, "tracing init failed");
    }

    let args = CliArgs::parse();
    // Only the program name is forwarded so the flags above stay ours.
    let settings = CarparkSettings::load_from_iter([OsString::from("load-registry")])
        .map_err(|error| eyre!("failed to load carpark settings: {error}"))?;

    let database_url = args
        .database_url
        .or_else(|| settings.database_url().map(str::to_owned))
        .ok_or_else(|| eyre!("no database configured; pass --database-url"))?;
    let registry_path = args
        .registry_path
        .unwrap_or_else(|| settings.registry_path());

    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .wrap_err("failed to build Tokio runtime")?;
    runtime.block_on(load(database_url, registry_path))
}

async fn load(database_url: String, registry_path: PathBuf) -> Result<()> {
    run_migrations(&database_url)
        .await
        .wrap_err("failed to migrate the carpark schema")?;
    let pool = DbPool::new(PoolConfig::new(&database_url).with_max_size(2))
        .await
        .wrap_err("failed to create database pool")?;

    let loader = CarparkRegistryLoader::new(
        Arc::new(CsvRegistrySource::new(&registry_path)),
        Arc::new(DieselCarparkRepository::new(pool)),
    );
    let report = loader
        .load()
        .await
        .map_err(|error| eyre!("registry load from {} failed: {error}", registry_path.display()))?;

    println!(
        "{}",
        serde_json::to_string_pretty(&report).wrap_err("failed to render load report")?
    );
    Ok(())
}
