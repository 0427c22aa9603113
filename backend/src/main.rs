//! Backend entry-point: loads settings, runs the startup registry load,
//! starts the sync loop and serves the REST API.

mod server;

use actix_web::web;
use mockable::DefaultEnv;
use ortho_config::OrthoConfig;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use carpark_backend::inbound::http::health::HealthState;
use carpark_backend::inbound::http::session_config::{BuildMode, session_settings_from_env};
use carpark_backend::settings::CarparkSettings;
use server::{ServerConfig, build_engine, create_server};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = CarparkSettings::load_from_iter(std::env::args_os())
        .map_err(|err| std::io::Error::other(format!("configuration: {err}")))?;
    let session = session_settings_from_env(&DefaultEnv::new(), BuildMode::from_debug_assertions())
        .map_err(std::io::Error::other)?;

    let engine = build_engine(&settings).await?;
    if let Some(report) = engine.scheduler.run_startup(&engine.loader).await {
        info!(
            total = report.total,
            inserted = report.inserted,
            existing = report.existing,
            rejected = report.rejected,
            "registry ready"
        );
    }
    let sync_loop = engine.scheduler.spawn();

    let health_state = web::Data::new(HealthState::new());
    let server = create_server(
        health_state.clone(),
        ServerConfig::new(session, settings.bind_addr(), engine.http_state),
    )?;
    info!(bind_addr = %settings.bind_addr(), "carpark backend listening");

    let result = server.await;
    health_state.mark_unhealthy();
    sync_loop.abort();
    result
}
