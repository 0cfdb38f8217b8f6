//! Backend entry-point: loads settings, prepares persistence and serves the API.

mod server;

use std::sync::Arc;

use actix_web::web;
use color_eyre::eyre::{Result, WrapErr, eyre};
use mockable::DefaultClock;
use ortho_config::OrthoConfig;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use gigzz_backend::inbound::http::health::HealthState;
use gigzz_backend::outbound::memory::InMemoryMarketplace;
use gigzz_backend::outbound::persistence::{DbPool, PoolConfig, run_pending_migrations};
use gigzz_backend::settings::AppSettings;
use server::{PersistenceBackend, ServerConfig, create_server};

/// Application bootstrap.
#[actix_web::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = AppSettings::load().map_err(|err| eyre!("failed to load settings: {err}"))?;
    let bind_addr = settings.bind_addr()?;
    let persistence = prepare_persistence(&settings).await?;
    let config = ServerConfig::new(bind_addr, persistence).with_idempotency(settings.idempotency());

    let health_state = web::Data::new(HealthState::new());
    let server = create_server(health_state.clone(), config)
        .await
        .wrap_err_with(|| format!("failed to start server on {bind_addr}"))?;
    info!(%bind_addr, "listening");

    let result = server.await;
    health_state.mark_unhealthy();
    result.wrap_err("server terminated with an error")
}

async fn prepare_persistence(settings: &AppSettings) -> Result<PersistenceBackend> {
    let Some(database_url) = settings.database_url() else {
        warn!("no database URL configured; using in-memory storage, balances reset on restart");
        return Ok(PersistenceBackend::InMemory(Arc::new(
            InMemoryMarketplace::new(Arc::new(DefaultClock)),
        )));
    };

    if settings.skip_migrations {
        info!("skipping database migrations");
    } else {
        run_pending_migrations(database_url)
            .await
            .wrap_err("failed to apply database migrations")?;
    }

    let pool = DbPool::new(
        PoolConfig::new(database_url).with_max_size(settings.db_pool_max_size()),
    )
    .await
    .map_err(|err| eyre!("failed to create database pool: {err}"))?;
    Ok(PersistenceBackend::Postgres(pool))
}
