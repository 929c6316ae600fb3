//! Prospekt reclaim sweeper runtime.
//!
//! Housekeeping process that reverts stale lead leases on an interval.
//! Claim-time eligibility already treats stale leases as claimable; running
//! this keeps locked counts honest and emits reclaim audit entries eagerly.

#![forbid(unsafe_code)]

use std::env;
use std::sync::Arc;
use std::time::Duration;

use prospekt_application::ReclaimSweeper;
use prospekt_core::{AppError, AppResult};
use prospekt_infrastructure::{PostgresAuditRepository, PostgresLeadRepository};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
struct SweeperConfig {
    database_url: String,
    sweep_interval_ms: u64,
}

impl SweeperConfig {
    fn load() -> AppResult<Self> {
        let database_url = required_env("DATABASE_URL")?;
        let sweep_interval_ms = parse_env_u64("SWEEP_INTERVAL_MS", 60_000)?;

        if sweep_interval_ms == 0 {
            return Err(AppError::Validation(
                "SWEEP_INTERVAL_MS must be greater than zero".to_owned(),
            ));
        }

        Ok(Self {
            database_url,
            sweep_interval_ms,
        })
    }
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = SweeperConfig::load()?;
    let pool = connect_pool(config.database_url.as_str()).await?;

    let leads = Arc::new(PostgresLeadRepository::new(pool.clone()));
    let audit_repository = Arc::new(PostgresAuditRepository::new(pool));

    info!(
        sweep_interval_ms = config.sweep_interval_ms,
        "prospekt-sweeper started"
    );

    let sweeper = ReclaimSweeper::start(
        leads,
        audit_repository,
        Duration::from_millis(config.sweep_interval_ms),
    );

    tokio::signal::ctrl_c().await.map_err(|error| {
        AppError::Internal(format!("failed to listen for shutdown signal: {error}"))
    })?;

    info!("shutdown signal received; stopping reclaim sweeper");
    sweeper.stop().await;
    info!("prospekt-sweeper stopped");

    Ok(())
}

async fn connect_pool(database_url: &str) -> AppResult<PgPool> {
    PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await
        .map_err(|error| AppError::Internal(format!("failed to connect to database: {error}")))
}

fn required_env(name: &str) -> AppResult<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| AppError::Validation(format!("{name} must be set")))
}

fn parse_env_u64(name: &str, default: u64) -> AppResult<u64> {
    let Ok(raw) = env::var(name) else {
        return Ok(default);
    };

    raw.trim()
        .parse::<u64>()
        .map_err(|error| AppError::Validation(format!("{name} must be a u64: {error}")))
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}
