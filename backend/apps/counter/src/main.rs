//! Download Counter Entry Point
//!
//! Connects to the database, subscribes to object access notifications
//! and keeps running until Ctrl-C or SIGTERM. Uses `anyhow` for startup
//! errors; runtime errors are `downloads::DownloadError` and only logged.

use anyhow::Context;
use downloads::{
    CounterConfig, DownloadCounterService, MinioNotificationListener, store::DownloadStore,
};
use platform::config::{ObjectStorageConfig, duration_secs_from_env, positive_usize_from_env};
use sqlx::postgres::PgPoolOptions;
use std::env;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "counter=info,downloads=info,platform=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = counter_config()?;

    // Database connection
    let database_url =
        env::var("DATABASE_URL").context("DATABASE_URL must be set in environment")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;

    tracing::info!("Connected to database");

    sqlx::migrate!("../../../database/migrations")
        .run(&pool)
        .await?;

    tracing::info!("Migrations completed");

    let store = Arc::new(DownloadStore::new(pool));

    // Startup cleanup: errors here should not prevent startup
    match store.cleanup_expired().await {
        Ok(trackers) => {
            tracing::info!(trackers_deleted = trackers, "Download tracker cleanup completed");
        }
        Err(e) => {
            tracing::warn!(
                error = %e,
                "Download tracker cleanup failed, continuing anyway"
            );
        }
    }

    // Missing credentials or a bad endpoint leave the service degraded
    let listener = ObjectStorageConfig::from_env().and_then(|storage| {
        match MinioNotificationListener::new(storage) {
            Ok(listener) => Some(listener),
            Err(e) => {
                e.log();
                None
            }
        }
    });

    let mut service = DownloadCounterService::new(store.clone(), store, config)?;
    service.start(listener);

    shutdown_signal().await;
    tracing::info!("Shutdown signal received");

    service.stop().await;

    Ok(())
}

fn counter_config() -> anyhow::Result<CounterConfig> {
    let defaults = CounterConfig::default();

    let base = match env::var("DOWNLOAD_IP_SALT") {
        Ok(salt) if !salt.is_empty() => CounterConfig::with_salt(salt),
        _ if cfg!(debug_assertions) => {
            tracing::warn!("DOWNLOAD_IP_SALT not set, using a random salt for this run");
            CounterConfig::with_random_salt()
        }
        _ => anyhow::bail!("DOWNLOAD_IP_SALT must be set in production"),
    };

    Ok(CounterConfig {
        tracking_window: duration_secs_from_env(
            "DOWNLOAD_TRACKING_WINDOW_SECS",
            defaults.tracking_window,
        )?,
        sweep_interval: duration_secs_from_env(
            "DOWNLOAD_SWEEP_INTERVAL_SECS",
            defaults.sweep_interval,
        )?,
        max_in_flight: positive_usize_from_env("DOWNLOAD_MAX_IN_FLIGHT", defaults.max_in_flight)?,
        ..base
    })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
