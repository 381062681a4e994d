//! `mapchange-monitor` -- applies queued map changes to game server
//! instances.
//!
//! Polls `next_wipe_info` for queued requests, rewrites `Rust.LevelUrl` in
//! each instance's `RustModule.kvp`, restarts the instance through the
//! instance manager and clears the queued flag.
//!
//! See [`MonitorConfig::from_env`] for the environment variables.

use std::sync::Arc;

use mapchange_core::config_patch::ConfigPatcher;
use mapchange_monitor::config::{redact_url, MonitorConfig};
use mapchange_monitor::pipeline::Pipeline;
use mapchange_monitor::poller::MapChangeMonitor;
use mapchange_monitor::store::PgWipeStore;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "mapchange_monitor=info,mapchange_core=info,mapchange_db=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = MonitorConfig::from_env().unwrap_or_else(|e| {
        tracing::error!(error = %e, "Invalid configuration");
        std::process::exit(1);
    });

    tracing::info!(
        database = %redact_url(&config.database_url),
        instances_dir = %config.instances_dir.display(),
        poll_interval_secs = config.poll_interval.as_secs(),
        settle_secs = config.settle_delay.as_secs(),
        restart_program = %config.restart_command.program(),
        "Starting mapchange-monitor",
    );

    let pool = match mapchange_db::connect(&config.database_url).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!(error = %e, "Error connecting to the database");
            std::process::exit(1);
        }
    };
    tracing::info!("Connected to the database");

    match mapchange_db::server_version(&pool).await {
        Ok(version) => tracing::info!(%version, "Database version"),
        Err(e) => {
            tracing::error!(error = %e, "Database health check failed");
            std::process::exit(1);
        }
    }

    let pipeline = Pipeline::new(
        PgWipeStore::new(pool),
        ConfigPatcher::new(config.instances_dir),
        config.restart_command,
        config.settle_delay,
    );
    let monitor = Arc::new(MapChangeMonitor::new(pipeline, config.poll_interval));

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Interrupt received");
                cancel.cancel();
            }
        }
    });

    monitor.run(cancel).await;
}
