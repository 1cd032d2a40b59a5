mod app;
mod render;

use std::{
    fs::{self, OpenOptions},
    sync::{Arc, Mutex},
};

use anyhow::{Context, Result};
use chrono::Utc;
use spacetrader_core::{
    bootstrap,
    config::{self, AppConfig},
    Capabilities, MemoryWorld, SessionRuntime, SessionSettings, SnapshotFile, WorldSnapshot,
};
use tracing::info;
use tracing_subscriber::{prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;

    config::ensure_default_config()?;
    let config = AppConfig::load()?;

    let store = SnapshotFile::new(config.world_path());
    let snapshot = store.load_or_seed(|| WorldSnapshot::demo(&config.username, Utc::now()))?;
    let world = Arc::new(MemoryWorld::new(snapshot));
    let caps = Capabilities::from_world(world.clone());

    let settings = SessionSettings {
        refresh_interval: chrono::Duration::from_std(config.refresh_interval())
            .unwrap_or_else(|_| SessionSettings::default().refresh_interval),
    };
    let state = bootstrap(&caps, &world.ship_catalog(), &config.username, settings)
        .await
        .with_context(|| format!("failed to start a session for {}", config.username))?;
    info!(username = %config.username, world = %store.path().display(), "Starting session");

    let runtime = SessionRuntime::new(state, caps);
    let mut app = app::SpaceTraderApp::new(runtime, world, store, config.tick_rate());
    app.run().await
}

fn init_logging() -> Result<()> {
    let log_dir = std::env::current_dir()?.join("logs");
    fs::create_dir_all(&log_dir)?;
    let log_path = log_dir.join("spacetrader.log");
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("failed to open {}", log_path.display()))?;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // The terminal belongs to the UI, so logs only go to the file.
    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(false)
        .compact()
        .with_writer(Mutex::new(log_file));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .init();

    Ok(())
}
