//! # Skycast Maintenance Pass
//!
//! Composition root: wires config, database, client and orchestrator, then
//! refreshes the current location and every favorite and purges stale
//! snapshots. Meant to be run by a periodic scheduler.
//!
//! ```text
//! init_tracing → SkycastConfig::load → Database::new → OpenWeatherClient
//!      → SyncOrchestrator → refresh current + favorites → purge stale
//! ```
//!
//! ## Usage
//! ```bash
//! SKYCAST_API_KEY=... cargo run -p skycast-sync --bin skycast
//! RUST_LOG=skycast=trace cargo run -p skycast-sync --bin skycast -- ./skycast.toml
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use skycast_db::{Database, DbConfig};
use skycast_sync::{OpenWeatherClient, SkycastConfig, SyncOrchestrator};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = SkycastConfig::load(config_path)?;
    info!(
        units = %config.units(),
        language = %config.language(),
        "Configuration loaded"
    );

    if config.api.api_key().is_none() {
        warn!("No API key configured; refreshes will fail and the cache is left as is");
    }

    let db_path = config
        .database_path()
        .ok_or("Could not determine app data directory")?;
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let db = Database::new(DbConfig::new(db_path.clone())).await?;

    let client = OpenWeatherClient::new(config.api.clone())?;
    let orchestrator = SyncOrchestrator::new(db.clone(), Arc::new(client), config);

    let mut targets = Vec::new();
    if let Some(current) = orchestrator.database().locations().get_current().await? {
        targets.push(current);
    }
    for favorite in orchestrator.database().locations().list_favorites().await? {
        if !targets.iter().any(|t| t.id == favorite.id) {
            targets.push(favorite);
        }
    }

    let mut refreshed = 0;
    for location in &targets {
        if orchestrator.refresh_location(&location.id).await? {
            refreshed += 1;
        } else {
            warn!(location_id = %location.id, name = %location.name, "Refresh failed, keeping cached weather");
        }
    }

    let purged = orchestrator.purge_stale_weather().await?;

    info!(
        locations = targets.len(),
        refreshed,
        purged,
        "Maintenance pass complete"
    );

    db.close().await;
    Ok(())
}

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=skycast=trace` - Show trace for skycast crates only
/// - Default: `info,skycast=debug,sqlx=warn`
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,skycast=debug,sqlx=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
