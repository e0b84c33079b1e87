//! # Schema
//!
//! The Skycast schema lives in `migrations/sqlite/` and is compiled into the
//! binary. [`Database::new`](crate::Database::new) applies it on open.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Skycast Tables                                 │
//! │                                                                         │
//! │  locations                                                              │
//! │    id, name, address, latitude, longitude, is_current, is_favorite     │
//! │    UNIQUE (latitude, longitude)            ← dedup by coordinates      │
//! │    UNIQUE (is_current) WHERE is_current=1  ← one current location      │
//! │        │                                                                │
//! │        │ ON DELETE CASCADE                                              │
//! │        ├──► weather_current_snapshots  (location_id PK, payload JSON)  │
//! │        └──► weather_forecast_snapshots (location_id PK, payload JSON)  │
//! │                                                                         │
//! │  weather_alerts (standalone)                                            │
//! │    CHECK alert_type / notification_mode enums                          │
//! │    CHECK end_time > start_time                                         │
//! │    CHECK latitude and longitude both set or both NULL                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The snapshot foreign keys are what make a weather write for a deleted
//! location fail with [`DbError::ForeignKeyViolation`](crate::DbError).

use sqlx::SqlitePool;
use tracing::info;

use crate::error::DbResult;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Applies any schema files not yet recorded in `_sqlx_migrations`.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    info!(embedded = MIGRATOR.migrations.len(), "Applying Skycast schema");

    MIGRATOR.run(pool).await?;

    info!("Skycast schema up to date");
    Ok(())
}

/// `(embedded, applied)` schema file counts, for the health check.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations")
        .fetch_one(pool)
        .await?;

    Ok((MIGRATOR.migrations.len(), usize::try_from(applied).unwrap_or(0)))
}

// =============================================================================
// Unit Tests
// =============================================================================
