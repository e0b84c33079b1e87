//! # Weather Cache Repository
//!
//! Latest current-conditions and forecast payloads, one row of each per
//! location.
//!
//! ## Storage Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  weather_current_snapshots         weather_forecast_snapshots           │
//! │  ┌──────────────┬───────────┐      ┌──────────────┬───────────┐        │
//! │  │ location_id  │ PK, FK ───┼──┐   │ location_id  │ PK, FK ───┼──┐     │
//! │  │ payload      │ JSON text │  │   │ payload      │ JSON text │  │     │
//! │  │ last_updated │ RFC 3339  │  │   │ last_updated │ RFC 3339  │  │     │
//! │  └──────────────┴───────────┘  │   └──────────────┴───────────┘  │     │
//! │                                ▼                                  ▼     │
//! │                         locations(id)  ON DELETE CASCADE                │
//! │                                                                         │
//! │  Writes replace (INSERT .. ON CONFLICT DO UPDATE), never append.       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use skycast_core::{CurrentConditions, CurrentSnapshot, Forecast, ForecastSnapshot, WeatherSnapshot};

/// Which snapshot table a query targets.
#[derive(Debug, Clone, Copy)]
enum SnapshotKind {
    Current,
    Forecast,
}

impl SnapshotKind {
    fn table(self) -> &'static str {
        match self {
            SnapshotKind::Current => "weather_current_snapshots",
            SnapshotKind::Forecast => "weather_forecast_snapshots",
        }
    }

    fn entity(self) -> &'static str {
        match self {
            SnapshotKind::Current => "current conditions",
            SnapshotKind::Forecast => "forecast",
        }
    }
}

/// Repository for cached weather snapshots.
#[derive(Debug, Clone)]
pub struct WeatherCacheRepository {
    pool: SqlitePool,
}

impl WeatherCacheRepository {
    /// Creates a new WeatherCacheRepository.
    pub fn new(pool: SqlitePool) -> Self {
        WeatherCacheRepository { pool }
    }

    /// Replaces the current-conditions snapshot for a location.
    ///
    /// ## Returns
    /// * `Ok(CurrentSnapshot)` - What is now stored
    /// * `Err(DbError::ForeignKeyViolation)` - Unknown location id
    pub async fn save_current(
        &self,
        location_id: &str,
        payload: &CurrentConditions,
    ) -> DbResult<CurrentSnapshot> {
        let mut conn = self.pool.acquire().await?;
        save_snapshot(&mut *conn, SnapshotKind::Current, location_id, payload, Utc::now()).await
    }

    /// Returns the cached current conditions, if any.
    ///
    /// A stored payload that no longer decodes is an error, not a miss.
    pub async fn get_current(&self, location_id: &str) -> DbResult<Option<CurrentSnapshot>> {
        self.load(SnapshotKind::Current, location_id).await
    }

    /// Replaces the forecast snapshot for a location.
    pub async fn save_forecast(
        &self,
        location_id: &str,
        payload: &Forecast,
    ) -> DbResult<ForecastSnapshot> {
        let mut conn = self.pool.acquire().await?;
        save_snapshot(&mut *conn, SnapshotKind::Forecast, location_id, payload, Utc::now()).await
    }

    /// Returns the cached forecast, if any.
    pub async fn get_forecast(&self, location_id: &str) -> DbResult<Option<ForecastSnapshot>> {
        self.load(SnapshotKind::Forecast, location_id).await
    }

    /// Writes both snapshots in one transaction with a shared timestamp.
    ///
    /// Either both rows are replaced or neither is.
    pub async fn save_all(
        &self,
        location_id: &str,
        current: &CurrentConditions,
        forecast: &Forecast,
    ) -> DbResult<(CurrentSnapshot, ForecastSnapshot)> {
        debug!(location_id = %location_id, "Saving weather snapshots");

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let current = save_snapshot(&mut *tx, SnapshotKind::Current, location_id, current, now).await?;
        let forecast =
            save_snapshot(&mut *tx, SnapshotKind::Forecast, location_id, forecast, now).await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        Ok((current, forecast))
    }

    /// Removes both snapshots of a location.
    ///
    /// ## Returns
    /// Number of rows removed (0, 1 or 2).
    pub async fn delete_all(&self, location_id: &str) -> DbResult<u64> {
        let mut tx = self.pool.begin().await?;
        let mut removed = 0;

        for kind in [SnapshotKind::Current, SnapshotKind::Forecast] {
            removed += sqlx::query(&format!("DELETE FROM {} WHERE location_id = ?1", kind.table()))
                .bind(location_id)
                .execute(&mut *tx)
                .await?
                .rows_affected();
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        Ok(removed)
    }

    /// Purges snapshots last updated before `threshold`, across all locations.
    ///
    /// ## Returns
    /// Number of rows removed from both tables.
    pub async fn delete_stale(&self, threshold: DateTime<Utc>) -> DbResult<u64> {
        let mut tx = self.pool.begin().await?;
        let mut removed = 0;

        for kind in [SnapshotKind::Current, SnapshotKind::Forecast] {
            removed += sqlx::query(&format!("DELETE FROM {} WHERE last_updated < ?1", kind.table()))
                .bind(threshold)
                .execute(&mut *tx)
                .await?
                .rows_affected();
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        debug!(removed, threshold = %threshold, "Purged stale snapshots");
        Ok(removed)
    }

    async fn load<P: DeserializeOwned>(
        &self,
        kind: SnapshotKind,
        location_id: &str,
    ) -> DbResult<Option<WeatherSnapshot<P>>> {
        let row: Option<(String, DateTime<Utc>)> = sqlx::query_as(&format!(
            "SELECT payload, last_updated FROM {} WHERE location_id = ?1",
            kind.table()
        ))
        .bind(location_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some((payload, last_updated)) = row else {
            return Ok(None);
        };

        let payload = serde_json::from_str(&payload)
            .map_err(|e| DbError::corrupt(kind.entity(), location_id, e))?;

        Ok(Some(WeatherSnapshot {
            location_id: location_id.to_string(),
            payload,
            last_updated,
        }))
    }
}

async fn save_snapshot<P: Serialize + Clone>(
    conn: &mut SqliteConnection,
    kind: SnapshotKind,
    location_id: &str,
    payload: &P,
    now: DateTime<Utc>,
) -> DbResult<WeatherSnapshot<P>> {
    let json = serde_json::to_string(payload).map_err(|e| DbError::Serialization(e.to_string()))?;

    sqlx::query(&format!(
        r#"
        INSERT INTO {} (location_id, payload, last_updated)
        VALUES (?1, ?2, ?3)
        ON CONFLICT (location_id) DO UPDATE SET
            payload = excluded.payload,
            last_updated = excluded.last_updated
        "#,
        kind.table()
    ))
    .bind(location_id)
    .bind(&json)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(WeatherSnapshot {
        location_id: location_id.to_string(),
        payload: payload.clone(),
        last_updated: now,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
