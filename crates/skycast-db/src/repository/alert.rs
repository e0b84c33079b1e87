//! # Alert Repository
//!
//! CRUD for user-defined weather alerts plus an observable list.
//!
//! Alerts have no link to locations or cached weather. An external
//! scheduler polls [`AlertRepository::list_active`], fires platform
//! notifications, then deactivates what it fired.
//!
//! ## Change Notification
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  save / update / set_active / delete                                    │
//! │       │ (after the write succeeds)                                      │
//! │       ▼                                                                 │
//! │  watch::Sender<u64>  version += 1      (owned by Database)             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  watch_all() stream ──► re-runs list_all() ──► UI                      │
//! │                                                                         │
//! │  The stream emits once on subscribe; bursts of writes coalesce.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::pin::Pin;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures_util::stream::{self, Stream};
use sqlx::SqlitePool;
use tokio::sync::watch;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use skycast_core::validation::{validate_alert_anchor, validate_alert_window};
use skycast_core::{NewWeatherAlert, WeatherAlert};

const COLUMNS: &str = "id, alert_type, start_time, end_time, notification_mode, \
     custom_sound_ref, is_active, latitude, longitude, created_at";

/// Stream of full alert lists, one item per observed change.
pub type AlertStream = Pin<Box<dyn Stream<Item = DbResult<Vec<WeatherAlert>>> + Send>>;

/// Repository for weather alerts.
#[derive(Debug, Clone)]
pub struct AlertRepository {
    pool: SqlitePool,
    changes: Arc<watch::Sender<u64>>,
}

impl AlertRepository {
    /// Creates a new AlertRepository sharing the given change channel.
    pub fn new(pool: SqlitePool, changes: Arc<watch::Sender<u64>>) -> Self {
        AlertRepository { pool, changes }
    }

    /// Stores a new alert.
    ///
    /// ## Returns
    /// * `Ok(WeatherAlert)` - The stored alert with its generated id
    /// * `Err(DbError::Validation)` - Window or anchor rejected
    pub async fn save(&self, alert: NewWeatherAlert) -> DbResult<WeatherAlert> {
        validate_alert_window(alert.start_time, alert.end_time)?;
        let anchor = validate_alert_anchor(alert.latitude, alert.longitude)?;

        let stored = WeatherAlert {
            id: Uuid::new_v4().to_string(),
            alert_type: alert.alert_type,
            start_time: alert.start_time,
            end_time: alert.end_time,
            notification_mode: alert.notification_mode,
            custom_sound_ref: alert.custom_sound_ref,
            is_active: alert.is_active,
            latitude: anchor.map(|(lat, _)| lat),
            longitude: anchor.map(|(_, lon)| lon),
            created_at: Utc::now(),
        };

        debug!(alert_id = %stored.id, alert_type = ?stored.alert_type, "Saving alert");

        sqlx::query(&format!(
            "INSERT INTO weather_alerts ({COLUMNS}) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
        ))
        .bind(&stored.id)
        .bind(stored.alert_type)
        .bind(stored.start_time)
        .bind(stored.end_time)
        .bind(stored.notification_mode)
        .bind(&stored.custom_sound_ref)
        .bind(stored.is_active)
        .bind(stored.latitude)
        .bind(stored.longitude)
        .bind(stored.created_at)
        .execute(&self.pool)
        .await?;

        self.notify();
        Ok(stored)
    }

    /// Gets an alert by its ID.
    pub async fn get(&self, id: &str) -> DbResult<Option<WeatherAlert>> {
        let alert = sqlx::query_as::<_, WeatherAlert>(&format!(
            "SELECT {COLUMNS} FROM weather_alerts WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(alert)
    }

    /// Overwrites every mutable field of an existing alert.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - No alert with `alert.id`
    pub async fn update(&self, alert: &WeatherAlert) -> DbResult<()> {
        validate_alert_window(alert.start_time, alert.end_time)?;
        let anchor = validate_alert_anchor(alert.latitude, alert.longitude)?;

        let result = sqlx::query(
            r#"
            UPDATE weather_alerts SET
                alert_type = ?2,
                start_time = ?3,
                end_time = ?4,
                notification_mode = ?5,
                custom_sound_ref = ?6,
                is_active = ?7,
                latitude = ?8,
                longitude = ?9
            WHERE id = ?1
            "#,
        )
        .bind(&alert.id)
        .bind(alert.alert_type)
        .bind(alert.start_time)
        .bind(alert.end_time)
        .bind(alert.notification_mode)
        .bind(&alert.custom_sound_ref)
        .bind(alert.is_active)
        .bind(anchor.map(|(lat, _)| lat))
        .bind(anchor.map(|(_, lon)| lon))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Alert", &alert.id));
        }

        self.notify();
        Ok(())
    }

    /// Toggles an alert on or off.
    pub async fn set_active(&self, id: &str, is_active: bool) -> DbResult<()> {
        let result = sqlx::query("UPDATE weather_alerts SET is_active = ?2 WHERE id = ?1")
            .bind(id)
            .bind(is_active)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Alert", id));
        }

        self.notify();
        Ok(())
    }

    /// Deletes an alert.
    ///
    /// ## Returns
    /// `true` if a row was deleted.
    pub async fn delete(&self, id: &str) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM weather_alerts WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        let deleted = result.rows_affected() > 0;
        if deleted {
            self.notify();
        }
        Ok(deleted)
    }

    /// All alerts, soonest first.
    pub async fn list_all(&self) -> DbResult<Vec<WeatherAlert>> {
        let alerts = sqlx::query_as::<_, WeatherAlert>(&format!(
            "SELECT {COLUMNS} FROM weather_alerts ORDER BY start_time, created_at"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(alerts)
    }

    /// Alerts that are active and whose window has started by `now`.
    pub async fn list_active(&self, now: DateTime<Utc>) -> DbResult<Vec<WeatherAlert>> {
        let alerts = sqlx::query_as::<_, WeatherAlert>(&format!(
            "SELECT {COLUMNS} FROM weather_alerts \
             WHERE is_active = 1 AND start_time <= ?1 \
             ORDER BY start_time, created_at"
        ))
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        Ok(alerts)
    }

    /// Observes the alert list.
    ///
    /// Yields the full list right away, then again after each write made
    /// through any `AlertRepository` of the same `Database`.
    pub fn watch_all(&self) -> AlertStream {
        let rx = self.changes.subscribe();
        let repo = self.clone();

        Box::pin(stream::unfold(
            (repo, rx, true),
            |(repo, mut rx, first)| async move {
                if !first && rx.changed().await.is_err() {
                    return None;
                }
                let alerts = repo.list_all().await;
                Some((alerts, (repo, rx, false)))
            },
        ))
    }

    fn notify(&self) {
        self.changes.send_modify(|version| *version = version.wrapping_add(1));
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::Duration;
    use futures_util::StreamExt;
    use skycast_core::{AlertType, NotificationMode};

    async fn repo() -> AlertRepository {
        Database::new(DbConfig::in_memory()).await.unwrap().alerts()
    }

    fn storm_at(start: DateTime<Utc>) -> NewWeatherAlert {
        NewWeatherAlert::new(AlertType::Storm, start, start + Duration::hours(2))
    }

    #[tokio::test]
    async fn test_save_and_get() {
        let repo = repo().await;
        let start = Utc::now();

        let saved = repo
            .save(
                storm_at(start)
                    .with_notification_mode(NotificationMode::Alarm)
                    .with_anchor(50.0, -1.0),
            )
            .await
            .unwrap();

        let loaded = repo.get(&saved.id).await.unwrap().unwrap();
        assert_eq!(loaded, saved);
        assert_eq!(loaded.notification_mode, NotificationMode::Alarm);
        assert_eq!(loaded.latitude, Some(50.0));
        assert!(repo.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_rejects_bad_window_and_anchor() {
        let repo = repo().await;
        let start = Utc::now();

        let backwards = NewWeatherAlert::new(AlertType::Rain, start, start - Duration::hours(1));
        assert!(matches!(
            repo.save(backwards).await.unwrap_err(),
            DbError::Validation(_)
        ));

        let mut half_anchor = storm_at(start);
        half_anchor.latitude = Some(10.0);
        assert!(matches!(
            repo.save(half_anchor).await.unwrap_err(),
            DbError::Validation(_)
        ));

        assert!(repo.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_active_filters_on_flag_and_start() {
        let repo = repo().await;
        let now = Utc::now();

        let started = repo.save(storm_at(now - Duration::minutes(10))).await.unwrap();
        let future = repo.save(storm_at(now + Duration::hours(1))).await.unwrap();
        let disabled = repo.save(storm_at(now - Duration::hours(1))).await.unwrap();
        repo.set_active(&disabled.id, false).await.unwrap();

        let active = repo.list_active(now).await.unwrap();
        let ids: Vec<_> = active.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec![started.id.as_str()]);
        assert!(active.iter().all(|a| a.is_due(now)));

        assert_eq!(repo.list_all().await.unwrap().len(), 3);
        assert!(!repo.get(&future.id).await.unwrap().unwrap().is_due(now));
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let repo = repo().await;
        let mut alert = repo.save(storm_at(Utc::now())).await.unwrap();

        alert.alert_type = AlertType::Snow;
        alert.custom_sound_ref = Some("content://sounds/chime".to_string());
        repo.update(&alert).await.unwrap();
        assert_eq!(repo.get(&alert.id).await.unwrap().unwrap(), alert);

        assert!(repo.delete(&alert.id).await.unwrap());
        assert!(!repo.delete(&alert.id).await.unwrap());

        assert!(repo.update(&alert).await.unwrap_err().is_not_found());
        assert!(repo.set_active(&alert.id, true).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_watch_all_emits_on_change() {
        let repo = repo().await;
        let mut stream = repo.watch_all();

        let initial = stream.next().await.unwrap().unwrap();
        assert!(initial.is_empty());

        let saved = repo.save(storm_at(Utc::now())).await.unwrap();
        let after_save = tokio::time::timeout(std::time::Duration::from_secs(2), stream.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(after_save.len(), 1);

        repo.delete(&saved.id).await.unwrap();
        let after_delete = tokio::time::timeout(std::time::Duration::from_secs(2), stream.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert!(after_delete.is_empty());
    }
}
