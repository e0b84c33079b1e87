//! # Location Repository
//!
//! Database operations for known locations.
//!
//! ## Key Operations
//! - Upsert by coordinates (dedup on `(latitude, longitude)`)
//! - Atomic "current location" switch, also for typed-in places with an address
//! - Favorite flag, rename, address updates
//! - Delete with cascading snapshot cleanup
//!
//! ## Current Location Switch
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    set_current(id) in ONE transaction                   │
//! │                                                                         │
//! │  BEGIN                                                                  │
//! │    UPDATE locations SET is_current = 0                                 │
//! │     WHERE is_current = 1 AND id != :id    ← clear the old one          │
//! │    UPDATE locations SET is_current = 1                                 │
//! │     WHERE id = :id                        ← 0 rows? ROLLBACK           │
//! │  COMMIT                                                                 │
//! │                                                                         │
//! │  Partial unique index (is_current) WHERE is_current = 1 means a        │
//! │  second current row can never be committed, even by a racing writer.   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use skycast_core::validation::{
    validate_address, validate_coordinates, validate_location_name,
};
use skycast_core::Location;

/// Column list shared by every SELECT / RETURNING clause.
const COLUMNS: &str =
    "id, name, address, latitude, longitude, is_current, is_favorite, created_at, updated_at";

/// Repository for location database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = LocationRepository::new(pool);
///
/// let york = repo.upsert_by_coordinates(53.96, -1.08, "York").await?;
/// repo.set_current(&york.id).await?;
/// ```
#[derive(Debug, Clone)]
pub struct LocationRepository {
    pool: SqlitePool,
}

impl LocationRepository {
    /// Creates a new LocationRepository.
    pub fn new(pool: SqlitePool) -> Self {
        LocationRepository { pool }
    }

    /// Creates the location at the given coordinates, or renames the one
    /// already stored there.
    ///
    /// ## Arguments
    /// * `lat`, `lon` - Coordinates in degrees (validated, `-0.0` folded to `0.0`)
    /// * `name` - Display name
    ///
    /// ## Returns
    /// * `Ok(Location)` - The stored row (existing id kept on conflict)
    /// * `Err(DbError::Validation)` - Coordinates or name rejected
    pub async fn upsert_by_coordinates(&self, lat: f64, lon: f64, name: &str) -> DbResult<Location> {
        let (lat, lon) = validate_coordinates(lat, lon)?;
        let name = validate_location_name(name)?;
        let now = Utc::now();

        debug!(lat = %lat, lon = %lon, name = %name, "Upserting location");

        let location = sqlx::query_as::<_, Location>(&format!(
            r#"
            INSERT INTO locations (
                id, name, address, latitude, longitude,
                is_current, is_favorite, created_at, updated_at
            ) VALUES (?1, ?2, NULL, ?3, ?4, 0, 0, ?5, ?5)
            ON CONFLICT (latitude, longitude) DO UPDATE SET
                name = excluded.name,
                updated_at = excluded.updated_at
            RETURNING {COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4().to_string())
        .bind(&name)
        .bind(lat)
        .bind(lon)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(location)
    }

    /// Gets a location by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Location))` - Location found
    /// * `Ok(None)` - No such location
    pub async fn get(&self, id: &str) -> DbResult<Option<Location>> {
        let location =
            sqlx::query_as::<_, Location>(&format!("SELECT {COLUMNS} FROM locations WHERE id = ?1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(location)
    }

    /// Finds the location stored at exactly these coordinates.
    pub async fn find_by_coordinates(&self, lat: f64, lon: f64) -> DbResult<Option<Location>> {
        let (lat, lon) = validate_coordinates(lat, lon)?;

        let location = sqlx::query_as::<_, Location>(&format!(
            "SELECT {COLUMNS} FROM locations WHERE latitude = ?1 AND longitude = ?2"
        ))
        .bind(lat)
        .bind(lon)
        .fetch_optional(&self.pool)
        .await?;

        Ok(location)
    }

    /// Returns the current location, if one is set.
    pub async fn get_current(&self) -> DbResult<Option<Location>> {
        let location = sqlx::query_as::<_, Location>(&format!(
            "SELECT {COLUMNS} FROM locations WHERE is_current = 1"
        ))
        .fetch_optional(&self.pool)
        .await?;

        Ok(location)
    }

    /// Lists favorite locations ordered by name.
    pub async fn list_favorites(&self) -> DbResult<Vec<Location>> {
        let locations = sqlx::query_as::<_, Location>(&format!(
            "SELECT {COLUMNS} FROM locations WHERE is_favorite = 1 \
             ORDER BY name COLLATE NOCASE, created_at"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(locations)
    }

    /// Lists every known location ordered by name.
    pub async fn list_all(&self) -> DbResult<Vec<Location>> {
        let locations = sqlx::query_as::<_, Location>(&format!(
            "SELECT {COLUMNS} FROM locations ORDER BY name COLLATE NOCASE, created_at"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(locations)
    }

    /// Number of stored locations.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM locations")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Makes `id` the only current location.
    ///
    /// ## Returns
    /// * `Ok(())` - `id` is now the single current location
    /// * `Err(DbError::NotFound)` - Unknown id; the previous current row is untouched
    pub async fn set_current(&self, id: &str) -> DbResult<()> {
        debug!(location_id = %id, "Setting current location");

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        // Write first so the transaction takes the write lock immediately
        sqlx::query(
            "UPDATE locations SET is_current = 0, updated_at = ?1 \
             WHERE is_current = 1 AND id != ?2",
        )
        .bind(now)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        let result = sqlx::query("UPDATE locations SET is_current = 1, updated_at = ?1 WHERE id = ?2")
            .bind(now)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(DbError::not_found("Location", id));
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        Ok(())
    }

    /// Stores a typed-in place and makes it the only current location, in one
    /// transaction.
    ///
    /// An existing row at the coordinates keeps its id and favorite flag but
    /// takes the new name and address.
    ///
    /// ## Returns
    /// * `Ok(Location)` - The stored row, now current
    /// * `Err(DbError::Validation)` - Coordinates, name or address rejected; nothing written
    pub async fn upsert_current_with_address(
        &self,
        lat: f64,
        lon: f64,
        name: &str,
        address: &str,
    ) -> DbResult<Location> {
        let (lat, lon) = validate_coordinates(lat, lon)?;
        let name = validate_location_name(name)?;
        let address = validate_address(address)?;
        let now = Utc::now();

        debug!(lat = %lat, lon = %lon, name = %name, "Setting manual current location");

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "UPDATE locations SET is_current = 0, updated_at = ?1 \
             WHERE is_current = 1 AND NOT (latitude = ?2 AND longitude = ?3)",
        )
        .bind(now)
        .bind(lat)
        .bind(lon)
        .execute(&mut *tx)
        .await?;

        let location = sqlx::query_as::<_, Location>(&format!(
            r#"
            INSERT INTO locations (
                id, name, address, latitude, longitude,
                is_current, is_favorite, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, 1, 0, ?6, ?6)
            ON CONFLICT (latitude, longitude) DO UPDATE SET
                name = excluded.name,
                address = excluded.address,
                is_current = 1,
                updated_at = excluded.updated_at
            RETURNING {COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4().to_string())
        .bind(&name)
        .bind(&address)
        .bind(lat)
        .bind(lon)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        Ok(location)
    }

    /// Sets or clears the favorite flag.
    pub async fn set_favorite(&self, id: &str, is_favorite: bool) -> DbResult<()> {
        debug!(location_id = %id, is_favorite, "Setting favorite flag");

        let result = sqlx::query("UPDATE locations SET is_favorite = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(is_favorite)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Location", id));
        }
        Ok(())
    }

    /// Changes the display name.
    pub async fn rename(&self, id: &str, name: &str) -> DbResult<()> {
        let name = validate_location_name(name)?;

        let result = sqlx::query("UPDATE locations SET name = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(&name)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Location", id));
        }
        Ok(())
    }

    /// Stores the resolved address string.
    pub async fn update_address(&self, id: &str, address: &str) -> DbResult<()> {
        let address = validate_address(address)?;

        let result = sqlx::query("UPDATE locations SET address = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(&address)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Location", id));
        }
        Ok(())
    }

    /// Deletes a location. Its cached snapshots go with it (ON DELETE CASCADE).
    ///
    /// ## Returns
    /// `true` if a row was deleted, `false` if the id was unknown.
    pub async fn delete(&self, id: &str) -> DbResult<bool> {
        debug!(location_id = %id, "Deleting location");

        let result = sqlx::query("DELETE FROM locations WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    async fn repo() -> LocationRepository {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.locations()
    }

    #[tokio::test]
    async fn test_upsert_dedups_by_coordinates() {
        let repo = repo().await;

        let first = repo.upsert_by_coordinates(60.7128, -70.006, "York").await.unwrap();
        let second = repo
            .upsert_by_coordinates(60.7128, -70.006, "New York")
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.name, "New York");
        assert_eq!(second.created_at, first.created_at);
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_upsert_negative_zero_matches_zero() {
        let repo = repo().await;

        let a = repo.upsert_by_coordinates(0.0, 0.0, "Null Island").await.unwrap();
        let b = repo.upsert_by_coordinates(-0.0, -0.0, "Null Island").await.unwrap();

        assert_eq!(a.id, b.id);
        assert!(repo.find_by_coordinates(-0.0, 0.0).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_upsert_rejects_invalid_input() {
        let repo = repo().await;

        let err = repo.upsert_by_coordinates(91.0, 0.0, "Nowhere").await.unwrap_err();
        assert!(matches!(err, DbError::Validation(_)));

        let err = repo.upsert_by_coordinates(1.0, 1.0, "  ").await.unwrap_err();
        assert!(matches!(err, DbError::Validation(_)));

        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_set_current_moves_the_flag() {
        let repo = repo().await;
        let a = repo.upsert_by_coordinates(1.0, 1.0, "A").await.unwrap();
        let b = repo.upsert_by_coordinates(2.0, 2.0, "B").await.unwrap();

        repo.set_current(&a.id).await.unwrap();
        assert_eq!(repo.get_current().await.unwrap().unwrap().id, a.id);

        repo.set_current(&b.id).await.unwrap();
        assert_eq!(repo.get_current().await.unwrap().unwrap().id, b.id);
        assert!(!repo.get(&a.id).await.unwrap().unwrap().is_current);

        // Setting the same one again is fine
        repo.set_current(&b.id).await.unwrap();
        assert_eq!(repo.get_current().await.unwrap().unwrap().id, b.id);
    }

    #[tokio::test]
    async fn test_set_current_unknown_id_keeps_previous() {
        let repo = repo().await;
        let a = repo.upsert_by_coordinates(1.0, 1.0, "A").await.unwrap();
        repo.set_current(&a.id).await.unwrap();

        let err = repo.set_current("missing").await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(repo.get_current().await.unwrap().unwrap().id, a.id);
    }

    #[tokio::test]
    async fn test_concurrent_set_current_leaves_exactly_one() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(DbConfig::new(dir.path().join("loc.db")))
            .await
            .unwrap();
        let repo = db.locations();

        let mut ids = Vec::new();
        for i in 0..8 {
            let loc = repo
                .upsert_by_coordinates(i as f64, i as f64, &format!("L{i}"))
                .await
                .unwrap();
            ids.push(loc.id);
        }

        let handles: Vec<_> = ids
            .iter()
            .cloned()
            .map(|id| {
                let repo = repo.clone();
                tokio::spawn(async move { repo.set_current(&id).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let current: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM locations WHERE is_current = 1")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(current, 1);
    }

    #[tokio::test]
    async fn test_favorites_rename_and_address() {
        let repo = repo().await;
        let york = repo.upsert_by_coordinates(53.96, -1.08, "York").await.unwrap();
        let leeds = repo.upsert_by_coordinates(53.8, -1.55, "Leeds").await.unwrap();

        repo.set_favorite(&york.id, true).await.unwrap();
        repo.set_favorite(&leeds.id, true).await.unwrap();
        let names: Vec<_> = repo
            .list_favorites()
            .await
            .unwrap()
            .into_iter()
            .map(|l| l.name)
            .collect();
        assert_eq!(names, vec!["Leeds", "York"]);

        repo.set_favorite(&leeds.id, false).await.unwrap();
        assert_eq!(repo.list_favorites().await.unwrap().len(), 1);

        repo.rename(&york.id, "Home").await.unwrap();
        repo.update_address(&york.id, "York, England, GB").await.unwrap();
        let york = repo.get(&york.id).await.unwrap().unwrap();
        assert_eq!(york.name, "Home");
        assert_eq!(york.address.as_deref(), Some("York, England, GB"));

        assert!(repo.rename("missing", "x").await.unwrap_err().is_not_found());
        assert!(repo.set_favorite("missing", true).await.unwrap_err().is_not_found());
        assert!(repo
            .update_address("missing", "x")
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn test_upsert_current_with_address() {
        let repo = repo().await;
        let old = repo.upsert_by_coordinates(1.0, 1.0, "Old").await.unwrap();
        repo.set_current(&old.id).await.unwrap();
        let york = repo.upsert_by_coordinates(53.96, -1.08, "Home").await.unwrap();
        repo.set_favorite(&york.id, true).await.unwrap();

        let manual = repo
            .upsert_current_with_address(53.96, -1.08, "York", "York, England, GB")
            .await
            .unwrap();
        assert_eq!(manual.id, york.id);
        assert_eq!(manual.name, "York");
        assert_eq!(manual.address.as_deref(), Some("York, England, GB"));
        assert!(manual.is_current);
        assert!(manual.is_favorite);
        assert!(!repo.get(&old.id).await.unwrap().unwrap().is_current);

        // Calling again on the current row keeps it current
        let again = repo
            .upsert_current_with_address(53.96, -1.08, "York", "York, GB")
            .await
            .unwrap();
        assert!(again.is_current);
        assert_eq!(repo.get_current().await.unwrap().unwrap().id, york.id);
    }

    #[tokio::test]
    async fn test_upsert_current_with_bad_address_writes_nothing() {
        let repo = repo().await;
        let old = repo.upsert_by_coordinates(1.0, 1.0, "Old").await.unwrap();
        repo.set_current(&old.id).await.unwrap();

        let err = repo
            .upsert_current_with_address(2.0, 2.0, "New", "   ")
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Validation(_)));
        assert_eq!(repo.count().await.unwrap(), 1);
        assert_eq!(repo.get_current().await.unwrap().unwrap().id, old.id);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let repo = repo().await;
        let loc = repo.upsert_by_coordinates(5.0, 5.0, "Gone").await.unwrap();

        assert!(repo.delete(&loc.id).await.unwrap());
        assert!(!repo.delete(&loc.id).await.unwrap());
        assert!(repo.get(&loc.id).await.unwrap().is_none());
    }
}
