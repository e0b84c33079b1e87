//! # Sync Orchestrator
//!
//! Decides when weather comes from the local cache and when it is fetched
//! from the remote API, and owns the location lifecycle around it.
//!
//! ## Decision Table
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                 get_location_with_weather(id, force, network)           │
//! │                                                                         │
//! │  network  force   behavior                                             │
//! │  ───────  ─────   ──────────────────────────────────────────────────   │
//! │  false    any     cache only; None on miss; never touches the network  │
//! │  true     false   cache hit → cached; miss → fetch, store, return      │
//! │  true     true    fetch, store, return; on failure → cached or None    │
//! │                                                                         │
//! │  A fetch is current + forecast requested together. It counts only if   │
//! │  both succeed, and both are then written in one transaction.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Fetch Task
//! ```text
//! ┌──────────────┐  tokio::spawn   ┌──────────────────────────────────────┐
//! │   caller     │ ──────────────► │ fetch_current ┐                      │
//! │  (awaits     │                 │ fetch_forecast┘ try_join → save_all  │
//! │   JoinHandle)│ ◄────────────── │                                      │
//! └──────────────┘   FetchOutcome  └──────────────────────────────────────┘
//!
//!  Dropping the caller's future detaches the task; the cache write still
//!  happens so later readers find it warm.
//! ```
//!
//! Fetch failures never leave this module. Invalid input and local store
//! failures do, as [`SyncError`].

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use skycast_core::validation::{validate_address, validate_coordinates, validate_location_name};
use skycast_core::{
    CurrentSnapshot, ForecastSnapshot, Location, LocationMethod, LocationWithWeather,
    NewWeatherAlert, Units, WeatherAlert, CURRENT_LOCATION_NAME,
};
use skycast_db::{AlertStream, Database, DbError};

use crate::client::{FetchError, WeatherApi};
use crate::config::SkycastConfig;
use crate::error::{SyncError, SyncResult};

// =============================================================================
// Fetch Outcome
// =============================================================================

/// Result of one fetch attempt that did not hit a local store error.
#[derive(Debug)]
enum FetchOutcome {
    Stored {
        current: CurrentSnapshot,
        forecast: ForecastSnapshot,
    },
    Failed(FetchError),
    /// The location was deleted while the fetch was in flight.
    Gone,
}

/// Fetches current conditions and forecast for a location and caches both.
///
/// Runs as its own task so the cache write outlives an abandoned caller.
async fn fetch_and_store(
    db: Database,
    client: Arc<dyn WeatherApi>,
    location: Location,
    units: Units,
    lang: String,
) -> SyncResult<FetchOutcome> {
    let (lat, lon) = location.coordinates();

    let fetched = tokio::try_join!(
        client.fetch_current(lat, lon, units, &lang),
        client.fetch_forecast(lat, lon, units, &lang),
    );

    let (current, forecast) = match fetched {
        Ok(pair) => pair,
        Err(e) => {
            warn!(location_id = %location.id, error = %e, "Weather fetch failed");
            return Ok(FetchOutcome::Failed(e));
        }
    };

    let saved = db
        .weather_cache()
        .save_all(&location.id, &current, &forecast)
        .await;

    let (current, forecast) = match saved {
        Ok(pair) => pair,
        Err(DbError::ForeignKeyViolation { .. }) => {
            debug!(location_id = %location.id, "Location deleted during fetch, dropping weather");
            return Ok(FetchOutcome::Gone);
        }
        Err(e) => return Err(e.into()),
    };

    debug!(
        location_id = %location.id,
        temp = current.payload.temperature(),
        "Weather cache updated"
    );

    Ok(FetchOutcome::Stored { current, forecast })
}

// =============================================================================
// Sync Orchestrator
// =============================================================================

/// Cache/fetch coordinator shared by every consumer in the process.
///
/// Built once by the composition root. Cloning is cheap; every field is a
/// handle.
#[derive(Clone)]
pub struct SyncOrchestrator {
    db: Database,
    client: Arc<dyn WeatherApi>,
    config: Arc<SkycastConfig>,
}

impl fmt::Debug for SyncOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncOrchestrator")
            .field("db", &self.db)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SyncOrchestrator {
    /// Creates the orchestrator.
    ///
    /// ## Arguments
    /// * `db` - Opened and migrated database
    /// * `client` - Remote weather source
    /// * `config` - Loaded configuration (units, language, staleness)
    pub fn new(db: Database, client: Arc<dyn WeatherApi>, config: SkycastConfig) -> Self {
        SyncOrchestrator {
            db,
            client,
            config: Arc::new(config),
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    // =========================================================================
    // Current Location
    // =========================================================================

    /// Marks the location at these coordinates as current.
    ///
    /// An existing record at the coordinates keeps its name; a new one is
    /// called "Current location". Seeds the cache on a best-effort basis.
    ///
    /// ## Returns
    /// * `Ok(Location)` - The location, now current
    /// * `Err(SyncError::InvalidInput)` - Coordinates rejected; nothing stored or fetched
    pub async fn set_current_location(&self, lat: f64, lon: f64) -> SyncResult<Location> {
        let (lat, lon) = validate_coordinates(lat, lon)?;
        let locations = self.db.locations();

        let name = match locations.find_by_coordinates(lat, lon).await? {
            Some(existing) => existing.name,
            None => CURRENT_LOCATION_NAME.to_string(),
        };
        let location = locations.upsert_by_coordinates(lat, lon, &name).await?;

        self.make_current(location).await
    }

    /// Like [`set_current_location`](Self::set_current_location) for a place
    /// the user typed in, storing the resolved address too.
    ///
    /// The display name is the first comma-separated part of the address.
    pub async fn set_manual_location(
        &self,
        lat: f64,
        lon: f64,
        address: &str,
    ) -> SyncResult<Location> {
        let (lat, lon) = validate_coordinates(lat, lon)?;
        let address = validate_address(address)?;
        let name = name_from_address(&address);

        let location = self
            .db
            .locations()
            .upsert_current_with_address(lat, lon, &name, &address)
            .await?;

        self.announce_current(location).await
    }

    async fn make_current(&self, location: Location) -> SyncResult<Location> {
        self.db.locations().set_current(&location.id).await?;
        self.announce_current(location).await
    }

    /// Logs, seeds and re-reads a location that was just made current.
    async fn announce_current(&self, location: Location) -> SyncResult<Location> {
        let locations = self.db.locations();
        info!(location_id = %location.id, name = %location.name, "Current location set");

        self.seed(location.clone()).await;

        locations
            .get(&location.id)
            .await?
            .ok_or_else(|| SyncError::from(DbError::not_found("Location", &location.id)))
    }

    /// Current location with its weather, per the decision table.
    ///
    /// `None` when no location is current or no weather is available.
    pub async fn get_current_location_with_weather(
        &self,
        force_refresh: bool,
        is_network_available: bool,
    ) -> SyncResult<Option<LocationWithWeather>> {
        match self.db.locations().get_current().await? {
            Some(location) => {
                self.resolve_weather(location, force_refresh, is_network_available)
                    .await
            }
            None => Ok(None),
        }
    }

    // =========================================================================
    // Weather Lookup
    // =========================================================================

    /// A location with its weather, per the decision table.
    ///
    /// ## Returns
    /// * `Ok(Some(..))` - Current conditions are attached
    /// * `Ok(None)` - Unknown or deleted id, or no cache and no successful fetch
    /// * `Err(SyncError::Persistence)` - Local store failure
    pub async fn get_location_with_weather(
        &self,
        location_id: &str,
        force_refresh: bool,
        is_network_available: bool,
    ) -> SyncResult<Option<LocationWithWeather>> {
        match self.db.locations().get(location_id).await? {
            Some(location) => {
                self.resolve_weather(location, force_refresh, is_network_available)
                    .await
            }
            None => {
                debug!(location_id = %location_id, "Unknown location");
                Ok(None)
            }
        }
    }

    async fn resolve_weather(
        &self,
        location: Location,
        force_refresh: bool,
        is_network_available: bool,
    ) -> SyncResult<Option<LocationWithWeather>> {
        if !is_network_available {
            return self.cached(location).await;
        }

        if !force_refresh {
            if let Some(hit) = self.cached(location.clone()).await? {
                return Ok(Some(hit));
            }
            debug!(location_id = %location.id, "Cache miss, fetching");
        }

        match self.fetch(location.clone()).await? {
            FetchOutcome::Stored { current, forecast } => Ok(Some(LocationWithWeather {
                location,
                current: Some(current),
                forecast: Some(forecast),
            })),
            FetchOutcome::Failed(e) => {
                debug!(location_id = %location.id, error = %e, "Falling back to cache");
                self.cached(location).await
            }
            FetchOutcome::Gone => Ok(None),
        }
    }

    /// Cache-only lookup. A hit needs current conditions.
    async fn cached(&self, location: Location) -> SyncResult<Option<LocationWithWeather>> {
        let cache = self.db.weather_cache();

        let Some(current) = cache.get_current(&location.id).await? else {
            return Ok(None);
        };
        let forecast = cache.get_forecast(&location.id).await?;

        Ok(Some(LocationWithWeather {
            location,
            current: Some(current),
            forecast,
        }))
    }

    async fn fetch(&self, location: Location) -> SyncResult<FetchOutcome> {
        let task = tokio::spawn(fetch_and_store(
            self.db.clone(),
            Arc::clone(&self.client),
            location,
            self.config.units(),
            self.config.language().to_string(),
        ));

        task.await?
    }

    /// Best-effort cache seeding; failures are logged only.
    async fn seed(&self, location: Location) {
        let location_id = location.id.clone();
        match self.fetch(location).await {
            Ok(FetchOutcome::Stored { .. }) => {
                debug!(location_id = %location_id, "Weather cache seeded")
            }
            Ok(FetchOutcome::Failed(_) | FetchOutcome::Gone) => {}
            Err(e) => warn!(location_id = %location_id, error = %e, "Seeding weather cache failed"),
        }
    }

    // =========================================================================
    // Favorites
    // =========================================================================

    /// Every favorite with whatever is cached for it. Never fetches.
    pub async fn get_favorite_locations_with_weather(
        &self,
    ) -> SyncResult<Vec<LocationWithWeather>> {
        let cache = self.db.weather_cache();
        let favorites = self.db.locations().list_favorites().await?;

        let mut result = Vec::with_capacity(favorites.len());
        for location in favorites {
            let current = cache.get_current(&location.id).await?;
            let forecast = cache.get_forecast(&location.id).await?;
            result.push(LocationWithWeather {
                location,
                current,
                forecast,
            });
        }

        Ok(result)
    }

    /// Stores a favorite and seeds its cache on a best-effort basis.
    ///
    /// ## Returns
    /// * `Ok(true)` - Stored, whether or not weather could be fetched
    /// * `Ok(false)` - The location could not be stored
    /// * `Err(SyncError::InvalidInput)` - Coordinates or name rejected
    pub async fn add_favorite_location(&self, lat: f64, lon: f64, name: &str) -> SyncResult<bool> {
        let (lat, lon) = validate_coordinates(lat, lon)?;
        let name = validate_location_name(name)?;
        let locations = self.db.locations();

        let location = match locations.upsert_by_coordinates(lat, lon, &name).await {
            Ok(location) => location,
            Err(e) => {
                warn!(error = %e, "Failed to store favorite location");
                return Ok(false);
            }
        };

        if let Err(e) = locations.set_favorite(&location.id, true).await {
            warn!(location_id = %location.id, error = %e, "Failed to flag favorite");
            return Ok(false);
        }

        info!(location_id = %location.id, name = %location.name, "Favorite added");
        self.seed(location).await;
        Ok(true)
    }

    /// Clears the favorite flag. Returns `false` for an unknown id.
    pub async fn remove_favorite_location(&self, location_id: &str) -> SyncResult<bool> {
        match self.db.locations().set_favorite(location_id, false).await {
            Ok(()) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    // =========================================================================
    // Location Maintenance
    // =========================================================================

    /// Fetches fresh weather for a location and overwrites its cache.
    ///
    /// Flags are left alone. On failure the cache is untouched.
    ///
    /// ## Returns
    /// `true` only if both payloads were fetched and stored. A location
    /// deleted mid-fetch gives `false`.
    pub async fn refresh_location(&self, location_id: &str) -> SyncResult<bool> {
        let Some(location) = self.db.locations().get(location_id).await? else {
            debug!(location_id = %location_id, "Refresh skipped, unknown location");
            return Ok(false);
        };

        let outcome = self.fetch(location).await?;
        Ok(matches!(outcome, FetchOutcome::Stored { .. }))
    }

    /// Deletes a location and its cached weather. Unknown ids are a no-op.
    pub async fn delete_location(&self, location_id: &str) -> SyncResult<()> {
        if self.db.locations().delete(location_id).await? {
            info!(location_id = %location_id, "Location deleted");
        }
        Ok(())
    }

    pub async fn rename_location(&self, location_id: &str, name: &str) -> SyncResult<()> {
        self.db.locations().rename(location_id, name).await?;
        Ok(())
    }

    pub async fn get_location(&self, location_id: &str) -> SyncResult<Option<Location>> {
        Ok(self.db.locations().get(location_id).await?)
    }

    pub async fn list_locations(&self) -> SyncResult<Vec<Location>> {
        Ok(self.db.locations().list_all().await?)
    }

    /// Reverse-geocodes a location and stores the best match as its address.
    ///
    /// ## Returns
    /// * `Ok(Some(address))` - Address resolved and stored
    /// * `Ok(None)` - Unknown id, no match, or the lookup failed
    pub async fn resolve_address(&self, location_id: &str) -> SyncResult<Option<String>> {
        let locations = self.db.locations();
        let Some(location) = locations.get(location_id).await? else {
            return Ok(None);
        };
        let (lat, lon) = location.coordinates();

        let places = match self.client.fetch_reverse_geocode(lat, lon).await {
            Ok(places) => places,
            Err(e) => {
                warn!(location_id = %location_id, error = %e, "Reverse geocoding failed");
                return Ok(None);
            }
        };

        let Some(best) = places.first() else {
            return Ok(None);
        };

        let address = best.display_address();
        locations.update_address(location_id, &address).await?;
        Ok(Some(address))
    }

    /// Drops snapshots older than the configured staleness threshold.
    ///
    /// ## Returns
    /// Number of snapshot rows removed.
    pub async fn purge_stale_weather(&self) -> SyncResult<u64> {
        let threshold = Utc::now() - self.config.stale_after();
        let removed = self.db.weather_cache().delete_stale(threshold).await?;
        info!(removed, threshold = %threshold, "Stale weather purged");
        Ok(removed)
    }

    // =========================================================================
    // Preferences
    // =========================================================================

    pub fn preferred_units(&self) -> Units {
        self.config.units()
    }

    pub fn location_method(&self) -> LocationMethod {
        self.config.location_method()
    }

    pub fn language(&self) -> &str {
        self.config.language()
    }

    // =========================================================================
    // Alerts
    // =========================================================================

    pub async fn save_alert(&self, alert: NewWeatherAlert) -> SyncResult<WeatherAlert> {
        Ok(self.db.alerts().save(alert).await?)
    }

    pub async fn get_alert(&self, alert_id: &str) -> SyncResult<Option<WeatherAlert>> {
        Ok(self.db.alerts().get(alert_id).await?)
    }

    pub async fn update_alert(&self, alert: &WeatherAlert) -> SyncResult<()> {
        Ok(self.db.alerts().update(alert).await?)
    }

    /// Returns `true` if the alert existed.
    pub async fn delete_alert(&self, alert_id: &str) -> SyncResult<bool> {
        Ok(self.db.alerts().delete(alert_id).await?)
    }

    /// Live alert list; emits now and after every alert write.
    pub fn list_all_alerts(&self) -> AlertStream {
        self.db.alerts().watch_all()
    }

    pub async fn list_active_alerts(&self, now: DateTime<Utc>) -> SyncResult<Vec<WeatherAlert>> {
        Ok(self.db.alerts().list_active(now).await?)
    }
}

/// First comma-separated part of an address, or the generic name.
fn name_from_address(address: &str) -> String {
    address
        .split(',')
        .map(str::trim)
        .find(|part| !part.is_empty())
        .and_then(|part| validate_location_name(part).ok())
        .unwrap_or_else(|| CURRENT_LOCATION_NAME.to_string())
}

// =============================================================================
// Unit Tests
// =============================================================================
