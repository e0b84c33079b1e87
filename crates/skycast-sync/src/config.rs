//! # Skycast Configuration
//!
//! Strongly typed settings for the remote API, user preferences and the
//! local store.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     SKYCAST_API_KEY=...                                                │
//! │     SKYCAST_UNITS=imperial                                             │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/skycast/skycast.toml (Linux)                             │
//! │     ~/Library/Application Support/com.skycast.skycast/skycast.toml     │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     metric, "en", gps, 72h staleness                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # skycast.toml
//! [api]
//! api_key = "your-key"
//! base_url = "https://api.openweathermap.org/data/2.5"
//! geo_base_url = "https://api.openweathermap.org/geo/1.0"
//! geocode_limit = 5
//!
//! [preferences]
//! units = "metric"          # metric | imperial | standard
//! language = "en"           # ISO 639-1
//! location_method = "gps"   # gps | manual
//!
//! [storage]
//! stale_after_hours = 72
//! ```

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{SyncError, SyncResult};
use skycast_core::validation::validate_language;
use skycast_core::{LocationMethod, Units};

/// Default current/forecast API root.
pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";

/// Default reverse-geocoding API root.
pub const DEFAULT_GEO_BASE_URL: &str = "https://api.openweathermap.org/geo/1.0";

/// Ten years.
const MAX_STALE_AFTER_HOURS: u64 = 24 * 365 * 10;

// =============================================================================
// API Settings
// =============================================================================

/// Remote weather API settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct ApiSettings {
    /// API key sent as `appid`. Requests fail before any I/O without one.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Root for `/weather` and `/forecast`.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Root for `/reverse`.
    #[serde(default = "default_geo_base_url")]
    pub geo_base_url: String,

    /// Maximum reverse-geocoding matches (1-5).
    #[serde(default = "default_geocode_limit")]
    pub geocode_limit: u8,

    /// Per-request timeout. Unset means no timeout.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_geo_base_url() -> String {
    DEFAULT_GEO_BASE_URL.to_string()
}

fn default_geocode_limit() -> u8 {
    5
}

impl Default for ApiSettings {
    fn default() -> Self {
        ApiSettings {
            api_key: None,
            base_url: default_base_url(),
            geo_base_url: default_geo_base_url(),
            geocode_limit: default_geocode_limit(),
            request_timeout_secs: None,
        }
    }
}

impl fmt::Debug for ApiSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiSettings")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("geo_base_url", &self.geo_base_url)
            .field("geocode_limit", &self.geocode_limit)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl ApiSettings {
    /// Settings pointing both API roots at one test server.
    pub fn with_base_url(api_key: &str, base_url: &str) -> Self {
        ApiSettings {
            api_key: Some(api_key.to_string()),
            base_url: base_url.to_string(),
            geo_base_url: base_url.to_string(),
            ..Self::default()
        }
    }

    /// The configured key, if it is non-empty.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.trim().is_empty())
    }
}

// =============================================================================
// Preferences
// =============================================================================

/// User preferences read by the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub units: Units,

    /// Language for condition descriptions.
    #[serde(default = "default_language")]
    pub language: String,

    #[serde(default)]
    pub location_method: LocationMethod,
}

fn default_language() -> String {
    "en".to_string()
}

impl Default for Preferences {
    fn default() -> Self {
        Preferences {
            units: Units::default(),
            language: default_language(),
            location_method: LocationMethod::default(),
        }
    }
}

// =============================================================================
// Storage Settings
// =============================================================================

/// Local store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    /// SQLite file. Defaults to the platform data dir.
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// Snapshots older than this are purged by maintenance.
    #[serde(default = "default_stale_after_hours")]
    pub stale_after_hours: u64,
}

fn default_stale_after_hours() -> u64 {
    72
}

impl Default for StorageSettings {
    fn default() -> Self {
        StorageSettings {
            database_path: None,
            stale_after_hours: default_stale_after_hours(),
        }
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete Skycast configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SkycastConfig {
    #[serde(default)]
    pub api: ApiSettings,

    #[serde(default)]
    pub preferences: Preferences,

    #[serde(default)]
    pub storage: StorageSettings,
}

impl SkycastConfig {
    /// Creates a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (skycast.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> SyncResult<Self> {
        Self::load_with(config_path, |key| std::env::var(key).ok())
    }

    /// [`load`](Self::load) with overrides read from `lookup`.
    fn load_with(
        config_path: Option<PathBuf>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> SyncResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading config from file");
                let contents = std::fs::read_to_string(&path)
                    .map_err(|e| SyncError::ConfigLoadFailed(e.to_string()))?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_overrides(lookup);
        config.validate()?;

        // Same normalized form the environment path stores
        config.preferences.language = validate_language(&config.preferences.language)
            .map_err(|e| SyncError::InvalidConfig(e.to_string()))?;

        Ok(config)
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> SyncResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| SyncError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| SyncError::ConfigSaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(|e| SyncError::ConfigSaveFailed(e.to_string()))?;

        info!(?path, "Config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> SyncResult<()> {
        validate_http_url("base_url", &self.api.base_url)?;
        validate_http_url("geo_base_url", &self.api.geo_base_url)?;

        if !(1..=5).contains(&self.api.geocode_limit) {
            return Err(SyncError::InvalidConfig(format!(
                "geocode_limit must be between 1 and 5, got {}",
                self.api.geocode_limit
            )));
        }

        if self.api.request_timeout_secs == Some(0) {
            return Err(SyncError::InvalidConfig(
                "request_timeout_secs must be greater than 0".into(),
            ));
        }

        validate_language(&self.preferences.language)
            .map_err(|e| SyncError::InvalidConfig(e.to_string()))?;

        if !(1..=MAX_STALE_AFTER_HOURS).contains(&self.storage.stale_after_hours) {
            return Err(SyncError::InvalidConfig(format!(
                "stale_after_hours must be between 1 and {}, got {}",
                MAX_STALE_AFTER_HOURS, self.storage.stale_after_hours
            )));
        }

        Ok(())
    }

    /// Applies overrides from any key lookup (the process environment in
    /// production).
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup("SKYCAST_API_KEY") {
            debug!("Overriding API key from environment");
            self.api.api_key = Some(key);
        }

        if let Some(url) = lookup("SKYCAST_API_BASE_URL") {
            debug!(url = %url, "Overriding API base URL from environment");
            self.api.base_url = url;
        }

        if let Some(url) = lookup("SKYCAST_GEO_BASE_URL") {
            debug!(url = %url, "Overriding geocoding URL from environment");
            self.api.geo_base_url = url;
        }

        if let Some(units) = lookup("SKYCAST_UNITS") {
            match units.parse() {
                Ok(parsed) => self.preferences.units = parsed,
                Err(e) => warn!(units = %units, error = %e, "Ignoring units from environment"),
            }
        }

        if let Some(language) = lookup("SKYCAST_LANGUAGE") {
            match validate_language(&language) {
                Ok(code) => self.preferences.language = code,
                Err(e) => warn!(language = %language, error = %e, "Ignoring language from environment"),
            }
        }

        if let Some(method) = lookup("SKYCAST_LOCATION_METHOD") {
            match method.parse() {
                Ok(parsed) => self.preferences.location_method = parsed,
                Err(e) => warn!(method = %method, error = %e, "Ignoring location method from environment"),
            }
        }

        if let Some(path) = lookup("SKYCAST_DB_PATH") {
            self.storage.database_path = Some(PathBuf::from(path));
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join("skycast.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// The database file: configured path, else `<data dir>/skycast.db`.
    pub fn database_path(&self) -> Option<PathBuf> {
        self.storage
            .database_path
            .clone()
            .or_else(|| project_dirs().map(|dirs| dirs.data_dir().join("skycast.db")))
    }

    /// Age after which cached snapshots are purged.
    pub fn stale_after(&self) -> chrono::Duration {
        chrono::Duration::hours(self.storage.stale_after_hours.min(MAX_STALE_AFTER_HOURS) as i64)
    }

    pub fn units(&self) -> Units {
        self.preferences.units
    }

    pub fn language(&self) -> &str {
        &self.preferences.language
    }

    pub fn location_method(&self) -> LocationMethod {
        self.preferences.location_method
    }
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("com", "skycast", "skycast")
}

fn validate_http_url(field: &str, value: &str) -> SyncResult<()> {
    let url = Url::parse(value).map_err(|e| SyncError::InvalidUrl(format!("{field}: {e}")))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(SyncError::InvalidUrl(format!(
            "{field} must start with http:// or https://, got: {value}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = SkycastConfig::default();
        assert_eq!(config.units(), Units::Metric);
        assert_eq!(config.language(), "en");
        assert_eq!(config.location_method(), LocationMethod::Gps);
        assert_eq!(config.api.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.api.geocode_limit, 5);
        assert_eq!(config.stale_after(), chrono::Duration::hours(72));
        assert!(config.api.api_key().is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = SkycastConfig::default();

        config.api.base_url = "ftp://example.com".to_string();
        assert!(matches!(config.validate(), Err(SyncError::InvalidUrl(_))));
        config.api.base_url = "not a url".to_string();
        assert!(matches!(config.validate(), Err(SyncError::InvalidUrl(_))));
        config.api.base_url = DEFAULT_BASE_URL.to_string();

        config.api.geocode_limit = 0;
        assert!(config.validate().is_err());
        config.api.geocode_limit = 6;
        assert!(config.validate().is_err());
        config.api.geocode_limit = 1;

        config.preferences.language = "english".to_string();
        assert!(matches!(config.validate(), Err(SyncError::InvalidConfig(_))));
        config.preferences.language = "fr".to_string();

        config.storage.stale_after_hours = 0;
        assert!(config.validate().is_err());
        config.storage.stale_after_hours = 1;

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: SkycastConfig = toml::from_str(
            r#"
            [preferences]
            units = "imperial"
            "#,
        )
        .unwrap();

        assert_eq!(config.units(), Units::Imperial);
        assert_eq!(config.language(), "en");
        assert_eq!(config.api.geo_base_url, DEFAULT_GEO_BASE_URL);
    }

    #[test]
    fn test_unknown_units_rejected_in_file() {
        let result: Result<SkycastConfig, _> = toml::from_str(
            r#"
            [preferences]
            units = "furlongs"
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("skycast.toml");

        let mut config = SkycastConfig::default();
        config.api.api_key = Some("abc123".to_string());
        config.preferences.units = Units::Standard;
        config.preferences.location_method = LocationMethod::Manual;
        config.storage.database_path = Some(dir.path().join("weather.db"));
        config.save(Some(path.clone())).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("[api]"));
        assert!(text.contains("[preferences]"));

        let loaded: SkycastConfig = toml::from_str(&text).unwrap();
        assert_eq!(loaded.api.api_key.as_deref(), Some("abc123"));
        assert_eq!(loaded.units(), Units::Standard);
        assert_eq!(loaded.location_method(), LocationMethod::Manual);
        assert_eq!(loaded.database_path(), Some(dir.path().join("weather.db")));
    }

    #[test]
    fn test_load_normalizes_language_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("skycast.toml");
        std::fs::write(&path, "[preferences]\nlanguage = \"zh-TW\"\n").unwrap();

        let config = SkycastConfig::load_with(Some(path.clone()), |_| None).unwrap();
        assert_eq!(config.language(), "zh_tw");

        std::fs::write(&path, "[preferences]\nlanguage = \"klingon\"\n").unwrap();
        let err = SkycastConfig::load_with(Some(path), |_| None).unwrap_err();
        assert!(matches!(err, SyncError::InvalidConfig(_)));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("SKYCAST_API_KEY", "from-env"),
            ("SKYCAST_UNITS", "imperial"),
            ("SKYCAST_LANGUAGE", "DE"),
            ("SKYCAST_LOCATION_METHOD", "manual"),
            ("SKYCAST_DB_PATH", "/tmp/override.db"),
            ("SKYCAST_API_BASE_URL", "http://localhost:9000"),
        ]);

        let mut config = SkycastConfig::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.api.api_key(), Some("from-env"));
        assert_eq!(config.units(), Units::Imperial);
        assert_eq!(config.language(), "de");
        assert_eq!(config.location_method(), LocationMethod::Manual);
        assert_eq!(config.database_path(), Some(PathBuf::from("/tmp/override.db")));
        assert_eq!(config.api.base_url, "http://localhost:9000");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_bad_overrides_are_ignored() {
        let mut config = SkycastConfig::default();
        config.apply_overrides(|key| match key {
            "SKYCAST_UNITS" => Some("parsecs".to_string()),
            "SKYCAST_LANGUAGE" => Some("klingon".to_string()),
            _ => None,
        });

        assert_eq!(config.units(), Units::Metric);
        assert_eq!(config.language(), "en");
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let settings = ApiSettings::with_base_url("secret-key", "http://localhost");
        let debug = format!("{:?}", settings);
        assert!(!debug.contains("secret-key"));
        assert!(debug.contains("<redacted>"));
    }
}
