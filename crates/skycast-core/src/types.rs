//! # Domain Types
//!
//! Core domain types used throughout Skycast.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌──────────────────────┐   ┌─────────────────┐  │
//! │  │    Location     │   │  WeatherSnapshot<P>  │   │  WeatherAlert   │  │
//! │  │  ─────────────  │   │  ──────────────────  │   │  ─────────────  │  │
//! │  │  id (UUID)      │◄──│  location_id (FK)    │   │  id (UUID)      │  │
//! │  │  lat / lon      │   │  payload: P          │   │  alert_type     │  │
//! │  │  is_current     │   │  last_updated        │   │  start / end    │  │
//! │  │  is_favorite    │   │                      │   │  is_active      │  │
//! │  └─────────────────┘   │  P = CurrentConditions│  └─────────────────┘  │
//! │                        │    | Forecast        │                         │
//! │                        └──────────────────────┘                         │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │     Units       │   │ LocationMethod  │   │NotificationMode │       │
//! │  │  metric         │   │  gps            │   │  silent         │       │
//! │  │  imperial       │   │  manual         │   │  sound          │       │
//! │  │  standard       │   └─────────────────┘   │  alarm          │       │
//! │  └─────────────────┘                         └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Payload Decoding
//! Weather payloads are decoded into explicit structs. A body missing a
//! required field (or carrying an empty `weather` array) fails to decode
//! instead of producing a half-filled value.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ValidationError;

// =============================================================================
// Location
// =============================================================================

/// A known place the user views weather for.
///
/// Locations are unique by `(latitude, longitude)`. At most one location
/// has `is_current = true`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Location {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name ("Current location", "York", ...).
    pub name: String,

    /// Resolved geocoded address, if one has been stored.
    pub address: Option<String>,

    pub latitude: f64,
    pub longitude: f64,

    /// The user's active viewing context.
    pub is_current: bool,

    /// Pinned by the user, independently of current status.
    pub is_favorite: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Location {
    /// Returns the coordinates as a `(lat, lon)` pair.
    #[inline]
    pub fn coordinates(&self) -> (f64, f64) {
        (self.latitude, self.longitude)
    }
}

// =============================================================================
// Weather Payloads
// =============================================================================

/// Geographic point as reported by the remote API.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coord {
    pub lat: f64,
    pub lon: f64,
}

/// One weather condition entry (`weather[]` in the remote body).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Remote condition code (e.g. 500 = light rain).
    pub id: i64,
    pub main: String,
    pub description: String,
    /// Icon code, e.g. `"10d"`.
    pub icon: String,
}

/// Temperature, pressure and humidity readings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MainReadings {
    pub temp: f64,
    pub feels_like: f64,
    pub temp_min: f64,
    pub temp_max: f64,
    /// Atmospheric pressure in hPa.
    pub pressure: f64,
    /// Relative humidity in percent.
    pub humidity: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wind {
    pub speed: f64,
    pub deg: f64,
    #[serde(default)]
    pub gust: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clouds {
    /// Cloudiness in percent.
    pub all: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SunTimes {
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub sunrise: Option<i64>,
    #[serde(default)]
    pub sunset: Option<i64>,
}

/// Current-conditions payload (`GET /weather`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub coord: Coord,
    #[serde(deserialize_with = "non_empty")]
    pub weather: Vec<Condition>,
    pub main: MainReadings,
    pub wind: Wind,
    #[serde(default)]
    pub clouds: Option<Clouds>,
    /// Visibility in meters.
    #[serde(default)]
    pub visibility: Option<u32>,
    /// Observation time, unix seconds.
    pub dt: i64,
    #[serde(default)]
    pub sys: Option<SunTimes>,
    /// Shift in seconds from UTC.
    pub timezone: i64,
    /// Place name reported by the API.
    pub name: String,
}

impl CurrentConditions {
    /// The first (primary) condition. Decoded payloads always have one; a
    /// hand-built value may not.
    pub fn primary_condition(&self) -> Option<&Condition> {
        self.weather.first()
    }

    pub fn temperature(&self) -> f64 {
        self.main.temp
    }

    pub fn description(&self) -> Option<&str> {
        self.primary_condition().map(|c| c.description.as_str())
    }

    pub fn icon(&self) -> Option<&str> {
        self.primary_condition().map(|c| c.icon.as_str())
    }
}

/// One 3-hour step of the forecast series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastEntry {
    /// Forecast time, unix seconds.
    pub dt: i64,
    pub main: MainReadings,
    #[serde(deserialize_with = "non_empty")]
    pub weather: Vec<Condition>,
    pub wind: Wind,
    /// Probability of precipitation, 0.0 - 1.0.
    #[serde(default)]
    pub pop: Option<f64>,
    #[serde(default)]
    pub dt_txt: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastCity {
    pub name: String,
    #[serde(default)]
    pub country: Option<String>,
    pub coord: Coord,
    pub timezone: i64,
    #[serde(default)]
    pub sunrise: Option<i64>,
    #[serde(default)]
    pub sunset: Option<i64>,
}

/// Forecast payload (`GET /forecast`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub list: Vec<ForecastEntry>,
    pub city: ForecastCity,
}

impl Forecast {
    /// Highest probability of precipitation across the series, if reported.
    pub fn max_precipitation_chance(&self) -> Option<f64> {
        self.list
            .iter()
            .filter_map(|e| e.pop)
            .fold(None, |acc, p| Some(acc.map_or(p, |a: f64| a.max(p))))
    }
}

/// Rejects empty arrays so a payload never decodes without a condition.
fn non_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let items = Vec::<T>::deserialize(deserializer)?;
    if items.is_empty() {
        return Err(serde::de::Error::invalid_length(0, &"at least one entry"));
    }
    Ok(items)
}

// =============================================================================
// Weather Snapshot
// =============================================================================

/// The most recently stored payload for a location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot<P> {
    pub location_id: String,
    pub payload: P,
    pub last_updated: DateTime<Utc>,
}

pub type CurrentSnapshot = WeatherSnapshot<CurrentConditions>;
pub type ForecastSnapshot = WeatherSnapshot<Forecast>;

/// A location joined with its cached weather.
///
/// Single-location lookups only return one when current conditions are
/// known. Favorites lists include locations with nothing cached yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationWithWeather {
    pub location: Location,
    pub current: Option<CurrentSnapshot>,
    pub forecast: Option<ForecastSnapshot>,
}

impl LocationWithWeather {
    /// True when current conditions are cached.
    pub fn has_weather(&self) -> bool {
        self.current.is_some()
    }

    /// Oldest timestamp among the attached snapshots.
    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        let current = self.current.as_ref().map(|s| s.last_updated);
        let forecast = self.forecast.as_ref().map(|s| s.last_updated);
        match (current, forecast) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }
}

// =============================================================================
// Reverse Geocoding
// =============================================================================

/// One reverse-geocoding match (`GET /reverse`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodeResult {
    pub name: String,
    #[serde(default)]
    pub local_names: Option<BTreeMap<String, String>>,
    pub lat: f64,
    pub lon: f64,
    pub country: String,
    #[serde(default)]
    pub state: Option<String>,
}

impl GeocodeResult {
    /// Formats the match as "name, state, country", skipping empty or
    /// repeated parts.
    pub fn display_address(&self) -> String {
        let mut parts: Vec<&str> = vec![self.name.as_str()];
        if let Some(state) = self.state.as_deref() {
            if !state.is_empty() && state != self.name {
                parts.push(state);
            }
        }
        if !self.country.is_empty() {
            parts.push(self.country.as_str());
        }
        parts.join(", ")
    }

    /// Name in the given language, falling back to the default name.
    pub fn localized_name(&self, lang: &str) -> &str {
        self.local_names
            .as_ref()
            .and_then(|names| names.get(lang))
            .map(String::as_str)
            .unwrap_or(&self.name)
    }
}

// =============================================================================
// Units
// =============================================================================

/// Measurement system requested from the remote API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Units {
    /// Celsius, meters/sec.
    #[default]
    Metric,
    /// Fahrenheit, miles/hour.
    Imperial,
    /// Kelvin, meters/sec.
    Standard,
}

impl Units {
    /// Value of the `units` query parameter.
    pub fn as_query_param(&self) -> &'static str {
        match self {
            Units::Metric => "metric",
            Units::Imperial => "imperial",
            Units::Standard => "standard",
        }
    }
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_query_param())
    }
}

impl FromStr for Units {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "metric" => Ok(Units::Metric),
            "imperial" => Ok(Units::Imperial),
            "standard" | "kelvin" => Ok(Units::Standard),
            other => Err(ValidationError::invalid_format(
                "units",
                format!("unknown units '{}', expected metric, imperial or standard", other),
            )),
        }
    }
}

// =============================================================================
// Location Method
// =============================================================================

/// How the user's current location is acquired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationMethod {
    /// Sensor-based acquisition (external to this engine).
    #[default]
    Gps,
    /// User-entered coordinates and address.
    Manual,
}

impl fmt::Display for LocationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocationMethod::Gps => write!(f, "gps"),
            LocationMethod::Manual => write!(f, "manual"),
        }
    }
}

impl FromStr for LocationMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gps" => Ok(LocationMethod::Gps),
            "manual" => Ok(LocationMethod::Manual),
            other => Err(ValidationError::invalid_format(
                "location_method",
                format!("unknown method '{}', expected gps or manual", other),
            )),
        }
    }
}

// =============================================================================
// Alerts
// =============================================================================

/// Category of weather a user wants to be alerted about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    Rain,
    Storm,
    Snow,
    Heat,
    Wind,
}

/// How a fired alert is delivered by the platform scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum NotificationMode {
    Silent,
    #[default]
    Sound,
    Alarm,
}

/// A user-defined, time-bounded weather alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct WeatherAlert {
    /// Unique identifier (UUID v4).
    pub id: String,
    pub alert_type: AlertType,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub notification_mode: NotificationMode,
    /// Platform reference to a user-picked sound.
    pub custom_sound_ref: Option<String>,
    pub is_active: bool,
    /// Optional anchor point; both or neither are set.
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl WeatherAlert {
    /// An alert is due once it is active and its window has started.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.start_time <= now
    }
}

/// Input for creating a new alert; the store assigns id and created_at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewWeatherAlert {
    pub alert_type: AlertType,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub notification_mode: NotificationMode,
    #[serde(default)]
    pub custom_sound_ref: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

fn default_active() -> bool {
    true
}

impl NewWeatherAlert {
    /// Active alert with the default notification mode and no anchor.
    pub fn new(alert_type: AlertType, start_time: DateTime<Utc>, end_time: DateTime<Utc>) -> Self {
        NewWeatherAlert {
            alert_type,
            start_time,
            end_time,
            notification_mode: NotificationMode::default(),
            custom_sound_ref: None,
            is_active: true,
            latitude: None,
            longitude: None,
        }
    }

    pub fn with_notification_mode(mut self, mode: NotificationMode) -> Self {
        self.notification_mode = mode;
        self
    }

    pub fn with_anchor(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = Some(latitude);
        self.longitude = Some(longitude);
        self
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
