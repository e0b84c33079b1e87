//! # Validation Module
//!
//! Input validation run before any store write or network call.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Orchestrator entry points (Rust)                             │
//! │  ├── THIS MODULE: coordinates, names, language, alert windows          │
//! │  └── Failure = InvalidInput, nothing touched                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Remote payload decoding (serde)                              │
//! │  └── Missing required fields fail the fetch                            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── UNIQUE (latitude, longitude)                                      │
//! │  ├── Partial UNIQUE index: one current location                        │
//! │  └── Foreign keys with ON DELETE CASCADE                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,no_run
//! use skycast_core::validation::{validate_coordinates, validate_language};
//!
//! // Normalized coordinates, ready for the store
//! let (lat, lon) = validate_coordinates(-0.0, 12.5).unwrap();
//!
//! // Language code for the remote API
//! let lang = validate_language("EN").unwrap();
//! ```

use chrono::{DateTime, Utc};

use crate::error::ValidationError;
use crate::{MAX_ADDRESS_LEN, MAX_NAME_LEN};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Coordinate Validators
// =============================================================================

/// Validates a latitude in degrees.
///
/// ## Rules
/// - Must be finite (no NaN, no infinity)
/// - Must be within [-90, 90]
pub fn validate_latitude(lat: f64) -> ValidationResult<f64> {
    validate_degrees("latitude", lat, 90.0)
}

/// Validates a longitude in degrees.
///
/// ## Rules
/// - Must be finite (no NaN, no infinity)
/// - Must be within [-180, 180]
pub fn validate_longitude(lon: f64) -> ValidationResult<f64> {
    validate_degrees("longitude", lon, 180.0)
}

/// Validates a coordinate pair and returns it normalized.
///
/// `-0.0` is folded into `0.0` so the pair compares equal to the one the
/// store already holds.
///
/// ## Example
/// ```rust
/// use skycast_core::validation::validate_coordinates;
///
/// assert_eq!(validate_coordinates(-0.0, 10.0).unwrap(), (0.0, 10.0));
/// assert!(validate_coordinates(0.0, 180.5).is_err());
/// assert!(validate_coordinates(f64::NAN, 0.0).is_err());
/// ```
pub fn validate_coordinates(lat: f64, lon: f64) -> ValidationResult<(f64, f64)> {
    Ok((validate_latitude(lat)?, validate_longitude(lon)?))
}

fn validate_degrees(field: &str, value: f64, bound: f64) -> ValidationResult<f64> {
    if !value.is_finite() {
        return Err(ValidationError::NotFinite {
            field: field.to_string(),
        });
    }

    if !(-bound..=bound).contains(&value) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            value,
            min: -bound,
            max: bound,
        });
    }

    // -0.0 == 0.0, so this maps negative zero to positive zero
    Ok(if value == 0.0 { 0.0 } else { value })
}

// =============================================================================
// String Validators
// =============================================================================

/// Validates a location display name.
///
/// ## Rules
/// - Must not be empty after trimming
/// - At most 200 characters
///
/// ## Returns
/// The trimmed name.
pub fn validate_location_name(name: &str) -> ValidationResult<String> {
    validate_text("name", name, MAX_NAME_LEN)
}

/// Validates a resolved address string.
///
/// ## Rules
/// - Must not be empty after trimming
/// - At most 500 characters
pub fn validate_address(address: &str) -> ValidationResult<String> {
    validate_text("address", address, MAX_ADDRESS_LEN)
}

fn validate_text(field: &str, value: &str, max: usize) -> ValidationResult<String> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::required(field));
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(value.to_string())
}

/// Validates a language code for localized descriptions.
///
/// Accepts an ISO 639-1 code (`"en"`) optionally followed by a region
/// (`"pt_br"`, `"zh-TW"`). The result is lowercased with `_` as separator.
///
/// ## Example
/// ```rust
/// use skycast_core::validation::validate_language;
///
/// assert_eq!(validate_language("EN").unwrap(), "en");
/// assert_eq!(validate_language("zh-TW").unwrap(), "zh_tw");
/// assert!(validate_language("english").is_err());
/// ```
pub fn validate_language(code: &str) -> ValidationResult<String> {
    let code = code.trim().to_lowercase().replace('-', "_");

    if code.is_empty() {
        return Err(ValidationError::required("language"));
    }

    let mut parts = code.split('_');
    let primary = parts.next().unwrap_or_default();
    let region = parts.next();

    let is_alpha2 = |s: &str| s.len() == 2 && s.chars().all(|c| c.is_ascii_lowercase());

    if !is_alpha2(primary) || parts.next().is_some() || region.is_some_and(|r| !is_alpha2(r)) {
        return Err(ValidationError::invalid_format(
            "language",
            "expected a two-letter ISO 639-1 code",
        ));
    }

    Ok(code)
}

// =============================================================================
// Alert Validators
// =============================================================================

/// Validates an alert window: the end must come strictly after the start.
pub fn validate_alert_window(
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
) -> ValidationResult<()> {
    if end_time <= start_time {
        return Err(ValidationError::InvalidTimeRange);
    }
    Ok(())
}

/// Validates an optional alert anchor point.
///
/// Both coordinates or neither must be given.
pub fn validate_alert_anchor(
    latitude: Option<f64>,
    longitude: Option<f64>,
) -> ValidationResult<Option<(f64, f64)>> {
    match (latitude, longitude) {
        (None, None) => Ok(None),
        (Some(lat), Some(lon)) => validate_coordinates(lat, lon).map(Some),
        _ => Err(ValidationError::invalid_format(
            "anchor",
            "latitude and longitude must be set together",
        )),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_validate_coordinates_bounds() {
        assert!(validate_coordinates(90.0, 180.0).is_ok());
        assert!(validate_coordinates(-90.0, -180.0).is_ok());
        assert!(validate_coordinates(90.0001, 0.0).is_err());
        assert!(validate_coordinates(0.0, -180.0001).is_err());
    }

    #[test]
    fn test_validate_coordinates_not_finite() {
        assert!(matches!(
            validate_coordinates(f64::NAN, 0.0),
            Err(ValidationError::NotFinite { .. })
        ));
        assert!(matches!(
            validate_coordinates(0.0, f64::INFINITY),
            Err(ValidationError::NotFinite { .. })
        ));
    }

    #[test]
    fn test_validate_coordinates_negative_zero() {
        let (lat, lon) = validate_coordinates(-0.0, -0.0).unwrap();
        assert!(lat.is_sign_positive());
        assert!(lon.is_sign_positive());
    }

    #[test]
    fn test_validate_location_name() {
        assert_eq!(validate_location_name("  York ").unwrap(), "York");
        assert!(validate_location_name("   ").is_err());
        assert!(validate_location_name(&"x".repeat(MAX_NAME_LEN + 1)).is_err());
        assert!(validate_location_name(&"é".repeat(MAX_NAME_LEN)).is_ok());
    }

    #[test]
    fn test_validate_address() {
        assert!(validate_address("12 Main St, York").is_ok());
        assert!(validate_address("").is_err());
        assert!(validate_address(&"a".repeat(MAX_ADDRESS_LEN + 1)).is_err());
    }

    #[test]
    fn test_validate_language() {
        assert_eq!(validate_language("de").unwrap(), "de");
        assert_eq!(validate_language("pt_BR").unwrap(), "pt_br");
        assert!(validate_language("").is_err());
        assert!(validate_language("e1").is_err());
        assert!(validate_language("en_us_x").is_err());
        assert!(validate_language("en_usa").is_err());
    }

    #[test]
    fn test_validate_alert_window() {
        let start = Utc::now();
        assert!(validate_alert_window(start, start + Duration::minutes(1)).is_ok());
        assert_eq!(
            validate_alert_window(start, start),
            Err(ValidationError::InvalidTimeRange)
        );
        assert!(validate_alert_window(start, start - Duration::hours(1)).is_err());
    }

    #[test]
    fn test_validate_alert_anchor() {
        assert_eq!(validate_alert_anchor(None, None).unwrap(), None);
        assert_eq!(
            validate_alert_anchor(Some(1.0), Some(2.0)).unwrap(),
            Some((1.0, 2.0))
        );
        assert!(validate_alert_anchor(Some(1.0), None).is_err());
        assert!(validate_alert_anchor(Some(100.0), Some(0.0)).is_err());
    }
}
