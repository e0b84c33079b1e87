//! # Error Types
//!
//! Domain-specific error types for skycast-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  skycast-core errors (this file)                                       │
//! │  └── ValidationError  - InvalidInput (rejected before any I/O)         │
//! │                                                                         │
//! │  skycast-db errors (separate crate)                                    │
//! │  └── DbError          - PersistenceFailure                             │
//! │                                                                         │
//! │  skycast-sync errors (separate crate)                                  │
//! │  ├── FetchError       - FetchFailure (never leaves the orchestrator)   │
//! │  └── SyncError        - What orchestrator callers see                  │
//! │                                                                         │
//! │  Flow: ValidationError ─┐                                              │
//! │        DbError ─────────┴──► SyncError ──► UI                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when caller input doesn't meet requirements.
/// They are raised before any store write or network call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is NaN or infinite.
    #[error("{field} must be a finite number")]
    NotFinite { field: String },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: String,
        value: f64,
        min: f64,
        max: f64,
    },

    /// Invalid format (e.g., invalid UUID, invalid language code).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Time window where the end does not come after the start.
    #[error("end time must be after start time")]
    InvalidTimeRange,
}

impl ValidationError {
    /// Creates a Required error for a field.
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }

    /// Creates an InvalidFormat error.
    pub fn invalid_format(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::required("name");
        assert_eq!(err.to_string(), "name is required");

        let err = ValidationError::OutOfRange {
            field: "latitude".to_string(),
            value: 91.5,
            min: -90.0,
            max: 90.0,
        };
        assert_eq!(
            err.to_string(),
            "latitude must be between -90 and 90, got 91.5"
        );
    }

    #[test]
    fn test_time_range_message() {
        assert_eq!(
            ValidationError::InvalidTimeRange.to_string(),
            "end time must be after start time"
        );
    }
}
