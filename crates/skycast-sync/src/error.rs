//! # Sync Error Types
//!
//! Errors surfaced by the orchestrator and the configuration layer.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sync Error Categories                             │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Caller input   │  │  Local store    │  │  Configuration          │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidInput   │  │  Persistence    │  │  InvalidConfig          │ │
//! │  │  (rejected      │  │  (disk, SQL,    │  │  InvalidUrl             │ │
//! │  │   before I/O)   │  │   corruption)   │  │  ConfigLoad/SaveFailed  │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  FetchError (client.rs) never appears here: the orchestrator turns a   │
//! │  failed fetch into a cache fallback or an absent result.               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use skycast_core::ValidationError;
use skycast_db::DbError;
use thiserror::Error;

/// Result type alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors visible to orchestrator callers.
#[derive(Debug, Error)]
pub enum SyncError {
    // =========================================================================
    // Caller Errors
    // =========================================================================
    /// Coordinates, names or alert fields rejected before any I/O.
    #[error("Invalid input: {0}")]
    InvalidInput(ValidationError),

    // =========================================================================
    // Local Store Errors
    // =========================================================================
    /// The local store failed. Distinct from "no data": this is a local fault.
    #[error("Storage error: {0}")]
    Persistence(DbError),

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid configuration value.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Invalid API base URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to save config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Internal Errors
    // =========================================================================
    /// A background task panicked or was aborted.
    #[error("Internal error: {0}")]
    Internal(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<ValidationError> for SyncError {
    fn from(err: ValidationError) -> Self {
        SyncError::InvalidInput(err)
    }
}

impl From<DbError> for SyncError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Validation(v) => SyncError::InvalidInput(v),
            other => SyncError::Persistence(other),
        }
    }
}

impl From<url::ParseError> for SyncError {
    fn from(err: url::ParseError) -> Self {
        SyncError::InvalidUrl(err.to_string())
    }
}

impl From<toml::de::Error> for SyncError {
    fn from(err: toml::de::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for SyncError {
    fn from(err: toml::ser::Error) -> Self {
        SyncError::ConfigSaveFailed(err.to_string())
    }
}

impl From<tokio::task::JoinError> for SyncError {
    fn from(err: tokio::task::JoinError) -> Self {
        SyncError::Internal(err.to_string())
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl SyncError {
    /// Returns true if the caller passed bad input.
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, SyncError::InvalidInput(_))
    }

    /// Returns true if the local store failed.
    pub fn is_persistence(&self) -> bool {
        matches!(self, SyncError::Persistence(_))
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            SyncError::InvalidConfig(_)
                | SyncError::InvalidUrl(_)
                | SyncError::ConfigLoadFailed(_)
                | SyncError::ConfigSaveFailed(_)
        )
    }
}
