//! # skycast-core: Pure Domain Model for Skycast
//!
//! This crate holds the types every other Skycast crate speaks: locations,
//! weather snapshots, alerts, and the validation rules that guard them.
//! It has zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Skycast Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  UI / View-model layer (external)               │   │
//! │  │   Home view ──► Favorites view ──► Alerts view                  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              skycast-sync (SyncOrchestrator)                    │   │
//! │  │   cache / fetch / fallback policy, remote weather client        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ skycast-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌─────────────┐  ┌────────────┐              │   │
//! │  │   │   types   │  │ validation  │  │   error    │              │   │
//! │  │   │ Location  │  │ coordinates │  │ Validation │              │   │
//! │  │   │ Snapshot  │  │ names, lang │  │   Error    │              │   │
//! │  │   │ Alert     │  │ alert window│  │            │              │   │
//! │  │   └───────────┘  └─────────────┘  └────────────┘              │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    skycast-db (Database Layer)                  │   │
//! │  │           SQLite queries, migrations, repositories              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Location, WeatherSnapshot, WeatherAlert, etc.)
//! - [`error`] - Validation error types
//! - [`validation`] - Input validation run before any store or network call
//!
//! ## Example Usage
//!
//! ```rust
//! use skycast_core::validation::validate_coordinates;
//! use skycast_core::Units;
//!
//! assert!(validate_coordinates(50.7749, -12.4194).is_ok());
//! assert!(validate_coordinates(91.0, 0.0).is_err());
//!
//! assert_eq!(Units::Imperial.as_query_param(), "imperial");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::ValidationError;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Display name given to the location created by `set_current_location`.
pub const CURRENT_LOCATION_NAME: &str = "Current location";

/// Maximum length of a location display name.
pub const MAX_NAME_LEN: usize = 200;

/// Maximum length of a resolved address string.
pub const MAX_ADDRESS_LEN: usize = 500;
