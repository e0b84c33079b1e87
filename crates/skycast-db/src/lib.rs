//! # skycast-db: Local Store for Skycast
//!
//! This crate provides database access for the Skycast weather engine.
//! It uses SQLite for local storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Skycast Data Flow                                │
//! │                                                                         │
//! │  SyncOrchestrator (skycast-sync)                                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    skycast-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────────┐  ┌────────────┐  │   │
//! │  │   │   Database    │    │   Repositories     │  │ Migrations │  │   │
//! │  │   │   (pool.rs)   │    │                    │  │ (embedded) │  │   │
//! │  │   │               │    │ LocationRepository │  │            │  │   │
//! │  │   │ SqlitePool    │◄───│ WeatherCacheRepo   │  │ 001_init   │  │   │
//! │  │   │ Alert watch   │    │ AlertRepository    │  │            │  │   │
//! │  │   └───────────────┘    └────────────────────┘  └────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  │   <data dir>/skycast/skycast.db                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Location, weather cache and alert stores
//!
//! ## Usage
//!
//! ```rust,ignore
//! use skycast_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/skycast.db")).await?;
//!
//! let favorites = db.locations().list_favorites().await?;
//! let cached = db.weather_cache().get_current(&favorites[0].id).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::alert::{AlertRepository, AlertStream};
pub use repository::location::LocationRepository;
pub use repository::weather::WeatherCacheRepository;
