//! # skycast-sync: Sync Engine for Skycast
//!
//! Offline-capable weather access: every read goes through the local cache,
//! and the remote API is called only when the cache/fetch policy says so.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Skycast Sync Architecture                        │
//! │                                                                         │
//! │  UI views / background trigger (bin/skycast.rs)                        │
//! │                               │                                         │
//! │                               ▼                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                      SyncOrchestrator                            │  │
//! │  │                                                                  │  │
//! │  │  Constructed once by the composition root, cloned into callers   │  │
//! │  │  Cache / fetch / fallback decisions, location lifecycle          │  │
//! │  └───────────┬───────────────────────┬──────────────────────────────┘  │
//! │              │                       │                                  │
//! │              ▼                       ▼                                  │
//! │  ┌────────────────────┐  ┌──────────────────────────────────────────┐  │
//! │  │  dyn WeatherApi    │  │  skycast-db::Database                    │  │
//! │  │                    │  │                                          │  │
//! │  │  OpenWeatherClient │  │  LocationRepository                      │  │
//! │  │  single attempt,   │  │  WeatherCacheRepository                  │  │
//! │  │  no retries        │  │  AlertRepository (observable)            │  │
//! │  └────────────────────┘  └──────────────────────────────────────────┘  │
//! │                                                                         │
//! │  SkycastConfig: units, language, location method, API roots, storage  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`client`] - `WeatherApi` trait and the `reqwest` client
//! - [`config`] - TOML + environment configuration
//! - [`error`] - Sync error types
//! - [`orchestrator`] - `SyncOrchestrator`
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use skycast_sync::{OpenWeatherClient, SkycastConfig, SyncOrchestrator};
//! use skycast_db::{Database, DbConfig};
//!
//! let config = SkycastConfig::load(None)?;
//! let db = Database::new(DbConfig::new("skycast.db")).await?;
//! let client = OpenWeatherClient::new(config.api.clone())?;
//! let orchestrator = SyncOrchestrator::new(db, Arc::new(client), config);
//!
//! let home = orchestrator.set_current_location(53.96, -1.08).await?;
//! let weather = orchestrator
//!     .get_location_with_weather(&home.id, false, true)
//!     .await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod client;
pub mod config;
pub mod error;
pub mod orchestrator;

// =============================================================================
// Re-exports
// =============================================================================

pub use client::{FetchError, OpenWeatherClient, WeatherApi};
pub use config::{ApiSettings, Preferences, SkycastConfig, StorageSettings};
pub use error::{SyncError, SyncResult};
pub use orchestrator::SyncOrchestrator;
