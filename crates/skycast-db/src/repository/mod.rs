//! # Repository Module
//!
//! Database repository implementations for Skycast.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  SyncOrchestrator                                                      │
//! │       │                                                                 │
//! │       │  db.locations().get_current()                                  │
//! │       │  db.weather_cache().get_current(&id)                           │
//! │       ▼                                                                 │
//! │  LocationRepository          WeatherCacheRepository                    │
//! │  ├── upsert_by_coordinates   ├── save_current / get_current            │
//! │  ├── set_current             ├── save_forecast / get_forecast          │
//! │  ├── set_favorite            ├── save_all                              │
//! │  └── delete                  └── delete_all / delete_stale             │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  AlertRepository stands apart: no foreign keys into locations.         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`LocationRepository`](location::LocationRepository) - Known places, current/favorite flags
//! - [`WeatherCacheRepository`](weather::WeatherCacheRepository) - Latest payloads per location
//! - [`AlertRepository`](alert::AlertRepository) - User-defined weather alerts

pub mod alert;
pub mod location;
pub mod weather;
