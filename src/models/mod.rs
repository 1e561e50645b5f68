//! Data models for the weather pipeline
//!
//! This module contains the persisted domain models organized by concern:
//! - Location: user-chosen places and their display order
//! - Settings: unit preferences and their locale defaults
//! - Weather: cached forecast snapshots keyed by location id

pub mod location;
pub mod settings;
pub mod weather;

// Re-export all public types for convenient access
pub use location::{Location, LocationPatch, new_location_id, normalize_order};
pub use settings::{PrecipUnit, Settings, TempUnit, WindUnit};
pub use weather::{
    CurrentConditions, DailyForecast, DailySummary, HourlySeries, WeatherCache, WeatherCacheItem,
};
