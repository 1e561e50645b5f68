//! `better-weather` - background weather refresh for a handful of saved places
//!
//! This library fetches Open-Meteo forecasts for user-chosen locations,
//! keeps one cached snapshot per location in a persistent store and derives
//! the toolbar badge (icon, temperature, colour) from the primary location.

pub mod background;
pub mod config;
pub mod control;
pub mod coordinator;
pub mod error;
pub mod icons;
pub mod models;
pub mod search;
pub mod store;
pub mod telemetry;
pub mod view;
pub mod weather;

#[cfg(test)]
mod test_support;

// Re-export core types for public API
pub use background::{BackgroundHandle, BackgroundService};
pub use config::AppConfig;
pub use control::{ControlApi, ControlClient, LocalControl, RefreshReply};
pub use coordinator::{
    BadgeSink, CoordinatorEvent, MemoryBadge, RefreshCoordinator, RefreshMessage, RefreshOutcome,
    RefreshReport,
};
pub use error::WeatherError;
pub use models::{Location, Settings, WeatherCache, WeatherCacheItem};
pub use search::{SearchOutcome, SearchSession};
pub use store::{DiskStore, KeyValueStore, MemoryStore, StorageKey, WeatherStore};
pub use view::{PopupView, ViewState, render_popup};
pub use weather::{ForecastProvider, GeocodeResult, OpenMeteoClient};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, WeatherError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
