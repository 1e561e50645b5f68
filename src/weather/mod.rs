//! Weather client: forecast and geocoding providers.
//!
//! The refresh pipeline talks to the provider only through
//! [`ForecastProvider`], so tests and alternative backends can stand in for
//! Open-Meteo.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::Result;
use crate::models::{Location, Settings, WeatherCacheItem};

pub mod open_meteo;

pub use open_meteo::{GeocodeResult, OpenMeteoClient};

/// Default number of suggestions requested from the geocoder
pub const DEFAULT_SEARCH_LIMIT: usize = 6;

/// Queries shorter than this (after trimming) are never sent
pub const MIN_QUERY_CHARS: usize = 2;

/// Options for [`ForecastProvider::search_places`]
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    /// Primary language subtag, e.g. `de`
    pub language: Option<String>,
    /// Result count, [`DEFAULT_SEARCH_LIMIT`] when unset
    pub limit: Option<usize>,
    /// Aborts the request when fired
    pub cancel: Option<CancellationToken>,
}

impl SearchOptions {
    #[must_use]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    #[must_use]
    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_SEARCH_LIMIT)
    }
}

#[async_trait]
pub trait ForecastProvider: Send + Sync {
    /// Fetch a complete snapshot for one location in the user's units.
    ///
    /// Fails only on transport errors or a non-success HTTP status; missing
    /// fields in the payload are coerced to safe defaults.
    async fn fetch_forecast(
        &self,
        location: &Location,
        settings: &Settings,
    ) -> Result<WeatherCacheItem>;

    /// Place-name suggestions. Returns an empty list for queries shorter than
    /// [`MIN_QUERY_CHARS`] and fails with `Cancelled` when the token fires.
    async fn search_places(&self, query: &str, options: SearchOptions)
    -> Result<Vec<GeocodeResult>>;
}

#[must_use]
pub fn is_searchable(query: &str) -> bool {
    query.trim().chars().count() >= MIN_QUERY_CHARS
}
