//! Debounced place search for the location picker.
//!
//! Each call to [`SearchSession::search`] supersedes the previous one: its
//! request is cancelled and its outcome is reported as
//! [`SearchOutcome::Superseded`] instead of results for a stale query.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::Result;
use crate::weather::{ForecastProvider, GeocodeResult, SearchOptions, is_searchable};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    Results(Vec<GeocodeResult>),
    /// Query too short; suggestions should be emptied
    Cleared,
    /// A newer query replaced this one
    Superseded,
}

#[derive(Default)]
struct SearchState {
    latest: String,
    in_flight: Option<CancellationToken>,
}

pub struct SearchSession {
    provider: Arc<dyn ForecastProvider>,
    language: Option<String>,
    debounce: Duration,
    state: Mutex<SearchState>,
}

impl SearchSession {
    /// `locale` is a BCP 47 tag; only its primary subtag is sent
    pub fn new(provider: Arc<dyn ForecastProvider>, locale: &str) -> Self {
        Self {
            provider,
            language: primary_language(locale),
            debounce: DEFAULT_DEBOUNCE,
            state: Mutex::new(SearchState::default()),
        }
    }

    #[must_use]
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    #[must_use]
    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    pub async fn search(&self, query: &str) -> Result<SearchOutcome> {
        let query = query.trim().to_string();
        let token = {
            let mut state = self.state.lock().await;
            state.latest.clone_from(&query);
            if let Some(previous) = state.in_flight.take() {
                previous.cancel();
            }
            if !is_searchable(&query) {
                return Ok(SearchOutcome::Cleared);
            }
            let token = CancellationToken::new();
            state.in_flight = Some(token.clone());
            token
        };

        tokio::select! {
            () = token.cancelled() => return Ok(SearchOutcome::Superseded),
            () = tokio::time::sleep(self.debounce) => {}
        }

        let mut options = SearchOptions::default().with_cancel(token.clone());
        options.language.clone_from(&self.language);
        let result = self.provider.search_places(&query, options).await;

        let state = self.state.lock().await;
        if token.is_cancelled() || state.latest != query {
            debug!(query, "Discarding stale search");
            return Ok(SearchOutcome::Superseded);
        }
        match result {
            Ok(results) => Ok(SearchOutcome::Results(results)),
            Err(error) if error.is_cancelled() => Ok(SearchOutcome::Superseded),
            Err(error) => Err(error),
        }
    }
}

/// `de-AT` -> `de`
#[must_use]
pub fn primary_language(locale: &str) -> Option<String> {
    locale
        .trim()
        .split(['-', '_'])
        .next()
        .filter(|subtag| !subtag.is_empty())
        .map(str::to_lowercase)
}
