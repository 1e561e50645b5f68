//! Refresh coordinator: fetches forecasts into the cache and keeps the
//! toolbar badge in sync with the primary location.
//!
//! The primary location is the first one in display order. Every trigger
//! (the periodic alarm, store changes, explicit refresh messages) is turned
//! into a [`CoordinatorEvent`], planned with the pure [`plan`] function and
//! executed by [`RefreshCoordinator::execute`].
//!
//! Cache updates are read-modify-write cycles serialised behind an async
//! mutex, so concurrent refreshes never drop each other's entries. When two
//! refreshes target the same location the last write wins.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::icons::{badge_color, badge_text, icon_asset_paths, pick_icon, to_celsius};
use crate::models::{Location, WeatherCacheItem};
use crate::store::{StorageKey, WeatherStore};
use crate::weather::ForecastProvider;
use crate::{Result, WeatherError};

/// Name of the periodic refresh alarm
pub const REFRESH_ALARM: &str = "weather-refresh";

/// Period of [`REFRESH_ALARM`] in minutes
pub const REFRESH_INTERVAL_MINUTES: u32 = 15;

/// Toolbar badge capability
#[async_trait]
pub trait BadgeSink: Send + Sync {
    async fn set_text(&self, text: &str) -> Result<()>;
    async fn set_color(&self, color: &str) -> Result<()>;
    /// Icon asset paths keyed by pixel size
    async fn set_icon(&self, paths: &BTreeMap<u32, String>) -> Result<()>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadgeState {
    pub text: String,
    pub color: Option<String>,
    pub icon: Option<BTreeMap<u32, String>>,
}

/// Badge kept in memory and traced on every change
#[derive(Debug, Default)]
pub struct MemoryBadge {
    state: RwLock<BadgeState>,
}

impl MemoryBadge {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot(&self) -> BadgeState {
        self.state.read().await.clone()
    }
}

#[async_trait]
impl BadgeSink for MemoryBadge {
    async fn set_text(&self, text: &str) -> Result<()> {
        info!(text, "Badge text");
        self.state.write().await.text = text.to_string();
        Ok(())
    }

    async fn set_color(&self, color: &str) -> Result<()> {
        debug!(color, "Badge color");
        self.state.write().await.color = Some(color.to_string());
        Ok(())
    }

    async fn set_icon(&self, paths: &BTreeMap<u32, String>) -> Result<()> {
        debug!(icon = paths.values().next().map(String::as_str), "Badge icon");
        self.state.write().await.icon = Some(paths.clone());
        Ok(())
    }
}

/// Refresh request sent by the popup, `{"type":"weather:refresh","locationId"?}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RefreshMessage {
    #[serde(rename = "weather:refresh")]
    Refresh {
        #[serde(
            rename = "locationId",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        location_id: Option<String>,
    },
}

impl RefreshMessage {
    #[must_use]
    pub fn new(location_id: Option<String>) -> Self {
        Self::Refresh { location_id }
    }

    /// Parses a JSON message; anything that is not a refresh request is `None`
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        serde_json::from_str(raw).ok()
    }

    #[must_use]
    pub fn location_id(&self) -> Option<&str> {
        match self {
            Self::Refresh { location_id } => location_id.as_deref(),
        }
    }

    #[must_use]
    pub fn plan(&self) -> RefreshPlan {
        plan_request(self.location_id())
    }
}

/// Trigger delivered to the coordinator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoordinatorEvent {
    AlarmFired(String),
    StorageChanged(BTreeSet<StorageKey>),
    RefreshRequested { location_id: Option<String> },
}

impl From<RefreshMessage> for CoordinatorEvent {
    fn from(message: RefreshMessage) -> Self {
        match message {
            RefreshMessage::Refresh { location_id } => Self::RefreshRequested { location_id },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshPlan {
    Primary,
    One(String),
    All,
}

/// Decide what an event should refresh, if anything
#[must_use]
pub fn plan(event: &CoordinatorEvent) -> Option<RefreshPlan> {
    match event {
        CoordinatorEvent::AlarmFired(name) if name == REFRESH_ALARM => Some(RefreshPlan::Primary),
        CoordinatorEvent::AlarmFired(_) => None,
        CoordinatorEvent::StorageChanged(keys)
            if keys.contains(&StorageKey::Locations) || keys.contains(&StorageKey::Settings) =>
        {
            Some(RefreshPlan::Primary)
        }
        CoordinatorEvent::StorageChanged(_) => None,
        CoordinatorEvent::RefreshRequested { location_id } => {
            Some(plan_request(location_id.as_deref()))
        }
    }
}

/// An explicit request always refreshes something; an empty id means all
fn plan_request(location_id: Option<&str>) -> RefreshPlan {
    match location_id {
        Some(id) if !id.is_empty() => RefreshPlan::One(id.to_string()),
        _ => RefreshPlan::All,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshFailure {
    pub location_id: String,
    pub message: String,
}

/// Result of refreshing every location
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshReport {
    pub refreshed: Vec<String>,
    pub failed: Vec<RefreshFailure>,
}

impl RefreshReport {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    Primary,
    One(Box<WeatherCacheItem>),
    All(RefreshReport),
}

pub struct RefreshCoordinator {
    provider: Arc<dyn ForecastProvider>,
    store: WeatherStore,
    badge: Arc<dyn BadgeSink>,
    cache_write: Mutex<()>,
}

impl RefreshCoordinator {
    pub fn new(
        provider: Arc<dyn ForecastProvider>,
        store: WeatherStore,
        badge: Arc<dyn BadgeSink>,
    ) -> Self {
        Self {
            provider,
            store,
            badge,
            cache_write: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn store(&self) -> &WeatherStore {
        &self.store
    }

    pub async fn handle(&self, event: CoordinatorEvent) -> Result<Option<RefreshOutcome>> {
        let Some(plan) = plan(&event) else {
            debug!(?event, "Ignoring event");
            return Ok(None);
        };
        self.execute(plan).await.map(Some)
    }

    pub async fn execute(&self, plan: RefreshPlan) -> Result<RefreshOutcome> {
        match plan {
            RefreshPlan::Primary => {
                self.refresh_primary().await?;
                Ok(RefreshOutcome::Primary)
            }
            RefreshPlan::One(id) => {
                let item = self.refresh_one(&id).await?;
                Ok(RefreshOutcome::One(Box::new(item)))
            }
            RefreshPlan::All => Ok(RefreshOutcome::All(self.refresh_all().await?)),
        }
    }

    /// Refresh one location and return its new snapshot
    #[tracing::instrument(skip(self))]
    pub async fn refresh_one(&self, location_id: &str) -> Result<WeatherCacheItem> {
        let locations = self.store.get_locations().await?;
        let location = locations
            .iter()
            .find(|location| location.id == location_id)
            .ok_or_else(|| WeatherError::not_found(location_id))?;

        let item = self.fetch(location).await?;
        self.write_items(vec![(location.id.clone(), item.clone())])
            .await?;

        if let Some(primary) = locations.first()
            && primary.id == location_id
        {
            self.update_action_from_cache(primary).await?;
        }
        Ok(item)
    }

    /// Refresh every stored location concurrently.
    ///
    /// A failing location does not abort the others; successful snapshots are
    /// written in a single cache update and the failures are reported.
    #[tracing::instrument(skip(self))]
    pub async fn refresh_all(&self) -> Result<RefreshReport> {
        let locations = self.store.get_locations().await?;
        let settings = self.store.get_settings().await?;

        let fetches = locations
            .iter()
            .map(|location| self.provider.fetch_forecast(location, &settings));
        let results = join_all(fetches).await;

        let mut report = RefreshReport::default();
        let mut items = Vec::new();
        for (location, result) in locations.iter().zip(results) {
            match result {
                Ok(item) => {
                    report.refreshed.push(location.id.clone());
                    items.push((location.id.clone(), item));
                }
                Err(error) => {
                    warn!(location_id = %location.id, %error, "Refresh failed");
                    report.failed.push(RefreshFailure {
                        location_id: location.id.clone(),
                        message: error.to_string(),
                    });
                }
            }
        }

        if !items.is_empty() {
            self.write_items(items).await?;
        }
        if let Some(primary) = locations.first() {
            self.update_action_from_cache(primary).await?;
        }

        info!(
            refreshed = report.refreshed.len(),
            failed = report.failed.len(),
            "Refreshed all locations"
        );
        Ok(report)
    }

    /// Refresh the primary location, or clear the badge when there is none
    #[tracing::instrument(skip(self))]
    pub async fn refresh_primary(&self) -> Result<()> {
        let locations = self.store.get_locations().await?;
        let Some(primary) = locations.first() else {
            debug!("No locations, clearing badge");
            return self.badge.set_text("").await;
        };

        let item = self.fetch(primary).await?;
        self.write_items(vec![(primary.id.clone(), item)]).await?;
        self.update_action_from_cache(primary).await
    }

    /// Derive the badge from the cached snapshot of `location`
    pub async fn update_action_from_cache(&self, location: &Location) -> Result<()> {
        let cache = self.store.get_weather_cache().await?;
        let Some(item) = cache.get(&location.id) else {
            return self.badge.set_text("").await;
        };

        self.badge.set_icon(&icon_asset_paths(pick_icon(item))).await?;

        let settings = self.store.get_settings().await?;
        let temperature = item.current.temperature;
        let text = badge_text(temperature);
        self.badge.set_text(&text).await?;
        if !text.is_empty() {
            let celsius = to_celsius(temperature, settings.temp_unit);
            self.badge.set_color(badge_color(celsius)).await?;
        }
        Ok(())
    }

    async fn fetch(&self, location: &Location) -> Result<WeatherCacheItem> {
        let settings = self.store.get_settings().await?;
        self.provider.fetch_forecast(location, &settings).await
    }

    async fn write_items(&self, items: Vec<(String, WeatherCacheItem)>) -> Result<()> {
        let _guard = self.cache_write.lock().await;
        let mut cache = self.store.get_weather_cache().await?;
        cache.extend(items);
        self.store.save_weather_cache(&cache).await
    }
}
