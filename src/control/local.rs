use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::{ControlApi, RefreshReply};
use crate::Result;
use crate::background::BackgroundHandle;
use crate::coordinator::{BadgeState, MemoryBadge, RefreshCoordinator, RefreshMessage};
use crate::models::{Location, LocationPatch, Settings};
use crate::store::WeatherStore;
use crate::view::{PopupView, ViewState, render_popup};

enum Refresher {
    /// Queued behind the background service's own events
    Service(BackgroundHandle),
    /// No service in this process
    Inline(Arc<RefreshCoordinator>),
}

/// [`ControlApi`] over a store opened by this process
pub struct LocalControl {
    store: WeatherStore,
    badge: Arc<MemoryBadge>,
    refresher: Refresher,
}

impl LocalControl {
    /// Refreshes run on `coordinator` directly; `badge` must be the one it writes to
    pub fn new(coordinator: Arc<RefreshCoordinator>, badge: Arc<MemoryBadge>) -> Self {
        Self {
            store: coordinator.store().clone(),
            badge,
            refresher: Refresher::Inline(coordinator),
        }
    }

    /// Refreshes are sent to a running [`BackgroundService`](crate::BackgroundService)
    pub fn with_service(
        store: WeatherStore,
        badge: Arc<MemoryBadge>,
        handle: BackgroundHandle,
    ) -> Self {
        Self {
            store,
            badge,
            refresher: Refresher::Service(handle),
        }
    }

    #[must_use]
    pub fn store(&self) -> &WeatherStore {
        &self.store
    }
}

#[async_trait]
impl ControlApi for LocalControl {
    async fn locations(&self) -> Result<Vec<Location>> {
        self.store.get_locations().await
    }

    async fn add_location(&self, location: Location) -> Result<Vec<Location>> {
        self.store.add_location(location).await
    }

    async fn update_location(
        &self,
        location_id: &str,
        patch: &LocationPatch,
    ) -> Result<Vec<Location>> {
        self.store.update_location(location_id, patch).await
    }

    async fn delete_location(&self, location_id: &str) -> Result<Vec<Location>> {
        self.store.delete_location(location_id).await
    }

    async fn save_locations(&self, locations: Vec<Location>) -> Result<Vec<Location>> {
        self.store.save_locations(locations).await
    }

    async fn settings(&self) -> Result<Settings> {
        self.store.get_settings().await
    }

    async fn save_settings(&self, settings: Settings) -> Result<Settings> {
        self.store.save_settings(settings).await
    }

    async fn active_location_id(&self) -> Result<Option<String>> {
        self.store.get_active_location_id().await
    }

    async fn set_active_location_id(&self, location_id: Option<String>) -> Result<()> {
        self.store
            .set_active_location_id(location_id.as_deref())
            .await
    }

    async fn popup(&self, mut view: ViewState) -> Result<PopupView> {
        if view.active_location_id.is_none() {
            view.active_location_id = self.store.get_active_location_id().await?;
        }
        let locations = self.store.get_locations().await?;
        let settings = self.store.get_settings().await?;
        let cache = self.store.get_weather_cache().await?;
        Ok(render_popup(&locations, &cache, &settings, &view))
    }

    async fn badge(&self) -> Result<BadgeState> {
        Ok(self.badge.snapshot().await)
    }

    async fn refresh(&self, message: RefreshMessage) -> Result<RefreshReply> {
        debug!(?message, "Refresh through control");
        let outcome = match &self.refresher {
            Refresher::Service(handle) => handle.send(message.clone()).await?,
            Refresher::Inline(coordinator) => coordinator.execute(message.plan()).await?,
        };
        Ok(RefreshReply::from_outcome(outcome, &message))
    }
}
