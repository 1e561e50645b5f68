//! Persistent store for locations, settings, the weather cache and the
//! active location id.
//!
//! [`WeatherStore`] is a typed layer over any [`KeyValueStore`]. Values are
//! encoded with postcard. Every successful write is announced to all
//! subscribers as a [`StorageChange`], after the substrate write returned.
//!
//! The read-modify-write helpers (`add_location`, `update_location`,
//! `delete_location`) are not atomic across concurrent callers.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::Result;
use crate::models::{Location, LocationPatch, Settings, WeatherCache, normalize_order};

mod disk;
mod kv;

pub use disk::DiskStore;
pub use kv::{KeyValueStore, MemoryStore};

/// Buffered change events per subscriber before it starts lagging
const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// Persisted keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StorageKey {
    Locations,
    Settings,
    WeatherCache,
    ActiveLocationId,
}

impl StorageKey {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Locations => "locations",
            Self::Settings => "settings",
            Self::WeatherCache => "weatherCache",
            Self::ActiveLocationId => "activeLocationId",
        }
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keys touched by one write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageChange {
    pub keys: BTreeSet<StorageKey>,
}

impl StorageChange {
    #[must_use]
    pub fn single(key: StorageKey) -> Self {
        Self {
            keys: BTreeSet::from([key]),
        }
    }

    #[must_use]
    pub fn contains(&self, key: StorageKey) -> bool {
        self.keys.contains(&key)
    }
}

/// Typed accessor over a key-value substrate
#[derive(Clone)]
pub struct WeatherStore {
    kv: Arc<dyn KeyValueStore>,
    locale: String,
    changes: broadcast::Sender<StorageChange>,
}

impl fmt::Debug for WeatherStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeatherStore")
            .field("locale", &self.locale)
            .field("subscribers", &self.changes.receiver_count())
            .finish_non_exhaustive()
    }
}

impl WeatherStore {
    /// `locale` decides the unit defaults created on the first settings read
    pub fn new(kv: Arc<dyn KeyValueStore>, locale: impl Into<String>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            kv,
            locale: locale.into(),
            changes,
        }
    }

    /// Store backed by a fresh [`MemoryStore`]
    pub fn in_memory(locale: impl Into<String>) -> Self {
        Self::new(Arc::new(MemoryStore::new()), locale)
    }

    #[must_use]
    pub fn locale(&self) -> &str {
        &self.locale
    }

    /// New receiver for change notifications; sees only later writes
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StorageChange> {
        self.changes.subscribe()
    }

    async fn read<T: DeserializeOwned>(&self, key: StorageKey) -> Result<Option<T>> {
        match self.kv.get(key.as_str()).await? {
            Some(bytes) => Ok(Some(postcard::from_bytes(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn write<T: Serialize>(&self, key: StorageKey, value: &T) -> Result<()> {
        let bytes = postcard::to_stdvec(value)?;
        self.kv.set(key.as_str(), bytes).await?;
        self.notify(key);
        Ok(())
    }

    fn notify(&self, key: StorageKey) {
        debug!(%key, "Storage changed");
        // No subscribers is fine
        let _ = self.changes.send(StorageChange::single(key));
    }

    /// Stored locations in display order
    pub async fn get_locations(&self) -> Result<Vec<Location>> {
        let stored: Vec<Location> = self.read(StorageKey::Locations).await?.unwrap_or_default();
        Ok(normalize_order(stored))
    }

    /// Persists `locations` with dense `order` values and returns what was written
    pub async fn save_locations(&self, locations: Vec<Location>) -> Result<Vec<Location>> {
        let normalized = normalize_order(locations);
        self.write(StorageKey::Locations, &normalized).await?;
        Ok(normalized)
    }

    pub async fn add_location(&self, location: Location) -> Result<Vec<Location>> {
        let mut locations = self.get_locations().await?;
        info!(location_id = %location.id, "Adding location");
        locations.push(location);
        self.save_locations(locations).await
    }

    /// Applies `patch` to the location with `location_id`; unknown ids leave
    /// the list unchanged
    pub async fn update_location(
        &self,
        location_id: &str,
        patch: &LocationPatch,
    ) -> Result<Vec<Location>> {
        let locations = self
            .get_locations()
            .await?
            .into_iter()
            .map(|location| {
                if location.id == location_id {
                    patch.applied_to(&location)
                } else {
                    location
                }
            })
            .collect();
        self.save_locations(locations).await
    }

    /// Removes the location and prunes its weather cache entry
    pub async fn delete_location(&self, location_id: &str) -> Result<Vec<Location>> {
        let mut locations = self.get_locations().await?;
        locations.retain(|location| location.id != location_id);
        let saved = self.save_locations(locations).await?;

        let mut cache = self.get_weather_cache().await?;
        if cache.remove(location_id).is_some() {
            debug!(location_id, "Pruned orphaned cache entry");
            self.save_weather_cache(&cache).await?;
        }
        Ok(saved)
    }

    /// Stored settings, or locale defaults persisted on first access
    pub async fn get_settings(&self) -> Result<Settings> {
        if let Some(settings) = self.read(StorageKey::Settings).await? {
            return Ok(settings);
        }
        let defaults = Settings::for_locale(&self.locale);
        info!(locale = %self.locale, ?defaults, "Creating locale default settings");
        self.write(StorageKey::Settings, &defaults).await?;
        Ok(defaults)
    }

    pub async fn save_settings(&self, settings: Settings) -> Result<Settings> {
        self.write(StorageKey::Settings, &settings).await?;
        Ok(settings)
    }

    pub async fn get_weather_cache(&self) -> Result<WeatherCache> {
        Ok(self.read(StorageKey::WeatherCache).await?.unwrap_or_default())
    }

    /// Replaces the whole cache mapping
    pub async fn save_weather_cache(&self, cache: &WeatherCache) -> Result<()> {
        self.write(StorageKey::WeatherCache, cache).await
    }

    pub async fn get_active_location_id(&self) -> Result<Option<String>> {
        self.read(StorageKey::ActiveLocationId).await
    }

    pub async fn set_active_location_id(&self, location_id: Option<&str>) -> Result<()> {
        match location_id {
            Some(id) => self.write(StorageKey::ActiveLocationId, &id).await,
            None => {
                self.kv.remove(StorageKey::ActiveLocationId.as_str()).await?;
                self.notify(StorageKey::ActiveLocationId);
                Ok(())
            }
        }
    }
}
