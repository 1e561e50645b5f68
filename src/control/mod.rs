//! Access to the store and coordinator of a running daemon.
//!
//! The on-disk store can be opened by one process only. While the daemon runs
//! it owns the store and serves [`router`] on the configured control address;
//! every other command then goes through a [`ControlClient`], so its writes
//! reach the daemon's change subscribers. Without a daemon the commands open
//! the store themselves and use a [`LocalControl`]. Both implement
//! [`ControlApi`].

mod client;
mod local;
mod server;

pub use client::ControlClient;
pub use local::LocalControl;
pub use server::{router, serve};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::coordinator::{BadgeState, RefreshFailure, RefreshMessage, RefreshOutcome};
use crate::models::{Location, LocationPatch, Settings};
use crate::view::{PopupView, ViewState};

#[async_trait]
pub trait ControlApi: Send + Sync {
    async fn locations(&self) -> Result<Vec<Location>>;

    async fn add_location(&self, location: Location) -> Result<Vec<Location>>;

    async fn update_location(
        &self,
        location_id: &str,
        patch: &LocationPatch,
    ) -> Result<Vec<Location>>;

    async fn delete_location(&self, location_id: &str) -> Result<Vec<Location>>;

    /// Replace the whole list; `order` is normalised
    async fn save_locations(&self, locations: Vec<Location>) -> Result<Vec<Location>>;

    async fn settings(&self) -> Result<Settings>;

    async fn save_settings(&self, settings: Settings) -> Result<Settings>;

    async fn active_location_id(&self) -> Result<Option<String>>;

    async fn set_active_location_id(&self, location_id: Option<String>) -> Result<()>;

    /// Render the popup. Without an explicit location the stored active id is used.
    async fn popup(&self, view: ViewState) -> Result<PopupView>;

    async fn badge(&self) -> Result<BadgeState>;

    async fn refresh(&self, message: RefreshMessage) -> Result<RefreshReply>;
}

/// What a refresh did, in a form that travels as JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum RefreshReply {
    Primary,
    #[serde(rename_all = "camelCase")]
    One {
        location_id: String,
        /// `None` when the provider sent no usable temperature
        temperature: Option<f64>,
        timezone: String,
    },
    All {
        refreshed: Vec<String>,
        failed: Vec<RefreshFailure>,
    },
}

impl RefreshReply {
    #[must_use]
    pub fn from_outcome(outcome: RefreshOutcome, message: &RefreshMessage) -> Self {
        match outcome {
            RefreshOutcome::Primary => Self::Primary,
            RefreshOutcome::One(item) => Self::One {
                location_id: message.location_id().unwrap_or_default().to_string(),
                temperature: Some(item.current.temperature).filter(|t| t.is_finite()),
                timezone: item.timezone,
            },
            RefreshOutcome::All(report) => Self::All {
                refreshed: report.refreshed,
                failed: report.failed,
            },
        }
    }

    #[must_use]
    pub fn failed(&self) -> &[RefreshFailure] {
        match self {
            Self::All { failed, .. } => failed,
            Self::Primary | Self::One { .. } => &[],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActiveLocation {
    location_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    location_id: Option<String>,
}
