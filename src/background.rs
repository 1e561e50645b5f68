//! Long-running background service.
//!
//! Owns the periodic [`REFRESH_ALARM`], listens for store changes and
//! serves refresh requests from [`BackgroundHandle`]s. Events are handled one
//! at a time; a failing refresh is logged and the loop keeps going until its
//! cancellation token fires.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::coordinator::{
    CoordinatorEvent, REFRESH_ALARM, RefreshCoordinator, RefreshMessage, RefreshOutcome,
};
use crate::store::StorageKey;
use crate::{Result, WeatherError};

const REQUEST_QUEUE: usize = 16;

struct RefreshRequest {
    message: RefreshMessage,
    reply: oneshot::Sender<Result<RefreshOutcome>>,
}

/// Sends refresh messages to a running [`BackgroundService`]
#[derive(Clone)]
pub struct BackgroundHandle {
    requests: mpsc::Sender<RefreshRequest>,
}

impl BackgroundHandle {
    /// Refresh one location, or every location when `location_id` is `None`,
    /// and wait for the outcome
    pub async fn request_refresh(&self, location_id: Option<String>) -> Result<RefreshOutcome> {
        self.send(RefreshMessage::new(location_id)).await
    }

    pub async fn send(&self, message: RefreshMessage) -> Result<RefreshOutcome> {
        let (reply, response) = oneshot::channel();
        self.requests
            .send(RefreshRequest { message, reply })
            .await
            .map_err(|_| WeatherError::Cancelled)?;
        response.await.map_err(|_| WeatherError::Cancelled)?
    }
}

pub struct BackgroundService {
    coordinator: Arc<RefreshCoordinator>,
    period: Duration,
}

impl BackgroundService {
    pub fn new(coordinator: Arc<RefreshCoordinator>, period: Duration) -> Self {
        Self {
            coordinator,
            period,
        }
    }

    /// Start the service on the current runtime
    pub fn spawn(self, cancel: CancellationToken) -> (BackgroundHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(REQUEST_QUEUE);
        let task = tokio::spawn(self.run(rx, cancel));
        (BackgroundHandle { requests: tx }, task)
    }

    async fn run(self, mut requests: mpsc::Receiver<RefreshRequest>, cancel: CancellationToken) {
        // A fresh store persists its locale defaults on first read. Settle
        // them before subscribing so that write is not answered with a refresh.
        if let Err(error) = self.coordinator.store().get_settings().await {
            warn!(%error, "Could not load settings");
        }
        let mut changes = self.coordinator.store().subscribe();

        info!(period = ?self.period, alarm = REFRESH_ALARM, "Background service started");
        if let Err(error) = self.coordinator.refresh_primary().await {
            warn!(%error, "Startup refresh failed");
        }

        let mut alarm = tokio::time::interval_at(Instant::now() + self.period, self.period);
        alarm.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut requests_open = true;

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                change = changes.recv() => match change {
                    Ok(change) => self.dispatch(CoordinatorEvent::StorageChanged(change.keys)).await,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Missed storage changes, refreshing primary");
                        let keys = BTreeSet::from([StorageKey::Locations]);
                        self.dispatch(CoordinatorEvent::StorageChanged(keys)).await;
                    }
                    Err(RecvError::Closed) => break,
                },
                _ = alarm.tick() => {
                    self.dispatch(CoordinatorEvent::AlarmFired(REFRESH_ALARM.to_string())).await;
                }
                request = requests.recv(), if requests_open => match request {
                    Some(RefreshRequest { message, reply }) => {
                        debug!(?message, "Refresh requested");
                        let result = self.coordinator.execute(message.plan()).await;
                        if let Err(error) = &result {
                            warn!(%error, "Requested refresh failed");
                        }
                        // Requester may have gone away
                        let _ = reply.send(result);
                    }
                    None => requests_open = false,
                },
            }
        }
        info!("Background service stopped");
    }

    async fn dispatch(&self, event: CoordinatorEvent) {
        if let Err(error) = self.coordinator.handle(event).await {
            warn!(%error, "Background refresh failed");
        }
    }
}
