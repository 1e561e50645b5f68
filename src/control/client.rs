use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use super::{ActiveLocation, ControlApi, ErrorBody, RefreshReply};
use crate::config::ControlConfig;
use crate::coordinator::{BadgeState, RefreshMessage};
use crate::models::{Location, LocationPatch, Settings};
use crate::view::{PopupView, ViewState};
use crate::{Result, WeatherError};

/// HTTP client for the control API of a running daemon
#[derive(Debug, Clone)]
pub struct ControlClient {
    client: Client,
    base_url: Url,
    health_timeout: Duration,
}

impl ControlClient {
    pub fn new(address: &str, health_timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(&format!("http://{address}/")).map_err(|e| {
            WeatherError::config(format!("Invalid control address '{address}': {e}"))
        })?;
        let client = Client::builder()
            .user_agent(concat!("better-weather/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url,
            health_timeout,
        })
    }

    pub fn from_config(config: &ControlConfig) -> Result<Self> {
        Self::new(&config.address, config.health_timeout())
    }

    /// True when a daemon answers on the control address
    pub async fn is_running(&self) -> bool {
        let request = self
            .client
            .get(self.endpoint(&["health"]))
            .timeout(self.health_timeout);
        match request.send().await {
            Ok(response) => response.status().is_success(),
            Err(error) => {
                debug!(%error, address = %self.base_url, "No daemon answering");
                false
            }
        }
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let text = response.text().await.unwrap_or_default();
        Err(match serde_json::from_str::<ErrorBody>(&text) {
            Ok(ErrorBody {
                location_id: Some(location_id),
                ..
            }) if status == StatusCode::NOT_FOUND => WeatherError::not_found(location_id),
            Ok(body) => WeatherError::remote(status.as_u16(), body.error),
            Err(_) => WeatherError::remote(status.as_u16(), text),
        })
    }
}

#[async_trait]
impl ControlApi for ControlClient {
    async fn locations(&self) -> Result<Vec<Location>> {
        self.send(self.client.get(self.endpoint(&["api", "locations"])))
            .await
    }

    async fn add_location(&self, location: Location) -> Result<Vec<Location>> {
        let url = self.endpoint(&["api", "locations"]);
        self.send(self.client.post(url).json(&location)).await
    }

    async fn update_location(
        &self,
        location_id: &str,
        patch: &LocationPatch,
    ) -> Result<Vec<Location>> {
        let url = self.endpoint(&["api", "locations", location_id]);
        self.send(self.client.patch(url).json(patch)).await
    }

    async fn delete_location(&self, location_id: &str) -> Result<Vec<Location>> {
        let url = self.endpoint(&["api", "locations", location_id]);
        self.send(self.client.delete(url)).await
    }

    async fn save_locations(&self, locations: Vec<Location>) -> Result<Vec<Location>> {
        let url = self.endpoint(&["api", "locations"]);
        self.send(self.client.put(url).json(&locations)).await
    }

    async fn settings(&self) -> Result<Settings> {
        self.send(self.client.get(self.endpoint(&["api", "settings"])))
            .await
    }

    async fn save_settings(&self, settings: Settings) -> Result<Settings> {
        let url = self.endpoint(&["api", "settings"]);
        self.send(self.client.put(url).json(&settings)).await
    }

    async fn active_location_id(&self) -> Result<Option<String>> {
        let active: ActiveLocation = self
            .send(self.client.get(self.endpoint(&["api", "active"])))
            .await?;
        Ok(active.location_id)
    }

    async fn set_active_location_id(&self, location_id: Option<String>) -> Result<()> {
        let url = self.endpoint(&["api", "active"]);
        let body = ActiveLocation { location_id };
        let _: ActiveLocation = self.send(self.client.put(url).json(&body)).await?;
        Ok(())
    }

    async fn popup(&self, view: ViewState) -> Result<PopupView> {
        let url = self.endpoint(&["api", "popup"]);
        self.send(self.client.post(url).json(&view)).await
    }

    async fn badge(&self) -> Result<BadgeState> {
        self.send(self.client.get(self.endpoint(&["api", "badge"])))
            .await
    }

    #[instrument(skip(self))]
    async fn refresh(&self, message: RefreshMessage) -> Result<RefreshReply> {
        let url = self.endpoint(&["api", "refresh"]);
        self.send(self.client.post(url).json(&message)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> ControlClient {
        let address = server.address().to_string();
        ControlClient::new(&address, Duration::from_millis(500)).unwrap()
    }

    #[tokio::test]
    async fn test_health_check_detects_daemon() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
            .mount(&server)
            .await;

        assert!(client_for(&server).is_running().await);
    }

    #[tokio::test]
    async fn test_health_check_without_daemon() {
        // Reserve a port, then free it so nothing listens there
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let address = listener.local_addr().unwrap().to_string();
        drop(listener);

        let client = ControlClient::new(&address, Duration::from_millis(200)).unwrap();
        assert!(!client.is_running().await);
    }

    #[tokio::test]
    async fn test_location_ids_are_path_encoded() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/locations/a%2Fb"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let remaining = client_for(&server).delete_location("a/b").await.unwrap();
        assert!(remaining.is_empty());
    }

    #[tokio::test]
    async fn test_not_found_keeps_location_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/refresh"))
            .and(body_json(json!({"type": "weather:refresh", "locationId": "gone"})))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": "Location not found: gone",
                "locationId": "gone"
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .refresh(RefreshMessage::new(Some("gone".into())))
            .await
            .unwrap_err();
        assert!(matches!(err, WeatherError::NotFound { ref location_id } if location_id == "gone"));
    }

    #[tokio::test]
    async fn test_other_failures_become_remote_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/settings"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let err = client_for(&server).settings().await.unwrap_err();
        assert!(matches!(err, WeatherError::Remote { status: 500, ref message } if message == "boom"));
    }
}
