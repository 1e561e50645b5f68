//! Open-Meteo forecast and geocoding client
//!
//! Builds the request URLs, performs the GETs and normalises the JSON
//! payloads into [`WeatherCacheItem`]s. The payload is read as loosely typed
//! JSON on purpose: a field that is missing, `null` or of the wrong shape is
//! coerced to `NaN`, an empty string or an empty vector instead of failing the
//! refresh.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Url};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use super::{ForecastProvider, SearchOptions, is_searchable};
use crate::config::ProviderConfig;
use crate::models::{
    CurrentConditions, DailyForecast, DailySummary, HourlySeries, Location, Settings,
    WeatherCacheItem,
};
use crate::{Result, WeatherError};

pub const FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";
pub const GEOCODING_URL: &str = "https://geocoding-api.open-meteo.com/v1/search";

const CURRENT_FIELDS: &str = "temperature_2m,apparent_temperature,precipitation,wind_speed_10m,relative_humidity_2m,is_day,weather_code";
const HOURLY_FIELDS: &str = "temperature_2m,wind_speed_10m,relative_humidity_2m,precipitation";
const DAILY_FIELDS: &str = "temperature_2m_max,temperature_2m_min,sunrise,sunset,weather_code";
const FORECAST_DAYS: usize = 7;

const FORECAST_SERVICE: &str = "Open-Meteo forecast";
const GEOCODING_SERVICE: &str = "Open-Meteo geocoding";
const USER_AGENT: &str = concat!("better-weather/", env!("CARGO_PKG_VERSION"));

/// Weather code used when the provider sent none; maps to the fallback icon
const UNKNOWN_WEATHER_CODE: i32 = -1;

/// One geocoder suggestion
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeocodeResult {
    #[serde(default)]
    pub id: i64,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default)]
    pub admin1: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
}

impl GeocodeResult {
    /// `name, admin1, country` with blank and case-insensitive duplicate
    /// parts dropped
    #[must_use]
    pub fn label(&self) -> String {
        let mut seen = Vec::new();
        let mut parts = Vec::new();
        for part in [Some(&self.name), self.admin1.as_ref(), self.country.as_ref()]
            .into_iter()
            .flatten()
        {
            let key = part.trim().to_lowercase();
            if key.is_empty() || seen.contains(&key) {
                continue;
            }
            seen.push(key);
            parts.push(part.trim());
        }
        parts.join(", ")
    }

    /// New saved location appended at `order`
    #[must_use]
    pub fn into_location(self, id: impl Into<String>, order: i64) -> Location {
        let name = self.label();
        Location::new(id, Some(name), self.latitude, self.longitude, order)
    }
}

/// Open-Meteo API client
#[derive(Debug, Clone)]
pub struct OpenMeteoClient {
    client: ClientWithMiddleware,
    forecast_url: String,
    geocoding_url: String,
}

impl OpenMeteoClient {
    /// Create a client from provider configuration
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_seconds.into());
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        let mut builder = ClientBuilder::new(client);
        // Non-success answers are reported, not retried, unless configured
        if config.max_retries > 0 {
            let policy = ExponentialBackoff::builder().build_with_max_retries(config.max_retries);
            builder = builder.with(RetryTransientMiddleware::new_with_policy(policy));
        }

        Ok(Self {
            client: builder.build(),
            forecast_url: config.forecast_url.clone(),
            geocoding_url: config.geocoding_url.clone(),
        })
    }

    /// Client against explicit endpoints, without retries
    pub fn with_base_urls(
        forecast_url: impl Into<String>,
        geocoding_url: impl Into<String>,
    ) -> Result<Self> {
        let config = ProviderConfig {
            forecast_url: forecast_url.into(),
            geocoding_url: geocoding_url.into(),
            max_retries: 0,
            ..ProviderConfig::default()
        };
        Self::new(&config)
    }

    /// Forecast request URL for `location` in the units of `settings`
    pub fn forecast_url(&self, location: &Location, settings: &Settings) -> Result<Url> {
        let latitude = location.lat.to_string();
        let longitude = location.lon.to_string();
        let forecast_days = FORECAST_DAYS.to_string();
        let params = [
            ("latitude", latitude.as_str()),
            ("longitude", longitude.as_str()),
            ("current", CURRENT_FIELDS),
            ("hourly", HOURLY_FIELDS),
            ("daily", DAILY_FIELDS),
            ("timezone", "auto"),
            ("temperature_unit", settings.temp_unit.provider_value()),
            ("wind_speed_unit", settings.wind_unit.provider_value()),
            ("precipitation_unit", settings.precip_unit.provider_value()),
            ("forecast_days", forecast_days.as_str()),
        ];
        Url::parse_with_params(&self.forecast_url, &params).map_err(|e| {
            WeatherError::config(format!("Invalid forecast URL '{}': {e}", self.forecast_url))
        })
    }

    /// Geocoding request URL for an already trimmed query
    pub fn geocoding_url(&self, query: &str, language: Option<&str>, limit: usize) -> Result<Url> {
        let count = limit.to_string();
        let mut params = vec![
            ("name", query),
            ("count", count.as_str()),
            ("format", "json"),
        ];
        if let Some(language) = language.filter(|l| !l.is_empty()) {
            params.push(("language", language));
        }
        Url::parse_with_params(&self.geocoding_url, &params).map_err(|e| {
            WeatherError::config(format!(
                "Invalid geocoding URL '{}': {e}",
                self.geocoding_url
            ))
        })
    }

    async fn get_json(&self, url: Url, service: &str) -> Result<Value> {
        let start_time = Instant::now();
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            warn!(%status, service, "Provider returned an error status");
            return Err(WeatherError::upstream(service, status.as_u16()));
        }

        let body: Value = response.json().await?;
        let elapsed = start_time.elapsed();
        debug!(service, elapsed_ms = elapsed.as_millis(), "Provider response received");
        if elapsed.as_secs() > 5 {
            warn!("Slow API response detected: {:.3}s", elapsed.as_secs_f64());
        }
        Ok(body)
    }

    async fn search(&self, trimmed: &str, options: &SearchOptions) -> Result<Vec<GeocodeResult>> {
        let url = self.geocoding_url(trimmed, options.language.as_deref(), options.limit())?;
        let body = self.get_json(url, GEOCODING_SERVICE).await?;
        Ok(parse_geocode_response(&body))
    }
}

#[async_trait]
impl ForecastProvider for OpenMeteoClient {
    #[instrument(skip(self, location, settings), fields(location_id = %location.id))]
    async fn fetch_forecast(
        &self,
        location: &Location,
        settings: &Settings,
    ) -> Result<WeatherCacheItem> {
        let url = self.forecast_url(location, settings)?;
        debug!("OpenMeteo API request URL: {}", url);

        let body = self.get_json(url, FORECAST_SERVICE).await?;
        let item = parse_forecast_response(&body, Utc::now().timestamp_millis());

        info!(
            timezone = %item.timezone,
            hourly = item.hourly.len(),
            days = item.daily_forecast.len(),
            "Fetched forecast"
        );
        Ok(item)
    }

    #[instrument(skip(self, options))]
    async fn search_places(
        &self,
        query: &str,
        options: SearchOptions,
    ) -> Result<Vec<GeocodeResult>> {
        let trimmed = query.trim();
        if !is_searchable(trimmed) {
            return Ok(Vec::new());
        }

        let Some(token) = options.cancel.clone() else {
            return self.search(trimmed, &options).await;
        };
        if token.is_cancelled() {
            return Err(WeatherError::Cancelled);
        }

        tokio::select! {
            biased;
            () = token.cancelled() => {
                debug!("Geocoding request cancelled");
                Err(WeatherError::Cancelled)
            }
            results = self.search(trimmed, &options) => results,
        }
    }
}

/// Normalise a forecast payload. Never fails; see the module docs.
#[must_use]
pub fn parse_forecast_response(body: &Value, fetched_at: i64) -> WeatherCacheItem {
    let current = body.get("current");
    let daily = body.get("daily");
    fn field<'a>(group: Option<&'a Value>, name: &str) -> Option<&'a Value> {
        group.and_then(|g| g.get(name))
    }

    // 60.6 is not a WMO code; it falls back instead of rounding into one
    let weather_code = to_number(field(current, "weather_code"));
    let weather_code = if weather_code.is_finite()
        && weather_code.fract() == 0.0
        && (f64::from(i32::MIN)..=f64::from(i32::MAX)).contains(&weather_code)
    {
        weather_code as i32
    } else {
        UNKNOWN_WEATHER_CODE
    };

    let daily_time = string_array(field(daily, "time"), Some(FORECAST_DAYS));
    let daily_len = daily_time.len();

    WeatherCacheItem {
        fetched_at,
        timezone: body
            .get("timezone")
            .and_then(Value::as_str)
            .unwrap_or("UTC")
            .to_string(),
        weather_code,
        current: CurrentConditions {
            time: to_string(field(current, "time")),
            temperature: to_number(field(current, "temperature_2m")),
            apparent_temperature: to_number(field(current, "apparent_temperature")),
            precipitation: to_number(field(current, "precipitation")),
            wind_speed: to_number(field(current, "wind_speed_10m")),
            humidity: to_number(field(current, "relative_humidity_2m")),
            is_day: to_number(field(current, "is_day")) == 1.0,
        },
        daily: DailySummary {
            temp_max: to_number(first(field(daily, "temperature_2m_max"))),
            temp_min: to_number(first(field(daily, "temperature_2m_min"))),
            sunrise: to_string(first(field(daily, "sunrise"))),
            sunset: to_string(first(field(daily, "sunset"))),
        },
        daily_forecast: DailyForecast {
            temp_max: number_array(field(daily, "temperature_2m_max"), daily_len),
            temp_min: number_array(field(daily, "temperature_2m_min"), daily_len),
            weather_code: number_array(field(daily, "weather_code"), daily_len),
            time: daily_time,
        },
        hourly: parse_hourly(body.get("hourly")),
    }
}

fn parse_hourly(hourly: Option<&Value>) -> HourlySeries {
    let Some(time) = hourly
        .and_then(|h| h.get("time"))
        .filter(|t| t.is_array())
    else {
        return HourlySeries::default();
    };
    let time = string_array(Some(time), None);
    let count = time.len();
    let column = |name: &str| number_array(hourly.and_then(|h| h.get(name)), count);

    HourlySeries {
        temperature: column("temperature_2m"),
        wind_speed: column("wind_speed_10m"),
        humidity: column("relative_humidity_2m"),
        precipitation: column("precipitation"),
        time,
    }
}

/// Extract geocoding suggestions; entries that do not decode are skipped
#[must_use]
pub fn parse_geocode_response(body: &Value) -> Vec<GeocodeResult> {
    let Some(results) = body.get("results").and_then(Value::as_array) else {
        return Vec::new();
    };
    results
        .iter()
        .filter_map(|entry| match GeocodeResult::deserialize(entry) {
            Ok(result) => Some(result),
            Err(e) => {
                debug!("Skipping malformed geocoding entry: {}", e);
                None
            }
        })
        .collect()
}

fn first(value: Option<&Value>) -> Option<&Value> {
    value.and_then(Value::as_array).and_then(|values| values.first())
}

fn to_number(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(f64::NAN),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(f64::NAN),
        Some(Value::Bool(b)) => f64::from(u8::from(*b)),
        _ => f64::NAN,
    }
}

fn to_string(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        _ => String::new(),
    }
}

/// Exactly `len` numbers; short or missing columns are padded with `NaN`
fn number_array(value: Option<&Value>, len: usize) -> Vec<f64> {
    let values = value.and_then(Value::as_array);
    (0..len)
        .map(|i| to_number(values.and_then(|v| v.get(i))))
        .collect()
}

fn string_array(value: Option<&Value>, limit: Option<usize>) -> Vec<String> {
    let Some(values) = value.and_then(Value::as_array) else {
        return Vec::new();
    };
    values
        .iter()
        .take(limit.unwrap_or(usize::MAX))
        .map(|v| to_string(Some(v)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::icons::icon_name_for;
    use crate::models::{PrecipUnit, TempUnit, WindUnit};
    use rstest::rstest;
    use serde_json::json;
    use tokio_util::sync::CancellationToken;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn berlin() -> Location {
        Location::new("berlin", Some("Berlin".into()), 52.52, 13.41, 0)
    }

    fn metric() -> Settings {
        Settings::for_locale("de-DE")
    }

    fn client_for(server: &MockServer) -> OpenMeteoClient {
        OpenMeteoClient::with_base_urls(
            format!("{}/v1/forecast", server.uri()),
            format!("{}/v1/search", server.uri()),
        )
        .unwrap()
    }

    fn forecast_body() -> Value {
        json!({
            "timezone": "Europe/Berlin",
            "current": {
                "time": "2024-05-01T12:00",
                "temperature_2m": 18.4,
                "apparent_temperature": 17.9,
                "precipitation": 0.2,
                "wind_speed_10m": 11.0,
                "relative_humidity_2m": 64,
                "is_day": 1,
                "weather_code": 61
            },
            "hourly": {
                "time": ["2024-05-01T00:00", "2024-05-01T01:00"],
                "temperature_2m": [12.1, 11.8],
                "wind_speed_10m": [5.0, 4.2],
                "relative_humidity_2m": [80, 82],
                "precipitation": [0.0, 0.1]
            },
            "daily": {
                "time": ["2024-05-01", "2024-05-02", "2024-05-03", "2024-05-04",
                         "2024-05-05", "2024-05-06", "2024-05-07", "2024-05-08"],
                "temperature_2m_max": [20.0, 21.0, 22.0, 23.0, 24.0, 25.0, 26.0, 27.0],
                "temperature_2m_min": [8.0, 9.0, 10.0, 11.0, 12.0, 13.0, 14.0, 15.0],
                "sunrise": ["2024-05-01T05:31"],
                "sunset": ["2024-05-01T20:38"],
                "weather_code": [61, 3, 2, 1, 0, 95, 71, 45]
            }
        })
    }

    #[test]
    fn test_forecast_url_contains_all_parameters() {
        let client = OpenMeteoClient::with_base_urls(FORECAST_URL, GEOCODING_URL).unwrap();
        let url = client.forecast_url(&berlin(), &metric()).unwrap();
        let pairs: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();

        assert!(url.as_str().starts_with("https://api.open-meteo.com/v1/forecast?"));
        assert_eq!(pairs["latitude"], "52.52");
        assert_eq!(pairs["longitude"], "13.41");
        assert_eq!(pairs["current"], CURRENT_FIELDS);
        assert_eq!(pairs["hourly"], HOURLY_FIELDS);
        assert_eq!(pairs["daily"], DAILY_FIELDS);
        assert_eq!(pairs["timezone"], "auto");
        assert_eq!(pairs["temperature_unit"], "celsius");
        assert_eq!(pairs["wind_speed_unit"], "kmh");
        assert_eq!(pairs["precipitation_unit"], "mm");
        assert_eq!(pairs["forecast_days"], "7");
    }

    #[test]
    fn test_forecast_url_maps_imperial_units() {
        let client = OpenMeteoClient::with_base_urls(FORECAST_URL, GEOCODING_URL).unwrap();
        let settings = Settings {
            temp_unit: TempUnit::F,
            wind_unit: WindUnit::Ms,
            precip_unit: PrecipUnit::In,
            locale_defaulted: false,
        };
        let url = client.forecast_url(&berlin(), &settings).unwrap();
        let query = url.query().unwrap();
        assert!(query.contains("temperature_unit=fahrenheit"));
        assert!(query.contains("wind_speed_unit=ms"));
        assert!(query.contains("precipitation_unit=inch"));
    }

    #[test]
    fn test_geocoding_url_optional_language() {
        let client = OpenMeteoClient::with_base_urls(FORECAST_URL, GEOCODING_URL).unwrap();
        let url = client.geocoding_url("São Paulo", None, 6).unwrap();
        assert!(url.as_str().starts_with(GEOCODING_URL));
        assert!(url.query().unwrap().contains("count=6"));
        assert!(url.query().unwrap().contains("format=json"));
        assert!(!url.query().unwrap().contains("language"));

        let url = client.geocoding_url("Berlin", Some("de"), 3).unwrap();
        assert!(url.query().unwrap().contains("language=de"));
    }

    #[test]
    fn test_parse_full_forecast() {
        let item = parse_forecast_response(&forecast_body(), 1_714_557_600_000);

        assert_eq!(item.fetched_at, 1_714_557_600_000);
        assert_eq!(item.timezone, "Europe/Berlin");
        assert_eq!(item.weather_code, 61);
        assert_eq!(item.current.temperature, 18.4);
        assert_eq!(item.current.humidity, 64.0);
        assert!(item.current.is_day);
        assert_eq!(item.daily.temp_max, 20.0);
        assert_eq!(item.daily.sunrise, "2024-05-01T05:31");
        assert_eq!(item.hourly.len(), 2);
        assert_eq!(item.hourly.humidity, vec![80.0, 82.0]);
    }

    #[test]
    fn test_daily_forecast_is_capped_at_seven_days() {
        let item = parse_forecast_response(&forecast_body(), 0);
        assert_eq!(item.daily_forecast.time.len(), 7);
        assert_eq!(item.daily_forecast.temp_max.len(), 7);
        assert_eq!(item.daily_forecast.temp_min.len(), 7);
        assert_eq!(item.daily_forecast.weather_code.len(), 7);
        assert_eq!(item.daily_forecast.weather_code[5], 95.0);
    }

    #[test]
    fn test_partial_forecast_is_coerced() {
        let body = json!({
            "current": { "temperature_2m": null, "is_day": 0 },
            "hourly": { "time": ["2024-05-01T00:00", "2024-05-01T01:00"], "temperature_2m": [3.5] },
            "daily": { "time": "not-an-array" }
        });
        let item = parse_forecast_response(&body, 0);

        assert_eq!(item.timezone, "UTC");
        assert_eq!(item.weather_code, UNKNOWN_WEATHER_CODE);
        assert!(item.current.temperature.is_nan());
        assert!(!item.current.is_day);
        assert_eq!(item.current.time, "");
        assert!(item.daily.temp_max.is_nan());
        assert_eq!(item.daily.sunset, "");
        assert!(item.daily_forecast.is_empty());
        assert!(item.daily_forecast.temp_max.is_empty());

        assert_eq!(item.hourly.temperature.len(), 2);
        assert_eq!(item.hourly.temperature[0], 3.5);
        assert!(item.hourly.temperature[1].is_nan());
        assert_eq!(item.hourly.wind_speed.len(), 2);
    }

    #[rstest]
    #[case(json!(61), 61)]
    #[case(json!(61.0), 61)]
    #[case(json!(60.6), UNKNOWN_WEATHER_CODE)]
    #[case(json!(1e12), UNKNOWN_WEATHER_CODE)]
    #[case(json!("61"), 61)]
    fn test_current_weather_code_must_be_integral(#[case] code: Value, #[case] expected: i32) {
        let body = json!({ "current": { "weather_code": code, "is_day": 1 } });
        let item = parse_forecast_response(&body, 0);
        assert_eq!(item.weather_code, expected);
    }

    #[test]
    fn test_fractional_code_uses_fallback_icon() {
        let body = json!({ "current": { "weather_code": 60.6, "is_day": 1 } });
        let item = parse_forecast_response(&body, 0);
        assert_eq!(icon_name_for(item.weather_code, true), "cloudy-2-day");
    }

    #[test]
    fn test_missing_hourly_block_is_empty() {
        let item = parse_forecast_response(&json!({}), 0);
        assert_eq!(item.hourly, HourlySeries::default());
    }

    #[test]
    fn test_geocode_label_deduplicates_parts() {
        let result = GeocodeResult {
            id: 1,
            name: "Berlin".into(),
            latitude: 52.52,
            longitude: 13.41,
            country: Some("Germany".into()),
            country_code: Some("DE".into()),
            admin1: Some("berlin".into()),
            timezone: None,
        };
        assert_eq!(result.label(), "Berlin, Germany");

        let location = result.into_location("new-id", 3);
        assert_eq!(location.name.as_deref(), Some("Berlin, Germany"));
        assert_eq!(location.order, 3);
    }

    #[test]
    fn test_parse_geocode_skips_malformed_entries() {
        let body = json!({
            "results": [
                { "id": 1, "name": "Lisbon", "latitude": 38.7, "longitude": -9.1, "country": "Portugal" },
                { "name": "Broken" }
            ]
        });
        let results = parse_geocode_response(&body);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].name, "Lisbon");

        assert!(parse_geocode_response(&json!({"generationtime_ms": 0.5})).is_empty());
        assert!(parse_geocode_response(&json!({"results": "nope"})).is_empty());
    }

    #[tokio::test]
    async fn test_fetch_forecast_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/forecast"))
            .and(query_param("latitude", "52.52"))
            .and(query_param("temperature_unit", "celsius"))
            .respond_with(ResponseTemplate::new(200).set_body_json(forecast_body()))
            .expect(1)
            .mount(&server)
            .await;

        let item = client_for(&server)
            .fetch_forecast(&berlin(), &metric())
            .await
            .unwrap();
        assert_eq!(item.weather_code, 61);
        assert!(item.fetched_at > 0);
    }

    #[tokio::test]
    async fn test_fetch_forecast_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/forecast"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        let err = client_for(&server)
            .fetch_forecast(&berlin(), &metric())
            .await
            .unwrap_err();
        assert!(matches!(err, WeatherError::Upstream { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_search_places_returns_results() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/search"))
            .and(query_param("name", "Lisbon"))
            .and(query_param("count", "6"))
            .and(query_param("language", "pt"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [
                    { "id": 2267057, "name": "Lisbon", "latitude": 38.71, "longitude": -9.14,
                      "country": "Portugal", "country_code": "PT", "admin1": "Lisbon" }
                ]
            })))
            .mount(&server)
            .await;

        let results = client_for(&server)
            .search_places("  Lisbon ", SearchOptions::default().with_language("pt"))
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].label(), "Lisbon, Portugal");
    }

    #[tokio::test]
    async fn test_search_places_without_results_field() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let results = client_for(&server)
            .search_places("Nowhere", SearchOptions::default())
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_short_query_never_hits_network() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let results = client_for(&server)
            .search_places(" x ", SearchOptions::default())
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_search() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/search"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "results": [] }))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let token = CancellationToken::new();
        let client = client_for(&server);
        let pending = {
            let token = token.clone();
            tokio::spawn(async move {
                client
                    .search_places("Berlin", SearchOptions::default().with_cancel(token))
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        token.cancel();

        let err = pending.await.unwrap().unwrap_err();
        assert!(err.is_cancelled());
    }
}
