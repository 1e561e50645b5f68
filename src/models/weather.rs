//! Cached weather snapshot model

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Location id to its most recent snapshot
pub type WeatherCache = BTreeMap<String, WeatherCacheItem>;

/// One location's most recent fetched weather snapshot.
///
/// Numeric values the provider omitted are stored as `NaN`, so every parallel
/// array keeps the length of its group's `time` array.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WeatherCacheItem {
    /// Fetch time in epoch milliseconds
    pub fetched_at: i64,
    /// IANA time zone the provider resolved for the coordinates
    pub timezone: String,
    pub weather_code: i32,
    pub current: CurrentConditions,
    pub daily: DailySummary,
    pub daily_forecast: DailyForecast,
    pub hourly: HourlySeries,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CurrentConditions {
    /// Observation time (provider local ISO-8601, may be empty)
    pub time: String,
    pub temperature: f64,
    pub apparent_temperature: f64,
    pub precipitation: f64,
    pub wind_speed: f64,
    pub humidity: f64,
    pub is_day: bool,
}

/// Today's extremes and sun times
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DailySummary {
    pub temp_max: f64,
    pub temp_min: f64,
    pub sunrise: String,
    pub sunset: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct DailyForecast {
    pub time: Vec<String>,
    pub temp_max: Vec<f64>,
    pub temp_min: Vec<f64>,
    pub weather_code: Vec<f64>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct HourlySeries {
    pub time: Vec<String>,
    pub temperature: Vec<f64>,
    pub wind_speed: Vec<f64>,
    pub humidity: Vec<f64>,
    pub precipitation: Vec<f64>,
}

impl DailyForecast {
    #[must_use]
    pub fn len(&self) -> usize {
        self.time.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }
}

impl HourlySeries {
    #[must_use]
    pub fn len(&self) -> usize {
        self.time.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Entries whose timestamp starts with `date_key` (`YYYY-MM-DD`).
    /// Returns `None` when nothing matches.
    #[must_use]
    pub fn for_date(&self, date_key: &str) -> Option<HourlySeries> {
        if date_key.is_empty() {
            return None;
        }
        let indices: Vec<usize> = self
            .time
            .iter()
            .enumerate()
            .filter(|(_, time)| time.starts_with(date_key))
            .map(|(index, _)| index)
            .collect();
        if indices.is_empty() {
            return None;
        }

        let pick = |values: &[f64]| -> Vec<f64> {
            indices
                .iter()
                .map(|&i| values.get(i).copied().unwrap_or(f64::NAN))
                .collect()
        };

        Some(HourlySeries {
            time: indices.iter().map(|&i| self.time[i].clone()).collect(),
            temperature: pick(&self.temperature),
            wind_speed: pick(&self.wind_speed),
            humidity: pick(&self.humidity),
            precipitation: pick(&self.precipitation),
        })
    }
}
