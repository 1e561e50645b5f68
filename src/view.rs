//! Presentation helpers: turn stored data plus an explicit [`ViewState`]
//! into display strings. Missing or non-finite values render as `--`.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};

use crate::icons::{
    describe_weather_code, icon_asset_paths, icon_name_for_value, pick_icon, round_half_up,
};
use crate::models::{HourlySeries, Location, PrecipUnit, Settings, WeatherCache, WeatherCacheItem};

pub const PLACEHOLDER: &str = "--";

/// Days shown in the forecast row at most
pub const MAX_FORECAST_DAYS: usize = 7;

const POPUP_ICON_SIZE: u32 = 96;
const FORECAST_ICON_SIZE: u32 = 48;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartMetric {
    #[default]
    Temp,
    Wind,
    Humidity,
    Precip,
}

impl ChartMetric {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Temp => "Temp",
            Self::Wind => "Wind",
            Self::Humidity => "Humidity",
            Self::Precip => "Precip",
        }
    }

    /// Lowest value the chart axis may start at
    #[must_use]
    pub fn min_floor(self) -> Option<f64> {
        match self {
            Self::Temp => None,
            Self::Wind | Self::Humidity | Self::Precip => Some(0.0),
        }
    }

    fn values(self, hourly: &HourlySeries) -> &[f64] {
        match self {
            Self::Temp => &hourly.temperature,
            Self::Wind => &hourly.wind_speed,
            Self::Humidity => &hourly.humidity,
            Self::Precip => &hourly.precipitation,
        }
    }

    fn format_value(self, value: f64, settings: &Settings) -> String {
        match self {
            Self::Temp => format_temp(value, settings),
            Self::Wind => format_value(value, settings.wind_unit.label()),
            Self::Humidity => format_percent(value),
            Self::Precip => format_precip(value, settings.precip_unit),
        }
    }

    fn format_range(self, min: f64, max: f64, settings: &Settings) -> String {
        match self {
            Self::Temp => format!(
                "{}–{}{}",
                round(min),
                round(max),
                settings.temp_unit.label()
            ),
            Self::Wind => format!(
                "{}–{} {}",
                round(min),
                round(max),
                settings.wind_unit.label()
            ),
            Self::Humidity => format!("{}–{}%", round(min), round(max)),
            Self::Precip => {
                let decimals = settings.precip_unit.decimals();
                format!(
                    "{min:.decimals$}–{max:.decimals$} {}",
                    settings.precip_unit.label()
                )
            }
        }
    }
}

impl fmt::Display for ChartMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label().to_lowercase())
    }
}

impl FromStr for ChartMetric {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "temp" => Ok(Self::Temp),
            "wind" => Ok(Self::Wind),
            "humidity" => Ok(Self::Humidity),
            "precip" => Ok(Self::Precip),
            other => Err(format!("unknown chart metric '{other}'")),
        }
    }
}

/// What the popup currently shows
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ViewState {
    /// Falls back to the first location when unset or unknown
    pub active_location_id: Option<String>,
    pub active_day_index: usize,
    pub metric: ChartMetric,
}

impl ViewState {
    /// Switch location; the selected day resets when the location changes
    pub fn select_location(&mut self, location_id: impl Into<String>) {
        let location_id = location_id.into();
        if self.active_location_id.as_deref() != Some(location_id.as_str()) {
            self.active_day_index = 0;
        }
        self.active_location_id = Some(location_id);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "view", rename_all = "lowercase")]
pub enum PopupView {
    /// No saved locations
    Empty,
    Location(Box<LocationView>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationView {
    pub location_id: String,
    pub label: String,
    /// `2 / 3`
    pub position: String,
    pub condition: String,
    pub icon: Option<String>,
    pub temperature: String,
    pub feels_like: String,
    pub precipitation: String,
    pub wind: String,
    pub humidity: String,
    pub temp_max: String,
    pub temp_min: String,
    pub sunrise: String,
    pub sunset: String,
    pub forecast: Vec<ForecastDay>,
    pub chart: ChartView,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastDay {
    pub label: String,
    pub icon: Option<String>,
    pub description: String,
    pub high: String,
    pub low: String,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartView {
    pub metric: ChartMetric,
    /// `Today | 00:00 - 23:00`
    pub range_label: String,
    /// `3–11°C`
    pub summary: String,
    pub y_max: String,
    pub y_min: String,
    pub times: Vec<String>,
    /// Gaps travel as JSON `null`
    #[serde(deserialize_with = "nan_for_null")]
    pub values: Vec<f64>,
}

fn nan_for_null<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
    let values: Vec<Option<f64>> = Vec::deserialize(deserializer)?;
    Ok(values
        .into_iter()
        .map(|value| value.unwrap_or(f64::NAN))
        .collect())
}

impl ChartView {
    fn empty(metric: ChartMetric) -> Self {
        Self {
            metric,
            range_label: PLACEHOLDER.to_string(),
            summary: PLACEHOLDER.to_string(),
            y_max: PLACEHOLDER.to_string(),
            y_min: PLACEHOLDER.to_string(),
            times: Vec::new(),
            values: Vec::new(),
        }
    }
}

/// Chart axis bounds padded by a tenth of the span
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleBounds {
    pub min: f64,
    pub max: f64,
    pub scale_min: f64,
    pub scale_max: f64,
}

/// Bounds over the finite `values`, `None` when there are none
#[must_use]
pub fn scale_bounds(values: &[f64], min_floor: Option<f64>) -> Option<ScaleBounds> {
    let (min, max) = finite_min_max(values)?;
    let mut span = max - min;
    if span == 0.0 {
        span = if max == 0.0 { 1.0 } else { max.abs() };
    }
    let padding = span * 0.1;
    let mut scale_min = if min == 0.0 { min } else { min - padding };
    let mut scale_max = max + padding;
    if let Some(floor) = min_floor {
        scale_min = scale_min.max(floor);
    }
    if scale_max == scale_min {
        scale_max = scale_min + 1.0;
    }
    Some(ScaleBounds {
        min,
        max,
        scale_min,
        scale_max,
    })
}

fn finite_min_max(values: &[f64]) -> Option<(f64, f64)> {
    values
        .iter()
        .copied()
        .filter(|value| value.is_finite())
        .fold(None, |acc, value| match acc {
            None => Some((value, value)),
            Some((min, max)) => Some((min.min(value), max.max(value))),
        })
}

fn round(value: f64) -> i64 {
    round_half_up(value)
}

/// `12 km/h`
#[must_use]
pub fn format_value(value: f64, unit: &str) -> String {
    if !value.is_finite() {
        return PLACEHOLDER.to_string();
    }
    format!("{} {unit}", round(value))
}

/// `12°C`
#[must_use]
pub fn format_temp(value: f64, settings: &Settings) -> String {
    if !value.is_finite() {
        return PLACEHOLDER.to_string();
    }
    format!("{}{}", round(value), settings.temp_unit.label())
}

#[must_use]
pub fn format_precip(value: f64, unit: PrecipUnit) -> String {
    if !value.is_finite() {
        return PLACEHOLDER.to_string();
    }
    let decimals = unit.decimals();
    format!("{value:.decimals$} {}", unit.label())
}

#[must_use]
pub fn format_percent(value: f64) -> String {
    if !value.is_finite() {
        return PLACEHOLDER.to_string();
    }
    format!("{}%", round(value))
}

fn parse_local_datetime(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S"))
        .ok()
}

/// Clock time of a provider-local ISO timestamp; unparseable input is shown as is
#[must_use]
pub fn format_iso_time(value: &str) -> String {
    if value.is_empty() {
        return PLACEHOLDER.to_string();
    }
    parse_local_datetime(value).map_or_else(
        || value.to_string(),
        |parsed| parsed.format("%H:%M").to_string(),
    )
}

/// `Today` for the first day, otherwise the short weekday name
#[must_use]
pub fn format_weekday(value: &str, index: usize) -> String {
    if index == 0 {
        return "Today".to_string();
    }
    if value.is_empty() {
        return PLACEHOLDER.to_string();
    }
    let date = value
        .get(..10)
        .and_then(|day| NaiveDate::parse_from_str(day, "%Y-%m-%d").ok());
    date.map_or_else(|| value.to_string(), |date| date.format("%a").to_string())
}

/// Local clock time of an epoch-milliseconds timestamp
#[must_use]
pub fn format_fetched_at(fetched_at: i64) -> String {
    DateTime::from_timestamp_millis(fetched_at).map_or_else(
        || PLACEHOLDER.to_string(),
        |time| time.with_timezone(&Local).format("%H:%M").to_string(),
    )
}

/// Hourly entries of the selected forecast day. Without a daily forecast the
/// whole series is used.
#[must_use]
pub fn hourly_for_day(item: &WeatherCacheItem, day_index: usize) -> HourlySeries {
    let Some(day) = item.daily_forecast.time.get(day_index) else {
        return item.hourly.clone();
    };
    let date_key = day.get(..10).unwrap_or(day);
    item.hourly.for_date(date_key).unwrap_or_default()
}

fn forecast_day_count(item: &WeatherCacheItem) -> usize {
    let daily = &item.daily_forecast;
    [
        daily.time.len(),
        daily.temp_max.len(),
        daily.temp_min.len(),
        daily.weather_code.len(),
        MAX_FORECAST_DAYS,
    ]
    .into_iter()
    .min()
    .unwrap_or(0)
}

fn icon_path(name: &str, size: u32) -> Option<String> {
    icon_asset_paths(name).remove(&size)
}

fn render_forecast(item: &WeatherCacheItem, settings: &Settings, active: usize) -> Vec<ForecastDay> {
    let daily = &item.daily_forecast;
    (0..forecast_day_count(item))
        .map(|i| {
            let code = daily.weather_code[i];
            let description = if code.is_finite() {
                #[allow(clippy::cast_possible_truncation)]
                let code = code as i32;
                describe_weather_code(code)
            } else {
                describe_weather_code(-1)
            };
            ForecastDay {
                label: format_weekday(&daily.time[i], i),
                icon: icon_path(icon_name_for_value(code, true), FORECAST_ICON_SIZE),
                description: description.to_string(),
                high: format_temp(daily.temp_max[i], settings),
                low: format_temp(daily.temp_min[i], settings),
                active: i == active,
            }
        })
        .collect()
}

fn render_chart(
    item: &WeatherCacheItem,
    settings: &Settings,
    metric: ChartMetric,
    day_index: usize,
) -> ChartView {
    let hourly = hourly_for_day(item, day_index);
    if hourly.is_empty() {
        return ChartView::empty(metric);
    }

    let day_label = match item.daily_forecast.time.get(day_index) {
        Some(day) => format_weekday(day, day_index),
        None if day_index == 0 => "Today".to_string(),
        None => format!("Day {}", day_index + 1),
    };
    let first = hourly.time.first().map_or("", String::as_str);
    let last = hourly.time.last().map_or("", String::as_str);
    let range_label = format!(
        "{day_label} | {} - {}",
        format_iso_time(first),
        format_iso_time(last)
    );

    let values = metric.values(&hourly).to_vec();
    let mut chart = ChartView {
        metric,
        range_label,
        times: hourly.time.clone(),
        ..ChartView::empty(metric)
    };
    if let Some(bounds) = scale_bounds(&values, metric.min_floor()) {
        chart.summary = metric.format_range(bounds.min, bounds.max, settings);
        chart.y_max = metric.format_value(bounds.max, settings);
        chart.y_min = metric.format_value(bounds.scale_min, settings);
    }
    chart.values = values;
    chart
}

/// Everything the popup shows for the active location
#[must_use]
pub fn render_popup(
    locations: &[Location],
    cache: &WeatherCache,
    settings: &Settings,
    view: &ViewState,
) -> PopupView {
    if locations.is_empty() {
        return PopupView::Empty;
    }
    let index = view
        .active_location_id
        .as_deref()
        .and_then(|id| locations.iter().position(|location| location.id == id))
        .unwrap_or(0);
    let location = &locations[index];

    let mut rendered = LocationView {
        location_id: location.id.clone(),
        label: location.label(index),
        position: format!("{} / {}", index + 1, locations.len()),
        condition: "No data yet".to_string(),
        icon: None,
        temperature: PLACEHOLDER.to_string(),
        feels_like: PLACEHOLDER.to_string(),
        precipitation: PLACEHOLDER.to_string(),
        wind: PLACEHOLDER.to_string(),
        humidity: PLACEHOLDER.to_string(),
        temp_max: PLACEHOLDER.to_string(),
        temp_min: PLACEHOLDER.to_string(),
        sunrise: PLACEHOLDER.to_string(),
        sunset: PLACEHOLDER.to_string(),
        forecast: Vec::new(),
        chart: ChartView::empty(view.metric),
        status: "Refresh to load weather data.".to_string(),
    };
    let Some(item) = cache.get(&location.id) else {
        return PopupView::Location(Box::new(rendered));
    };

    let day_count = forecast_day_count(item);
    let day_index = if view.active_day_index < day_count {
        view.active_day_index
    } else {
        0
    };
    let temp_label = settings.temp_unit.label();

    rendered.condition = describe_weather_code(item.weather_code).to_string();
    rendered.icon = icon_path(pick_icon(item), POPUP_ICON_SIZE);
    rendered.temperature = format_temp(item.current.temperature, settings);
    rendered.feels_like = format_value(item.current.apparent_temperature, temp_label);
    rendered.precipitation = format_precip(item.current.precipitation, settings.precip_unit);
    rendered.wind = format_value(item.current.wind_speed, settings.wind_unit.label());
    rendered.humidity = format_percent(item.current.humidity);
    rendered.temp_max = format_value(item.daily.temp_max, temp_label);
    rendered.temp_min = format_value(item.daily.temp_min, temp_label);
    rendered.sunrise = format_iso_time(&item.daily.sunrise);
    rendered.sunset = format_iso_time(&item.daily.sunset);
    rendered.forecast = render_forecast(item, settings, day_index);
    rendered.chart = render_chart(item, settings, view.metric, day_index);
    rendered.status = format!(
        "Updated at {} ({})",
        format_fetched_at(item.fetched_at),
        item.timezone
    );
    PopupView::Location(Box::new(rendered))
}
