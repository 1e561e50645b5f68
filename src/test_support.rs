//! Fixtures shared by unit tests

use crate::models::{
    CurrentConditions, DailyForecast, DailySummary, HourlySeries, WeatherCacheItem,
};

/// Complete snapshot with the given current temperature
pub fn sample_item(temperature: f64) -> WeatherCacheItem {
    WeatherCacheItem {
        fetched_at: 1_714_600_000_000,
        timezone: "Europe/Berlin".to_string(),
        weather_code: 61,
        current: CurrentConditions {
            time: "2024-05-01T22:00".to_string(),
            temperature,
            apparent_temperature: temperature - 1.0,
            precipitation: 0.4,
            wind_speed: 11.6,
            humidity: 81.0,
            is_day: true,
        },
        daily: DailySummary {
            temp_max: temperature + 4.0,
            temp_min: temperature - 5.0,
            sunrise: "2024-05-01T05:48".to_string(),
            sunset: "2024-05-01T20:41".to_string(),
        },
        daily_forecast: DailyForecast {
            time: vec!["2024-05-01".to_string(), "2024-05-02".to_string()],
            temp_max: vec![temperature + 4.0, 18.2],
            temp_min: vec![temperature - 5.0, 7.9],
            weather_code: vec![61.0, 3.0],
        },
        hourly: HourlySeries {
            time: vec![
                "2024-05-01T22:00".to_string(),
                "2024-05-01T23:00".to_string(),
                "2024-05-02T00:00".to_string(),
                "2024-05-02T01:00".to_string(),
            ],
            temperature: vec![temperature, temperature - 0.5, 9.0, 8.4],
            wind_speed: vec![11.6, 9.0, 7.2, 6.1],
            humidity: vec![81.0, 84.0, 88.0, 90.0],
            precipitation: vec![0.4, 0.0, 0.0, 0.2],
        },
    }
}
