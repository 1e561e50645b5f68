//! Weather code to icon and badge mapping

use std::collections::BTreeMap;

use crate::models::{TempUnit, WeatherCacheItem};

pub const ICON_BASE_PATH: &str = "weather-icons/png";
pub const ICON_SIZES: [u32; 5] = [16, 32, 48, 96, 128];

/// Icon for a weather code, either one name for day and night or a pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IconChoice {
    Single(&'static str),
    DayNight {
        day: &'static str,
        night: &'static str,
    },
}

impl IconChoice {
    const fn pair(day: &'static str, night: &'static str) -> Self {
        Self::DayNight { day, night }
    }

    #[must_use]
    pub fn name(self, is_day: bool) -> &'static str {
        match self {
            Self::Single(name) => name,
            Self::DayNight { day, night } => {
                if is_day {
                    day
                } else {
                    night
                }
            }
        }
    }
}

const FALLBACK_ICON: IconChoice = IconChoice::pair("cloudy-2-day", "cloudy-2-night");

/// WMO weather interpretation code to icon
#[must_use]
pub fn icon_choice(code: i32) -> IconChoice {
    match code {
        0 => IconChoice::pair("clear-day", "clear-night"),
        1 => IconChoice::pair("cloudy-1-day", "cloudy-1-night"),
        2 => IconChoice::pair("cloudy-2-day", "cloudy-2-night"),
        3 => IconChoice::pair("cloudy-3-day", "cloudy-3-night"),
        45 | 48 => IconChoice::pair("fog-day", "fog-night"),
        51 | 61 => IconChoice::pair("rainy-1-day", "rainy-1-night"),
        53 | 63 | 80 => IconChoice::pair("rainy-2-day", "rainy-2-night"),
        55 | 65 | 81 | 82 => IconChoice::pair("rainy-3-day", "rainy-3-night"),
        56 | 57 | 66 | 67 => IconChoice::Single("rain-and-sleet-mix"),
        71 | 77 => IconChoice::pair("snowy-1-day", "snowy-1-night"),
        73 | 85 => IconChoice::pair("snowy-2-day", "snowy-2-night"),
        75 | 86 => IconChoice::pair("snowy-3-day", "snowy-3-night"),
        95 => IconChoice::pair("isolated-thunderstorms-day", "isolated-thunderstorms-night"),
        96 | 99 => IconChoice::Single("severe-thunderstorm"),
        _ => FALLBACK_ICON,
    }
}

#[must_use]
pub fn icon_name_for(code: i32, is_day: bool) -> &'static str {
    icon_choice(code).name(is_day)
}

/// Icon for a daily forecast column value. Non-integral or out of range
/// values fall back.
#[must_use]
pub fn icon_name_for_value(code: f64, is_day: bool) -> &'static str {
    if code.fract() != 0.0 || code < f64::from(i32::MIN) || code > f64::from(i32::MAX) {
        return FALLBACK_ICON.name(is_day);
    }
    #[allow(clippy::cast_possible_truncation)]
    let code = code as i32;
    icon_name_for(code, is_day)
}

#[must_use]
pub fn pick_icon(item: &WeatherCacheItem) -> &'static str {
    icon_name_for(item.weather_code, item.current.is_day)
}

/// Size in pixels to asset path
#[must_use]
pub fn icon_asset_paths(name: &str) -> BTreeMap<u32, String> {
    ICON_SIZES
        .iter()
        .map(|&size| (size, format!("{ICON_BASE_PATH}/{name}-{size}.png")))
        .collect()
}

/// Short description of a WMO weather code
#[must_use]
pub fn describe_weather_code(code: i32) -> &'static str {
    match code {
        0 => "Clear sky",
        1 => "Mainly clear",
        2 => "Partly cloudy",
        3 => "Overcast",
        45 => "Fog",
        48 => "Depositing rime fog",
        51 => "Light drizzle",
        53 => "Moderate drizzle",
        55 => "Dense drizzle",
        56 => "Light freezing drizzle",
        57 => "Dense freezing drizzle",
        61 => "Slight rain",
        63 => "Moderate rain",
        65 => "Heavy rain",
        66 => "Light freezing rain",
        67 => "Heavy freezing rain",
        71 => "Slight snow fall",
        73 => "Moderate snow fall",
        75 => "Heavy snow fall",
        77 => "Snow grains",
        80 => "Slight rain showers",
        81 => "Moderate rain showers",
        82 => "Violent rain showers",
        85 => "Slight snow showers",
        86 => "Heavy snow showers",
        95 => "Thunderstorm",
        96 => "Thunderstorm with slight hail",
        99 => "Thunderstorm with heavy hail",
        _ => "Unknown conditions",
    }
}

#[must_use]
pub fn to_celsius(temp: f64, unit: TempUnit) -> f64 {
    match unit {
        TempUnit::C => temp,
        TempUnit::F => (temp - 32.0) * 5.0 / 9.0,
    }
}

/// Badge background for a Celsius temperature
#[must_use]
pub fn badge_color(temp_celsius: f64) -> &'static str {
    if temp_celsius <= 0.0 {
        "#2563eb"
    } else if temp_celsius <= 10.0 {
        "#38bdf8"
    } else if temp_celsius <= 20.0 {
        "#facc15"
    } else if temp_celsius <= 30.0 {
        "#fb923c"
    } else {
        "#ef4444"
    }
}

/// Rounds halves towards positive infinity, so `-2.5` becomes `-2`.
/// The integer result never carries a negative zero.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

/// Rounded temperature for the badge, empty when not finite
#[must_use]
pub fn badge_text(temp: f64) -> String {
    if !temp.is_finite() {
        return String::new();
    }
    round_half_up(temp).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, "clear-day", "clear-night")]
    #[case(1, "cloudy-1-day", "cloudy-1-night")]
    #[case(2, "cloudy-2-day", "cloudy-2-night")]
    #[case(3, "cloudy-3-day", "cloudy-3-night")]
    #[case(45, "fog-day", "fog-night")]
    #[case(48, "fog-day", "fog-night")]
    #[case(51, "rainy-1-day", "rainy-1-night")]
    #[case(61, "rainy-1-day", "rainy-1-night")]
    #[case(53, "rainy-2-day", "rainy-2-night")]
    #[case(63, "rainy-2-day", "rainy-2-night")]
    #[case(80, "rainy-2-day", "rainy-2-night")]
    #[case(55, "rainy-3-day", "rainy-3-night")]
    #[case(65, "rainy-3-day", "rainy-3-night")]
    #[case(81, "rainy-3-day", "rainy-3-night")]
    #[case(82, "rainy-3-day", "rainy-3-night")]
    #[case(56, "rain-and-sleet-mix", "rain-and-sleet-mix")]
    #[case(57, "rain-and-sleet-mix", "rain-and-sleet-mix")]
    #[case(66, "rain-and-sleet-mix", "rain-and-sleet-mix")]
    #[case(67, "rain-and-sleet-mix", "rain-and-sleet-mix")]
    #[case(71, "snowy-1-day", "snowy-1-night")]
    #[case(77, "snowy-1-day", "snowy-1-night")]
    #[case(73, "snowy-2-day", "snowy-2-night")]
    #[case(85, "snowy-2-day", "snowy-2-night")]
    #[case(75, "snowy-3-day", "snowy-3-night")]
    #[case(86, "snowy-3-day", "snowy-3-night")]
    #[case(95, "isolated-thunderstorms-day", "isolated-thunderstorms-night")]
    #[case(96, "severe-thunderstorm", "severe-thunderstorm")]
    #[case(99, "severe-thunderstorm", "severe-thunderstorm")]
    #[case(4, "cloudy-2-day", "cloudy-2-night")]
    #[case(-1, "cloudy-2-day", "cloudy-2-night")]
    #[case(100, "cloudy-2-day", "cloudy-2-night")]
    fn test_icon_table(#[case] code: i32, #[case] day: &str, #[case] night: &str) {
        assert_eq!(icon_name_for(code, true), day);
        assert_eq!(icon_name_for(code, false), night);
    }

    #[rstest]
    #[case(61.0, "rainy-1-day")]
    #[case(61.5, "cloudy-2-day")]
    #[case(f64::NAN, "cloudy-2-day")]
    #[case(1e12, "cloudy-2-day")]
    fn test_icon_for_forecast_value(#[case] code: f64, #[case] expected: &str) {
        assert_eq!(icon_name_for_value(code, true), expected);
    }

    #[test]
    fn test_icon_asset_paths() {
        let paths = icon_asset_paths("fog-night");
        assert_eq!(paths.keys().copied().collect::<Vec<_>>(), ICON_SIZES);
        assert_eq!(paths[&16], "weather-icons/png/fog-night-16.png");
        assert_eq!(paths[&128], "weather-icons/png/fog-night-128.png");
    }

    #[rstest]
    #[case(-15.0, "#2563eb")]
    #[case(0.0, "#2563eb")]
    #[case(0.1, "#38bdf8")]
    #[case(10.0, "#38bdf8")]
    #[case(20.0, "#facc15")]
    #[case(25.0, "#fb923c")]
    #[case(30.0, "#fb923c")]
    #[case(30.5, "#ef4444")]
    fn test_badge_color_bands(#[case] temp: f64, #[case] expected: &str) {
        assert_eq!(badge_color(temp), expected);
    }

    #[test]
    fn test_fahrenheit_badge_color_uses_celsius() {
        // 68 °F is 20 °C
        let celsius = to_celsius(68.0, TempUnit::F);
        assert!((celsius - 20.0).abs() < 1e-9);
        assert_eq!(badge_color(celsius), "#facc15");
        assert_eq!(to_celsius(68.0, TempUnit::C), 68.0);
    }

    #[rstest]
    #[case(12.4, "12")]
    #[case(12.5, "13")]
    #[case(-0.4, "0")]
    #[case(-3.6, "-4")]
    #[case(-0.5, "0")]
    #[case(-2.5, "-2")]
    #[case(f64::NAN, "")]
    #[case(f64::INFINITY, "")]
    fn test_badge_text(#[case] temp: f64, #[case] expected: &str) {
        assert_eq!(badge_text(temp), expected);
    }
}
