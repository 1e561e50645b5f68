//! Unit preferences and their locale-derived defaults

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Locale tags that default to imperial units
const IMPERIAL_LOCALES: [&str; 3] = ["en-US", "en-LR", "en-MM"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TempUnit {
    #[default]
    C,
    F,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WindUnit {
    #[default]
    Kph,
    Mph,
    Ms,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PrecipUnit {
    #[default]
    Mm,
    In,
}

impl TempUnit {
    /// Open-Meteo `temperature_unit` value
    #[must_use]
    pub fn provider_value(self) -> &'static str {
        match self {
            Self::C => "celsius",
            Self::F => "fahrenheit",
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::C => "°C",
            Self::F => "°F",
        }
    }
}

impl WindUnit {
    /// Open-Meteo `wind_speed_unit` value
    #[must_use]
    pub fn provider_value(self) -> &'static str {
        match self {
            Self::Kph => "kmh",
            Self::Mph => "mph",
            Self::Ms => "ms",
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Kph => "km/h",
            Self::Mph => "mph",
            Self::Ms => "m/s",
        }
    }
}

impl PrecipUnit {
    /// Open-Meteo `precipitation_unit` value
    #[must_use]
    pub fn provider_value(self) -> &'static str {
        match self {
            Self::Mm => "mm",
            Self::In => "inch",
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Mm => "mm",
            Self::In => "in",
        }
    }

    /// Decimal places used when displaying amounts
    #[must_use]
    pub fn decimals(self) -> usize {
        match self {
            Self::Mm => 1,
            Self::In => 2,
        }
    }
}

macro_rules! impl_unit_str {
    ($ty:ty, $($variant:ident => $text:literal),+) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let text = match self {
                    $(Self::$variant => $text,)+
                };
                f.write_str(text)
            }
        }

        impl FromStr for $ty {
            type Err = String;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value.trim().to_ascii_lowercase().as_str() {
                    $($text => Ok(Self::$variant),)+
                    other => Err(format!("unknown unit '{other}'")),
                }
            }
        }
    };
}

impl_unit_str!(TempUnit, C => "c", F => "f");
impl_unit_str!(WindUnit, Kph => "kph", Mph => "mph", Ms => "ms");
impl_unit_str!(PrecipUnit, Mm => "mm", In => "in");

/// Unit preferences
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub temp_unit: TempUnit,
    pub wind_unit: WindUnit,
    pub precip_unit: PrecipUnit,
    /// True until the user explicitly changes a unit
    pub locale_defaulted: bool,
}

impl Settings {
    /// Defaults for a BCP 47 locale tag such as `en-US`
    #[must_use]
    pub fn for_locale(locale: &str) -> Self {
        let imperial = IMPERIAL_LOCALES.contains(&locale.trim());
        if imperial {
            Self {
                temp_unit: TempUnit::F,
                wind_unit: WindUnit::Mph,
                precip_unit: PrecipUnit::In,
                locale_defaulted: true,
            }
        } else {
            Self {
                temp_unit: TempUnit::C,
                wind_unit: WindUnit::Kph,
                precip_unit: PrecipUnit::Mm,
                locale_defaulted: true,
            }
        }
    }

    #[must_use]
    pub fn with_temp_unit(self, temp_unit: TempUnit) -> Self {
        Self {
            temp_unit,
            locale_defaulted: false,
            ..self
        }
    }

    #[must_use]
    pub fn with_wind_unit(self, wind_unit: WindUnit) -> Self {
        Self {
            wind_unit,
            locale_defaulted: false,
            ..self
        }
    }

    #[must_use]
    pub fn with_precip_unit(self, precip_unit: PrecipUnit) -> Self {
        Self {
            precip_unit,
            locale_defaulted: false,
            ..self
        }
    }
}
