//! Configuration management for `better-weather`
//!
//! Handles loading configuration from files, environment variables,
//! and provides validation for all configuration settings.

use crate::WeatherError;
use crate::weather::open_meteo::{FORECAST_URL, GEOCODING_URL};
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

const APP_DIR: &str = "better-weather";
const ENV_PREFIX: &str = "BETTER_WEATHER";

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Forecast and geocoding provider settings
    #[serde(default)]
    pub provider: ProviderConfig,
    /// Persistent store settings
    #[serde(default)]
    pub storage: StorageConfig,
    /// Refresh scheduling
    #[serde(default)]
    pub refresh: RefreshConfig,
    /// Local endpoint of the running daemon
    #[serde(default)]
    pub control: ControlConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
    /// BCP 47 locale tag used for unit defaults and search language.
    /// Falls back to `LC_ALL`/`LANG` when unset.
    #[serde(default)]
    pub locale: Option<String>,
}

/// Weather provider configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_forecast_url")]
    pub forecast_url: String,
    #[serde(default = "default_geocoding_url")]
    pub geocoding_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u32,
    /// Transient-failure retries; 0 disables retrying
    #[serde(default)]
    pub max_retries: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory of the on-disk key-value store
    #[serde(default = "default_storage_location")]
    pub location: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshConfig {
    /// Period of the primary-location alarm
    #[serde(default = "default_interval_minutes")]
    pub interval_minutes: u32,
    /// Delay between the last keystroke and a place search
    #[serde(default = "default_search_debounce_ms")]
    pub search_debounce_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlConfig {
    /// Address the daemon listens on and other commands connect to
    #[serde(default = "default_control_address")]
    pub address: String,
    /// How long a command waits for the daemon to answer a liveness check
    #[serde(default = "default_health_timeout_ms")]
    pub health_timeout_ms: u64,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty or json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_forecast_url() -> String {
    FORECAST_URL.to_string()
}

fn default_geocoding_url() -> String {
    GEOCODING_URL.to_string()
}

fn default_timeout() -> u32 {
    30
}

fn default_storage_location() -> String {
    dirs::data_local_dir()
        .map(|dir| dir.join(APP_DIR).join("store"))
        .unwrap_or_else(|| PathBuf::from(".better-weather"))
        .to_string_lossy()
        .into_owned()
}

fn default_interval_minutes() -> u32 {
    crate::coordinator::REFRESH_INTERVAL_MINUTES
}

fn default_search_debounce_ms() -> u64 {
    250
}

fn default_control_address() -> String {
    "127.0.0.1:48515".to_string()
}

fn default_health_timeout_ms() -> u64 {
    500
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            forecast_url: default_forecast_url(),
            geocoding_url: default_geocoding_url(),
            timeout_seconds: default_timeout(),
            max_retries: 0,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            location: default_storage_location(),
        }
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_minutes: default_interval_minutes(),
            search_debounce_ms: default_search_debounce_ms(),
        }
    }
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            address: default_control_address(),
            health_timeout_ms: default_health_timeout_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            provider: ProviderConfig::default(),
            storage: StorageConfig::default(),
            refresh: RefreshConfig::default(),
            control: ControlConfig::default(),
            logging: LoggingConfig::default(),
            locale: None,
        }
    }
}

impl RefreshConfig {
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(u64::from(self.interval_minutes) * 60)
    }

    #[must_use]
    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }
}

impl ControlConfig {
    #[must_use]
    pub fn health_timeout(&self) -> Duration {
        Duration::from_millis(self.health_timeout_ms)
    }
}

/// `BETTER_WEATHER_LOCALE=en-US`, `BETTER_WEATHER_PROVIDER__TIMEOUT_SECONDS=10`.
/// `source` replaces the process environment when given.
fn environment(source: Option<config::Map<String, String>>) -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
        .source(source)
}

impl AppConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path(None)
    }

    /// Load configuration from specified path
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        Self::load_with_env(config_path, None)
    }

    /// Like [`AppConfig::load_from_path`] with an explicit set of variables
    /// standing in for the process environment
    pub fn load_with_env(
        config_path: Option<PathBuf>,
        env: Option<config::Map<String, String>>,
    ) -> Result<Self> {
        let mut builder = Config::builder();

        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path().unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        builder = builder.add_source(environment(env));

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: AppConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.apply_defaults();
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join("config.toml"))
    }

    /// Apply default values to empty or zero configuration fields
    pub fn apply_defaults(&mut self) {
        if self.provider.forecast_url.is_empty() {
            self.provider.forecast_url = default_forecast_url();
        }
        if self.provider.geocoding_url.is_empty() {
            self.provider.geocoding_url = default_geocoding_url();
        }
        if self.provider.timeout_seconds == 0 {
            self.provider.timeout_seconds = default_timeout();
        }
        if self.storage.location.is_empty() {
            self.storage.location = default_storage_location();
        }
        if self.refresh.interval_minutes == 0 {
            self.refresh.interval_minutes = default_interval_minutes();
        }
        if self.control.address.is_empty() {
            self.control.address = default_control_address();
        }
        if self.control.health_timeout_ms == 0 {
            self.control.health_timeout_ms = default_health_timeout_ms();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.provider.timeout_seconds > 300 {
            return Err(
                WeatherError::config("Provider timeout cannot exceed 300 seconds").into(),
            );
        }

        if self.provider.max_retries > 10 {
            return Err(WeatherError::config("Provider max retries cannot exceed 10").into());
        }

        if self.refresh.interval_minutes > 24 * 60 {
            return Err(
                WeatherError::config("Refresh interval cannot exceed 1440 minutes (1 day)").into(),
            );
        }

        if self.refresh.search_debounce_ms > 5_000 {
            return Err(WeatherError::config("Search debounce cannot exceed 5000 ms").into());
        }

        Ok(())
    }

    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(WeatherError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(WeatherError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        if self.control.address.parse::<SocketAddr>().is_err() {
            return Err(WeatherError::config(format!(
                "Control address '{}' must be an IP address and port",
                self.control.address
            ))
            .into());
        }

        for url in [&self.provider.forecast_url, &self.provider.geocoding_url] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(WeatherError::config(format!(
                    "Provider URL '{url}' must be a valid HTTP or HTTPS URL"
                ))
                .into());
            }
        }

        Ok(())
    }

    /// Configured locale, else the process environment, else `en`
    #[must_use]
    pub fn resolve_locale(&self) -> String {
        if let Some(locale) = self.locale.as_deref().filter(|l| !l.trim().is_empty()) {
            return locale.trim().to_string();
        }
        ["LC_ALL", "LANG"]
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .find_map(|value| posix_to_bcp47(&value))
            .unwrap_or_else(|| "en".to_string())
    }
}

/// `en_US.UTF-8` -> `en-US`; `C`/`POSIX` and empty values yield `None`
#[must_use]
pub fn posix_to_bcp47(value: &str) -> Option<String> {
    let tag = value.split(['.', '@']).next()?.trim();
    if tag.is_empty() || tag == "C" || tag == "POSIX" {
        return None;
    }
    Some(tag.replace('_', "-"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(
            config.provider.forecast_url,
            "https://api.open-meteo.com/v1/forecast"
        );
        assert_eq!(config.provider.max_retries, 0);
        assert_eq!(config.refresh.interval_minutes, 15);
        assert_eq!(config.refresh.search_debounce(), Duration::from_millis(250));
        assert_eq!(config.refresh.interval(), Duration::from_secs(900));
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_invalid_log_level() {
        let mut config = AppConfig::default();
        config.logging.level = "invalid".to_string();
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Invalid log level"));
    }

    #[test]
    fn test_config_validation_numeric_ranges() {
        let mut config = AppConfig::default();
        config.provider.timeout_seconds = 500;
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("timeout cannot exceed"));
    }

    #[test]
    fn test_config_validation_rejects_non_http_url() {
        let mut config = AppConfig::default();
        config.provider.geocoding_url = "ftp://example.com".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_apply_defaults_fills_zero_values() {
        let mut config = AppConfig::default();
        config.refresh.interval_minutes = 0;
        config.logging.format = String::new();
        config.apply_defaults();
        assert_eq!(config.refresh.interval_minutes, 15);
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_load_from_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "locale = \"en-US\"\n[refresh]\ninterval_minutes = 30\n[logging]\nformat = \"json\""
        )
        .unwrap();

        let config = AppConfig::load_from_path(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(config.refresh.interval_minutes, 30);
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.resolve_locale(), "en-US");
        assert_eq!(config.provider.timeout_seconds, 30);
    }

    fn env(vars: &[(&str, &str)]) -> Option<config::Map<String, String>> {
        Some(
            vars.iter()
                .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
                .collect(),
        )
    }

    fn missing_file() -> Option<PathBuf> {
        Some(PathBuf::from("/nonexistent/better-weather.toml"))
    }

    #[test]
    fn test_env_overrides_use_single_underscore_prefix() {
        let config = AppConfig::load_with_env(
            missing_file(),
            env(&[
                ("BETTER_WEATHER_LOCALE", "en-US"),
                ("BETTER_WEATHER_PROVIDER__TIMEOUT_SECONDS", "10"),
                ("BETTER_WEATHER_CONTROL__ADDRESS", "127.0.0.1:9000"),
                ("OTHER_LOCALE", "fr-FR"),
            ]),
        )
        .unwrap();
        assert_eq!(config.resolve_locale(), "en-US");
        assert_eq!(config.provider.timeout_seconds, 10);
        assert_eq!(config.control.address, "127.0.0.1:9000");
    }

    #[test]
    fn test_env_overrides_are_validated() {
        let result = AppConfig::load_with_env(
            missing_file(),
            env(&[("BETTER_WEATHER_LOGGING__LEVEL", "bogus")]),
        );
        assert!(result.unwrap_err().to_string().contains("Invalid log level"));
    }

    #[test]
    fn test_config_validation_rejects_bad_control_address() {
        let mut config = AppConfig::default();
        config.control.address = "localhost".to_string();
        assert!(config.validate().is_err());
    }

    #[rstest]
    #[case("en_US.UTF-8", Some("en-US"))]
    #[case("de_DE", Some("de-DE"))]
    #[case("fr_FR@euro", Some("fr-FR"))]
    #[case("C", None)]
    #[case("POSIX", None)]
    #[case("", None)]
    fn test_posix_to_bcp47(#[case] value: &str, #[case] expected: Option<&str>) {
        assert_eq!(posix_to_bcp47(value).as_deref(), expected);
    }

    #[test]
    fn test_config_path_generation() {
        if let Some(path) = AppConfig::get_config_path() {
            assert!(path.to_string_lossy().contains("better-weather"));
            assert!(path.to_string_lossy().ends_with("config.toml"));
        }
    }
}
