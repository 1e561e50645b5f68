//! Error types and handling for the weather refresh pipeline

use thiserror::Error;

/// Main error type for the `better-weather` library
#[derive(Error, Debug)]
pub enum WeatherError {
    /// A remote service answered with a non-success status
    #[error("{service} returned HTTP {status}")]
    Upstream { service: String, status: u16 },

    /// Transport failure before a status was received
    #[error("Network error: {source}")]
    Network {
        #[from]
        source: reqwest_middleware::Error,
    },

    /// Refresh requested for a location id that is not stored
    #[error("Location not found: {location_id}")]
    NotFound { location_id: String },

    /// Persistence layer failure
    #[error("Storage error: {message}")]
    Storage { message: String },

    /// A search request was superseded by a newer one
    #[error("Request cancelled")]
    Cancelled,

    /// The running daemon rejected a control request
    #[error("Daemon answered HTTP {status}: {message}")]
    Remote { status: u16, message: String },

    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// I/O operation errors
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl WeatherError {
    /// Create a new upstream error
    pub fn upstream<S: Into<String>>(service: S, status: u16) -> Self {
        Self::Upstream {
            service: service.into(),
            status,
        }
    }

    /// Create a new not-found error
    pub fn not_found<S: Into<String>>(location_id: S) -> Self {
        Self::NotFound {
            location_id: location_id.into(),
        }
    }

    /// Create a new storage error
    pub fn storage<S: Into<String>>(message: S) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    pub fn remote<S: Into<String>>(status: u16, message: S) -> Self {
        Self::Remote {
            status,
            message: message.into(),
        }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            WeatherError::Upstream { .. } | WeatherError::Network { .. } => {
                "Unable to load weather.".to_string()
            }
            WeatherError::NotFound { .. } => {
                "Refresh failed. The location no longer exists.".to_string()
            }
            WeatherError::Storage { .. } | WeatherError::Io { .. } => {
                "Refresh failed. Local storage is unavailable.".to_string()
            }
            WeatherError::Remote { status: 502, .. } => "Unable to load weather.".to_string(),
            WeatherError::Remote { message, .. } => format!("Refresh failed. {message}"),
            WeatherError::Cancelled => String::new(),
            WeatherError::Config { message } => format!("Configuration error: {message}"),
        }
    }
}

impl From<reqwest::Error> for WeatherError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network {
            source: reqwest_middleware::Error::Reqwest(err),
        }
    }
}

impl From<fjall::Error> for WeatherError {
    fn from(err: fjall::Error) -> Self {
        Self::storage(err.to_string())
    }
}

impl From<postcard::Error> for WeatherError {
    fn from(err: postcard::Error) -> Self {
        Self::storage(format!("Failed to decode stored value: {err}"))
    }
}

impl From<tokio::task::JoinError> for WeatherError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::storage(format!("Storage task failed: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = WeatherError::upstream("Open-Meteo", 503);
        assert!(matches!(err, WeatherError::Upstream { status: 503, .. }));
        assert_eq!(err.to_string(), "Open-Meteo returned HTTP 503");

        let err = WeatherError::not_found("abc");
        assert_eq!(err.to_string(), "Location not found: abc");

        let err = WeatherError::storage("disk full");
        assert!(matches!(err, WeatherError::Storage { .. }));
    }

    #[test]
    fn test_user_messages() {
        assert!(
            WeatherError::upstream("Open-Meteo", 500)
                .user_message()
                .contains("Unable to load")
        );
        assert!(
            WeatherError::not_found("x")
                .user_message()
                .contains("Refresh failed")
        );
        assert!(WeatherError::Cancelled.user_message().is_empty());
        assert_eq!(
            WeatherError::remote(502, "Open-Meteo forecast returned HTTP 500").user_message(),
            "Unable to load weather."
        );
        assert!(
            WeatherError::remote(500, "disk full")
                .user_message()
                .ends_with("disk full")
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: WeatherError = io_err.into();
        assert!(matches!(err, WeatherError::Io { .. }));
    }
}
