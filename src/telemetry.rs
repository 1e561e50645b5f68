//! Tracing subscriber setup

use tracing_subscriber::fmt::layer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry};

use crate::config::LoggingConfig;

/// `RUST_LOG` wins over the configured level
fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Install the global subscriber, JSON lines or human readable output.
/// Returns false when a subscriber was already installed.
pub fn init_tracing(logging: &LoggingConfig) -> bool {
    let filter = env_filter(&logging.level);
    let registry = Registry::default().with(filter);

    let installed = if logging.format == "json" {
        registry
            .with(layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(
                layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()
    };
    installed.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_rejected() {
        let logging = LoggingConfig {
            level: "debug".to_string(),
            format: "json".to_string(),
        };
        // Another test may already have installed one
        let _ = init_tracing(&logging);
        assert!(!init_tracing(&logging));
    }
}
