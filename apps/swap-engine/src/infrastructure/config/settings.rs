//! Engine Configuration Settings
//!
//! Configuration types for the swap engine, loaded from environment
//! variables. Every variable is optional; unset variables fall back to the
//! defaults below, malformed ones are rejected.

use std::time::Duration;

use crate::application::services::{
    DEFAULT_BUILD_DELAY, DEFAULT_CONCURRENCY, DEFAULT_FAILURE_RATE, QueueConfig, RetryPolicy,
    VenueRouterConfig,
};
use crate::infrastructure::telemetry::TelemetryConfig;

/// HTTP server settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerSettings {
    /// Port for the REST, WebSocket, health and metrics routes.
    pub http_port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { http_port: 3000 }
    }
}

/// Queue settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueSettings {
    /// Maximum concurrently executing orders.
    pub concurrency: usize,
    /// Attempts per order, including the first.
    pub max_attempts: u32,
    /// Backoff after the first failed attempt.
    pub backoff_base: Duration,
}

impl Default for QueueSettings {
    fn default() -> Self {
        let retry = RetryPolicy::default();
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            max_attempts: retry.max_attempts,
            backoff_base: retry.base_delay,
        }
    }
}

impl QueueSettings {
    /// Queue configuration for the application layer.
    #[must_use]
    pub const fn queue_config(&self) -> QueueConfig {
        QueueConfig {
            concurrency: self.concurrency,
            retry: RetryPolicy::new(self.max_attempts, self.backoff_base),
        }
    }
}

/// Execution settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExecutionSettings {
    /// Pause between `building` and `submitted`.
    pub build_delay: Duration,
    /// Probability that a simulated settlement fails.
    pub settlement_failure_rate: f64,
}

impl Default for ExecutionSettings {
    fn default() -> Self {
        Self {
            build_delay: DEFAULT_BUILD_DELAY,
            settlement_failure_rate: DEFAULT_FAILURE_RATE,
        }
    }
}

impl ExecutionSettings {
    /// Router configuration using the default venue set.
    #[must_use]
    pub fn router_config(&self) -> VenueRouterConfig {
        VenueRouterConfig {
            failure_rate: self.settlement_failure_rate,
            ..VenueRouterConfig::default()
        }
    }
}

/// Complete engine configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineConfig {
    /// Server settings.
    pub server: ServerSettings,
    /// Queue settings.
    pub queue: QueueSettings,
    /// Execution settings.
    pub execution: ExecutionSettings,
    /// Tracing export settings.
    pub telemetry: TelemetryConfig,
}

impl EngineConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set but cannot be parsed or is out
    /// of range.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Same as [`EngineConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let server = ServerSettings {
            http_port: parse_env(&lookup, "HTTP_PORT", defaults.server.http_port)?,
        };

        let concurrency: usize =
            parse_env(&lookup, "QUEUE_CONCURRENCY", defaults.queue.concurrency)?;
        if concurrency == 0 {
            return Err(ConfigError::OutOfRange {
                key: "QUEUE_CONCURRENCY",
                message: "must be at least 1".to_string(),
            });
        }

        let max_attempts: u32 =
            parse_env(&lookup, "QUEUE_MAX_ATTEMPTS", defaults.queue.max_attempts)?;
        if max_attempts == 0 {
            return Err(ConfigError::OutOfRange {
                key: "QUEUE_MAX_ATTEMPTS",
                message: "must be at least 1".to_string(),
            });
        }

        let queue = QueueSettings {
            concurrency,
            max_attempts,
            backoff_base: parse_env_duration_millis(
                &lookup,
                "QUEUE_BACKOFF_BASE_MS",
                defaults.queue.backoff_base,
            )?,
        };

        let settlement_failure_rate: f64 = parse_env(
            &lookup,
            "SETTLEMENT_FAILURE_RATE",
            defaults.execution.settlement_failure_rate,
        )?;
        if !(0.0..=1.0).contains(&settlement_failure_rate) {
            return Err(ConfigError::OutOfRange {
                key: "SETTLEMENT_FAILURE_RATE",
                message: "must be between 0 and 1".to_string(),
            });
        }

        let execution = ExecutionSettings {
            build_delay: parse_env_duration_millis(
                &lookup,
                "BUILD_DELAY_MS",
                defaults.execution.build_delay,
            )?,
            settlement_failure_rate,
        };

        Ok(Self {
            server,
            queue,
            execution,
            telemetry: TelemetryConfig::from_lookup(&lookup),
        })
    }
}

/// Configuration error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Variable is set but not parseable as the expected type.
    #[error("environment variable {key} has invalid value '{value}'")]
    InvalidValue {
        /// Variable name.
        key: &'static str,
        /// Raw value.
        value: String,
    },
    /// Variable parsed but is outside the accepted range.
    #[error("environment variable {key} {message}")]
    OutOfRange {
        /// Variable name.
        key: &'static str,
        /// Constraint that was violated.
        message: String,
    },
}

fn parse_env<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        None => Ok(default),
        Some(raw) if raw.trim().is_empty() => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { key, value: raw }),
    }
}

fn parse_env_duration_millis(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: Duration,
) -> Result<Duration, ConfigError> {
    let millis = parse_env(lookup, key, default.as_millis() as u64)?;
    Ok(Duration::from_millis(millis))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = EngineConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.server.http_port, 3000);
        assert_eq!(config.queue.concurrency, 10);
        assert_eq!(config.queue.max_attempts, 3);
        assert_eq!(config.queue.backoff_base, Duration::from_millis(1000));
        assert_eq!(config.execution.build_delay, Duration::from_millis(500));
        assert!((config.execution.settlement_failure_rate - 0.05).abs() < f64::EPSILON);
        assert!(!config.telemetry.enabled);
    }

    #[test]
    fn overrides() {
        let config = EngineConfig::from_lookup(lookup(&[
            ("HTTP_PORT", "8080"),
            ("QUEUE_CONCURRENCY", "4"),
            ("QUEUE_MAX_ATTEMPTS", "5"),
            ("QUEUE_BACKOFF_BASE_MS", "250"),
            ("BUILD_DELAY_MS", "0"),
            ("SETTLEMENT_FAILURE_RATE", "1"),
            ("OTEL_ENABLED", "true"),
        ]))
        .unwrap();

        assert_eq!(config.server.http_port, 8080);
        assert_eq!(config.queue.concurrency, 4);
        assert_eq!(config.execution.build_delay, Duration::ZERO);
        assert!(config.telemetry.enabled);

        let queue = config.queue.queue_config();
        assert_eq!(queue.concurrency, 4);
        assert_eq!(queue.retry.max_attempts, 5);
        assert_eq!(queue.retry.base_delay, Duration::from_millis(250));

        let router = config.execution.router_config();
        assert!((router.failure_rate - 1.0).abs() < f64::EPSILON);
        assert_eq!(router.venues.len(), 2);
    }

    #[test]
    fn blank_value_uses_default() {
        let config = EngineConfig::from_lookup(lookup(&[("HTTP_PORT", "  ")])).unwrap();
        assert_eq!(config.server.http_port, 3000);
    }

    #[test]
    fn rejects_unparseable_value() {
        let err = EngineConfig::from_lookup(lookup(&[("HTTP_PORT", "http")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidValue {
                key: "HTTP_PORT",
                value: "http".to_string()
            }
        );
    }

    #[test]
    fn rejects_out_of_range_values() {
        for (key, value) in [
            ("QUEUE_CONCURRENCY", "0"),
            ("QUEUE_MAX_ATTEMPTS", "0"),
            ("SETTLEMENT_FAILURE_RATE", "1.5"),
        ] {
            let err = EngineConfig::from_lookup(lookup(&[(key, value)])).unwrap_err();
            assert!(matches!(err, ConfigError::OutOfRange { key: k, .. } if k == key));
        }
    }
}
