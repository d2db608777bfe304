//! Configuration schema definitions.
//!
//! This module defines the configuration structure for a breaker and for the
//! operator binary. All types derive Serde traits for deserialization from
//! config files.

use std::time::Duration;

use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Root configuration read by the `circuit-breaker` binary.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Breaker tuning.
    pub breaker: BreakerConfig,

    /// Logging and metrics settings.
    pub observability: ObservabilityConfig,
}

/// A numeric setting as written by the user.
///
/// Anything that is not a number deserializes to `NotANumber` instead of
/// failing, so a bad value falls back to its default during resolution.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Numeric {
    #[default]
    Absent,
    Value(f64),
    NotANumber,
}

impl Numeric {
    /// True unless a number was supplied.
    pub fn is_unset(&self) -> bool {
        !matches!(self, Numeric::Value(_))
    }
}

impl From<f64> for Numeric {
    fn from(value: f64) -> Self {
        Numeric::Value(value)
    }
}

impl From<u64> for Numeric {
    fn from(value: u64) -> Self {
        Numeric::Value(value as f64)
    }
}

impl From<i64> for Numeric {
    fn from(value: i64) -> Self {
        Numeric::Value(value as f64)
    }
}

impl<'de> Deserialize<'de> for Numeric {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(f64),
            Other(IgnoredAny),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Number(value) => Numeric::Value(value),
            Raw::Other(_) => Numeric::NotANumber,
        })
    }
}

impl Serialize for Numeric {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Numeric::Value(value) => serializer.serialize_f64(*value),
            Numeric::Absent | Numeric::NotANumber => serializer.serialize_none(),
        }
    }
}

/// Breaker tuning as supplied by the user.
///
/// Every numeric field is optional; see [`crate::config::Settings`] for the
/// defaults applied when a field is absent, non-numeric or not positive.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BreakerConfig {
    /// Breaker identifier for logging/metrics.
    pub name: String,

    /// Length of the sliding window in milliseconds (default: 30000).
    #[serde(skip_serializing_if = "Numeric::is_unset")]
    pub sliding_time_window_ms: Numeric,

    /// Number of buckets the window is split into (default: 10).
    #[serde(skip_serializing_if = "Numeric::is_unset")]
    pub buckets_number: Numeric,

    /// Error percentage that must be exceeded to open (default: 50).
    #[serde(skip_serializing_if = "Numeric::is_unset")]
    pub tolerance_percent: Numeric,

    /// Measured calls that must be exceeded before opening (default: 5).
    #[serde(skip_serializing_if = "Numeric::is_unset")]
    pub calibration_count: Numeric,

    /// Command timeout in milliseconds (default: 0, disabled).
    #[serde(skip_serializing_if = "Numeric::is_unset")]
    pub default_timeout_ms: Numeric,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            sliding_time_window_ms: Numeric::Absent,
            buckets_number: Numeric::Absent,
            tolerance_percent: Numeric::Absent,
            calibration_count: Numeric::Absent,
            default_timeout_ms: Numeric::Absent,
        }
    }
}

impl BreakerConfig {
    /// Start from defaults with the given breaker name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn sliding_time_window(mut self, window: Duration) -> Self {
        self.sliding_time_window_ms = Numeric::Value(window.as_secs_f64() * 1000.0);
        self
    }

    pub fn buckets_number(mut self, buckets: usize) -> Self {
        self.buckets_number = Numeric::Value(buckets as f64);
        self
    }

    pub fn tolerance_percent(mut self, percent: f64) -> Self {
        self.tolerance_percent = Numeric::Value(percent);
        self
    }

    pub fn calibration_count(mut self, count: u64) -> Self {
        self.calibration_count = Numeric::Value(count as f64);
        self
    }

    pub fn default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout_ms = Numeric::Value(timeout.as_secs_f64() * 1000.0);
        self
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_accepts_integers_and_floats() {
        let config: BreakerConfig = toml::from_str(
            r#"
            buckets_number = 4
            tolerance_percent = 12.5
            "#,
        )
        .unwrap();
        assert_eq!(config.buckets_number, Numeric::Value(4.0));
        assert_eq!(config.tolerance_percent, Numeric::Value(12.5));
        assert_eq!(config.calibration_count, Numeric::Absent);
    }

    #[test]
    fn test_non_numeric_values_do_not_fail() {
        let config: BreakerConfig = toml::from_str(
            r#"
            sliding_time_window_ms = "soon"
            buckets_number = true
            calibration_count = [1, 2]
            "#,
        )
        .unwrap();
        assert_eq!(config.sliding_time_window_ms, Numeric::NotANumber);
        assert_eq!(config.buckets_number, Numeric::NotANumber);
        assert_eq!(config.calibration_count, Numeric::NotANumber);
    }

    #[test]
    fn test_builder_methods() {
        let config = BreakerConfig::named("payments")
            .sliding_time_window(Duration::from_secs(10))
            .buckets_number(5)
            .default_timeout(Duration::from_millis(250));
        assert_eq!(config.name, "payments");
        assert_eq!(config.sliding_time_window_ms, Numeric::Value(10_000.0));
        assert_eq!(config.buckets_number, Numeric::Value(5.0));
        assert_eq!(config.default_timeout_ms, Numeric::Value(250.0));
    }

    #[test]
    fn test_serialize_skips_unset() {
        let config = BreakerConfig::named("x").buckets_number(3);
        let text = toml::to_string(&config).unwrap();
        assert!(text.contains("buckets_number = 3.0"));
        assert!(!text.contains("tolerance_percent"));
    }
}
