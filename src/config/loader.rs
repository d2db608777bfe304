//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::AppConfig;

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Load configuration from a TOML file.
///
/// Only unreadable files and malformed TOML are errors; out-of-range values
/// are handled later by [`crate::config::BreakerConfig::resolve`].
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse configuration from TOML text.
pub fn parse_config(content: &str) -> Result<AppConfig, ConfigError> {
    Ok(toml::from_str(content)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Numeric;

    #[test]
    fn test_parse_full_config() {
        let config = parse_config(
            r#"
            [breaker]
            name = "inventory"
            sliding_time_window_ms = 10000
            buckets_number = 5
            tolerance_percent = 25
            calibration_count = 20
            default_timeout_ms = 800

            [observability]
            log_level = "debug"
            metrics_enabled = true
            metrics_address = "127.0.0.1:9191"
            "#,
        )
        .unwrap();

        assert_eq!(config.breaker.name, "inventory");
        assert_eq!(config.breaker.buckets_number, Numeric::Value(5.0));
        assert_eq!(config.observability.log_level, "debug");
        assert!(config.observability.metrics_enabled);

        let settings = config.breaker.resolve();
        assert_eq!(settings.calibration_count, 20);
        assert_eq!(settings.default_timeout, Some(std::time::Duration::from_millis(800)));
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.breaker.name, "default");
        assert_eq!(config.observability.log_level, "info");
        assert!(!config.observability.metrics_enabled);
    }

    #[test]
    fn test_malformed_toml_is_an_error() {
        let err = parse_config("[breaker\nname = ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let path = std::env::temp_dir().join("circuit-breaker-does-not-exist.toml");
        let err = load_config(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!(
            "circuit-breaker-{}.toml",
            uuid::Uuid::new_v4()
        ));
        fs::write(&path, "[breaker]\nname = \"files\"\nbuckets_number = -3\n").unwrap();

        let config = load_config(&path).unwrap();
        let _ = fs::remove_file(&path);

        assert_eq!(config.breaker.name, "files");
        assert_eq!(config.breaker.resolve().buckets_number, 10);
    }
}
