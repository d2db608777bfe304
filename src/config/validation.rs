//! Configuration resolution.
//!
//! # Responsibilities
//! - Turn a user-supplied `BreakerConfig` into immutable `Settings`
//! - Replace absent, non-numeric and non-positive values with defaults
//! - Report every substitution of a supplied value
//!
//! # Design Decisions
//! - Resolution never fails; a breaker can always be built
//! - Absent values take their default without an adjustment entry
//! - Pure function: BreakerConfig → (Settings, Vec<Adjustment>)

use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::config::schema::{BreakerConfig, Numeric};

/// Default sliding window length.
pub const DEFAULT_SLIDING_TIME_WINDOW: Duration = Duration::from_millis(30_000);
/// Default number of buckets.
pub const DEFAULT_BUCKETS_NUMBER: usize = 10;
/// Default error percentage that must be exceeded.
pub const DEFAULT_TOLERANCE_PERCENT: f64 = 50.0;
/// Default number of measured calls that must be exceeded.
pub const DEFAULT_CALIBRATION_COUNT: u64 = 5;

/// Validated breaker settings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Settings {
    pub name: String,
    pub sliding_time_window: Duration,
    pub buckets_number: usize,
    pub tolerance_percent: f64,
    pub calibration_count: u64,
    /// `None` disables the timeout.
    pub default_timeout: Option<Duration>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            sliding_time_window: DEFAULT_SLIDING_TIME_WINDOW,
            buckets_number: DEFAULT_BUCKETS_NUMBER,
            tolerance_percent: DEFAULT_TOLERANCE_PERCENT,
            calibration_count: DEFAULT_CALIBRATION_COUNT,
            default_timeout: None,
        }
    }
}

impl Settings {
    /// Interval between bucket rotations.
    pub fn rotation_period(&self) -> Duration {
        let buckets = u32::try_from(self.buckets_number).unwrap_or(u32::MAX).max(1);
        (self.sliding_time_window / buckets).max(Duration::from_millis(1))
    }
}

/// A supplied value that was replaced by its default.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Adjustment {
    pub field: &'static str,
    pub found: String,
    pub applied: String,
}

impl fmt::Display for Adjustment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} replaced by {}", self.field, self.found, self.applied)
    }
}

impl BreakerConfig {
    /// Resolve into settings, discarding the adjustment report.
    pub fn resolve(&self) -> Settings {
        self.resolve_with_report().0
    }

    /// Resolve into settings and list every supplied value that was replaced.
    pub fn resolve_with_report(&self) -> (Settings, Vec<Adjustment>) {
        let defaults = Settings::default();
        let mut adjustments = Vec::new();

        let sliding_time_window = positive(
            "sliding_time_window_ms",
            self.sliding_time_window_ms,
            &mut adjustments,
            |ms| Duration::try_from_secs_f64(ms / 1000.0).ok(),
        )
        .unwrap_or(defaults.sliding_time_window);

        let buckets_number = positive(
            "buckets_number",
            self.buckets_number,
            &mut adjustments,
            |n| (n >= 1.0).then(|| n as usize),
        )
        .unwrap_or(defaults.buckets_number);

        let tolerance_percent = positive(
            "tolerance_percent",
            self.tolerance_percent,
            &mut adjustments,
            Some,
        )
        .unwrap_or(defaults.tolerance_percent);

        let calibration_count = positive(
            "calibration_count",
            self.calibration_count,
            &mut adjustments,
            |n| (n >= 1.0).then(|| n as u64),
        )
        .unwrap_or(defaults.calibration_count);

        // zero is the documented way to disable the timeout
        let default_timeout = match self.default_timeout_ms {
            Numeric::Value(ms) if ms == 0.0 => None,
            value => positive(
                "default_timeout_ms",
                value,
                &mut adjustments,
                |ms| Duration::try_from_secs_f64(ms / 1000.0).ok(),
            ),
        };

        let name = if self.name.trim().is_empty() {
            defaults.name
        } else {
            self.name.clone()
        };

        let settings = Settings {
            name,
            sliding_time_window,
            buckets_number,
            tolerance_percent,
            calibration_count,
            default_timeout,
        };

        for adjustment in &mut adjustments {
            adjustment.applied = applied_value(adjustment.field, &settings);
        }

        (settings, adjustments)
    }
}

/// Accept finite, positive numbers that `convert` maps to a value.
fn positive<T>(
    field: &'static str,
    value: Numeric,
    adjustments: &mut Vec<Adjustment>,
    convert: impl Fn(f64) -> Option<T>,
) -> Option<T> {
    let found = match value {
        Numeric::Absent => return None,
        Numeric::NotANumber => "non-numeric value".to_string(),
        Numeric::Value(v) if v.is_finite() && v > 0.0 => match convert(v) {
            Some(converted) => return Some(converted),
            None => v.to_string(),
        },
        Numeric::Value(v) => v.to_string(),
    };

    adjustments.push(Adjustment {
        field,
        found,
        applied: String::new(),
    });
    None
}

fn applied_value(field: &str, settings: &Settings) -> String {
    match field {
        "sliding_time_window_ms" => settings.sliding_time_window.as_millis().to_string(),
        "buckets_number" => settings.buckets_number.to_string(),
        "tolerance_percent" => settings.tolerance_percent.to_string(),
        "calibration_count" => settings.calibration_count.to_string(),
        "default_timeout_ms" => "0 (disabled)".to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_absent() {
        let (settings, adjustments) = BreakerConfig::default().resolve_with_report();
        assert_eq!(settings, Settings::default());
        assert!(adjustments.is_empty());
        assert_eq!(settings.rotation_period(), Duration::from_secs(3));
    }

    #[test]
    fn test_supplied_values_are_kept() {
        let config = BreakerConfig::named("db")
            .sliding_time_window(Duration::from_secs(10))
            .buckets_number(5)
            .tolerance_percent(20.0)
            .calibration_count(100)
            .default_timeout(Duration::from_millis(500));
        let (settings, adjustments) = config.resolve_with_report();

        assert!(adjustments.is_empty());
        assert_eq!(settings.name, "db");
        assert_eq!(settings.sliding_time_window, Duration::from_secs(10));
        assert_eq!(settings.buckets_number, 5);
        assert_eq!(settings.tolerance_percent, 20.0);
        assert_eq!(settings.calibration_count, 100);
        assert_eq!(settings.default_timeout, Some(Duration::from_millis(500)));
        assert_eq!(settings.rotation_period(), Duration::from_secs(2));
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = BreakerConfig {
            name: "  ".to_string(),
            sliding_time_window_ms: Numeric::Value(-1.0),
            buckets_number: Numeric::Value(0.0),
            tolerance_percent: Numeric::NotANumber,
            calibration_count: Numeric::Value(f64::NAN),
            default_timeout_ms: Numeric::Value(-20.0),
        };
        let (settings, adjustments) = config.resolve_with_report();

        assert_eq!(settings, Settings::default());
        let fields: Vec<_> = adjustments.iter().map(|a| a.field).collect();
        assert_eq!(
            fields,
            vec![
                "sliding_time_window_ms",
                "buckets_number",
                "tolerance_percent",
                "calibration_count",
                "default_timeout_ms",
            ]
        );
        assert_eq!(adjustments[1].to_string(), "buckets_number: 0 replaced by 10");
        assert_eq!(adjustments[2].found, "non-numeric value");
    }

    #[test]
    fn test_fractional_bucket_count_below_one_is_rejected() {
        let config = BreakerConfig {
            buckets_number: Numeric::Value(0.5),
            ..BreakerConfig::default()
        };
        assert_eq!(config.resolve().buckets_number, DEFAULT_BUCKETS_NUMBER);
    }

    #[test]
    fn test_zero_timeout_disables_silently() {
        let config = BreakerConfig {
            default_timeout_ms: Numeric::Value(0.0),
            ..BreakerConfig::default()
        };
        let (settings, adjustments) = config.resolve_with_report();
        assert_eq!(settings.default_timeout, None);
        assert!(adjustments.is_empty());
    }

    #[test]
    fn test_rotation_period_never_zero() {
        let settings = Settings {
            sliding_time_window: Duration::from_millis(5),
            buckets_number: 100,
            ..Settings::default()
        };
        assert_eq!(settings.rotation_period(), Duration::from_millis(1));
    }
}
