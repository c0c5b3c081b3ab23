//! Threshold-based anomaly detection over report statistics

use serde::{Serialize, Serializer};
use std::fmt::Display;

use crate::defaults;
use crate::parsers::{Count, Figures};

/// Limits beyond which a report is considered anomalous
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    /// Success rate (percent) below which the report is flagged
    pub min_success_rate: f64,
    /// Maximum share of skipped tests, relative to the total
    pub max_skip_ratio: f64,
    /// Maximum total execution time in seconds
    pub max_duration_seconds: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Thresholds {
            min_success_rate: defaults::DEFAULT_MIN_SUCCESS_RATE,
            max_skip_ratio: defaults::DEFAULT_MAX_SKIP_RATIO,
            max_duration_seconds: defaults::DEFAULT_MAX_DURATION_SECONDS,
        }
    }
}

/// A statistic that crossed its threshold
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Anomaly {
    LowSuccessRate { rate: f64 },
    Errors { count: Count },
    Failures { count: Count },
    ExcessiveSkips { count: Count },
    LongDuration { seconds: f64 },
}

impl Display for Anomaly {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Anomaly::LowSuccessRate { rate } => write!(f, "⚠️ Low success rate: {rate:.1}%"),
            Anomaly::Errors { count } => write!(f, "❌ {count} error(s) detected"),
            Anomaly::Failures { count } => write!(f, "❌ {count} test(s) failed"),
            Anomaly::ExcessiveSkips { count } => write!(f, "⚠️ Too many skipped tests: {count}"),
            Anomaly::LongDuration { seconds } => {
                write!(f, "⏱️ Long execution time: {seconds:.2}s")
            }
        }
    }
}

impl Serialize for Anomaly {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Runs every check against `figures` and returns the anomalies found.
///
/// The checks are independent and always reported in the same order:
/// success rate, errors, failures, skip ratio, duration. A missing success
/// rate is treated as 100%.
pub fn detect_anomalies(figures: &Figures, thresholds: &Thresholds) -> Vec<Anomaly> {
    let mut anomalies = Vec::new();

    let rate = figures.success_rate.unwrap_or(100.0);
    if rate < thresholds.min_success_rate {
        anomalies.push(Anomaly::LowSuccessRate { rate });
    }

    if figures.errors.is_positive() {
        anomalies.push(Anomaly::Errors {
            count: figures.errors,
        });
    }

    if figures.failures.is_positive() {
        anomalies.push(Anomaly::Failures {
            count: figures.failures,
        });
    }

    if figures.skipped.as_f64() > figures.total_tests.as_f64() * thresholds.max_skip_ratio {
        anomalies.push(Anomaly::ExcessiveSkips {
            count: figures.skipped,
        });
    }

    if figures.time > thresholds.max_duration_seconds {
        anomalies.push(Anomaly::LongDuration {
            seconds: figures.time,
        });
    }

    anomalies
}
