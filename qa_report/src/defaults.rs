//! Centralized default values for qa-report configuration.
//!
//! These defaults are used as fallback values when neither the command line
//! nor a configuration file provides a threshold.

// ============================================================================
// Anomaly Threshold Defaults
// ============================================================================

/// Default minimum success rate (in percent) below which a report is flagged.
///
/// This value is used when neither CLI options nor configuration file
/// specify `anomalies.min_success_rate`.
pub const DEFAULT_MIN_SUCCESS_RATE: f64 = 80.0;

/// Default maximum share of skipped tests relative to the total.
///
/// A report is flagged when `skipped > total_tests * ratio`. With an empty
/// report any skipped test exceeds the threshold.
pub const DEFAULT_MAX_SKIP_RATIO: f64 = 0.2;

/// Default maximum total execution time in seconds (5 minutes).
pub const DEFAULT_MAX_DURATION_SECONDS: f64 = 300.0;

// ============================================================================
// Configuration File Defaults
// ============================================================================

/// Name of the per-project configuration file, searched upward from the
/// current directory.
pub const LOCAL_CONFIG_FILE_NAME: &str = ".qareportconfig";

/// Directory name below the user configuration directory holding
/// `config.toml`.
pub const SYSTEM_CONFIG_DIR_NAME: &str = "qa-report";

// ============================================================================
// Summary Formatting Defaults
// ============================================================================

/// Width of the `=` rules framing the summary sections.
pub const SUMMARY_RULE_WIDTH: usize = 60;
