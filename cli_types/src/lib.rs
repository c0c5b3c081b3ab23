use anyhow::{anyhow, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable summary
    Summary,
    /// The full analysis record as JSON
    Json,
}

#[derive(Parser)]
#[command(version, name = "qa-report")]
pub struct Cli {
    /// Increase verbosity level (can be specified multiple times.) The first level sets level
    /// "info", second sets level "debug", and third sets level "trace" for the logger.
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Threshold overrides. Unset values fall back to the configuration file and
/// then to the built-in defaults.
#[derive(Args, Default)]
pub struct CliThresholds {
    /// Success rate (in percent) below which a report is flagged [default: 80]
    #[arg(long, value_parser = parse_percentage)]
    pub min_success_rate: Option<f64>,

    /// Maximum share of skipped tests relative to the total, between 0 and 1 [default: 0.2]
    #[arg(long, value_parser = parse_ratio)]
    pub max_skip_ratio: Option<f64>,

    /// Maximum total execution time in seconds [default: 300]
    #[arg(long = "max-duration", value_parser = parse_non_negative)]
    pub max_duration_seconds: Option<f64>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze a JUnit XML (.xml) or Newman/Postman JSON (.json) test report
    /// and print its statistics together with the detected anomalies.
    ///
    /// Exits with a non-zero status if the report cannot be analyzed.
    Analyze {
        /// Path to the report
        report: PathBuf,

        /// How to print the analysis
        #[arg(short, long, value_enum, default_value = "summary")]
        output: OutputFormat,

        #[command(flatten)]
        thresholds: CliThresholds,
    },

    /// Analyze one or more reports and fail if any of them cannot be analyzed
    /// or shows an anomaly.
    ///
    /// Anomalies are checked in a fixed order: low success rate, errors,
    /// failures, too many skipped tests, long execution time.
    ///
    /// ## Configuration
    ///
    /// Thresholds are read from `.qareportconfig` (searched upward from the
    /// current directory) and `~/.config/qa-report/config.toml`:
    ///
    /// - `[anomalies].min_success_rate = 80.0`
    /// - `[anomalies].max_skip_ratio = 0.2`
    /// - `[anomalies].max_duration_seconds = 300.0`
    ///
    /// Command line options take precedence over the configuration.
    Check {
        /// Paths to the reports
        #[arg(required = true)]
        reports: Vec<PathBuf>,

        #[command(flatten)]
        thresholds: CliThresholds,
    },

    /// Show configuration file locations and the effective thresholds
    Config {},
}

fn parse_non_negative(s: &str) -> Result<f64> {
    let value: f64 = s
        .parse()
        .map_err(|_| anyhow!("invalid number: '{}'", s))?;
    if !value.is_finite() || value < 0.0 {
        return Err(anyhow!("value must be a non-negative number, got '{}'", s));
    }
    Ok(value)
}

fn parse_percentage(s: &str) -> Result<f64> {
    let value = parse_non_negative(s)?;
    if value > 100.0 {
        return Err(anyhow!("percentage must be between 0 and 100, got '{}'", s));
    }
    Ok(value)
}

fn parse_ratio(s: &str) -> Result<f64> {
    let value = parse_non_negative(s)?;
    if value > 1.0 {
        return Err(anyhow!("ratio must be between 0 and 1, got '{}'", s));
    }
    Ok(value)
}
