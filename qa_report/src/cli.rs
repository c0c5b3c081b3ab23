use anyhow::{bail, Result};
use clap::Parser;
use env_logger::Env;
use log::Level;
use std::path::{Path, PathBuf};

use crate::analyzer::{AnalysisRecord, ReportAnalyzer};
use crate::anomalies::Thresholds;
use crate::config;
use crate::parsers::{ReportStatistics, TestCaseEntry, TestStatus};
use qa_report_cli_types::{Cli, CliThresholds, Commands, OutputFormat};

pub fn handle_calls() -> Result<()> {
    let cli = Cli::parse();
    let logger_level = match cli.verbose {
        0 => Level::Warn,
        1 => Level::Info,
        2 => Level::Debug,
        _ => Level::Trace,
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(logger_level.as_str())).init();

    match cli.command {
        Commands::Analyze {
            report,
            output,
            thresholds,
        } => analyze(&report, output, determine_thresholds(&thresholds)),
        Commands::Check {
            reports,
            thresholds,
        } => check_multiple(&reports, determine_thresholds(&thresholds)),
        Commands::Config {} => show_config_info(),
    }
}

/// Determine the thresholds with proper precedence:
/// 1. CLI option (if specified)
/// 2. Configuration file (local overrides system-wide)
/// 3. Built-in default
fn determine_thresholds(cli: &CliThresholds) -> Thresholds {
    merge_thresholds(cli, config::anomaly_thresholds())
}

fn merge_thresholds(cli: &CliThresholds, configured: Thresholds) -> Thresholds {
    Thresholds {
        min_success_rate: cli
            .min_success_rate
            .unwrap_or(configured.min_success_rate),
        max_skip_ratio: cli.max_skip_ratio.unwrap_or(configured.max_skip_ratio),
        max_duration_seconds: cli
            .max_duration_seconds
            .unwrap_or(configured.max_duration_seconds),
    }
}

fn analyze(report: &Path, output: OutputFormat, thresholds: Thresholds) -> Result<()> {
    let record = ReportAnalyzer::new(thresholds).analyze(report);

    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&record)?),
        OutputFormat::Summary => {
            if let AnalysisRecord::Analyzed(analyzed) = &record {
                print!("{}", analyzed.summary);
            }
        }
    }

    if let Some(error) = record.error() {
        bail!("{}", error);
    }

    Ok(())
}

#[derive(Debug, PartialEq)]
struct CheckResult {
    message: String,
    passed: bool,
}

fn check_multiple(reports: &[PathBuf], thresholds: Thresholds) -> Result<()> {
    let analyzer = ReportAnalyzer::new(thresholds);
    let mut failed = false;

    for report in reports {
        let result = check(&analyzer, report);

        println!("{}", result.message);

        if !result.passed {
            failed = true;
        }
    }

    if failed {
        bail!("One or more reports failed the check.");
    }

    Ok(())
}

fn check(analyzer: &ReportAnalyzer, report: &Path) -> CheckResult {
    let name = report.display();

    match analyzer.analyze(report) {
        AnalysisRecord::Analyzed(analyzed) if analyzed.anomalies.is_empty() => CheckResult {
            message: format!("✅ '{name}'"),
            passed: true,
        },
        AnalysisRecord::Analyzed(analyzed) => {
            let mut lines = vec![format!("❌ '{name}'")];
            lines.extend(analyzed.anomalies.iter().map(|a| format!("  {a}")));
            if let ReportStatistics::Junit(stats) = &analyzed.statistics {
                lines.extend(
                    stats
                        .test_cases
                        .iter()
                        .filter(|case| case.status != TestStatus::Passed)
                        .map(describe_test_case),
                );
            }
            CheckResult {
                message: lines.join("\n"),
                passed: false,
            }
        }
        record => CheckResult {
            message: format!(
                "❌ '{name}'\n  {}",
                record.error().unwrap_or_default()
            ),
            passed: false,
        },
    }
}

fn describe_test_case(case: &TestCaseEntry) -> String {
    let qualified_name = if case.classname.is_empty() {
        case.name.clone()
    } else {
        format!("{}::{}", case.classname, case.name)
    };
    let detail = match case.status {
        TestStatus::Failed => case.failure_message.as_deref(),
        TestStatus::Error => case.error_message.as_deref(),
        _ => None,
    }
    .filter(|message| !message.is_empty())
    .map(|message| format!(": {message}"))
    .unwrap_or_default();

    format!("    {} {}{}", case.status.as_str(), qualified_name, detail)
}

/// Show configuration file locations and the effective thresholds
fn show_config_info() -> Result<()> {
    println!("QA Report Configuration Information");
    println!("===================================");

    match config::system_config_path() {
        Some(path) if path.is_file() => println!("System config: {} (exists)", path.display()),
        Some(path) => println!("System config: {} (not found)", path.display()),
        None => println!("System config: unavailable (no home directory)"),
    }

    match config::find_local_config_path() {
        Some(path) => println!("Local config: {} (exists)", path.display()),
        None => println!("Local config: not found"),
    }

    match config::read_hierarchical_config() {
        Ok(_) => println!("\nConfiguration loaded successfully"),
        Err(e) => println!("\nConfiguration: Error loading - {}", e),
    }

    let thresholds = config::anomaly_thresholds();
    println!("  min_success_rate: {}", thresholds.min_success_rate);
    println!("  max_skip_ratio: {}", thresholds.max_skip_ratio);
    println!("  max_duration_seconds: {}", thresholds.max_duration_seconds);

    Ok(())
}
