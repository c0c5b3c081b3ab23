pub mod analyzer;
pub mod anomalies;
pub mod cli;
pub mod config;
pub mod defaults;
pub mod parsers;
pub mod summary;

pub use analyzer::{analyze_report, AnalysisError, AnalysisRecord, AnalyzedReport, ReportAnalyzer};
pub use anomalies::{detect_anomalies, Anomaly, Thresholds};

// Shared by unit tests that touch process-wide state
#[cfg(test)]
mod test_utils;
