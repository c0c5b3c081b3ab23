//! Analyze test reports from disk
//!
//! This module selects a parser from the report's file extension, runs the
//! anomaly detection over the parsed statistics and attaches a summary.
//! Failures never surface as `Err`: they are turned into an error-shaped
//! [`AnalysisRecord`] so callers branch on the record instead.

use anyhow::Context;
use log::{debug, info, warn};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

use crate::anomalies::{detect_anomalies, Anomaly, Thresholds};
use crate::parsers::{JunitXmlParser, NewmanJsonParser, ReportParser, ReportStatistics};
use crate::summary::format_summary;

/// Report formats recognized from the file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    JunitXml,
    Json,
}

impl ReportFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("xml") => Some(ReportFormat::JunitXml),
            Some("json") => Some(ReportFormat::Json),
            _ => None,
        }
    }

    fn parser(&self) -> &'static dyn ReportParser {
        match self {
            ReportFormat::JunitXml => &JunitXmlParser,
            ReportFormat::Json => &NewmanJsonParser,
        }
    }

    fn failure(&self, cause: anyhow::Error) -> AnalysisError {
        match self {
            ReportFormat::JunitXml => AnalysisError::Junit(cause),
            ReportFormat::Json => AnalysisError::Json(cause),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Unsupported report format. Use .xml or .json")]
    UnsupportedFormat,

    #[error("Failed to analyze JUnit report: {0:#}")]
    Junit(anyhow::Error),

    #[error("Failed to analyze JSON report: {0:#}")]
    Json(anyhow::Error),
}

/// Statistics of a successfully parsed report, with its anomalies and summary
#[derive(Debug, Serialize)]
pub struct AnalyzedReport {
    #[serde(flatten)]
    pub statistics: ReportStatistics,
    pub anomalies: Vec<Anomaly>,
    pub summary: String,
}

/// Outcome of analyzing one report
#[derive(Debug)]
pub enum AnalysisRecord {
    Analyzed(AnalyzedReport),
    /// Generic JSON document carrying its own `error` key, returned unchanged
    Passthrough(Map<String, Value>),
    Failed(AnalysisError),
}

impl AnalysisRecord {
    /// Error message if this record is error-shaped
    pub fn error(&self) -> Option<String> {
        match self {
            AnalysisRecord::Analyzed(_) => None,
            AnalysisRecord::Passthrough(doc) => doc.get("error").map(|error| match error {
                Value::String(message) => message.clone(),
                other => other.to_string(),
            }),
            AnalysisRecord::Failed(error) => Some(error.to_string()),
        }
    }

    pub fn is_error(&self) -> bool {
        !matches!(self, AnalysisRecord::Analyzed(_))
    }

    pub fn anomalies(&self) -> &[Anomaly] {
        match self {
            AnalysisRecord::Analyzed(report) => &report.anomalies,
            _ => &[],
        }
    }
}

impl Serialize for AnalysisRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            AnalysisRecord::Analyzed(report) => report.serialize(serializer),
            AnalysisRecord::Passthrough(doc) => doc.serialize(serializer),
            AnalysisRecord::Failed(error) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("error", &error.to_string())?;
                map.end()
            }
        }
    }
}

/// Analyzes reports against a fixed set of thresholds
#[derive(Debug, Clone, Default)]
pub struct ReportAnalyzer {
    thresholds: Thresholds,
}

impl ReportAnalyzer {
    pub fn new(thresholds: Thresholds) -> Self {
        ReportAnalyzer { thresholds }
    }

    /// Parse the report at `path` and enrich it with anomalies and a summary
    pub fn analyze(&self, path: &Path) -> AnalysisRecord {
        match parse_report(path) {
            Ok(statistics) => self.enrich(statistics),
            Err(error) => {
                warn!("{}", error);
                AnalysisRecord::Failed(error)
            }
        }
    }

    /// Attach anomalies and summary to already parsed statistics
    pub fn enrich(&self, statistics: ReportStatistics) -> AnalysisRecord {
        let statistics = match statistics {
            ReportStatistics::Generic(doc) if doc.contains_key("error") => {
                debug!("Report carries its own error, passing it through");
                return AnalysisRecord::Passthrough(doc);
            }
            ReportStatistics::Generic(mut doc) => {
                doc.remove("anomalies");
                doc.remove("summary");
                ReportStatistics::Generic(doc)
            }
            other => other,
        };

        let figures = statistics.figures();
        let anomalies = detect_anomalies(&figures, &self.thresholds);
        let summary = format_summary(&figures, &anomalies);
        debug!("Detected {} anomalies", anomalies.len());

        AnalysisRecord::Analyzed(AnalyzedReport {
            statistics,
            anomalies,
            summary,
        })
    }
}

/// Analyze a report with the default thresholds
pub fn analyze_report(path: impl AsRef<Path>) -> AnalysisRecord {
    ReportAnalyzer::default().analyze(path.as_ref())
}

fn parse_report(path: &Path) -> Result<ReportStatistics, AnalysisError> {
    if !path.exists() {
        return Err(AnalysisError::NotFound(path.to_path_buf()));
    }

    let format = ReportFormat::from_path(path).ok_or(AnalysisError::UnsupportedFormat)?;
    info!("Analyzing {} as {:?}", path.display(), format);

    fs::read(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))
        .and_then(|input| format.parser().parse(&input))
        .map_err(|cause| format.failure(cause))
}
