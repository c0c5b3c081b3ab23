use crate::parsers::types::{NewmanStatistics, ReportParser, ReportStatistics};
use anyhow::{Context, Result};
use log::debug;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Number, Value};

/// Parser for Newman/Postman JSON reports.
///
/// Documents without a top-level `run` key are returned unchanged as
/// [`ReportStatistics::Generic`].
pub struct NewmanJsonParser;

impl ReportParser for NewmanJsonParser {
    fn parse(&self, input: &[u8]) -> Result<ReportStatistics> {
        let input = std::str::from_utf8(input).context("Report is not valid UTF-8")?;
        let document: Value = serde_json::from_str(input).context("Invalid JSON document")?;

        let Value::Object(mut object) = document else {
            anyhow::bail!("Expected a JSON object at the top level");
        };

        match object.remove("run") {
            Some(run) => {
                let run: NewmanRun =
                    serde_json::from_value(run).context("Invalid Newman 'run' section")?;
                debug!("Detected Newman/Postman report");
                Ok(ReportStatistics::Newman(run.into_statistics()))
            }
            None => {
                debug!("Passing through generic JSON report");
                Ok(ReportStatistics::Generic(object))
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct NewmanRun {
    #[serde(default)]
    stats: NewmanStats,
}

#[derive(Debug, Default, Deserialize)]
struct NewmanStats {
    #[serde(default)]
    tests: NewmanTestCounts,
    #[serde(default = "empty_object")]
    assertions: Value,
    #[serde(default = "empty_object")]
    requests: Value,
}

#[derive(Debug, Default, Deserialize)]
struct NewmanTestCounts {
    #[serde(default, deserialize_with = "count")]
    total: u64,
    #[serde(default, deserialize_with = "count")]
    failed: u64,
    #[serde(default, deserialize_with = "count")]
    passed: u64,
    #[serde(default, deserialize_with = "count")]
    pending: u64,
}

/// Non-negative integral count, also when written as a float such as `50.0`
fn count<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<u64, D::Error> {
    let number = Number::deserialize(deserializer)?;
    if let Some(count) = number.as_u64() {
        return Ok(count);
    }
    match number.as_f64() {
        Some(value) if value >= 0.0 && value.fract() == 0.0 && value < u64::MAX as f64 => {
            Ok(value as u64)
        }
        _ => Err(D::Error::custom(format!(
            "expected a non-negative integral count, got {number}"
        ))),
    }
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

impl NewmanRun {
    fn into_statistics(self) -> NewmanStatistics {
        let NewmanStats {
            tests,
            assertions,
            requests,
        } = self.stats;

        NewmanStatistics {
            total_tests: tests.total,
            failures: tests.failed,
            passed: tests.passed,
            skipped: tests.pending,
            assertions,
            requests,
        }
    }
}
