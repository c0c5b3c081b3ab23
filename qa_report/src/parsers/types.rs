use serde::Serialize;
use serde_json::{Map, Number, Value};
use std::fmt::Display;
use std::ops::Sub;

/// Normalized statistics extracted from a test report
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ReportStatistics {
    Junit(JunitStatistics),
    Newman(NewmanStatistics),
    /// Any other JSON object, passed through as-is
    Generic(Map<String, Value>),
}

/// Aggregate statistics of a JUnit XML report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JunitStatistics {
    pub total_tests: u64,
    pub failures: u64,
    pub errors: u64,
    pub skipped: u64,
    pub time: f64,
    pub test_cases: Vec<TestCaseEntry>,
    pub success_rate: f64,
}

/// Statistics of a Newman/Postman run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewmanStatistics {
    pub total_tests: u64,
    pub failures: u64,
    pub passed: u64,
    pub skipped: u64,
    pub assertions: Value,
    pub requests: Value,
}

/// A single test case observed in a JUnit XML report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestCaseEntry {
    pub name: String,
    pub classname: String,
    pub time: f64,
    pub status: TestStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// Test execution status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Passed,
    Failed,
    Error,
    Skipped,
}

impl TestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestStatus::Passed => "passed",
            TestStatus::Failed => "failed",
            TestStatus::Error => "error",
            TestStatus::Skipped => "skipped",
        }
    }
}

/// A test count as the report states it.
///
/// Integral counts are kept exact so they print literally at any magnitude.
/// Generic JSON documents may carry fractional counts, which stay floats.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Count {
    Integer(i128),
    Real(f64),
}

impl Count {
    pub fn as_f64(&self) -> f64 {
        match *self {
            Count::Integer(count) => count as f64,
            Count::Real(count) => count,
        }
    }

    pub fn is_positive(&self) -> bool {
        match *self {
            Count::Integer(count) => count > 0,
            Count::Real(count) => count > 0.0,
        }
    }

    fn from_number(number: &Number) -> Self {
        if let Some(count) = number.as_u64() {
            Count::Integer(count.into())
        } else if let Some(count) = number.as_i64() {
            Count::Integer(count.into())
        } else {
            Count::Real(number.as_f64().unwrap_or_default())
        }
    }
}

impl Default for Count {
    fn default() -> Self {
        Count::Integer(0)
    }
}

impl From<u64> for Count {
    fn from(count: u64) -> Self {
        Count::Integer(count.into())
    }
}

impl Sub for Count {
    type Output = Count;

    fn sub(self, other: Count) -> Count {
        match (self, other) {
            (Count::Integer(a), Count::Integer(b)) => a
                .checked_sub(b)
                .map(Count::Integer)
                .unwrap_or(Count::Real(a as f64 - b as f64)),
            (a, b) => Count::Real(a.as_f64() - b.as_f64()),
        }
    }
}

impl Display for Count {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Integral floats print without a fractional part
        match self {
            Count::Integer(count) => write!(f, "{count}"),
            Count::Real(count) => write!(f, "{count}"),
        }
    }
}

/// Numeric view over any statistics shape, with missing fields defaulted.
///
/// `success_rate` stays `None` when the report does not carry one. Consumers
/// decide how to treat its absence.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Figures {
    pub total_tests: Count,
    pub failures: Count,
    pub errors: Count,
    pub skipped: Count,
    pub time: f64,
    pub success_rate: Option<f64>,
}

impl Figures {
    /// Tests neither failed, errored nor skipped. May be negative for
    /// inconsistent reports.
    pub fn passed(&self) -> Count {
        self.total_tests - self.failures - self.errors - self.skipped
    }
}

impl ReportStatistics {
    pub fn figures(&self) -> Figures {
        match self {
            ReportStatistics::Junit(stats) => Figures {
                total_tests: stats.total_tests.into(),
                failures: stats.failures.into(),
                errors: stats.errors.into(),
                skipped: stats.skipped.into(),
                time: stats.time,
                success_rate: Some(stats.success_rate),
            },
            ReportStatistics::Newman(stats) => Figures {
                total_tests: stats.total_tests.into(),
                failures: stats.failures.into(),
                skipped: stats.skipped.into(),
                ..Figures::default()
            },
            ReportStatistics::Generic(doc) => {
                let count = |key: &str| match doc.get(key) {
                    Some(Value::Number(number)) => Count::from_number(number),
                    _ => Count::default(),
                };
                let number = |key: &str| doc.get(key).and_then(Value::as_f64);
                Figures {
                    total_tests: count("total_tests"),
                    failures: count("failures"),
                    errors: count("errors"),
                    skipped: count("skipped"),
                    time: number("time").unwrap_or(0.0),
                    success_rate: number("success_rate"),
                }
            }
        }
    }
}

/// Success rate in percent, `0` for an empty report
pub fn success_rate(total_tests: u64, failures: u64, errors: u64, skipped: u64) -> f64 {
    if total_tests == 0 {
        return 0.0;
    }
    let total = total_tests as f64;
    let passed = total - failures as f64 - errors as f64 - skipped as f64;
    passed / total * 100.0
}

/// Trait for parsers that convert report documents to ReportStatistics
pub trait ReportParser {
    fn parse(&self, input: &[u8]) -> anyhow::Result<ReportStatistics>;
}
