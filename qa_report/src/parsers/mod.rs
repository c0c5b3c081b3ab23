//! Parsers for test report formats
//!
//! This module provides parsers for JUnit XML and Newman/Postman JSON reports,
//! converting them into the common `ReportStatistics` type.

pub mod junit_xml;
pub mod newman_json;
pub mod types;

// Re-export commonly used types
pub use junit_xml::JunitXmlParser;
pub use newman_json::NewmanJsonParser;
pub use types::{
    Count, Figures, JunitStatistics, NewmanStatistics, ReportParser, ReportStatistics,
    TestCaseEntry, TestStatus,
};
