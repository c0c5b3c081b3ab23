use crate::parsers::types::{
    success_rate, JunitStatistics, ReportParser, ReportStatistics, TestCaseEntry, TestStatus,
};
use anyhow::{anyhow, bail, Context, Result};
use log::{debug, warn};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// Parser for JUnit XML format
pub struct JunitXmlParser;

impl ReportParser for JunitXmlParser {
    fn parse(&self, input: &[u8]) -> Result<ReportStatistics> {
        // Attribute values are decoded with the encoding named by the BOM or
        // the XML declaration, UTF-8 otherwise
        let mut reader = Reader::from_reader(input);
        reader.config_mut().trim_text(true);

        let mut document = JunitDocument::default();

        loop {
            let event = match reader.read_event() {
                Ok(event) => event,
                Err(e) => bail!(
                    "Malformed XML at position {}: {}",
                    reader.buffer_position(),
                    e
                ),
            };

            match event {
                Event::Start(element) => document.open_element(&element, true)?,
                Event::Empty(element) => document.open_element(&element, false)?,
                Event::End(_) => document.close_element(),
                Event::Text(text) => {
                    if document.depth == 0 && !text.iter().all(u8::is_ascii_whitespace) {
                        bail!("Text content outside of the root element");
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        document.finish()
    }
}

/// Aggregate attributes carried by the root element
#[derive(Debug, Default)]
struct SuiteTotals {
    tests: u64,
    failures: u64,
    errors: u64,
    skipped: u64,
    time: f64,
}

impl SuiteTotals {
    fn from_root(root: &BytesStart<'_>) -> Result<Self> {
        Ok(SuiteTotals {
            tests: count_attribute(root, "tests")?,
            failures: count_attribute(root, "failures")?,
            errors: count_attribute(root, "errors")?,
            skipped: count_attribute(root, "skipped")?,
            time: time_attribute(root)?,
        })
    }
}

/// A test case under construction.
///
/// Markers are collected while the element is open; the status is only
/// resolved once the whole document has been read.
#[derive(Debug)]
struct PendingCase {
    name: String,
    classname: String,
    time: f64,
    failure: Option<(String, String)>,
    error: Option<String>,
    skipped: bool,
}

impl PendingCase {
    fn from_element(element: &BytesStart<'_>) -> Result<Self> {
        let name = attribute(element, "name")?.unwrap_or_else(|| "Unknown".to_string());
        let classname = attribute(element, "classname")?.unwrap_or_default();
        let time = match attribute(element, "time")? {
            None => 0.0,
            Some(raw) => match raw.trim().parse::<f64>() {
                Ok(time) if time.is_finite() && time >= 0.0 => time,
                _ => {
                    warn!("Ignoring malformed time '{raw}' of test case '{name}'");
                    0.0
                }
            },
        };

        Ok(PendingCase {
            name,
            classname,
            time,
            failure: None,
            error: None,
            skipped: false,
        })
    }

    /// Records a direct child marker. Only the first marker of each kind counts.
    fn mark(&mut self, element: &BytesStart<'_>) -> Result<()> {
        match element.name().as_ref() {
            b"failure" if self.failure.is_none() => {
                let message = attribute(element, "message")?.unwrap_or_default();
                let failure_type = attribute(element, "type")?.unwrap_or_default();
                self.failure = Some((message, failure_type));
            }
            b"error" if self.error.is_none() => {
                self.error = Some(attribute(element, "message")?.unwrap_or_default());
            }
            b"skipped" => self.skipped = true,
            _ => {}
        }
        Ok(())
    }

    /// Each marker overrides the status set by the previous one, in the order
    /// failure, error, skipped.
    fn status(&self) -> TestStatus {
        let mut status = TestStatus::Passed;
        if self.failure.is_some() {
            status = TestStatus::Failed;
        }
        if self.error.is_some() {
            status = TestStatus::Error;
        }
        if self.skipped {
            status = TestStatus::Skipped;
        }
        status
    }

    fn into_entry(self) -> TestCaseEntry {
        let status = self.status();
        let (failure_message, failure_type) = match self.failure {
            Some((message, failure_type)) => (Some(message), Some(failure_type)),
            None => (None, None),
        };

        TestCaseEntry {
            name: self.name,
            classname: self.classname,
            time: self.time,
            status,
            failure_message,
            failure_type,
            error_message: self.error,
        }
    }
}

#[derive(Debug, Default)]
struct JunitDocument {
    totals: Option<SuiteTotals>,
    root_closed: bool,
    depth: usize,
    cases: Vec<PendingCase>,
    // (depth, index into `cases`) of the test case elements currently open
    open_cases: Vec<(usize, usize)>,
}

impl JunitDocument {
    fn open_element(&mut self, element: &BytesStart<'_>, has_children: bool) -> Result<()> {
        if self.depth == 0 {
            if self.totals.is_some() {
                bail!("Content after the root element");
            }
            self.totals = Some(SuiteTotals::from_root(element)?);
            self.root_closed = !has_children;
        } else if element.name().as_ref() == b"testcase" {
            self.cases.push(PendingCase::from_element(element)?);
            if has_children {
                self.open_cases.push((self.depth, self.cases.len() - 1));
            }
        } else if let Some(&(case_depth, index)) = self.open_cases.last() {
            if case_depth + 1 == self.depth {
                self.cases[index].mark(element)?;
            }
        }

        if has_children {
            self.depth += 1;
        }
        Ok(())
    }

    fn close_element(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        if matches!(self.open_cases.last(), Some(&(case_depth, _)) if case_depth == self.depth) {
            self.open_cases.pop();
        }
        if self.depth == 0 {
            self.root_closed = true;
        }
    }

    fn finish(self) -> Result<ReportStatistics> {
        let totals = self
            .totals
            .ok_or_else(|| anyhow!("Document has no root element"))?;
        if !self.root_closed || self.depth > 0 {
            bail!("Unexpected end of document: unclosed element");
        }

        let test_cases: Vec<TestCaseEntry> =
            self.cases.into_iter().map(PendingCase::into_entry).collect();
        debug!("Parsed {} test cases from JUnit XML", test_cases.len());

        Ok(ReportStatistics::Junit(JunitStatistics {
            total_tests: totals.tests,
            failures: totals.failures,
            errors: totals.errors,
            skipped: totals.skipped,
            time: totals.time,
            success_rate: success_rate(
                totals.tests,
                totals.failures,
                totals.errors,
                totals.skipped,
            ),
            test_cases,
        }))
    }
}

fn attribute(element: &BytesStart<'_>, key: &str) -> Result<Option<String>> {
    match element.try_get_attribute(key)? {
        Some(attr) => Ok(Some(attr.decode_and_unescape_value(element.decoder())?.into_owned())),
        None => Ok(None),
    }
}

fn count_attribute(element: &BytesStart<'_>, key: &str) -> Result<u64> {
    match attribute(element, key)? {
        None => Ok(0),
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid '{key}' attribute: '{raw}'")),
    }
}

fn time_attribute(element: &BytesStart<'_>) -> Result<f64> {
    let Some(raw) = attribute(element, "time")? else {
        return Ok(0.0);
    };
    let time: f64 = raw
        .trim()
        .parse()
        .with_context(|| format!("Invalid 'time' attribute: '{raw}'"))?;
    if !time.is_finite() || time < 0.0 {
        bail!("Invalid 'time' attribute: '{raw}'");
    }
    Ok(time)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_junit(xml: impl AsRef<[u8]>) -> JunitStatistics {
        match JunitXmlParser.parse(xml.as_ref()).unwrap() {
            ReportStatistics::Junit(stats) => stats,
            other => panic!("Expected JUnit statistics, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_single_testsuite() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<testsuite name="my_tests" tests="2" failures="0" errors="0" skipped="0" time="3.5">
  <testcase name="test_one" classname="module::tests" time="1.5"/>
  <testcase name="test_two" classname="module::tests" time="2.0"/>
</testsuite>"#;

        let stats = parse_junit(xml);

        assert_eq!(stats.total_tests, 2);
        assert_eq!(stats.time, 3.5);
        assert_eq!(stats.success_rate, 100.0);
        assert_eq!(stats.test_cases.len(), 2);

        let first = &stats.test_cases[0];
        assert_eq!(first.name, "test_one");
        assert_eq!(first.classname, "module::tests");
        assert_eq!(first.time, 1.5);
        assert_eq!(first.status, TestStatus::Passed);
        assert_eq!(first.failure_message, None);
    }

    #[test]
    fn test_parse_testsuites_collects_nested_cases_in_order() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<testsuites tests="3" failures="1" errors="0" skipped="0" time="5.2">
  <testsuite name="suite_one" tests="2" failures="0" time="3.5">
    <testcase name="test_one" classname="module::tests" time="1.5"/>
    <testcase name="test_two" classname="module::tests" time="2.0"/>
  </testsuite>
  <testsuite name="suite_two" tests="1" failures="1" time="1.7">
    <testcase name="test_three" classname="other::tests" time="1.7">
      <failure message="assertion failed" type="AssertionError"/>
    </testcase>
  </testsuite>
</testsuites>"#;

        let stats = parse_junit(xml);

        // Only the root attributes count, nested suite totals are ignored
        assert_eq!(stats.total_tests, 3);
        assert_eq!(stats.failures, 1);
        assert_eq!(stats.time, 5.2);

        let names: Vec<_> = stats.test_cases.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["test_one", "test_two", "test_three"]);

        let failed = &stats.test_cases[2];
        assert_eq!(failed.status, TestStatus::Failed);
        assert_eq!(failed.failure_message.as_deref(), Some("assertion failed"));
        assert_eq!(failed.failure_type.as_deref(), Some("AssertionError"));
    }

    #[test]
    fn test_parse_skipped_test() {
        let xml = r#"<testsuite name="my_tests" tests="1" skipped="1">
  <testcase name="test_skip" classname="module::tests" time="0.0">
    <skipped/>
  </testcase>
</testsuite>"#;

        let stats = parse_junit(xml);

        assert_eq!(stats.test_cases[0].status, TestStatus::Skipped);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.success_rate, 0.0);
    }

    #[test]
    fn test_parse_error_test() {
        let xml = r#"<testsuite name="my_tests" tests="1" errors="1">
  <testcase name="test_error" classname="module::tests" time="0.5">
    <error message="runtime error" type="RuntimeError">stack trace</error>
  </testcase>
</testsuite>"#;

        let stats = parse_junit(xml);
        let case = &stats.test_cases[0];

        assert_eq!(case.status, TestStatus::Error);
        assert_eq!(case.error_message.as_deref(), Some("runtime error"));
        assert_eq!(case.failure_type, None);
    }

    #[test]
    fn test_later_marker_overrides_status() {
        let xml = r#"<testsuite tests="2">
  <testcase name="failed_then_skipped">
    <skipped/>
    <failure message="boom"/>
  </testcase>
  <testcase name="failed_and_errored">
    <error message="crash"/>
    <failure message="assertion"/>
  </testcase>
</testsuite>"#;

        let stats = parse_junit(xml);

        // Evaluation order is failure, error, skipped regardless of child order
        assert_eq!(stats.test_cases[0].status, TestStatus::Skipped);
        assert_eq!(stats.test_cases[0].failure_message.as_deref(), Some("boom"));
        assert_eq!(stats.test_cases[1].status, TestStatus::Error);
        assert_eq!(stats.test_cases[1].failure_message.as_deref(), Some("assertion"));
        assert_eq!(stats.test_cases[1].error_message.as_deref(), Some("crash"));
    }

    #[test]
    fn test_first_marker_of_each_kind_wins() {
        let xml = r#"<testsuite tests="1" failures="1">
  <testcase name="twice">
    <failure message="first"/>
    <failure message="second" type="Other"/>
  </testcase>
</testsuite>"#;

        let stats = parse_junit(xml);

        assert_eq!(stats.test_cases[0].failure_message.as_deref(), Some("first"));
        assert_eq!(stats.test_cases[0].failure_type.as_deref(), Some(""));
    }

    #[test]
    fn test_only_direct_children_are_markers() {
        let xml = r#"<testsuite tests="1">
  <testcase name="nested">
    <system-out><failure message="not a marker"/></system-out>
  </testcase>
</testsuite>"#;

        let stats = parse_junit(xml);

        assert_eq!(stats.test_cases[0].status, TestStatus::Passed);
        assert_eq!(stats.test_cases[0].failure_message, None);
    }

    #[test]
    fn test_missing_attributes_use_defaults() {
        let xml = r#"<testsuite>
  <testcase/>
  <testcase name="bad_time" time="soon"/>
</testsuite>"#;

        let stats = parse_junit(xml);

        assert_eq!(stats.total_tests, 0);
        assert_eq!(stats.time, 0.0);
        assert_eq!(stats.success_rate, 0.0);
        assert_eq!(stats.test_cases[0].name, "Unknown");
        assert_eq!(stats.test_cases[0].classname, "");
        assert_eq!(stats.test_cases[0].time, 0.0);
        assert_eq!(stats.test_cases[1].time, 0.0);
    }

    #[test]
    fn test_escaped_attribute_values() {
        let xml = r#"<testsuite tests="1" failures="1">
  <testcase name="a &lt; b"><failure message="expected &quot;x&quot;"/></testcase>
</testsuite>"#;

        let stats = parse_junit(xml);

        assert_eq!(stats.test_cases[0].name, "a < b");
        assert_eq!(
            stats.test_cases[0].failure_message.as_deref(),
            Some("expected \"x\"")
        );
    }

    #[test]
    fn test_declared_encoding_is_honored() {
        let xml = b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?>\n\
<testsuite tests=\"1\" failures=\"1\">\n\
  <testcase name=\"caf\xe9\" classname=\"cr\xe8me\"><failure message=\"d\xe9j\xe0 vu\"/></testcase>\n\
</testsuite>";

        let stats = parse_junit(xml);

        assert_eq!(stats.test_cases[0].name, "café");
        assert_eq!(stats.test_cases[0].classname, "crème");
        assert_eq!(stats.test_cases[0].failure_message.as_deref(), Some("déjà vu"));
    }

    #[test]
    fn test_undeclared_non_utf8_is_rejected() {
        let xml = b"<testsuite tests=\"1\"><testcase name=\"caf\xe9\"/></testsuite>";
        assert!(JunitXmlParser.parse(xml).is_err());
    }

    #[test]
    fn test_empty_root_element() {
        let stats = parse_junit(r#"<testsuite tests="0" time="0.25"/>"#);

        assert_eq!(stats.total_tests, 0);
        assert_eq!(stats.time, 0.25);
        assert!(stats.test_cases.is_empty());
    }

    #[test]
    fn test_invalid_count_attribute() {
        let xml = r#"<testsuite tests="many"></testsuite>"#;
        let err = JunitXmlParser.parse(xml.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("Invalid 'tests' attribute"));
    }

    #[test]
    fn test_invalid_root_time() {
        assert!(JunitXmlParser.parse(r#"<testsuite time="fast"/>"#.as_bytes()).is_err());
        assert!(JunitXmlParser.parse(r#"<testsuite time="-1"/>"#.as_bytes()).is_err());
    }

    #[test]
    fn test_parse_invalid_xml() {
        assert!(JunitXmlParser.parse("not valid xml".as_bytes()).is_err());
        assert!(JunitXmlParser.parse("".as_bytes()).is_err());
    }

    #[test]
    fn test_unclosed_element() {
        let xml = r#"<testsuite tests="1"><testcase name="open">"#;
        assert!(JunitXmlParser.parse(xml.as_bytes()).is_err());
    }

    #[test]
    fn test_mismatched_end_tag() {
        let xml = r#"<testsuite tests="1"><testcase name="x"></testsuite>"#;
        assert!(JunitXmlParser.parse(xml.as_bytes()).is_err());
    }

    #[test]
    fn test_content_after_root() {
        assert!(JunitXmlParser.parse("<testsuite/><testsuite/>".as_bytes()).is_err());
        assert!(JunitXmlParser.parse("<testsuite/>trailing".as_bytes()).is_err());
    }
}
