use crate::anomalies::Anomaly;
use crate::defaults::SUMMARY_RULE_WIDTH;
use crate::parsers::Figures;

/// Renders the human-readable digest of a report.
///
/// Sections always come in the same order: header, counts, rate and time,
/// then the anomalies (omitted when there are none).
pub fn format_summary(figures: &Figures, anomalies: &[Anomaly]) -> String {
    let rule = "=".repeat(SUMMARY_RULE_WIDTH);

    let success_rate = match figures.success_rate {
        Some(rate) => format!("{rate:.1}%"),
        None => "n/a".to_string(),
    };

    let mut lines = vec![
        String::new(),
        rule.clone(),
        "    AUTOMATED TEST SUMMARY".to_string(),
        rule.clone(),
        String::new(),
        format!("Total tests      : {}", figures.total_tests),
        format!("✅ Passed         : {}", figures.passed()),
        format!("❌ Failed         : {}", figures.failures),
        format!("⚠️ Errors         : {}", figures.errors),
        format!("⏭️ Skipped        : {}", figures.skipped),
        String::new(),
        format!("Success rate     : {success_rate}"),
        format!("Total time       : {:.2}s", figures.time),
    ];

    if !anomalies.is_empty() {
        lines.push(rule.clone());
        lines.push("ANOMALIES DETECTED:".to_string());
        lines.push(rule.clone());
        lines.extend(anomalies.iter().map(|anomaly| format!("  {anomaly}")));
    }

    lines.push(rule);
    lines.push(String::new());

    lines.join("\n")
}
