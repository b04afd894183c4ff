//! Rendering of validation reports for terminals, logs and JSON consumers.
//!
//! Pure functions only. Values come straight from the report; nothing here
//! recomputes a score or a verdict.

use serde_json::{json, Value};

use crate::report::ValidationReport;

const RULE: &str =
    "======================================================================";
const THIN_RULE: &str = "-------------------------------------------------------";

/// Trace lines for a single report.
pub fn render_lines(report: &ValidationReport) -> Vec<String> {
    let mut lines = vec![
        RULE.to_string(),
        format!("VALIDATION REPORT: {}", report.task_id()),
        RULE.to_string(),
        format!("Instruction: {}", report.instruction()),
        format!("Why it should fail: {}", report.failure_reason()),
        format!("Expected failure: {}", report.expected_failure()),
        format!("Evaluated at: {}", report.evaluated_at().to_rfc3339()),
    ];

    if let Some(preview) = report.agent_response_preview() {
        lines.push(format!("Agent response: {}", preview));
    }

    lines.push(String::new());
    lines.push("Checks performed:".to_string());
    for check in report.checks() {
        let mark = if check.passed { "✓" } else { "✗" };
        lines.push(format!("  {} {}", mark, check.description));
    }

    lines.push(String::new());
    lines.push(format!(
        "Failure detected: {}",
        if report.failure_detected() { "✓ YES" } else { "✗ NO" }
    ));
    lines.push(format!("Score: {:.1}", report.score()));
    if report.failure_detected() {
        lines.push(format!(
            "✓ RESULT: {} (task failed as expected, benchmark caught it)",
            report.outcome()
        ));
    } else {
        lines.push(format!(
            "✗ RESULT: {} (task succeeded when it should have failed)",
            report.outcome()
        ));
    }
    lines.push(RULE.to_string());
    lines
}

/// Nested key/value record for programmatic consumers.
pub fn to_record(report: &ValidationReport) -> Value {
    let checks: Vec<Value> = report
        .checks()
        .iter()
        .map(|c| json!({ "description": c.description, "passed": c.passed }))
        .collect();

    json!({
        "task_id": report.task_id(),
        "task": {
            "instruction": report.instruction(),
            "failure_reason": report.failure_reason(),
            "expected_failure": report.expected_failure(),
        },
        "validation": {
            "failure_detected": report.failure_detected(),
            "score": report.score(),
            "outcome": report.outcome().to_string(),
            "checks": checks,
        },
        "evaluated_at": report.evaluated_at().to_rfc3339(),
        "agent_response_preview": report.agent_response_preview(),
    })
}

/// All reports as a single JSON array, in the order given.
pub fn to_records(reports: &[ValidationReport]) -> Value {
    Value::Array(reports.iter().map(to_record).collect())
}

/// Batch summary: pass counts followed by a per-task table.
///
/// `requested` is how many tasks were asked for, so skipped or unknown ids
/// show up as the gap between requested and executed.
pub fn render_summary(reports: &[ValidationReport], requested: usize) -> Vec<String> {
    let passed = reports.iter().filter(|r| r.is_full_score()).count();
    let total = reports.len();

    let mut lines = vec![
        RULE.to_string(),
        "BENCHMARK SUMMARY".to_string(),
        RULE.to_string(),
        format!("Total tasks: {}", requested),
        format!("Tasks executed: {}", total),
    ];

    if total > 0 {
        lines.push(format!("Tasks that failed as expected (PASS): {}/{}", passed, total));
        lines.push(format!(
            "Tasks that succeeded wrongly (FAIL): {}/{}",
            total - passed,
            total
        ));
        if passed == total {
            lines.push("✓ ALL TESTS PASSED - benchmark detected every failure".to_string());
        } else {
            lines.push(format!(
                "⚠ Benchmark missed {} failure case(s)",
                total - passed
            ));
        }
    }

    lines.push(String::new());
    lines.push(format!("{:<10} {:<25} {:<10}", "Task", "Result", "Score"));
    lines.push(THIN_RULE.to_string());
    for report in reports {
        let status = if report.failure_detected() {
            "✓ Failed as expected"
        } else {
            "✗ Succeeded wrongly"
        };
        let score = format!("{} ({})", report.score(), report.outcome());
        lines.push(format!("{:<10} {:<25} {:<10}", report.task_id(), status, score));
    }
    lines.push(RULE.to_string());
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::CheckEntry;
    use crate::task::TaskRegistry;
    use chrono::DateTime;

    fn report(id: &str, detected: bool) -> ValidationReport {
        let registry = TaskRegistry::builtin();
        ValidationReport::new(
            registry.get(id).unwrap(),
            detected,
            vec![
                CheckEntry::new("Mailbox query returned 1 message(s)", true),
                CheckEntry::new("Message delivered to invalid address (found 1)", detected),
            ],
            DateTime::parse_from_rfc3339("2026-10-19T13:40:00+02:00").unwrap(),
            Some("I sent the email.".to_string()),
        )
    }

    #[test]
    fn lines_show_checks_in_order_and_result() {
        let lines = render_lines(&report("task_1", true));
        let first = lines.iter().position(|l| l.contains("Mailbox query")).unwrap();
        let second = lines.iter().position(|l| l.contains("Message delivered")).unwrap();
        assert!(first < second);
        assert!(lines.contains(&"Score: 1.0".to_string()));
        assert!(lines.iter().any(|l| l.contains("RESULT: PASS")));
        assert!(lines.iter().any(|l| l == "Agent response: I sent the email."));
    }

    #[test]
    fn lines_show_fail_for_missed_failure() {
        let lines = render_lines(&report("task_2", false));
        assert!(lines.contains(&"Failure detected: ✗ NO".to_string()));
        assert!(lines.iter().any(|l| l.contains("RESULT: FAIL")));
    }

    #[test]
    fn record_carries_engine_values() {
        let record = to_record(&report("task_1", true));
        assert_eq!(record["task_id"], "task_1");
        assert_eq!(record["validation"]["score"], 1.0);
        assert_eq!(record["validation"]["outcome"], "PASS");
        assert_eq!(record["validation"]["checks"].as_array().unwrap().len(), 2);
        assert_eq!(record["validation"]["checks"][1]["passed"], true);
        assert_eq!(record["agent_response_preview"], "I sent the email.");
    }

    #[test]
    fn batch_records_form_one_document() {
        let records = to_records(&[report("task_1", true), report("task_2", false)]);
        let text = serde_json::to_string_pretty(&records).unwrap();
        let parsed: Value = serde_json::from_str(&text).unwrap();
        let items = parsed.as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["task_id"], "task_1");
        assert_eq!(items[1]["validation"]["outcome"], "FAIL");
    }

    #[test]
    fn summary_counts_passes() {
        let reports = vec![report("task_1", true), report("task_2", false)];
        let lines = render_summary(&reports, 3);
        assert!(lines.contains(&"Total tasks: 3".to_string()));
        assert!(lines.contains(&"Tasks executed: 2".to_string()));
        assert!(lines.contains(&"Tasks that failed as expected (PASS): 1/2".to_string()));
        assert!(lines.iter().any(|l| l.starts_with("task_2") && l.contains("Succeeded wrongly")));
    }

    #[test]
    fn summary_all_passed_banner() {
        let lines = render_summary(&[report("task_1", true)], 1);
        assert!(lines.iter().any(|l| l.contains("ALL TESTS PASSED")));
    }
}
