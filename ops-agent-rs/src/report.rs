//! Deterministic report synthesis and the four-section text layout.

use crate::models::{format_timestamp, truncate_chars, EvidenceItem, Report};

pub const HEALTHY_RECOMMENDATION: &str = "Pipeline appears healthy. Monitor for any new issues.";
pub const LOG_ERRORS_CAUSE: &str = "Application errors detected in logs";
pub const WORKFLOW_FAILURES_CAUSE: &str = "Workflow executions are failing";
pub const EXECUTION_HISTORY_RECOMMENDATION: &str =
    "Check workflow execution history for detailed failure reasons";

const EVIDENCE_PREVIEW_CHARS: usize = 200;

/// Build a report from gathered evidence. Pure and deterministic.
pub fn synthesize_report(
    pipeline_name: &str,
    hours_back: u32,
    log_group: Option<&str>,
    evidence: Vec<EvidenceItem>,
) -> Report {
    let mut probable_cause = Vec::new();
    let mut recommendations = Vec::new();

    let summary = if evidence.is_empty() {
        recommendations.push(HEALTHY_RECOMMENDATION.to_string());
        format!("No errors found in the last {} hours.", hours_back)
    } else {
        let log_errors = evidence.iter().filter(|e| e.is_log_error()).count();
        let workflow_failures = evidence.iter().filter(|e| e.is_workflow_failure()).count();

        if log_errors > 0 {
            probable_cause.push(LOG_ERRORS_CAUSE.to_string());
        }
        if workflow_failures > 0 {
            probable_cause.push(WORKFLOW_FAILURES_CAUSE.to_string());
        }

        recommendations.push(format!(
            "Review logs in log group: {}",
            log_group.unwrap_or("N/A")
        ));
        recommendations.push(EXECUTION_HISTORY_RECOMMENDATION.to_string());

        format!(
            "Found {} log errors and {} failed workflow executions in the last {} hours.",
            log_errors, workflow_failures, hours_back
        )
    };

    Report {
        pipeline_name: pipeline_name.to_string(),
        time_range_hours: hours_back,
        summary,
        evidence,
        probable_cause,
        recommendations,
    }
}

fn evidence_line(item: &EvidenceItem) -> String {
    match item {
        EvidenceItem::LogError { timestamp, message } => format!(
            "- Log error at {}: {}",
            format_timestamp(timestamp),
            truncate_chars(message, EVIDENCE_PREVIEW_CHARS)
        ),
        EvidenceItem::WorkflowFailure { execution_id, status, .. } => {
            format!("- Workflow failure: {} (Status: {})", execution_id, status)
        }
    }
}

/// Render a report as the numbered four-section text
pub fn format_report(report: &Report) -> String {
    let mut lines: Vec<String> = Vec::new();

    lines.push("1) Summary".to_string());
    lines.push(format!("- {}", report.summary));
    lines.push(String::new());

    lines.push("2) Evidence".to_string());
    if report.evidence.is_empty() {
        lines.push("- No evidence found in the specified time range.".to_string());
    } else {
        lines.extend(report.evidence.iter().map(evidence_line));
    }

    lines.push(String::new());
    lines.push("3) Probable cause".to_string());
    if report.probable_cause.is_empty() {
        lines.push("- Insufficient evidence to determine cause.".to_string());
    } else {
        lines.extend(report.probable_cause.iter().map(|c| format!("- {}", c)));
    }

    lines.push(String::new());
    lines.push("4) Recommended next steps".to_string());
    if report.recommendations.is_empty() {
        lines.push(
            "- Gather more information: specify pipeline name, time range, and environment."
                .to_string(),
        );
    } else {
        lines.extend(report.recommendations.iter().map(|r| format!("- {}", r)));
    }

    lines.join("\n")
}
