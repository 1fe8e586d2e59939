//! Local sanity check over a single terminal scan report.
//!
//! Pure and deterministic: no network calls, same body always yields the
//! same diagnostic (or none). A contradiction is an internally inconsistent
//! combination of fields the server should never emit together.

use crate::models::scan::ScanReport;

/// Detect internal contradictions in a terminal scan report.
///
/// Returns the joined issue descriptions, or `None` when the body is
/// internally consistent.
pub fn detect(report: &ScanReport) -> Option<String> {
    let mut issues = Vec::new();

    if report.match_status.is_none() && report.vintage_id.is_some() {
        issues.push("vintage_id present despite match_status=None");
    }

    if report.upload_status.as_deref() != Some("Completed") && report.vintage_id.is_some() {
        issues.push("vintage_id present despite incomplete upload");
    }

    if report.match_status.as_deref() == Some("Matched") && report.vintage_id.is_none() {
        issues.push("match_status=Matched but vintage_id is null");
    }

    if issues.is_empty() {
        None
    } else {
        Some(issues.join("; "))
    }
}
