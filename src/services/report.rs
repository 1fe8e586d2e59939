//! Result artifact and end-of-run summary.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::models::task::{SubmissionResult, TaskStatus};

/// Default artifact path: `results_{run_label}_{yyyymmdd_hhmmss}.json`.
pub fn default_output_path(run_label: &str) -> PathBuf {
    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    PathBuf::from(format!("results_{}_{}.json", run_label, timestamp))
}

/// Write one record per task as pretty-printed JSON.
pub fn write_results(path: &Path, results: &[SubmissionResult]) -> std::io::Result<()> {
    let file = std::fs::File::create(path)?;
    serde_json::to_writer_pretty(file, results)?;
    info!(path = %path.display(), records = results.len(), "Results written");
    Ok(())
}

/// Log aggregate statistics for the run: totals, timing over successes,
/// and a per-run-label breakdown.
pub fn log_summary(results: &[SubmissionResult]) {
    let successes: Vec<&SubmissionResult> = results
        .iter()
        .filter(|r| r.status == TaskStatus::Success)
        .collect();
    let failures = results.len() - successes.len();

    info!(
        total = results.len(),
        success = successes.len(),
        failures,
        "Batch summary"
    );

    let times: Vec<u64> = successes.iter().filter_map(|r| r.total_ms).collect();
    if !times.is_empty() {
        let mean = times.iter().sum::<u64>() as f64 / times.len() as f64;
        let max = times.iter().max().copied().unwrap_or(0);
        info!(avg_total_ms = %format!("{:.2}", mean), max_total_ms = max, "Timing over successes");
    }

    let mut by_label: HashMap<&str, Vec<&SubmissionResult>> = HashMap::new();
    for result in &successes {
        by_label.entry(result.run_label.as_str()).or_default().push(result);
    }

    for (label, items) in by_label {
        let times: Vec<u64> = items.iter().filter_map(|r| r.total_ms).collect();
        let avg = if times.is_empty() {
            None
        } else {
            Some(times.iter().sum::<u64>() as f64 / times.len() as f64)
        };
        let vintages: HashSet<i64> = items.iter().filter_map(|r| r.vintage_id).collect();

        info!(
            run_label = label,
            successes = items.len(),
            avg_total_ms = %avg.map(|a| format!("{:.2}", a)).unwrap_or_else(|| "n/a".to_string()),
            unique_vintage_matches = vintages.len(),
            "Run label summary"
        );
    }
}
