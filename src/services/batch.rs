//! Batch submitter: fans a task list out across a bounded worker pool.
//!
//! Each worker fully processes one task — resolve bytes, upload, poll until
//! terminal, cross-check — before releasing its permit. Results are
//! collected as tasks complete, in completion order, and every task yields
//! exactly one result regardless of how it failed.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::models::scan::ScanReport;
use crate::models::task::{ImageSource, SubmissionResult, SubmissionTask, TaskStatus};
use crate::services::api::{ApiError, PollOutcome, ScanApiClient};
use crate::services::{contradiction, integrity};

/// Retry schedule for the poll phase.
#[derive(Debug, Clone)]
pub struct PollPolicy {
    /// Fixed delay between poll attempts.
    pub delay: Duration,
    /// Attempt budget before a task is declared timed out.
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(500),
            max_attempts: 100,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Number of tasks processed concurrently.
    pub concurrency: usize,
    pub poll: PollPolicy,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            concurrency: 5,
            poll: PollPolicy::default(),
        }
    }
}

/// Process every task with bounded parallelism and collect one result per
/// task in completion order.
pub async fn run(
    client: Arc<ScanApiClient>,
    tasks: Vec<SubmissionTask>,
    options: BatchOptions,
) -> Vec<SubmissionResult> {
    let total = tasks.len();
    let semaphore = Arc::new(Semaphore::new(options.concurrency.max(1)));

    let mut set = JoinSet::new();
    let mut files_by_task = HashMap::new();

    for task in tasks {
        let client = Arc::clone(&client);
        let semaphore = Arc::clone(&semaphore);
        let poll = options.poll.clone();
        let file = task.image.file_name();

        let handle = set.spawn(async move {
            // The semaphore is never closed while workers hold a clone, so
            // a failed acquire can only mean runtime shutdown.
            let _permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    return SubmissionResult::failure(
                        &task,
                        TaskStatus::Exception,
                        "worker pool shut down before task started",
                    )
                }
            };
            process_task(&client, task, &poll).await
        });
        files_by_task.insert(handle.id(), file);
    }

    let mut results = Vec::with_capacity(total);
    while let Some(joined) = set.join_next_with_id().await {
        match joined {
            Ok((id, result)) => {
                files_by_task.remove(&id);
                info!(
                    file = %result.file,
                    status = %result.status,
                    progress = %format!("{}/{}", results.len() + 1, total),
                    "Task complete"
                );
                results.push(result);
            }
            Err(join_err) => {
                // A panicking worker still owes the batch a result row.
                let file = files_by_task
                    .remove(&join_err.id())
                    .unwrap_or_else(|| "unknown".to_string());
                error!(file = %file, error = %join_err, "Worker panicked");
                results.push(SubmissionResult {
                    file,
                    status: TaskStatus::Exception,
                    run_label: String::new(),
                    processing_id: None,
                    upload_status: None,
                    match_status: None,
                    vintage_id: None,
                    user_vintage_id: None,
                    label_id: None,
                    image_location: None,
                    match_message: None,
                    upload_ms: None,
                    poll_ms: None,
                    total_ms: None,
                    contradiction: None,
                    integrity_issue: None,
                    error: Some(format!("worker panicked: {}", join_err)),
                    groundtruth_vintage_id: None,
                    groundtruth_wine_id: None,
                    label_ocr_text: None,
                });
            }
        }
    }

    results
}

/// Process one task to a terminal outcome: upload, poll, cross-check.
/// Infallible by design — every failure mode becomes a result row.
async fn process_task(
    client: &ScanApiClient,
    task: SubmissionTask,
    poll: &PollPolicy,
) -> SubmissionResult {
    let file = task.image.file_name();
    let started = Instant::now();

    // ── Resolve image bytes ──────────────────────────────────────────
    let image_bytes = match &task.image {
        ImageSource::Local(path) => match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(file = %file, error = %e, "Failed to read local image");
                return SubmissionResult::failure(
                    &task,
                    TaskStatus::Exception,
                    format!("Failed to read image: {}", e),
                );
            }
        },
        ImageSource::Remote(url) => match client.download_image(url).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(file = %file, error = %e, "Failed to download image");
                return SubmissionResult::failure(
                    &task,
                    TaskStatus::Exception,
                    format!("Download failed: {}", e),
                );
            }
        },
    };

    // ── Upload phase ─────────────────────────────────────────────────
    if task.ocr_hint.is_some() {
        debug!(file = %file, "Injecting OCR hint into upload");
    }

    let upload_started = Instant::now();
    let processing_id = match client
        .upload_label(&file, image_bytes, task.ocr_hint.as_deref())
        .await
    {
        Ok(id) => id,
        Err(ApiError::Status { status, body }) => {
            warn!(file = %file, status, "Upload rejected");
            return SubmissionResult::failure(&task, TaskStatus::HttpError(status), body);
        }
        Err(ApiError::MissingProcessingId) => {
            error!(file = %file, "Upload succeeded but no processing_id was assigned");
            return SubmissionResult::failure(
                &task,
                TaskStatus::Exception,
                ApiError::MissingProcessingId.to_string(),
            );
        }
        Err(e) => {
            warn!(file = %file, error = %e, "Upload failed");
            return SubmissionResult::failure(
                &task,
                TaskStatus::Exception,
                format!("Upload failed: {}", e),
            );
        }
    };
    let upload_ms = upload_started.elapsed().as_millis() as u64;
    info!(file = %file, processing_id = %processing_id, upload_ms, "Upload accepted");

    // ── Poll phase ───────────────────────────────────────────────────
    for attempt in 1..=poll.max_attempts {
        let poll_started = Instant::now();
        match client.fetch_scan(&processing_id).await {
            Ok(PollOutcome::Ready(report)) => {
                let poll_ms = poll_started.elapsed().as_millis() as u64;
                return finish_task(client, task, report, processing_id, upload_ms, poll_ms, started)
                    .await;
            }
            Ok(PollOutcome::Processing) => {
                debug!(file = %file, attempt, "Still processing");
            }
            Err(e) => {
                // Transient-fault tolerant: a bad poll never aborts the task.
                warn!(file = %file, attempt, error = %e, "Poll attempt failed");
            }
        }
        sleep(poll.delay).await;
    }

    warn!(file = %file, attempts = poll.max_attempts, "Poll budget exhausted");
    let mut result = SubmissionResult::failure(
        &task,
        TaskStatus::Timeout,
        format!("No valid response after {} poll attempts", poll.max_attempts),
    );
    result.processing_id = Some(processing_id);
    result
}

/// Build the success result from a terminal report, running the local
/// contradiction check and, when both linked ids are present, the remote
/// consistency check.
async fn finish_task(
    client: &ScanApiClient,
    task: SubmissionTask,
    report: ScanReport,
    processing_id: String,
    upload_ms: u64,
    poll_ms: u64,
    started: Instant,
) -> SubmissionResult {
    let file = task.image.file_name();

    let contradiction = contradiction::detect(&report);
    if let Some(ref issue) = contradiction {
        warn!(file = %file, issue = %issue, "Contradiction in terminal report");
    }

    let integrity_issue = match (report.id, report.user_vintage_id) {
        (Some(label_id), Some(user_vintage_id)) => {
            integrity::verify(client, label_id, user_vintage_id).await
        }
        _ => None,
    };

    let total_ms = started.elapsed().as_millis() as u64;
    info!(
        file = %file,
        match_status = report.match_status.as_deref().unwrap_or("-"),
        vintage_id = report.vintage_id,
        upload_ms,
        poll_ms,
        total_ms,
        "Scan complete"
    );

    SubmissionResult {
        file,
        status: TaskStatus::Success,
        run_label: task.run_label.clone(),
        processing_id: Some(processing_id),
        upload_status: report.upload_status.clone(),
        match_status: report.match_status.clone(),
        vintage_id: report.vintage_id,
        user_vintage_id: report.user_vintage_id,
        label_id: report.id,
        image_location: report.image_location(),
        match_message: report.match_message.clone(),
        upload_ms: Some(upload_ms),
        poll_ms: Some(poll_ms),
        total_ms: Some(total_ms),
        contradiction,
        integrity_issue,
        error: None,
        groundtruth_vintage_id: task.expected_vintage_id,
        groundtruth_wine_id: task.expected_wine_id,
        label_ocr_text: task.ocr_hint.clone(),
    }
}
