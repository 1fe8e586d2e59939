use serde::{Serialize, Serializer};
use std::path::PathBuf;
use strum::Display;

/// Where a task's image bytes come from.
#[derive(Debug, Clone)]
pub enum ImageSource {
    Local(PathBuf),
    Remote(String),
}

impl ImageSource {
    /// Basename used to key metadata lookups and name the result row.
    pub fn file_name(&self) -> String {
        match self {
            ImageSource::Local(path) => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
            ImageSource::Remote(url) => url
                .rsplit('/')
                .next()
                .unwrap_or(url.as_str())
                .to_string(),
        }
    }
}

/// One unit of work for the batch submitter. Immutable once created;
/// owned exclusively by the worker that processes it.
#[derive(Debug, Clone)]
pub struct SubmissionTask {
    pub image: ImageSource,
    /// Pre-extracted label text injected into the upload query when present.
    pub ocr_hint: Option<String>,
    /// Batch grouping tag (e.g. "clip" or "vuforia").
    pub run_label: String,
    /// Ground-truth ids carried through to the result row for later scoring.
    pub expected_vintage_id: Option<i64>,
    pub expected_wine_id: Option<i64>,
}

/// Terminal status of a processed task. Exactly one is assigned per task.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum TaskStatus {
    Success,
    #[strum(to_string = "http_error_{0}")]
    HttpError(u16),
    Exception,
    Timeout,
}

impl Serialize for TaskStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// The outcome of one submission task. Created by a worker, never mutated
/// after return.
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionResult {
    pub file: String,
    pub status: TaskStatus,
    pub run_label: String,

    /// Present once the upload succeeded and the server assigned a handle.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_id: Option<String>,

    // Match outcome (from the terminal poll body)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vintage_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_vintage_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_message: Option<String>,

    // Timing measurements
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poll_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_ms: Option<u64>,

    // Diagnostics (non-fatal)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contradiction: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub integrity_issue: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    // Ground-truth carried over from metadata
    #[serde(skip_serializing_if = "Option::is_none")]
    pub groundtruth_vintage_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub groundtruth_wine_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label_ocr_text: Option<String>,
}

impl SubmissionResult {
    /// A result for a task that failed before or during upload.
    pub fn failure(task: &SubmissionTask, status: TaskStatus, error: impl Into<String>) -> Self {
        Self {
            file: task.image.file_name(),
            status,
            run_label: task.run_label.clone(),
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
            error: Some(error.into()),
            groundtruth_vintage_id: task.expected_vintage_id,
            groundtruth_wine_id: task.expected_wine_id,
            label_ocr_text: task.ocr_hint.clone(),
        }
    }
}
