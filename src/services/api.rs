use reqwest::multipart;
use reqwest::StatusCode;
use std::time::Duration;

use crate::models::scan::{LabelResource, ScanReport, UploadAck, UserVintageResource};

/// Per-request timeout, matching the QA environment's slow test tiers.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Error type for scan API operations.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("upload accepted but response body carries no processing_id")]
    MissingProcessingId,
}

impl ApiError {
    /// HTTP status code, when this error carries one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Transport(e) => e.status().map(|s| s.as_u16()),
            ApiError::MissingProcessingId => None,
        }
    }
}

/// One poll attempt against the scan status endpoint.
#[derive(Debug)]
pub enum PollOutcome {
    /// HTTP 200 — terminal, whatever the business match state in the body.
    Ready(ScanReport),
    /// HTTP 204 — still processing.
    Processing,
}

/// Client for the wine-label scan API.
///
/// Holds the bearer token obtained at startup; every request attaches it via
/// the `Authorization` header. Cheap to share behind an `Arc` across workers.
pub struct ScanApiClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl ScanApiClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Download image bytes from a remote source (e.g. a raw GitHub URL).
    /// No bearer token: image hosts are unrelated to the scan API.
    pub async fn download_image(&self, url: &str) -> Result<Vec<u8>, ApiError> {
        let response = self.http.get(url).send().await?.error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    }

    /// Upload a label image and return the server-assigned processing id.
    ///
    /// A 2xx response without a `processing_id` is a protocol violation and
    /// surfaces as [`ApiError::MissingProcessingId`].
    pub async fn upload_label(
        &self,
        file_name: &str,
        image_bytes: Vec<u8>,
        ocr_hint: Option<&str>,
    ) -> Result<String, ApiError> {
        let url = format!("{}/v/10.0.0/scans/label", self.base_url);

        let mut query: Vec<(&str, String)> = vec![
            ("image_type", "jpg".to_string()),
            ("add_user_vintage", "true".to_string()),
            ("queue_tier_matching", "false".to_string()),
        ];
        if let Some(hint) = ocr_hint {
            query.push(("label_ocr", hint.to_string()));
            query.push(("label_ocr_source", "vision".to_string()));
        }

        let form = multipart::Form::new().part(
            "image",
            multipart::Part::bytes(image_bytes)
                .file_name(file_name.to_string())
                .mime_str("image/jpeg")?,
        );

        let response = self
            .http
            .post(&url)
            .query(&query)
            .bearer_auth(&self.token)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let ack: UploadAck = response.json().await?;
        ack.processing_id.ok_or(ApiError::MissingProcessingId)
    }

    /// One poll of the scan status endpoint for a processing id.
    pub async fn fetch_scan(&self, processing_id: &str) -> Result<PollOutcome, ApiError> {
        let url = format!(
            "{}/v/9.0.0/scans/v2/label/{}",
            self.base_url, processing_id
        );

        let response = self
            .http
            .get(&url)
            .query(&[("user_id", "3"), ("language", "en")])
            .bearer_auth(&self.token)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(PollOutcome::Ready(response.json().await?)),
            StatusCode::NO_CONTENT => Ok(PollOutcome::Processing),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(ApiError::Status {
                    status: status.as_u16(),
                    body,
                })
            }
        }
    }

    /// Fetch a label scan resource by id (consistency checker only).
    pub async fn fetch_label(&self, label_id: i64) -> Result<LabelResource, ApiError> {
        let url = format!("{}/v/9.0.0/scans/v2/label/{}", self.base_url, label_id);
        self.get_json(&url).await
    }

    /// Fetch a user-vintage resource by id (consistency checker only).
    pub async fn fetch_user_vintage(
        &self,
        user_vintage_id: i64,
    ) -> Result<UserVintageResource, ApiError> {
        let url = format!("{}/v/9.1.1/user_vintages/{}", self.base_url, user_vintage_id);
        self.get_json(&url).await
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, ApiError> {
        let response = self.http.get(url).bearer_auth(&self.token).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json().await?)
    }
}
