use serde::{Deserialize, Serialize};

/// Upload acknowledgement from `POST /v/10.0.0/scans/label`.
#[derive(Debug, Deserialize)]
pub struct UploadAck {
    pub processing_id: Option<String>,
}

/// Image reference embedded in scan and vintage resources.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageRef {
    pub location: Option<String>,
}

/// Terminal body returned by `GET /v/9.0.0/scans/v2/label/{processing_id}`.
///
/// The server returns this with HTTP 200 only when processing has finished;
/// HTTP 204 means "still processing". Every field is optional on the wire.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanReport {
    pub id: Option<i64>,
    pub upload_status: Option<String>,
    pub match_status: Option<String>,
    pub vintage_id: Option<i64>,
    pub user_vintage_id: Option<i64>,
    pub match_message: Option<String>,
    pub image: Option<ImageRef>,
}

impl ScanReport {
    /// Image location with the leading slashes the API prepends stripped off.
    pub fn image_location(&self) -> Option<String> {
        self.image
            .as_ref()
            .and_then(|i| i.location.as_deref())
            .map(|loc| loc.trim_start_matches('/').to_string())
    }
}

/// Label scan resource, re-fetched independently by the consistency checker.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LabelResource {
    pub id: Option<i64>,
    pub user_vintage_id: Option<i64>,
    pub match_status: Option<String>,
    pub vintage_id: Option<i64>,
    pub image: Option<ImageRef>,
}

/// User-vintage resource linked back to a label scan.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserVintageResource {
    pub id: Option<i64>,
    pub label_id: Option<i64>,
    pub image: Option<ImageRef>,
}
