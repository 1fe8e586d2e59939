use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    /// Scan API base URL (e.g., "https://api.testing.example.com")
    pub api_base_url: String,

    /// OAuth client credentials for the password-grant token exchange
    pub client_id: String,
    pub client_secret: String,

    /// QA account credentials
    pub username: String,
    pub password: String,

    /// Directory scanned recursively for .jpg/.jpeg/.png test images
    pub image_dir: String,

    /// Batch grouping tag recorded on every result row
    #[serde(default = "default_run_label")]
    pub run_label: String,

    /// Optional JSONL metadata file with OCR hints and ground-truth ids
    pub metadata_file: Option<String>,

    /// Inject OCR text from metadata into uploads when available
    #[serde(default)]
    pub inject_ocr: bool,

    /// Concurrent workers processing the batch
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Delay between poll attempts, in milliseconds
    #[serde(default = "default_poll_delay_ms")]
    pub poll_delay_ms: u64,

    /// Poll attempt budget per task
    #[serde(default = "default_max_poll_attempts")]
    pub max_poll_attempts: u32,

    /// Explicit output path; defaults to results_{run_label}_{timestamp}.json
    pub output_file: Option<String>,
}

fn default_run_label() -> String {
    "default".to_string()
}

fn default_concurrency() -> usize {
    5
}

fn default_poll_delay_ms() -> u64 {
    500
}

fn default_max_poll_attempts() -> u32 {
    100
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }
}
