use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use scan_qa::config::AppConfig;
use scan_qa::models::task::{ImageSource, SubmissionTask};
use scan_qa::services::api::ScanApiClient;
use scan_qa::services::batch::{self, BatchOptions, PollPolicy};
use scan_qa::services::metadata::MetadataTable;
use scan_qa::services::{auth, metadata, report};

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env().expect("Failed to load configuration from environment");

    tracing::info!(base_url = %config.api_base_url, run_label = %config.run_label, "Starting scan-qa batch run");

    // Token exchange happens once; workers share the token read-only.
    let token = auth::fetch_token(
        &config.api_base_url,
        &config.client_id,
        &config.client_secret,
        &config.username,
        &config.password,
    )
    .await
    .expect("Authentication failed");

    let client = Arc::new(
        ScanApiClient::new(config.api_base_url.as_str(), token)
            .expect("Failed to build API client"),
    );

    let metadata_table = match &config.metadata_file {
        Some(path) => {
            let table = metadata::load(Path::new(path)).expect("Failed to load metadata file");
            tracing::info!(path = %path, entries = table.len(), "Metadata loaded");
            table
        }
        None => MetadataTable::new(),
    };

    let images = collect_images(Path::new(&config.image_dir));
    if images.is_empty() {
        tracing::error!(dir = %config.image_dir, "No images found in the specified source");
        std::process::exit(1);
    }
    tracing::info!(count = images.len(), dir = %config.image_dir, "Images discovered");

    let tasks: Vec<SubmissionTask> = images
        .into_iter()
        .map(|path| build_task(path, &config, &metadata_table))
        .collect();

    let options = BatchOptions {
        concurrency: config.concurrency,
        poll: PollPolicy {
            delay: Duration::from_millis(config.poll_delay_ms),
            max_attempts: config.max_poll_attempts,
        },
    };

    let results = batch::run(client, tasks, options).await;

    let output_path = config
        .output_file
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(|| report::default_output_path(&config.run_label));
    report::write_results(&output_path, &results).expect("Failed to write results");
    report::log_summary(&results);
}

fn build_task(path: PathBuf, config: &AppConfig, metadata: &MetadataTable) -> SubmissionTask {
    let image = ImageSource::Local(path);
    let meta = metadata.get(&image.file_name());

    let ocr_hint = if config.inject_ocr {
        meta.and_then(|m| m.ocr_text.clone())
    } else {
        None
    };

    SubmissionTask {
        image,
        ocr_hint,
        run_label: config.run_label.clone(),
        expected_vintage_id: meta.and_then(|m| m.expected_vintage()),
        expected_wine_id: meta.and_then(|m| m.wine_id),
    }
}

/// Recursively collect .jpg/.jpeg/.png files under a directory.
fn collect_images(dir: &Path) -> Vec<PathBuf> {
    let mut images = Vec::new();
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(dir = %dir.display(), error = %e, "Cannot read image directory");
            return images;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            images.extend(collect_images(&path));
        } else if is_image(&path) {
            images.push(path);
        }
    }

    images.sort();
    images
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            ext == "jpg" || ext == "jpeg" || ext == "png"
        })
        .unwrap_or(false)
}
