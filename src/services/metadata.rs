//! Ground-truth / hint lookup table loaded from a JSONL export.
//!
//! One object per line, keyed by the basename of its `filename` field.
//! Invalid lines are skipped with a warning rather than failing the run.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::warn;

/// Metadata attached to a test image out-of-band.
#[derive(Debug, Clone, Deserialize)]
pub struct LabelMetadata {
    pub filename: String,
    /// Label text extracted out-of-band, injectable as an upload hint.
    pub ocr_text: Option<String>,
    pub vintage_id: Option<i64>,
    pub expected_vintage_id: Option<i64>,
    pub wine_id: Option<i64>,
}

impl LabelMetadata {
    /// Ground-truth vintage id, whichever column the export used.
    pub fn expected_vintage(&self) -> Option<i64> {
        self.vintage_id.or(self.expected_vintage_id)
    }
}

/// Lookup table from image basename to its metadata.
pub type MetadataTable = HashMap<String, LabelMetadata>;

/// Load a metadata table from a JSONL file.
pub fn load(path: &Path) -> std::io::Result<MetadataTable> {
    let contents = std::fs::read_to_string(path)?;
    Ok(parse(&contents))
}

fn parse(contents: &str) -> MetadataTable {
    let mut table = MetadataTable::new();
    for (line_no, line) in contents.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<LabelMetadata>(line) {
            Ok(meta) => {
                let key = basename(&meta.filename);
                table.insert(key, meta);
            }
            Err(e) => {
                warn!(line = line_no + 1, error = %e, "Skipping invalid metadata line");
            }
        }
    }
    table
}

fn basename(filename: &str) -> String {
    filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename)
        .to_string()
}
