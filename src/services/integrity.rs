//! Cross-reference check between a label scan and its linked user-vintage.
//!
//! Both resources are re-fetched independently and compared against each
//! other and against the ids from the terminal poll response. Issues are
//! reported as text and never fail the submission that triggered the check.

use tracing::{debug, info, warn};

use crate::services::api::ScanApiClient;

/// Verify the cross-references between a label and its user-vintage.
///
/// Returns `None` when every relationship holds, or the joined issue
/// descriptions otherwise. A fetch failure for either resource
/// short-circuits into a single error string — there is no partial
/// comparison against a failed fetch.
pub async fn verify(
    client: &ScanApiClient,
    label_id: i64,
    user_vintage_id: i64,
) -> Option<String> {
    debug!(label_id, user_vintage_id, "Cross-referencing label and user_vintage");

    let label = match client.fetch_label(label_id).await {
        Ok(label) => label,
        Err(e) => {
            warn!(label_id, error = %e, "Integrity check could not fetch label");
            return Some(format!("Failed to fetch label {}: {}", label_id, e));
        }
    };

    let user_vintage = match client.fetch_user_vintage(user_vintage_id).await {
        Ok(uv) => uv,
        Err(e) => {
            warn!(user_vintage_id, error = %e, "Integrity check could not fetch user_vintage");
            return Some(format!(
                "Failed to fetch user_vintage {}: {}",
                user_vintage_id, e
            ));
        }
    };

    let mut issues = Vec::new();

    if label.id != Some(label_id) {
        issues.push("Label ID mismatch".to_string());
    }
    if label.user_vintage_id != Some(user_vintage_id) {
        issues.push("label.user_vintage_id != userVintage.id".to_string());
    }
    if user_vintage.label_id != Some(label_id) {
        issues.push("userVintage.label_id != label.id".to_string());
    }
    if label.match_status.as_deref() == Some("Matched") && label.vintage_id.is_none() {
        issues.push("label.match_status=Matched but no vintage_id".to_string());
    }
    if label.image.is_none() && user_vintage.image.is_none() {
        issues.push("No image in either label or user_vintage".to_string());
    }

    if issues.is_empty() {
        info!(label_id, user_vintage_id, "Integrity check passed");
        None
    } else {
        warn!(label_id, user_vintage_id, issues = issues.len(), "Integrity check found issues");
        Some(issues.join("; "))
    }
}
