use serde::Deserialize;
use std::time::Duration;

/// Error type for the startup token exchange.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("token request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("token endpoint returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Exchange password-grant credentials for a bearer token.
///
/// Runs once at startup; the returned token is shared read-only by every
/// worker for the rest of the run.
pub async fn fetch_token(
    base_url: &str,
    client_id: &str,
    client_secret: &str,
    username: &str,
    password: &str,
) -> Result<String, AuthError> {
    let url = format!("{}/oauth/token", base_url.trim_end_matches('/'));

    tracing::info!(url = %url, username = %username, "Requesting access token");

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()?;

    let response = http
        .post(&url)
        .form(&[
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("grant_type", "password"),
            ("username", username),
            ("password", password),
        ])
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(AuthError::Status {
            status: status.as_u16(),
            body,
        });
    }

    let token: TokenResponse = response.json().await?;
    Ok(token.access_token)
}
