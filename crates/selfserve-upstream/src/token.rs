//! OAuth2 client-credentials token exchange.
//!
//! Tokens are fetched fresh for every operation. Nothing is cached or
//! shared between platforms.

use chrono::{DateTime, Duration, Utc};
use reqwest::header::ACCEPT;
use serde::Deserialize;
use tracing::debug;

use crate::config::ClientCredentials;
use crate::error::UpstreamError;

/// A bearer token for one platform.
#[derive(Clone)]
pub struct AccessToken {
    value: String,
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn new(value: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            value: value.into(),
            expires_at,
        }
    }

    /// Raw token value for the `Authorization: Bearer` header.
    pub fn secret(&self) -> &str {
        &self.value
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("value", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Token endpoint response (RFC 6749 §5.1).
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// Exchange client credentials for an access token.
///
/// Unreachable endpoints, non-2xx answers and malformed bodies all fail
/// with [`UpstreamError::Auth`]. There is no retry.
pub async fn fetch_token(
    http: &reqwest::Client,
    credentials: &ClientCredentials,
) -> Result<AccessToken, UpstreamError> {
    debug!(platform = %credentials.platform, "Requesting client-credentials token");

    let response = http
        .post(&credentials.token_url)
        .header(ACCEPT, "application/json")
        .form(&[
            ("grant_type", "client_credentials"),
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
        ])
        .send()
        .await
        .map_err(|e| {
            UpstreamError::auth(&credentials.platform, format!("token endpoint unreachable: {e}"))
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(UpstreamError::auth(
            &credentials.platform,
            format!("token endpoint returned {status}"),
        ));
    }

    let body: TokenResponse = response.json().await.map_err(|e| {
        UpstreamError::auth(&credentials.platform, format!("malformed token response: {e}"))
    })?;

    let expires_in = body.expires_in.unwrap_or(0);
    let expires_at = expiry_after(expires_in).ok_or_else(|| {
        UpstreamError::auth(
            &credentials.platform,
            format!("token lifetime out of range: {expires_in}s"),
        )
    })?;
    Ok(AccessToken::new(body.access_token, expires_at))
}

/// `None` when `expires_in` does not fit a timestamp.
fn expiry_after(expires_in: i64) -> Option<DateTime<Utc>> {
    Duration::try_seconds(expires_in).and_then(|ttl| Utc::now().checked_add_signed(ttl))
}
