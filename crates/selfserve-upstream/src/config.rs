//! Upstream platform configuration.

use std::time::Duration;

/// Default timeout applied to every upstream request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// OAuth2 client credentials for one upstream platform.
#[derive(Clone)]
pub struct ClientCredentials {
    /// Label used in logs and errors (e.g. `tkgi`, `tas`).
    pub platform: String,
    /// Full URL of the platform's token endpoint.
    pub token_url: String,
    pub client_id: String,
    pub client_secret: String,
}

impl std::fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("platform", &self.platform)
            .field("token_url", &self.token_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Configuration for an authenticated upstream client.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    pub credentials: ClientCredentials,
    /// Per-request timeout, covering the token exchange too.
    pub request_timeout: Duration,
}

impl UpstreamConfig {
    pub fn new(credentials: ClientCredentials) -> Self {
        Self {
            credentials,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}
