//! Upstream communication error types.

use selfserve_core::error::PortalError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("token exchange with {platform} failed: {reason}")]
    Auth { platform: String, reason: String },

    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("request to {url} failed: {reason}")]
    Unavailable { url: String, reason: String },

    #[error("invalid kubeconfig: {0}")]
    Kubeconfig(String),

    #[error("kubernetes API error: {0}")]
    Cluster(String),
}

impl UpstreamError {
    pub fn auth(platform: &str, reason: impl ToString) -> Self {
        Self::Auth {
            platform: platform.into(),
            reason: reason.to_string(),
        }
    }

    /// Classify a transport error from `reqwest`.
    pub fn from_transport(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout { url: url.into() }
        } else {
            Self::Unavailable {
                url: url.into(),
                reason: err.to_string(),
            }
        }
    }
}

impl From<UpstreamError> for PortalError {
    fn from(err: UpstreamError) -> Self {
        match err {
            UpstreamError::Auth { platform, reason } => PortalError::Auth { platform, reason },
            UpstreamError::Timeout { url } => PortalError::UpstreamTimeout { url },
            UpstreamError::Unavailable { url, reason } => {
                PortalError::UpstreamUnavailable { url, reason }
            }
            UpstreamError::Cluster(reason) => PortalError::UpstreamUnavailable {
                url: "target cluster".into(),
                reason,
            },
            UpstreamError::Kubeconfig(msg) => PortalError::Internal(msg),
        }
    }
}
