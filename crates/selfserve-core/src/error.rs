//! Error types for the self-service portal.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PortalError {
    /// Missing locally, or owned by someone else. The two cases are
    /// deliberately indistinguishable to the caller.
    #[error("{entity} {id} not found or does not belong to user")]
    NotFound { entity: String, id: String },

    #[error("{entity} already exists: {name}")]
    AlreadyExists { entity: String, name: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    /// Token exchange against a platform's token endpoint failed.
    #[error("Authentication against {platform} failed: {reason}")]
    Auth { platform: String, reason: String },

    #[error("Upstream unavailable: {url}: {reason}")]
    UpstreamUnavailable { url: String, reason: String },

    #[error("Upstream request timed out: {url}")]
    UpstreamTimeout { url: String },

    #[error("Failed to create {entity} {name} (status {status}): {body}")]
    CreationFailed {
        entity: String,
        name: String,
        status: u16,
        body: String,
    },

    #[error("Error deleting {entity} {id} (status {status}): {body}")]
    DeletionFailed {
        entity: String,
        id: String,
        status: u16,
        body: String,
    },

    #[error("Failed to bind cluster role on {cluster}: {reason}")]
    BindingFailed { cluster: String, reason: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PortalError {
    pub fn not_found(entity: &str, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn binding_failed(cluster: &str, reason: impl ToString) -> Self {
        Self::BindingFailed {
            cluster: cluster.into(),
            reason: reason.to_string(),
        }
    }

    /// True for network-level failures talking to an upstream.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::UpstreamUnavailable { .. } | Self::UpstreamTimeout { .. }
        )
    }
}

pub type PortalResult<T> = Result<T, PortalError>;
