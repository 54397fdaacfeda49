//! Provisioned organization domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A platform organization created on behalf of one user.
///
/// The record only exists while the remote organization does; it is
/// written after the platform confirms creation and removed once the
/// platform accepts deletion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisionedOrganization {
    pub id: Uuid,
    pub name: String,
    /// Organization GUID on the platform.
    pub remote_id: String,
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields required to create a new organization record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrganization {
    pub name: String,
    pub remote_id: String,
    pub owner_id: Uuid,
}
