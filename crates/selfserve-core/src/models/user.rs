//! Caller identity.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The authenticated user on whose behalf an operation runs.
///
/// Authentication itself happens elsewhere; the portal only needs a
/// stable id for ownership and the email for platform-side identities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: Uuid,
    pub email: String,
}

impl UserIdentity {
    pub fn new(id: Uuid, email: impl Into<String>) -> Self {
        Self {
            id,
            email: email.into(),
        }
    }

    /// Identity whose id is derived from the email, so the same email
    /// always maps to the same owner.
    pub fn from_email(email: impl Into<String>) -> Self {
        let email = email.into();
        let id = Uuid::new_v5(&Uuid::NAMESPACE_OID, email.to_lowercase().as_bytes());
        Self { id, email }
    }
}
