//! Ownership checks for provisioned resources.

use uuid::Uuid;

use crate::error::{PortalError, PortalResult};
use crate::models::cluster::ProvisionedCluster;
use crate::models::organization::ProvisionedOrganization;
use crate::models::user::UserIdentity;

/// A resource with exactly one owning user.
pub trait Owned {
    /// Entity label used in error messages.
    const ENTITY: &'static str;

    fn owner_id(&self) -> Uuid;
    fn remote_id(&self) -> &str;
}

impl Owned for ProvisionedCluster {
    const ENTITY: &'static str = "Cluster";

    fn owner_id(&self) -> Uuid {
        self.owner_id
    }

    fn remote_id(&self) -> &str {
        &self.remote_id
    }
}

impl Owned for ProvisionedOrganization {
    const ENTITY: &'static str = "Organization";

    fn owner_id(&self) -> Uuid {
        self.owner_id
    }

    fn remote_id(&self) -> &str {
        &self.remote_id
    }
}

/// Resolve a lookup result into a resource the caller may act on.
///
/// A missing record and a record owned by another user both come back
/// as `NotFound` carrying the requested id.
pub fn ensure_owner<T: Owned>(
    lookup: PortalResult<T>,
    user: &UserIdentity,
    requested_id: &str,
) -> PortalResult<T> {
    match lookup {
        Ok(resource) if resource.owner_id() == user.id => Ok(resource),
        Ok(_) | Err(PortalError::NotFound { .. }) => {
            Err(PortalError::not_found(T::ENTITY, requested_id))
        }
        Err(other) => Err(other),
    }
}
