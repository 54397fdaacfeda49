//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. Lookups by remote id are global;
//! callers apply [`crate::access::ensure_owner`] before acting on the
//! result.

use uuid::Uuid;

use crate::error::PortalResult;
use crate::models::{
    cluster::{ClusterStatus, CreateCluster, ProvisionedCluster},
    organization::{CreateOrganization, ProvisionedOrganization},
};

pub trait ClusterRepository: Send + Sync {
    /// Fails with `AlreadyExists` if the name is taken.
    fn create(
        &self,
        input: CreateCluster,
    ) -> impl Future<Output = PortalResult<ProvisionedCluster>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = PortalResult<ProvisionedCluster>> + Send;
    fn get_by_name(
        &self,
        name: &str,
    ) -> impl Future<Output = PortalResult<ProvisionedCluster>> + Send;
    fn get_by_remote_id(
        &self,
        remote_id: &str,
    ) -> impl Future<Output = PortalResult<ProvisionedCluster>> + Send;
    /// Overwrite the mirrored status. Name, remote id and owner are
    /// never touched.
    fn update_status(
        &self,
        id: Uuid,
        status: ClusterStatus,
    ) -> impl Future<Output = PortalResult<ProvisionedCluster>> + Send;
    fn delete(&self, id: Uuid) -> impl Future<Output = PortalResult<()>> + Send;
    /// All clusters owned by `owner_id`, ordered by name.
    fn list_by_owner(
        &self,
        owner_id: Uuid,
    ) -> impl Future<Output = PortalResult<Vec<ProvisionedCluster>>> + Send;
}

pub trait OrganizationRepository: Send + Sync {
    fn create(
        &self,
        input: CreateOrganization,
    ) -> impl Future<Output = PortalResult<ProvisionedOrganization>> + Send;
    fn get_by_id(
        &self,
        id: Uuid,
    ) -> impl Future<Output = PortalResult<ProvisionedOrganization>> + Send;
    fn get_by_remote_id(
        &self,
        remote_id: &str,
    ) -> impl Future<Output = PortalResult<ProvisionedOrganization>> + Send;
    fn delete(&self, id: Uuid) -> impl Future<Output = PortalResult<()>> + Send;
    /// All organizations owned by `owner_id`, ordered by name.
    fn list_by_owner(
        &self,
        owner_id: Uuid,
    ) -> impl Future<Output = PortalResult<Vec<ProvisionedOrganization>>> + Send;
}
