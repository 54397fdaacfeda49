//! ClusterRoleBinding management on provisioned clusters.
//!
//! The portal talks to a cluster directly, authenticating with the admin
//! kubeconfig the broker hands out, not through the broker API.

use std::time::Duration;

use async_trait::async_trait;
use k8s_openapi::api::rbac::v1::{ClusterRoleBinding, RoleRef, Subject};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{DeleteParams, ListParams, PostParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Api, Client, Config};
use tracing::debug;

use crate::config::DEFAULT_REQUEST_TIMEOUT;
use crate::error::UpstreamError;
use crate::tls::install_crypto_provider;

pub const RBAC_API_GROUP: &str = "rbac.authorization.k8s.io";
pub const CLUSTER_ADMIN_ROLE: &str = "cluster-admin";

/// Build a binding granting `cluster-admin` to the user `email`.
pub fn cluster_admin_binding(name: &str, email: &str) -> ClusterRoleBinding {
    ClusterRoleBinding {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            ..Default::default()
        },
        role_ref: RoleRef {
            api_group: RBAC_API_GROUP.to_string(),
            kind: "ClusterRole".to_string(),
            name: CLUSTER_ADMIN_ROLE.to_string(),
        },
        subjects: Some(vec![Subject {
            api_group: Some(RBAC_API_GROUP.to_string()),
            kind: "User".to_string(),
            name: email.to_string(),
            namespace: None,
        }]),
    }
}

/// List parameters matching exactly the object called `name`.
pub fn name_selector(name: &str) -> ListParams {
    ListParams::default().fields(&format!("metadata.name={name}"))
}

/// Cluster-scoped RBAC operations on one target cluster.
#[async_trait]
pub trait RbacClient: Send + Sync {
    /// Bindings whose `metadata.name` equals `name`.
    async fn list_cluster_role_bindings(
        &self,
        name: &str,
    ) -> Result<Vec<ClusterRoleBinding>, UpstreamError>;

    async fn create_cluster_role_binding(
        &self,
        binding: &ClusterRoleBinding,
    ) -> Result<(), UpstreamError>;

    /// Returns `false` when no binding with that name existed.
    async fn delete_cluster_role_binding(&self, name: &str) -> Result<bool, UpstreamError>;
}

/// Opens an [`RbacClient`] from a kubeconfig document.
#[async_trait]
pub trait RbacConnector: Send + Sync {
    async fn connect(&self, kubeconfig: Kubeconfig) -> Result<Box<dyn RbacClient>, UpstreamError>;
}

/// [`RbacConnector`] backed by `kube`.
#[derive(Debug, Clone)]
pub struct KubeRbacConnector {
    timeout: Duration,
}

impl Default for KubeRbacConnector {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl KubeRbacConnector {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl RbacConnector for KubeRbacConnector {
    async fn connect(&self, kubeconfig: Kubeconfig) -> Result<Box<dyn RbacClient>, UpstreamError> {
        install_crypto_provider();

        let mut config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
            .await
            .map_err(|e| UpstreamError::Kubeconfig(e.to_string()))?;
        config.connect_timeout = Some(self.timeout);
        config.read_timeout = Some(self.timeout);

        debug!(server = %config.cluster_url, "Connecting to target cluster");

        let client = Client::try_from(config).map_err(|e| UpstreamError::Cluster(e.to_string()))?;
        Ok(Box::new(KubeRbacClient {
            api: Api::all(client),
        }))
    }
}

struct KubeRbacClient {
    api: Api<ClusterRoleBinding>,
}

#[async_trait]
impl RbacClient for KubeRbacClient {
    async fn list_cluster_role_bindings(
        &self,
        name: &str,
    ) -> Result<Vec<ClusterRoleBinding>, UpstreamError> {
        let list = self
            .api
            .list(&name_selector(name))
            .await
            .map_err(|e| UpstreamError::Cluster(e.to_string()))?;
        Ok(list.items)
    }

    async fn create_cluster_role_binding(
        &self,
        binding: &ClusterRoleBinding,
    ) -> Result<(), UpstreamError> {
        self.api
            .create(&PostParams::default(), binding)
            .await
            .map_err(|e| UpstreamError::Cluster(e.to_string()))?;
        Ok(())
    }

    async fn delete_cluster_role_binding(&self, name: &str) -> Result<bool, UpstreamError> {
        match self.api.delete(name, &DeleteParams::default()).await {
            Ok(_) => Ok(true),
            Err(kube::Error::Api(response)) if response.code == 404 => Ok(false),
            Err(e) => Err(UpstreamError::Cluster(e.to_string())),
        }
    }
}
