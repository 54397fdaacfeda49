//! Cluster lifecycle: create, refresh, delete and kubeconfig issuance.
//!
//! The broker is the source of truth. Every operation obtains one token,
//! drives the broker, and then brings the local record in line with
//! what the broker answered. Refresh is caller-triggered; nothing polls.

use std::net::IpAddr;

use serde::Deserialize;
use serde_json::{Value, json};
use selfserve_core::access::ensure_owner;
use selfserve_core::error::{PortalError, PortalResult};
use selfserve_core::models::cluster::{
    ClusterStatus, CreateCluster, ProvisionedCluster, validate_cluster_name,
};
use selfserve_core::models::user::UserIdentity;
use selfserve_core::repository::ClusterRepository;
use selfserve_upstream::rbac::cluster_admin_binding;
use selfserve_upstream::{AccessToken, RbacClient, RbacConnector, UpstreamApi};
use tracing::{debug, error, info, warn};

use crate::config::ClusterConfig;
use crate::kubeconfig::{
    KubeconfigDownload, legacy_binding_name, prepare_admin_kubeconfig, render_kubeconfig,
    user_binding_name,
};

/// Cluster document as returned by the broker.
#[derive(Debug, Deserialize)]
struct BrokerCluster {
    uuid: String,
    #[serde(default)]
    plan_name: String,
    #[serde(default)]
    last_action: String,
    #[serde(default)]
    last_action_state: String,
    #[serde(default)]
    last_action_description: String,
    parameters: BrokerParameters,
    #[serde(default)]
    kubernetes_master_ips: Vec<String>,
    #[serde(default)]
    k8s_version: String,
}

#[derive(Debug, Deserialize)]
struct BrokerParameters {
    kubernetes_master_host: String,
    kubernetes_master_port: u16,
    #[serde(default)]
    kubernetes_worker_instances: u32,
}

impl BrokerCluster {
    fn parse(body: Value) -> Result<Self, String> {
        serde_json::from_value(body).map_err(|e| format!("malformed cluster document: {e}"))
    }

    fn status(&self) -> ClusterStatus {
        // While provisioning the broker reports placeholders such as
        // "In Progress" instead of an address.
        let master_ip = self
            .kubernetes_master_ips
            .iter()
            .find(|ip| ip.parse::<IpAddr>().is_ok())
            .cloned();

        ClusterStatus {
            plan_name: self.plan_name.clone(),
            last_action: self.last_action.clone(),
            last_action_state: self.last_action_state.clone(),
            last_action_description: self.last_action_description.clone(),
            master_host: self.parameters.kubernetes_master_host.clone(),
            master_port: self.parameters.kubernetes_master_port,
            master_ip,
            worker_instances: self.parameters.kubernetes_worker_instances,
            k8s_version: self.k8s_version.clone(),
        }
    }
}

/// One cluster that could not be reconciled during a refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshFailure {
    pub cluster: String,
    pub reason: String,
}

/// Per-cluster results of a refresh.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshReport {
    /// Clusters whose mirrored status was overwritten.
    pub updated: Vec<String>,
    /// Clusters the broker no longer knows; their records are gone.
    pub removed: Vec<String>,
    /// Clusters left untouched because the broker call failed.
    pub failed: Vec<RefreshFailure>,
}

impl RefreshReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// What happened to the broker's own admin binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LegacyCleanup {
    Removed,
    /// Already gone, e.g. on a second kubeconfig download.
    Absent,
    /// Deletion failed; the user's grant still stands.
    Failed(String),
}

/// Result of granting a user cluster-admin on a cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingOutcome {
    pub binding_name: String,
    /// `false` when the binding already existed.
    pub created: bool,
    pub legacy_cleanup: LegacyCleanup,
}

/// Cluster lifecycle manager.
///
/// Generic over the repository, the broker API and the target-cluster
/// RBAC connector so that the orchestration has no dependency on the
/// database or on live clusters.
pub struct ClusterManager<R: ClusterRepository, U: UpstreamApi, K: RbacConnector> {
    repo: R,
    broker: U,
    rbac: K,
    config: ClusterConfig,
}

impl<R: ClusterRepository, U: UpstreamApi, K: RbacConnector> ClusterManager<R, U, K> {
    pub fn new(repo: R, broker: U, rbac: K, config: ClusterConfig) -> Self {
        Self {
            repo,
            broker,
            rbac,
            config,
        }
    }

    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    /// Clusters owned by `user`, ordered by name.
    pub async fn list(&self, user: &UserIdentity) -> PortalResult<Vec<ProvisionedCluster>> {
        self.repo.list_by_owner(user.id).await
    }

    /// Ask the broker for a new cluster and record it once accepted.
    pub async fn create(&self, user: &UserIdentity, name: &str) -> PortalResult<ProvisionedCluster> {
        validate_cluster_name(name).map_err(PortalError::validation)?;

        match self.repo.get_by_name(name).await {
            Ok(_) => {
                return Err(PortalError::AlreadyExists {
                    entity: "Cluster".into(),
                    name: name.into(),
                });
            }
            Err(PortalError::NotFound { .. }) => {}
            Err(e) => return Err(e),
        }

        let payload = json!({
            "name": name,
            "parameters": {
                "kubernetes_master_host": self.config.master_host(name),
                "kubernetes_master_port": self.config.master_port,
            },
            "plan_name": self.config.plan_name,
            "kubernetes_profile_name": self.config.profile_name,
        });

        let token = self.broker.authenticate().await?;
        let response = self
            .broker
            .post(&token, &self.config.clusters_url(), payload)
            .await?;

        if response.status != 202 {
            warn!(
                cluster = %name,
                status = response.status,
                body = %response.body_text(),
                "Broker rejected cluster creation"
            );
            return Err(PortalError::CreationFailed {
                entity: "Cluster".into(),
                name: name.into(),
                status: response.status,
                body: response.body_text(),
            });
        }

        let accepted = BrokerCluster::parse(response.body).map_err(|e| {
            PortalError::Internal(format!("broker accepted cluster {name} but {e}"))
        })?;

        let cluster = self
            .repo
            .create(CreateCluster {
                name: name.into(),
                remote_id: accepted.uuid.clone(),
                owner_id: user.id,
                status: accepted.status(),
            })
            .await?;

        info!(
            cluster = %cluster.name,
            remote_id = %cluster.remote_id,
            owner = %user.email,
            "Cluster creation accepted"
        );
        Ok(cluster)
    }

    /// Reconcile every cluster owned by `user` against the broker.
    ///
    /// Failures are isolated per cluster and reported, never raised. Only
    /// failing to obtain a token aborts the refresh.
    pub async fn refresh(&self, user: &UserIdentity) -> PortalResult<RefreshReport> {
        let clusters = self.repo.list_by_owner(user.id).await?;
        if clusters.is_empty() {
            return Ok(RefreshReport::default());
        }

        let token = self.broker.authenticate().await?;
        Ok(self.reconcile(&token, clusters).await)
    }

    async fn reconcile(
        &self,
        token: &AccessToken,
        clusters: Vec<ProvisionedCluster>,
    ) -> RefreshReport {
        let mut report = RefreshReport::default();

        for cluster in clusters {
            match self.refresh_one(token, &cluster).await {
                Ok(RefreshOutcome::Updated) => report.updated.push(cluster.name),
                Ok(RefreshOutcome::Removed) => report.removed.push(cluster.name),
                Err(reason) => {
                    warn!(cluster = %cluster.name, %reason, "Cluster refresh failed");
                    report.failed.push(RefreshFailure {
                        cluster: cluster.name,
                        reason,
                    });
                }
            }
        }

        debug!(
            updated = report.updated.len(),
            removed = report.removed.len(),
            failed = report.failed.len(),
            "Cluster refresh finished"
        );
        report
    }

    async fn refresh_one(
        &self,
        token: &AccessToken,
        cluster: &ProvisionedCluster,
    ) -> Result<RefreshOutcome, String> {
        let response = self
            .broker
            .get(token, &self.config.cluster_url(&cluster.name))
            .await
            .map_err(|e| e.to_string())?;

        match response.status {
            200 => {
                let current = BrokerCluster::parse(response.body)?;
                self.repo
                    .update_status(cluster.id, current.status())
                    .await
                    .map_err(|e| e.to_string())?;
                Ok(RefreshOutcome::Updated)
            }
            404 => {
                self.repo
                    .delete(cluster.id)
                    .await
                    .map_err(|e| e.to_string())?;
                info!(cluster = %cluster.name, "Cluster gone on broker, record removed");
                Ok(RefreshOutcome::Removed)
            }
            status => Err(format!("broker returned status {status}")),
        }
    }

    /// Ask the broker to delete a cluster owned by `user`.
    ///
    /// Once the broker accepts, the user's clusters are reconciled with
    /// the same token; the record disappears when the broker stops
    /// reporting the cluster. Reconciliation problems land in the report,
    /// since the deletion itself has already been accepted.
    pub async fn delete(&self, user: &UserIdentity, remote_id: &str) -> PortalResult<RefreshReport> {
        let cluster = ensure_owner(self.repo.get_by_remote_id(remote_id).await, user, remote_id)?;

        let token = self.broker.authenticate().await?;
        let response = self
            .broker
            .delete(&token, &self.config.cluster_url(&cluster.name))
            .await?;

        if response.status != 204 {
            warn!(
                cluster = %cluster.name,
                status = response.status,
                body = %response.body_text(),
                "Broker rejected cluster deletion"
            );
            return Err(PortalError::DeletionFailed {
                entity: "Cluster".into(),
                id: remote_id.into(),
                status: response.status,
                body: response.body_text(),
            });
        }

        info!(cluster = %cluster.name, "Cluster deletion accepted");

        match self.repo.list_by_owner(user.id).await {
            Ok(clusters) => Ok(self.reconcile(&token, clusters).await),
            Err(e) => {
                warn!(cluster = %cluster.name, error = %e, "Reconciliation after deletion failed");
                Ok(RefreshReport {
                    failed: vec![RefreshFailure {
                        cluster: cluster.name,
                        reason: e.to_string(),
                    }],
                    ..Default::default()
                })
            }
        }
    }

    /// Grant `user` cluster-admin on `cluster`.
    ///
    /// Fetches the broker's admin kubeconfig, points it at the master IP,
    /// ensures the user's ClusterRoleBinding exists and removes the
    /// broker's own admin binding.
    pub async fn bind_cluster_role(
        &self,
        user: &UserIdentity,
        cluster: &ProvisionedCluster,
    ) -> PortalResult<BindingOutcome> {
        let endpoint = cluster
            .master_endpoint()
            .ok_or_else(|| PortalError::binding_failed(&cluster.name, "cluster has no master IP yet"))?;

        let token = self.broker.authenticate().await?;
        let response = self
            .broker
            .get(&token, &self.config.admin_bind_url(&cluster.name))
            .await?;
        if response.status != 200 {
            return Err(PortalError::binding_failed(
                &cluster.name,
                format!("broker returned status {} for admin credentials", response.status),
            ));
        }

        let admin = prepare_admin_kubeconfig(response.body, &endpoint)
            .map_err(|e| PortalError::binding_failed(&cluster.name, e))?;
        let rbac = self
            .rbac
            .connect(admin.kubeconfig)
            .await
            .map_err(|e| PortalError::binding_failed(&cluster.name, e))?;

        let binding_name = user_binding_name(&user.email);
        let existing = rbac
            .list_cluster_role_bindings(&binding_name)
            .await
            .map_err(|e| PortalError::binding_failed(&cluster.name, e))?;

        let created = if existing.is_empty() {
            rbac.create_cluster_role_binding(&cluster_admin_binding(&binding_name, &user.email))
                .await
                .map_err(|e| PortalError::binding_failed(&cluster.name, e))?;
            info!(cluster = %cluster.name, binding = %binding_name, "Cluster role binding created");
            true
        } else {
            debug!(cluster = %cluster.name, binding = %binding_name, "Cluster role binding exists");
            false
        };

        let legacy = legacy_binding_name(&admin.username);
        let legacy_cleanup = match rbac.delete_cluster_role_binding(&legacy).await {
            Ok(true) => {
                info!(cluster = %cluster.name, binding = %legacy, "Removed broker admin binding");
                LegacyCleanup::Removed
            }
            Ok(false) => LegacyCleanup::Absent,
            Err(e) => {
                warn!(
                    cluster = %cluster.name,
                    binding = %legacy,
                    error = %e,
                    "Failed to remove broker admin binding"
                );
                LegacyCleanup::Failed(e.to_string())
            }
        };

        Ok(BindingOutcome {
            binding_name,
            created,
            legacy_cleanup,
        })
    }

    /// Issue an OIDC kubeconfig for a cluster owned by `user`.
    ///
    /// The user's cluster-admin binding is ensured first; if that fails
    /// no kubeconfig is produced.
    pub async fn kubeconfig(
        &self,
        user: &UserIdentity,
        remote_id: &str,
    ) -> PortalResult<KubeconfigDownload> {
        let cluster = ensure_owner(self.repo.get_by_remote_id(remote_id).await, user, remote_id)?;

        if let Err(e) = self.bind_cluster_role(user, &cluster).await {
            error!(cluster = %cluster.name, error = %e, "Error creating cluster role binding");
            return Err(e);
        }

        render_kubeconfig(&cluster, &self.config)
    }
}

enum RefreshOutcome {
    Updated,
    Removed,
}
