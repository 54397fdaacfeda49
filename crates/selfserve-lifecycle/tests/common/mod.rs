//! Shared fixtures for lifecycle tests: in-memory SurrealDB, a scripted
//! upstream platform and an in-process target cluster.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use k8s_openapi::api::rbac::v1::ClusterRoleBinding;
use kube::config::Kubeconfig;
use selfserve_core::models::cluster::{ClusterStatus, CreateCluster};
use selfserve_core::models::user::UserIdentity;
use selfserve_core::repository::ClusterRepository;
use selfserve_db::repository::{SurrealClusterRepository, SurrealOrganizationRepository};
use selfserve_lifecycle::{ClusterConfig, OrganizationConfig};
use selfserve_upstream::{
    AccessToken, Method, RbacClient, RbacConnector, UpstreamApi, UpstreamError, UpstreamRequest,
    UpstreamResponse,
};
use serde_json::{Value, json};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};

pub const BROKER_API: &str = "https://api.pks.example.com:9021";
pub const SYS_DOMAIN: &str = "sys.example.com";

pub async fn setup_db() -> Surreal<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    selfserve_db::run_migrations(&db).await.unwrap();
    db
}

pub async fn cluster_repo() -> SurrealClusterRepository<Db> {
    SurrealClusterRepository::new(setup_db().await)
}

pub async fn organization_repo() -> SurrealOrganizationRepository<Db> {
    SurrealOrganizationRepository::new(setup_db().await)
}

pub fn alice() -> UserIdentity {
    UserIdentity::from_email("alice@example.com")
}

pub fn bob() -> UserIdentity {
    UserIdentity::from_email("bob@example.com")
}

pub fn cluster_config() -> ClusterConfig {
    ClusterConfig {
        api_url: BROKER_API.into(),
        base_domain: "k8s.example.com".into(),
        ca_cert: "LS0tQ0E=".into(),
        oidc_issuer_url: "https://login.example.com".into(),
        oidc_client_id: "k8s".into(),
        ..Default::default()
    }
}

pub fn organization_config() -> OrganizationConfig {
    OrganizationConfig {
        sys_domain: SYS_DOMAIN.into(),
        origin: "sso".into(),
    }
}

pub fn ready_status(name: &str, master_ip: Option<&str>) -> ClusterStatus {
    ClusterStatus {
        plan_name: "small".into(),
        last_action: "CREATE".into(),
        last_action_state: "succeeded".into(),
        last_action_description: "Instance provisioning completed".into(),
        master_host: format!("{name}.k8s.example.com"),
        master_port: 8443,
        master_ip: master_ip.map(String::from),
        worker_instances: 1,
        k8s_version: "1.18".into(),
    }
}

/// Insert a cluster record directly, bypassing the broker.
pub async fn seed_cluster<R: ClusterRepository>(
    repo: &R,
    owner: &UserIdentity,
    name: &str,
    remote_id: &str,
    master_ip: Option<&str>,
) {
    repo.create(CreateCluster {
        name: name.into(),
        remote_id: remote_id.into(),
        owner_id: owner.id,
        status: ready_status(name, master_ip),
    })
    .await
    .unwrap();
}

/// Broker document for a cluster.
pub fn broker_cluster(name: &str, uuid: &str, state: &str, ips: &[&str]) -> Value {
    json!({
        "name": name,
        "plan_name": "small",
        "last_action": "CREATE",
        "last_action_state": state,
        "last_action_description": format!("Instance provisioning {state}"),
        "uuid": uuid,
        "kubernetes_master_ips": ips,
        "parameters": {
            "kubernetes_master_host": format!("{name}.k8s.example.com"),
            "kubernetes_master_port": 8443,
            "kubernetes_worker_instances": 3
        },
        "k8s_version": "1.18"
    })
}

/// Admin kubeconfig as the broker's `binds/admin` endpoint returns it.
pub fn admin_kubeconfig(name: &str) -> Value {
    json!({
        "apiVersion": "v1",
        "kind": "Config",
        "clusters": [{
            "name": name,
            "cluster": {"server": format!("https://{name}.k8s.example.com:8443")}
        }],
        "users": [{"name": "broker-admin", "user": {"token": "admin-token"}}],
        "contexts": [{"name": name, "context": {"cluster": name, "user": "broker-admin"}}],
        "current-context": name
    })
}

enum Scripted {
    Reply(UpstreamResponse),
    Timeout,
}

#[derive(Default)]
struct ScriptState {
    replies: HashMap<(Method, String), VecDeque<Scripted>>,
    calls: Vec<UpstreamRequest>,
    authentications: usize,
    reject_auth: bool,
}

/// Upstream platform answering from a script.
///
/// Replies are queued per method and URL; the last queued reply for a
/// route repeats. Unscripted routes fail as unreachable.
#[derive(Clone, Default)]
pub struct ScriptedUpstream {
    state: Arc<Mutex<ScriptState>>,
}

impl ScriptedUpstream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(&self, method: Method, url: impl Into<String>, status: u16, body: Value) -> &Self {
        self.push(method, url.into(), Scripted::Reply(UpstreamResponse::new(status, body)));
        self
    }

    pub fn time_out(&self, method: Method, url: impl Into<String>) -> &Self {
        self.push(method, url.into(), Scripted::Timeout);
        self
    }

    pub fn reject_auth(&self) {
        self.state.lock().unwrap().reject_auth = true;
    }

    fn push(&self, method: Method, url: String, reply: Scripted) {
        self.state
            .lock()
            .unwrap()
            .replies
            .entry((method, url))
            .or_default()
            .push_back(reply);
    }

    pub fn calls(&self) -> Vec<UpstreamRequest> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn calls_to(&self, method: Method, url: &str) -> Vec<UpstreamRequest> {
        self.calls()
            .into_iter()
            .filter(|c| c.method == method && c.url == url)
            .collect()
    }

    pub fn authentications(&self) -> usize {
        self.state.lock().unwrap().authentications
    }
}

#[async_trait]
impl UpstreamApi for ScriptedUpstream {
    async fn authenticate(&self) -> Result<AccessToken, UpstreamError> {
        let mut state = self.state.lock().unwrap();
        state.authentications += 1;
        if state.reject_auth {
            return Err(UpstreamError::auth("scripted", "status 401"));
        }
        Ok(AccessToken::new("scripted-token", Utc::now() + Duration::hours(1)))
    }

    async fn send(
        &self,
        _token: &AccessToken,
        request: UpstreamRequest,
    ) -> Result<UpstreamResponse, UpstreamError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(request.clone());

        let key = (request.method.clone(), request.url.clone());
        let queue = state.replies.get_mut(&key);
        let reply = match queue {
            Some(q) if q.len() > 1 => q.pop_front(),
            Some(q) => q.front().map(|r| match r {
                Scripted::Reply(resp) => Scripted::Reply(resp.clone()),
                Scripted::Timeout => Scripted::Timeout,
            }),
            None => None,
        };

        match reply {
            Some(Scripted::Reply(response)) => Ok(response),
            Some(Scripted::Timeout) => Err(UpstreamError::Timeout { url: request.url }),
            None => Err(UpstreamError::Unavailable {
                url: request.url,
                reason: "connection refused".into(),
            }),
        }
    }
}

#[derive(Default)]
struct ClusterState {
    bindings: BTreeMap<String, ClusterRoleBinding>,
    servers: Vec<String>,
    refuse_connect: bool,
}

/// In-process target cluster holding ClusterRoleBindings.
#[derive(Clone, Default)]
pub struct FakeCluster {
    state: Arc<Mutex<ClusterState>>,
}

impl FakeCluster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_binding(&self, binding: ClusterRoleBinding) {
        let name = binding.metadata.name.clone().unwrap_or_default();
        self.state.lock().unwrap().bindings.insert(name, binding);
    }

    pub fn refuse_connections(&self) {
        self.state.lock().unwrap().refuse_connect = true;
    }

    pub fn binding_names(&self) -> Vec<String> {
        self.state.lock().unwrap().bindings.keys().cloned().collect()
    }

    pub fn binding(&self, name: &str) -> Option<ClusterRoleBinding> {
        self.state.lock().unwrap().bindings.get(name).cloned()
    }

    /// Servers the portal connected to, in order.
    pub fn servers(&self) -> Vec<String> {
        self.state.lock().unwrap().servers.clone()
    }
}

#[async_trait]
impl RbacConnector for FakeCluster {
    async fn connect(&self, kubeconfig: Kubeconfig) -> Result<Box<dyn RbacClient>, UpstreamError> {
        let mut state = self.state.lock().unwrap();
        if state.refuse_connect {
            return Err(UpstreamError::Cluster("connection refused".into()));
        }
        let server = kubeconfig
            .clusters
            .first()
            .and_then(|c| c.cluster.as_ref())
            .and_then(|c| c.server.clone())
            .unwrap_or_default();
        state.servers.push(server);
        Ok(Box::new(self.clone()))
    }
}

#[async_trait]
impl RbacClient for FakeCluster {
    async fn list_cluster_role_bindings(
        &self,
        name: &str,
    ) -> Result<Vec<ClusterRoleBinding>, UpstreamError> {
        Ok(self.binding(name).into_iter().collect())
    }

    async fn create_cluster_role_binding(
        &self,
        binding: &ClusterRoleBinding,
    ) -> Result<(), UpstreamError> {
        let name = binding.metadata.name.clone().unwrap_or_default();
        let mut state = self.state.lock().unwrap();
        if state.bindings.contains_key(&name) {
            return Err(UpstreamError::Cluster(format!(
                "clusterrolebindings \"{name}\" already exists"
            )));
        }
        state.bindings.insert(name, binding.clone());
        Ok(())
    }

    async fn delete_cluster_role_binding(&self, name: &str) -> Result<bool, UpstreamError> {
        Ok(self.state.lock().unwrap().bindings.remove(name).is_some())
    }
}
