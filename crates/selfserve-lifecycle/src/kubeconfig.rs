//! Kubeconfig documents: the admin kubeconfig fetched from the broker and
//! the OIDC kubeconfig handed to users.

use kube::config::Kubeconfig;
use serde_json::Value;
use selfserve_core::error::{PortalError, PortalResult};
use selfserve_core::models::cluster::ProvisionedCluster;

use crate::config::ClusterConfig;

pub const KUBECONFIG_FILENAME: &str = "kubeconfig";
pub const KUBECONFIG_CONTENT_TYPE: &str = "text/plain; charset=utf8";

/// A kubeconfig ready to be served as a file download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KubeconfigDownload {
    pub filename: &'static str,
    pub content_type: &'static str,
    pub content: String,
}

impl KubeconfigDownload {
    /// Value for a `Content-Disposition` header.
    pub fn content_disposition(&self) -> String {
        format!("attachment; filename=\"{}\"", self.filename)
    }
}

/// Name of the ClusterRoleBinding granting `email` cluster-admin.
pub fn user_binding_name(email: &str) -> String {
    format!("{}-cluster-admin", email.replace('@', "__"))
}

/// Name of the binding the broker creates for its own admin user.
pub fn legacy_binding_name(kubeconfig_user: &str) -> String {
    format!("pks:{kubeconfig_user}-cluster-admin")
}

/// Admin kubeconfig pointed at the master IP instead of its DNS name.
#[derive(Debug, Clone)]
pub struct AdminKubeconfig {
    pub kubeconfig: Kubeconfig,
    /// Name of the first user entry, as issued by the broker.
    pub username: String,
}

/// Rewrite the broker's admin kubeconfig so it addresses `server`
/// directly, and pull out the broker's user name.
pub fn prepare_admin_kubeconfig(mut document: Value, server: &str) -> Result<AdminKubeconfig, String> {
    let cluster = document
        .pointer_mut("/clusters/0/cluster")
        .and_then(Value::as_object_mut)
        .ok_or("kubeconfig has no cluster entry")?;
    cluster.insert("server".into(), Value::String(server.to_string()));

    let username = document
        .pointer("/users/0/name")
        .and_then(Value::as_str)
        .ok_or("kubeconfig has no user entry")?
        .to_string();

    let kubeconfig: Kubeconfig =
        serde_json::from_value(document).map_err(|e| format!("malformed kubeconfig: {e}"))?;

    Ok(AdminKubeconfig {
        kubeconfig,
        username,
    })
}

/// Render the OIDC kubeconfig for `cluster`.
///
/// Fails with `BindingFailed` while the broker has not reported a master
/// IP yet, since there is no address to put in `server`.
pub fn render_kubeconfig(
    cluster: &ProvisionedCluster,
    config: &ClusterConfig,
) -> PortalResult<KubeconfigDownload> {
    let master_ip = cluster.status.master_ip.as_deref().ok_or_else(|| {
        PortalError::binding_failed(&cluster.name, "cluster has no master IP yet")
    })?;

    let content = format!(
        "\
apiVersion: v1
clusters:
- cluster:
    certificate-authority-data: {ca}
    server: https://{ip}:{port}
  name: {name}
contexts:
- context:
    cluster: {name}
    user: oidc
  name: {name}
current-context: {name}
kind: Config
users:
- name: oidc
  user:
    exec:
      apiVersion: client.authentication.k8s.io/v1beta1
      args:
      - oidc-login
      - get-token
      - --oidc-issuer-url={issuer}
      - --oidc-client-id={client_id}
      command: kubectl
      env: null
",
        ca = config.ca_cert,
        ip = master_ip,
        port = cluster.status.master_port,
        name = cluster.name,
        issuer = config.oidc_issuer_url,
        client_id = config.oidc_client_id,
    );

    Ok(KubeconfigDownload {
        filename: KUBECONFIG_FILENAME,
        content_type: KUBECONFIG_CONTENT_TYPE,
        content,
    })
}
