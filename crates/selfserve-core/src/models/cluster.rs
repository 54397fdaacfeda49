//! Provisioned cluster domain model.
//!
//! A cluster record is a local cache of what the cluster broker reports.
//! The broker is authoritative: refresh overwrites every mirrored field,
//! and a "not found" answer removes the record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum length of a cluster name.
pub const CLUSTER_NAME_MAX_LEN: usize = 32;

/// Status fields copied verbatim from the broker's cluster document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterStatus {
    pub plan_name: String,
    pub last_action: String,
    pub last_action_state: String,
    pub last_action_description: String,
    pub master_host: String,
    pub master_port: u16,
    /// First master IP; the broker only reports it once the control
    /// plane exists.
    pub master_ip: Option<String>,
    pub worker_instances: u32,
    pub k8s_version: String,
}

/// A Kubernetes cluster provisioned on behalf of one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisionedCluster {
    pub id: Uuid,
    /// User-chosen slug, unique across all clusters.
    pub name: String,
    /// Identifier assigned by the broker.
    pub remote_id: String,
    pub owner_id: Uuid,
    pub status: ClusterStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProvisionedCluster {
    /// `https://{ip}:{port}` of the control plane, if the IP is known.
    pub fn master_endpoint(&self) -> Option<String> {
        self.status
            .master_ip
            .as_ref()
            .map(|ip| format!("https://{}:{}", ip, self.status.master_port))
    }
}

/// Fields required to create a new cluster record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCluster {
    pub name: String,
    pub remote_id: String,
    pub owner_id: Uuid,
    pub status: ClusterStatus,
}

/// Check that `name` is a slug the broker and DNS will both accept.
pub fn validate_cluster_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("cluster name must not be empty".into());
    }
    if name.len() > CLUSTER_NAME_MAX_LEN {
        return Err(format!(
            "cluster name must be at most {CLUSTER_NAME_MAX_LEN} characters"
        ));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err("cluster name may only contain letters, digits, '-' and '_'".into());
    }
    Ok(())
}
