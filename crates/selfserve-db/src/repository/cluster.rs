//! SurrealDB implementation of [`ClusterRepository`].

use chrono::{DateTime, Utc};
use selfserve_core::error::PortalResult;
use selfserve_core::models::cluster::{ClusterStatus, CreateCluster, ProvisionedCluster};
use selfserve_core::repository::ClusterRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct ClusterRow {
    name: String,
    remote_id: String,
    owner_id: String,
    plan_name: String,
    last_action: String,
    last_action_state: String,
    last_action_description: String,
    master_host: String,
    master_port: u32,
    master_ip: Option<String>,
    worker_instances: u32,
    k8s_version: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct ClusterRowWithId {
    record_id: String,
    name: String,
    remote_id: String,
    owner_id: String,
    plan_name: String,
    last_action: String,
    last_action_state: String,
    last_action_description: String,
    master_host: String,
    master_port: u32,
    master_ip: Option<String>,
    worker_instances: u32,
    k8s_version: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn row_to_cluster(row: ClusterRow, id: Uuid) -> Result<ProvisionedCluster, DbError> {
    let owner_id = Uuid::parse_str(&row.owner_id)
        .map_err(|e| DbError::Query(format!("invalid owner UUID: {e}")))?;
    let master_port = u16::try_from(row.master_port)
        .map_err(|e| DbError::Query(format!("invalid master port {}: {e}", row.master_port)))?;
    Ok(ProvisionedCluster {
        id,
        name: row.name,
        remote_id: row.remote_id,
        owner_id,
        status: ClusterStatus {
            plan_name: row.plan_name,
            last_action: row.last_action,
            last_action_state: row.last_action_state,
            last_action_description: row.last_action_description,
            master_host: row.master_host,
            master_port,
            master_ip: row.master_ip,
            worker_instances: row.worker_instances,
            k8s_version: row.k8s_version,
        },
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

impl ClusterRowWithId {
    fn try_into_cluster(self) -> Result<ProvisionedCluster, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Query(format!("invalid UUID: {e}")))?;
        row_to_cluster(
            ClusterRow {
                name: self.name,
                remote_id: self.remote_id,
                owner_id: self.owner_id,
                plan_name: self.plan_name,
                last_action: self.last_action,
                last_action_state: self.last_action_state,
                last_action_description: self.last_action_description,
                master_host: self.master_host,
                master_port: self.master_port,
                master_ip: self.master_ip,
                worker_instances: self.worker_instances,
                k8s_version: self.k8s_version,
                created_at: self.created_at,
                updated_at: self.updated_at,
            },
            id,
        )
    }
}

/// SurrealDB implementation of the Cluster repository.
#[derive(Clone)]
pub struct SurrealClusterRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealClusterRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn find_one(
        &self,
        filter: &'static str,
        value: String,
    ) -> Result<ProvisionedCluster, DbError> {
        let query =
            format!("SELECT meta::id(id) AS record_id, * FROM cluster WHERE {filter} = $value");
        let mut result = self.db.query(&query).bind(("value", value.clone())).await?;

        let rows: Vec<ClusterRowWithId> = result.take(0)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "cluster".into(),
            id: format!("{filter}={value}"),
        })?;

        row.try_into_cluster()
    }
}

impl<C: Connection> ClusterRepository for SurrealClusterRepository<C> {
    async fn create(&self, input: CreateCluster) -> PortalResult<ProvisionedCluster> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();
        let status = input.status;

        let result = self
            .db
            .query(
                "CREATE type::record('cluster', $id) SET \
                 name = $name, \
                 remote_id = $remote_id, \
                 owner_id = $owner_id, \
                 plan_name = $plan_name, \
                 last_action = $last_action, \
                 last_action_state = $last_action_state, \
                 last_action_description = $last_action_description, \
                 master_host = $master_host, \
                 master_port = $master_port, \
                 master_ip = $master_ip, \
                 worker_instances = $worker_instances, \
                 k8s_version = $k8s_version",
            )
            .bind(("id", id_str.clone()))
            .bind(("name", input.name.clone()))
            .bind(("remote_id", input.remote_id))
            .bind(("owner_id", input.owner_id.to_string()))
            .bind(("plan_name", status.plan_name))
            .bind(("last_action", status.last_action))
            .bind(("last_action_state", status.last_action_state))
            .bind(("last_action_description", status.last_action_description))
            .bind(("master_host", status.master_host))
            .bind(("master_port", u32::from(status.master_port)))
            .bind(("master_ip", status.master_ip))
            .bind(("worker_instances", status.worker_instances))
            .bind(("k8s_version", status.k8s_version))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_check(e, "cluster", &input.name))?;

        let rows: Vec<ClusterRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "cluster".into(),
            id: id_str,
        })?;

        row_to_cluster(row, id).map_err(Into::into)
    }

    async fn get_by_id(&self, id: Uuid) -> PortalResult<ProvisionedCluster> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('cluster', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ClusterRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "cluster".into(),
            id: id_str,
        })?;

        row_to_cluster(row, id).map_err(Into::into)
    }

    async fn get_by_name(&self, name: &str) -> PortalResult<ProvisionedCluster> {
        Ok(self.find_one("name", name.to_string()).await?)
    }

    async fn get_by_remote_id(&self, remote_id: &str) -> PortalResult<ProvisionedCluster> {
        Ok(self.find_one("remote_id", remote_id.to_string()).await?)
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: ClusterStatus,
    ) -> PortalResult<ProvisionedCluster> {
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "UPDATE type::record('cluster', $id) SET \
                 plan_name = $plan_name, \
                 last_action = $last_action, \
                 last_action_state = $last_action_state, \
                 last_action_description = $last_action_description, \
                 master_host = $master_host, \
                 master_port = $master_port, \
                 master_ip = $master_ip, \
                 worker_instances = $worker_instances, \
                 k8s_version = $k8s_version, \
                 updated_at = time::now()",
            )
            .bind(("id", id_str.clone()))
            .bind(("plan_name", status.plan_name))
            .bind(("last_action", status.last_action))
            .bind(("last_action_state", status.last_action_state))
            .bind(("last_action_description", status.last_action_description))
            .bind(("master_host", status.master_host))
            .bind(("master_port", u32::from(status.master_port)))
            .bind(("master_ip", status.master_ip))
            .bind(("worker_instances", status.worker_instances))
            .bind(("k8s_version", status.k8s_version))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<ClusterRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "cluster".into(),
            id: id_str,
        })?;

        row_to_cluster(row, id).map_err(Into::into)
    }

    async fn delete(&self, id: Uuid) -> PortalResult<()> {
        self.db
            .query("DELETE type::record('cluster', $id)")
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        Ok(())
    }

    async fn list_by_owner(&self, owner_id: Uuid) -> PortalResult<Vec<ProvisionedCluster>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM cluster \
                 WHERE owner_id = $owner_id \
                 ORDER BY name ASC",
            )
            .bind(("owner_id", owner_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ClusterRowWithId> = result.take(0).map_err(DbError::from)?;

        let clusters = rows
            .into_iter()
            .map(|row| row.try_into_cluster())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(clusters)
    }
}
