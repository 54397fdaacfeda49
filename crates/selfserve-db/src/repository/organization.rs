//! SurrealDB implementation of [`OrganizationRepository`].

use chrono::{DateTime, Utc};
use selfserve_core::error::PortalResult;
use selfserve_core::models::organization::{CreateOrganization, ProvisionedOrganization};
use selfserve_core::repository::OrganizationRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct OrganizationRow {
    name: String,
    remote_id: String,
    owner_id: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct OrganizationRowWithId {
    record_id: String,
    name: String,
    remote_id: String,
    owner_id: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn row_to_organization(
    row: OrganizationRow,
    id: Uuid,
) -> Result<ProvisionedOrganization, DbError> {
    let owner_id = Uuid::parse_str(&row.owner_id)
        .map_err(|e| DbError::Query(format!("invalid owner UUID: {e}")))?;
    Ok(ProvisionedOrganization {
        id,
        name: row.name,
        remote_id: row.remote_id,
        owner_id,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

impl OrganizationRowWithId {
    fn try_into_organization(self) -> Result<ProvisionedOrganization, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Query(format!("invalid UUID: {e}")))?;
        let owner_id = Uuid::parse_str(&self.owner_id)
            .map_err(|e| DbError::Query(format!("invalid owner UUID: {e}")))?;
        Ok(ProvisionedOrganization {
            id,
            name: self.name,
            remote_id: self.remote_id,
            owner_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// SurrealDB implementation of the Organization repository.
#[derive(Clone)]
pub struct SurrealOrganizationRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealOrganizationRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> OrganizationRepository for SurrealOrganizationRepository<C> {
    async fn create(&self, input: CreateOrganization) -> PortalResult<ProvisionedOrganization> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('organization', $id) SET \
                 name = $name, remote_id = $remote_id, owner_id = $owner_id",
            )
            .bind(("id", id_str.clone()))
            .bind(("name", input.name))
            .bind(("remote_id", input.remote_id.clone()))
            .bind(("owner_id", input.owner_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_check(e, "organization", &input.remote_id))?;

        let rows: Vec<OrganizationRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "organization".into(),
            id: id_str,
        })?;

        row_to_organization(row, id).map_err(Into::into)
    }

    async fn get_by_id(&self, id: Uuid) -> PortalResult<ProvisionedOrganization> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('organization', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<OrganizationRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "organization".into(),
            id: id_str,
        })?;

        row_to_organization(row, id).map_err(Into::into)
    }

    async fn get_by_remote_id(&self, remote_id: &str) -> PortalResult<ProvisionedOrganization> {
        let remote_id_owned = remote_id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM organization WHERE remote_id = $remote_id",
            )
            .bind(("remote_id", remote_id_owned))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<OrganizationRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "organization".into(),
            id: format!("remote_id={remote_id}"),
        })?;

        Ok(row.try_into_organization()?)
    }

    async fn delete(&self, id: Uuid) -> PortalResult<()> {
        self.db
            .query("DELETE type::record('organization', $id)")
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        Ok(())
    }

    async fn list_by_owner(&self, owner_id: Uuid) -> PortalResult<Vec<ProvisionedOrganization>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM organization \
                 WHERE owner_id = $owner_id \
                 ORDER BY name ASC",
            )
            .bind(("owner_id", owner_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<OrganizationRowWithId> = result.take(0).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(|row| row.try_into_organization())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(items)
    }
}
