//! Schema definitions and migration runner for SurrealDB.
//!
//! Tables are SCHEMAFULL. UUIDs are stored as strings. Cluster names
//! are unique across the whole store, which is what keeps two
//! concurrent creates of the same cluster from both persisting.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "initial_schema",
    sql: SCHEMA_V1,
}];

// -----------------------------------------------------------------------
// Schema v1
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Provisioned clusters
-- =======================================================================
DEFINE TABLE cluster SCHEMAFULL;
DEFINE FIELD name ON TABLE cluster TYPE string;
DEFINE FIELD remote_id ON TABLE cluster TYPE string;
DEFINE FIELD owner_id ON TABLE cluster TYPE string;
DEFINE FIELD plan_name ON TABLE cluster TYPE string;
DEFINE FIELD last_action ON TABLE cluster TYPE string;
DEFINE FIELD last_action_state ON TABLE cluster TYPE string;
DEFINE FIELD last_action_description ON TABLE cluster TYPE string;
DEFINE FIELD master_host ON TABLE cluster TYPE string;
DEFINE FIELD master_port ON TABLE cluster TYPE int;
DEFINE FIELD master_ip ON TABLE cluster TYPE option<string>;
DEFINE FIELD worker_instances ON TABLE cluster TYPE int;
DEFINE FIELD k8s_version ON TABLE cluster TYPE string;
DEFINE FIELD created_at ON TABLE cluster TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE cluster TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_cluster_name ON TABLE cluster COLUMNS name UNIQUE;
DEFINE INDEX idx_cluster_remote_id ON TABLE cluster COLUMNS remote_id;
DEFINE INDEX idx_cluster_owner ON TABLE cluster COLUMNS owner_id;

-- =======================================================================
-- Provisioned organizations
-- =======================================================================
DEFINE TABLE organization SCHEMAFULL;
DEFINE FIELD name ON TABLE organization TYPE string;
DEFINE FIELD remote_id ON TABLE organization TYPE string;
DEFINE FIELD owner_id ON TABLE organization TYPE string;
DEFINE FIELD created_at ON TABLE organization TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE organization TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_organization_remote_id ON TABLE organization \
    COLUMNS remote_id UNIQUE;
DEFINE INDEX idx_organization_owner ON TABLE organization \
    COLUMNS owner_id;
";

/// Apply all pending migrations.
///
/// Creates a `_migration` tracking table on first run, then applies
/// each migration whose version exceeds the current maximum.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    let mut result = db
        .query("SELECT version FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    let current_version = records.first().map(|m| m.version).unwrap_or(0);

    for migration in MIGRATIONS {
        if migration.version <= current_version {
            continue;
        }

        info!(
            version = migration.version,
            name = migration.name,
            "Applying migration"
        );
        db.query(migration.sql).await?.check().map_err(|e| {
            DbError::Migration(format!(
                "Migration v{} '{}' failed: {}",
                migration.version, migration.name, e,
            ))
        })?;

        db.query("CREATE _migration SET version = $version, name = $name")
            .bind(("version", migration.version))
            .bind(("name", migration.name))
            .await?
            .check()
            .map_err(|e| {
                DbError::Migration(format!(
                    "Failed to record migration v{}: {}",
                    migration.version, e,
                ))
            })?;
    }

    Ok(())
}

/// Returns the raw schema DDL for version 1.
pub fn schema_v1() -> &'static str {
    SCHEMA_V1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_ordered() {
        for window in MIGRATIONS.windows(2) {
            assert!(
                window[0].version < window[1].version,
                "Migrations must be in ascending version order"
            );
        }
    }

    #[test]
    fn cluster_name_is_unique() {
        assert!(SCHEMA_V1.contains("idx_cluster_name ON TABLE cluster COLUMNS name UNIQUE"));
    }
}
