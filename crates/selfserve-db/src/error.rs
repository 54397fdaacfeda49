//! Database-specific error types and conversions.

use selfserve_core::error::PortalError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Unique constraint violated on {entity}: {value}")]
    Duplicate { entity: String, value: String },
}

impl DbError {
    /// Classify an error returned by `Response::check()`.
    ///
    /// SurrealDB reports unique index violations as "Database index
    /// `...` already contains ...".
    pub(crate) fn from_check(err: surrealdb::Error, entity: &str, value: &str) -> Self {
        let message = err.to_string();
        if message.contains("already contains") {
            DbError::Duplicate {
                entity: entity.into(),
                value: value.into(),
            }
        } else {
            DbError::Query(message)
        }
    }
}

impl From<DbError> for PortalError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => PortalError::NotFound { entity, id },
            DbError::Duplicate { entity, value } => PortalError::AlreadyExists {
                entity,
                name: value,
            },
            other => PortalError::Database(other.to_string()),
        }
    }
}
