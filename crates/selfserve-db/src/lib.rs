//! Self-service portal database layer: SurrealDB connection management,
//! schema migrations and the repository implementations for
//! provisioned clusters and organizations.

mod connection;
mod error;
pub mod repository;
mod schema;

pub use connection::{
    DEFAULT_DATABASE, DEFAULT_DB_URL, DEFAULT_NAMESPACE, DEFAULT_PASSWORD, DEFAULT_USERNAME,
    DbConfig, DbManager,
};
pub use error::DbError;
pub use schema::{run_migrations, schema_v1};
