//! SurrealDB repository implementations.

mod cluster;
mod organization;

pub use cluster::SurrealClusterRepository;
pub use organization::SurrealOrganizationRepository;
