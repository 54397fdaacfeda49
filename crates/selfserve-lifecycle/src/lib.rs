//! Self-service portal lifecycle orchestration.
//!
//! The managers here drive the upstream platforms on behalf of a user and
//! keep the local records in step with what the platforms report.

pub mod cluster;
pub mod config;
pub mod kubeconfig;
pub mod organization;

pub use cluster::{BindingOutcome, ClusterManager, LegacyCleanup, RefreshFailure, RefreshReport};
pub use config::{ClusterConfig, OrganizationConfig};
pub use kubeconfig::KubeconfigDownload;
pub use organization::{
    OrganizationCreated, OrganizationListing, OrganizationManager, ProvisioningWarning,
};
