//! Self-service portal upstream access: client-credentials token
//! exchange, the authenticated HTTP client used against the cluster
//! broker and organization platform, and ClusterRoleBinding management
//! on provisioned clusters.

pub mod client;
pub mod config;
pub mod error;
pub mod rbac;
pub mod tls;
pub mod token;

pub use client::{HttpUpstream, UpstreamApi, UpstreamRequest, UpstreamResponse};
pub use reqwest::Method;
pub use config::{ClientCredentials, UpstreamConfig};
pub use error::UpstreamError;
pub use rbac::{KubeRbacConnector, RbacClient, RbacConnector};
pub use tls::install_crypto_provider;
pub use token::AccessToken;
