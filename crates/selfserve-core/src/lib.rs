//! Self-service portal core: domain models, repository traits, ownership
//! checks and the error taxonomy shared by every other crate.

pub mod access;
pub mod error;
pub mod models;
pub mod repository;

pub use error::{PortalError, PortalResult};
