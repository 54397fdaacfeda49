//! Domain models for the portal.
//!
//! These are the core types shared across all crates.

pub mod cluster;
pub mod organization;
pub mod user;
