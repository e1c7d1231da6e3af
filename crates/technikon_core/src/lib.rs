//! Core data access for Technikon property owners.
//! This crate owns the `owners` store and its soft-delete conventions.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;

pub use logging::{default_log_level, init_logging, logging_status};
pub use model::owner::{Owner, OwnerId, OwnerValidationError};
pub use repo::owner_repo::{OwnerRepository, RepoError, RepoResult, SqliteOwnerRepository};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
