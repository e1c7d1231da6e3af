//! Repository layer for owner persistence.
//!
//! # Responsibility
//! - Define the owner data access contract.
//! - Isolate SQLite query details from callers.

pub mod owner_repo;
