//! Domain model for property owners.
//!
//! # Responsibility
//! - Define the owner record shared by repository and callers.
//! - Keep soft-delete state on the record itself.
//!
//! # Invariants
//! - `owner_id` is assigned by the store and never changes afterwards.
//! - Deletion is a flag first; hard removal is an explicit repository call.

pub mod owner;
