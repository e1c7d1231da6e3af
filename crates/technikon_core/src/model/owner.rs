//! Owner domain model.
//!
//! # Responsibility
//! - Define the canonical owner record persisted in `owners`.
//! - Provide lifecycle helpers for soft-delete semantics.
//!
//! # Invariants
//! - `owner_id` is `None` until the store assigns one on insert.
//! - `deleted_owner` is the source of truth for tombstone state.
//! - `vat_number` is positive and `email` is not blank.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Store-assigned owner identifier (`owners.owner_id`).
pub type OwnerId = i64;

/// Validation failures for owner records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OwnerValidationError {
    /// VAT numbers are positive business identifiers.
    NonPositiveVatNumber(i64),
    /// Email must contain at least one non-whitespace character.
    EmptyEmail,
}

impl Display for OwnerValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NonPositiveVatNumber(value) => {
                write!(f, "vat_number must be positive, got {value}")
            }
            Self::EmptyEmail => write!(f, "email cannot be empty"),
        }
    }
}

impl Error for OwnerValidationError {}

/// Property owner record.
///
/// Uniqueness of `vat_number` and `email` among active owners is expected
/// by callers but not enforced here or by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    /// Assigned on first save; immutable afterwards.
    pub owner_id: Option<OwnerId>,
    pub vat_number: i64,
    pub email: String,
    pub address: String,
    /// Stored as given. Never serialized.
    #[serde(skip_serializing, default)]
    pub password: String,
    /// Soft delete tombstone.
    #[serde(default)]
    pub deleted_owner: bool,
}

impl Owner {
    /// Creates an unsaved, active owner.
    pub fn new(
        vat_number: i64,
        email: impl Into<String>,
        address: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            owner_id: None,
            vat_number,
            email: email.into(),
            address: address.into(),
            password: password.into(),
            deleted_owner: false,
        }
    }

    /// Checks field-level invariants.
    ///
    /// # Errors
    /// - `NonPositiveVatNumber` when `vat_number <= 0`.
    /// - `EmptyEmail` when `email` is blank.
    pub fn validate(&self) -> Result<(), OwnerValidationError> {
        if self.vat_number <= 0 {
            return Err(OwnerValidationError::NonPositiveVatNumber(self.vat_number));
        }
        if self.email.trim().is_empty() {
            return Err(OwnerValidationError::EmptyEmail);
        }
        Ok(())
    }

    /// Marks this owner as softly deleted.
    pub fn soft_delete(&mut self) {
        self.deleted_owner = true;
    }

    /// Returns whether this owner is visible to filtered lookups.
    pub fn is_active(&self) -> bool {
        !self.deleted_owner
    }
}
