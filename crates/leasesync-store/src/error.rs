//! Errors reported by lease stores.

use thiserror::Error;

/// Failure of a single lease-store operation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LeaseStoreError {
    /// `create` found an existing record with the same name.
    #[error("lease '{namespace}/{name}' already exists")]
    AlreadyExists { namespace: String, name: String },

    /// The record does not exist.
    #[error("lease '{namespace}/{name}' not found")]
    NotFound { namespace: String, name: String },

    /// `update` carried a stale version marker.
    #[error("lease '{namespace}/{name}' was modified concurrently: expected version {expected}, found {actual}")]
    Conflict {
        namespace: String,
        name: String,
        expected: u64,
        actual: u64,
    },

    /// A name or namespace failed validation.
    #[error("invalid name '{value}': {reason}")]
    InvalidName { value: String, reason: String },

    /// Any other backend failure (transport, permissions, serialization).
    #[error("operation failed: {reason}")]
    Failed { reason: String },
}

impl LeaseStoreError {
    pub fn is_already_exists(&self) -> bool {
        matches!(self, LeaseStoreError::AlreadyExists { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, LeaseStoreError::NotFound { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, LeaseStoreError::Conflict { .. })
    }
}
