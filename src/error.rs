//! Error types for the lease mutex.

use std::fmt;

use leasesync_store::LeaseStoreError;
use leasesync_time::Cancelled;
use snafu::Snafu;

/// The store round-trip that failed inside a mutex operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LeaseOperation {
    /// Initial creation of the lease record in `lock`.
    Create,
    /// Reading the record in `lock`.
    Get,
    /// Renewal update in `extend`.
    Extend,
    /// Release update in `unlock`.
    Unlock,
}

impl fmt::Display for LeaseOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LeaseOperation::Create => "create",
            LeaseOperation::Get => "get",
            LeaseOperation::Extend => "extend",
            LeaseOperation::Unlock => "unlock",
        };
        f.write_str(name)
    }
}

/// Errors from [`Mutex`](crate::Mutex) operations.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum MutexError {
    /// The lease has no holder, or the record could not be read.
    #[snafu(display("lease '{namespace}/{name}' is not locked"))]
    NotLocked {
        /// Namespace of the lease.
        namespace: String,
        /// Name of the lease.
        name: String,
    },

    /// The lease is held by a different identity.
    #[snafu(display("lease '{namespace}/{name}' is locked by '{holder}'"))]
    LockedByAnother {
        /// Namespace of the lease.
        namespace: String,
        /// Name of the lease.
        name: String,
        /// Identity of the current holder.
        holder: String,
    },

    /// A held record lacks the fields needed to compute its expiration.
    #[snafu(display("lease '{namespace}/{name}' is malformed: {reason}"))]
    MalformedRecord {
        /// Namespace of the lease.
        namespace: String,
        /// Name of the lease.
        name: String,
        /// Which field is missing.
        reason: String,
    },

    /// A lease-store call failed.
    #[snafu(display("{operation}: error when trying to {operation} lease '{namespace}/{name}': {source}"))]
    Store {
        /// The failing step.
        operation: LeaseOperation,
        /// Namespace of the lease.
        namespace: String,
        /// Name of the lease.
        name: String,
        /// The underlying store error.
        source: LeaseStoreError,
    },

    /// The caller's cancellation token fired.
    #[snafu(display("operation cancelled"))]
    Cancelled,
}

impl MutexError {
    pub fn is_not_locked(&self) -> bool {
        matches!(self, MutexError::NotLocked { .. })
    }

    pub fn is_locked_by_another(&self) -> bool {
        matches!(self, MutexError::LockedByAnother { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, MutexError::Cancelled)
    }

    /// The failing store step, if this is a store error.
    pub fn operation(&self) -> Option<LeaseOperation> {
        match self {
            MutexError::Store { operation, .. } => Some(*operation),
            _ => None,
        }
    }
}

impl From<Cancelled> for MutexError {
    fn from(_: Cancelled) -> Self {
        MutexError::Cancelled
    }
}

/// Errors from loading a [`MutexConfig`](crate::MutexConfig).
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ConfigError {
    /// A configuration value is invalid.
    #[snafu(display("invalid configuration for {key}: '{value}' ({reason})"))]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    /// The TOML document could not be parsed.
    #[snafu(display("failed to parse configuration: {source}"))]
    Parse { source: toml::de::Error },
}
