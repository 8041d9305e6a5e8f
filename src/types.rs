//! Shared types for the lease mutex.

use serde::Deserialize;
use serde::Serialize;

/// Fencing token returned on successful lock acquisition.
///
/// The value is the lease's transition count after the claim, so tokens issued
/// for the same lease strictly increase. Include it in operations protected by
/// the lock so downstream services can reject a holder whose lease expired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FencingToken(pub u64);

impl FencingToken {
    /// Create a new fencing token.
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Token for a lease whose transition count is `transitions`.
    ///
    /// Negative counts, which a well-formed record never carries, map to zero.
    pub fn from_transitions(transitions: i32) -> Self {
        Self(u64::try_from(transitions).unwrap_or_default())
    }

    /// Get the raw token value.
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for FencingToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "FencingToken({})", self.0)
    }
}
