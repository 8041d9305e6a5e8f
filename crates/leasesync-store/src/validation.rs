//! Name validation for lease records.
//!
//! Lease names and namespaces follow DNS-1123 subdomain rules, the same
//! constraint control-plane backends enforce on object names.

use crate::LeaseStoreError;
use crate::types::Lease;

/// Maximum length of a lease name or namespace in bytes.
pub const MAX_NAME_LENGTH: usize = 253;

/// Validate a DNS-1123 subdomain name.
pub fn validate_name(value: &str) -> Result<(), LeaseStoreError> {
    let invalid = |reason: &str| LeaseStoreError::InvalidName {
        value: value.to_string(),
        reason: reason.to_string(),
    };

    if value.is_empty() {
        return Err(invalid("must not be empty"));
    }
    if value.len() > MAX_NAME_LENGTH {
        return Err(invalid("must be no more than 253 characters"));
    }
    if !value.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-' || b == b'.') {
        return Err(invalid("must consist of lower case alphanumeric characters, '-' or '.'"));
    }

    let starts_ok = value.bytes().next().is_some_and(|b| b.is_ascii_alphanumeric());
    let ends_ok = value.bytes().last().is_some_and(|b| b.is_ascii_alphanumeric());
    if !starts_ok || !ends_ok {
        return Err(invalid("must start and end with an alphanumeric character"));
    }

    Ok(())
}

/// Validate both the namespace and name of a lease record.
pub fn validate_lease(lease: &Lease) -> Result<(), LeaseStoreError> {
    validate_name(lease.namespace())?;
    validate_name(lease.name())
}
