//! The lease-store contract consumed by the lock protocol.

use async_trait::async_trait;

use crate::error::LeaseStoreError;
use crate::types::Lease;

/// Strongly-consistent store of lease records with optimistic concurrency.
///
/// Implementations must guarantee that `update` is rejected with
/// [`LeaseStoreError::Conflict`] whenever the submitted
/// `meta.resource_version` differs from the stored one. Mutual exclusion of
/// the lock protocol rests entirely on that compare-and-swap.
#[async_trait]
pub trait LeaseStore: Send + Sync {
    /// Persist a new record.
    ///
    /// Fails with [`LeaseStoreError::AlreadyExists`] if a record with the same
    /// namespace and name is present. Returns the stored record with its
    /// assigned version.
    async fn create(&self, lease: Lease) -> Result<Lease, LeaseStoreError>;

    /// Fetch the current record, including its version marker.
    async fn get(&self, namespace: &str, name: &str) -> Result<Lease, LeaseStoreError>;

    /// Replace a record if its version marker is still current.
    async fn update(&self, lease: Lease) -> Result<Lease, LeaseStoreError>;
}

// Blanket implementation for Arc<T>
#[async_trait]
impl<T: LeaseStore + ?Sized> LeaseStore for std::sync::Arc<T> {
    async fn create(&self, lease: Lease) -> Result<Lease, LeaseStoreError> {
        (**self).create(lease).await
    }

    async fn get(&self, namespace: &str, name: &str) -> Result<Lease, LeaseStoreError> {
        (**self).get(namespace, name).await
    }

    async fn update(&self, lease: Lease) -> Result<Lease, LeaseStoreError> {
        (**self).update(lease).await
    }
}
