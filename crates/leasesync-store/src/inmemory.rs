//! Deterministic in-memory lease store for testing.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::trace;

use crate::error::LeaseStoreError;
use crate::traits::LeaseStore;
use crate::types::Lease;
use crate::validation::validate_lease;
use crate::validation::validate_name;

/// Store operation, used to target injected failures and read call counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    Create,
    Get,
    Update,
}

impl fmt::Display for StoreOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreOperation::Create => write!(f, "create"),
            StoreOperation::Get => write!(f, "get"),
            StoreOperation::Update => write!(f, "update"),
        }
    }
}

#[derive(Default)]
struct StoreState {
    leases: BTreeMap<(String, String), Lease>,
    revision: u64,
    failures: HashMap<StoreOperation, VecDeque<LeaseStoreError>>,
    counts: HashMap<StoreOperation, u64>,
}

impl StoreState {
    /// Count the call and pop an injected failure, if one is queued.
    fn begin(&mut self, op: StoreOperation) -> Result<(), LeaseStoreError> {
        *self.counts.entry(op).or_default() += 1;
        match self.failures.get_mut(&op).and_then(VecDeque::pop_front) {
            Some(err) => {
                trace!(operation = %op, error = %err, "returning injected failure");
                Err(err)
            }
            None => Ok(()),
        }
    }

    fn next_revision(&mut self) -> u64 {
        self.revision = self.revision.saturating_add(1);
        self.revision
    }

    fn write(&mut self, mut lease: Lease) -> Lease {
        lease.meta.resource_version = self.next_revision();
        let key = (lease.meta.namespace.clone(), lease.meta.name.clone());
        self.leases.insert(key, lease.clone());
        lease
    }
}

/// A deterministic in-memory [`LeaseStore`].
///
/// Every write assigns a fresh, strictly increasing `resource_version`, and
/// `update` performs an exact version compare-and-swap. Failures can be queued
/// per operation with [`fail_next`](Self::fail_next) to exercise error paths.
#[derive(Default)]
pub struct DeterministicLeaseStore {
    state: Mutex<StoreState>,
}

impl DeterministicLeaseStore {
    /// Create a new empty store wrapped in Arc.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue `error` to be returned by the next call of `op`.
    ///
    /// The failing call has no effect on stored records. Multiple queued
    /// failures are returned in order.
    pub async fn fail_next(&self, op: StoreOperation, error: LeaseStoreError) {
        self.state.lock().await.failures.entry(op).or_default().push_back(error);
    }

    /// Number of times `op` has been invoked, including failed calls.
    pub async fn operation_count(&self, op: StoreOperation) -> u64 {
        self.state.lock().await.counts.get(&op).copied().unwrap_or(0)
    }

    /// Store `lease` unconditionally, bypassing the version check.
    ///
    /// Used to seed records in arbitrary states (foreign holders, stale or
    /// malformed fields). Returns the stored record with its new version.
    pub async fn insert(&self, lease: Lease) -> Lease {
        self.state.lock().await.write(lease)
    }

    /// Read a record without counting a `get` call.
    pub async fn peek(&self, namespace: &str, name: &str) -> Option<Lease> {
        self.state
            .lock()
            .await
            .leases
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.state.lock().await.leases.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl LeaseStore for DeterministicLeaseStore {
    async fn create(&self, lease: Lease) -> Result<Lease, LeaseStoreError> {
        let mut state = self.state.lock().await;
        state.begin(StoreOperation::Create)?;
        validate_lease(&lease)?;

        let key = (lease.meta.namespace.clone(), lease.meta.name.clone());
        if state.leases.contains_key(&key) {
            return Err(LeaseStoreError::AlreadyExists {
                namespace: key.0,
                name: key.1,
            });
        }

        let stored = state.write(lease);
        trace!(namespace = %stored.meta.namespace, name = %stored.meta.name, version = stored.meta.resource_version, "created lease");
        Ok(stored)
    }

    async fn get(&self, namespace: &str, name: &str) -> Result<Lease, LeaseStoreError> {
        let mut state = self.state.lock().await;
        state.begin(StoreOperation::Get)?;
        validate_name(namespace)?;
        validate_name(name)?;

        state
            .leases
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| LeaseStoreError::NotFound {
                namespace: namespace.to_string(),
                name: name.to_string(),
            })
    }

    async fn update(&self, lease: Lease) -> Result<Lease, LeaseStoreError> {
        let mut state = self.state.lock().await;
        state.begin(StoreOperation::Update)?;
        validate_lease(&lease)?;

        let key = (lease.meta.namespace.clone(), lease.meta.name.clone());
        let Some(current) = state.leases.get(&key) else {
            return Err(LeaseStoreError::NotFound {
                namespace: key.0,
                name: key.1,
            });
        };

        let actual = current.meta.resource_version;
        let expected = lease.meta.resource_version;
        if expected != actual {
            trace!(namespace = %key.0, name = %key.1, expected, actual, "rejecting stale update");
            return Err(LeaseStoreError::Conflict {
                namespace: key.0,
                name: key.1,
                expected,
                actual,
            });
        }

        let stored = state.write(lease);
        trace!(namespace = %stored.meta.namespace, name = %stored.meta.name, version = stored.meta.resource_version, "updated lease");
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_assigns_version() {
        let store = DeterministicLeaseStore::new();
        let created = store.create(Lease::new("default", "jobs")).await.unwrap();
        assert_eq!(created.resource_version(), 1);
        assert_eq!(store.peek("default", "jobs").await, Some(created));
    }

    #[tokio::test]
    async fn create_twice_is_already_exists() {
        let store = DeterministicLeaseStore::new();
        store.create(Lease::new("default", "jobs")).await.unwrap();
        let err = store.create(Lease::new("default", "jobs")).await.unwrap_err();
        assert!(err.is_already_exists());
    }

    #[tokio::test]
    async fn same_name_in_other_namespace_is_distinct() {
        let store = DeterministicLeaseStore::new();
        store.create(Lease::new("default", "jobs")).await.unwrap();
        store.create(Lease::new("other", "jobs")).await.unwrap();
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn get_missing_is_not_found() {
        let store = DeterministicLeaseStore::new();
        let err = store.get("default", "jobs").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn update_with_current_version_succeeds() {
        let store = DeterministicLeaseStore::new();
        let mut lease = store.create(Lease::new("default", "jobs")).await.unwrap();
        lease.spec.holder_identity = Some("node-a".into());

        let updated = store.update(lease).await.unwrap();
        assert_eq!(updated.resource_version(), 2);
        assert!(store.get("default", "jobs").await.unwrap().spec.is_held_by("node-a"));
    }

    #[tokio::test]
    async fn stale_update_is_conflict() {
        let store = DeterministicLeaseStore::new();
        let original = store.create(Lease::new("default", "jobs")).await.unwrap();

        let mut first = original.clone();
        first.spec.holder_identity = Some("node-a".into());
        store.update(first).await.unwrap();

        let mut second = original;
        second.spec.holder_identity = Some("node-b".into());
        let err = store.update(second).await.unwrap_err();
        assert_eq!(
            err,
            LeaseStoreError::Conflict {
                namespace: "default".into(),
                name: "jobs".into(),
                expected: 1,
                actual: 2,
            }
        );
        assert!(store.peek("default", "jobs").await.unwrap().spec.is_held_by("node-a"));
    }

    #[tokio::test]
    async fn update_missing_is_not_found() {
        let store = DeterministicLeaseStore::new();
        let err = store.update(Lease::new("default", "jobs")).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn invalid_names_are_rejected() {
        let store = DeterministicLeaseStore::new();
        let err = store.create(Lease::new("default", "Not_Valid")).await.unwrap_err();
        assert!(matches!(err, LeaseStoreError::InvalidName { .. }));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn injected_failure_is_returned_once() {
        let store = DeterministicLeaseStore::new();
        store
            .fail_next(StoreOperation::Create, LeaseStoreError::Failed {
                reason: "boom".into(),
            })
            .await;

        let err = store.create(Lease::new("default", "jobs")).await.unwrap_err();
        assert_eq!(err, LeaseStoreError::Failed { reason: "boom".into() });
        assert!(store.is_empty().await);

        store.create(Lease::new("default", "jobs")).await.unwrap();
        assert_eq!(store.operation_count(StoreOperation::Create).await, 2);
        assert_eq!(store.operation_count(StoreOperation::Update).await, 0);
    }

    #[tokio::test]
    async fn insert_bypasses_version_check() {
        let store = DeterministicLeaseStore::new();
        store.create(Lease::new("default", "jobs")).await.unwrap();

        let mut seeded = Lease::new("default", "jobs");
        seeded.spec.holder_identity = Some("foreign".into());
        let stored = store.insert(seeded).await;
        assert_eq!(stored.resource_version(), 2);
        assert_eq!(store.operation_count(StoreOperation::Update).await, 0);
    }

    #[tokio::test]
    async fn peek_does_not_count() {
        let store = DeterministicLeaseStore::new();
        let _ = store.peek("default", "jobs").await;
        assert_eq!(store.operation_count(StoreOperation::Get).await, 0);
    }
}
