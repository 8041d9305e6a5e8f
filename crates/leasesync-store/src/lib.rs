//! Lease records and the optimistic-concurrency store they live in.
//!
//! A [`Lease`] is a named record in a namespace holding the identity of its
//! current holder and the timestamps that decide when the claim expires. A
//! [`LeaseStore`] persists those records and rejects any `update` whose
//! version marker is stale. The lock protocol in `leasesync` is built on that
//! single guarantee.
//!
//! [`DeterministicLeaseStore`] is an in-memory implementation with failure
//! injection, used by the test suites.

pub mod error;
pub mod inmemory;
pub mod traits;
pub mod types;
pub mod validation;

pub use error::LeaseStoreError;
pub use inmemory::DeterministicLeaseStore;
pub use inmemory::StoreOperation;
pub use traits::LeaseStore;
pub use types::Lease;
pub use types::LeaseMeta;
pub use types::LeaseSpec;
pub use validation::MAX_NAME_LENGTH;
pub use validation::validate_name;
