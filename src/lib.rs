//! Distributed mutual exclusion on lease records.
//!
//! Processes that share a [`LeaseStore`] race to claim a named lease record.
//! Exactly one identity holds it at a time, and a claim that is not extended
//! expires after its TTL so a crashed holder cannot block the resource forever.
//!
//! - [`Syncer`] - Factory holding the store handle, namespace and identity
//! - [`Mutex`] - `lock` (blocking, with expiry takeover), `extend`, `unlock`
//! - [`MutexConfig`] - Retry interval and lease TTL
//!
//! Correctness rests on the store rejecting updates whose version marker is
//! stale. The lock holds no local state; every call re-reads the record.
//!
//! ## Example
//!
//! ```
//! use leasesync::CancellationToken;
//! use leasesync::Syncer;
//! use leasesync_store::DeterministicLeaseStore;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), leasesync::MutexError> {
//! let store = DeterministicLeaseStore::new();
//! let syncer = Syncer::new(store, "default", "worker");
//! let mutex = syncer.new_mutex("nightly-report");
//!
//! let cancel = CancellationToken::new();
//! let token = mutex.lock(&cancel).await?;
//! assert_eq!(token.value(), 1);
//!
//! // Protected critical section, extend before the TTL runs out
//! mutex.extend(&cancel).await?;
//!
//! mutex.unlock(&cancel).await?;
//! assert!(mutex.unlock(&cancel).await.unwrap_err().is_not_locked());
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod identity;
mod mutex;
mod syncer;
mod types;
pub mod verified;

pub use config::LEASE_TTL_ENV;
pub use config::MutexConfig;
pub use config::RETRY_INTERVAL_ENV;
pub use error::ConfigError;
pub use error::LeaseOperation;
pub use error::MutexError;
pub use identity::generate_identity;
pub use leasesync_store::Lease;
pub use leasesync_store::LeaseStore;
pub use leasesync_store::LeaseStoreError;
pub use leasesync_time::MicroTime;
pub use leasesync_time::SystemTimeProvider;
pub use leasesync_time::TimeProvider;
pub use mutex::LOCK_LABEL;
pub use mutex::Mutex;
pub use syncer::Syncer;
pub use tokio_util::sync::CancellationToken;
pub use types::FencingToken;
