//! Lease-backed distributed mutex.
//!
//! Provides mutual exclusion across processes that share a lease store:
//! - The lease record is created on first use and never deleted
//! - Ownership is claimed with a version-checked update, so exactly one
//!   contender wins each race
//! - Claims expire after a TTL, letting a crashed holder's lease be taken over

use std::sync::Arc;

use leasesync_store::Lease;
use leasesync_store::LeaseStore;
use leasesync_time::TimeProvider;
use leasesync_time::run_or_cancel;
use leasesync_time::sleep_or_cancel;
use snafu::ResultExt;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::warn;

use crate::config::MutexConfig;
use crate::error::LeaseOperation;
use crate::error::LockedByAnotherSnafu;
use crate::error::MalformedRecordSnafu;
use crate::error::MutexError;
use crate::error::NotLockedSnafu;
use crate::error::StoreSnafu;
use crate::types::FencingToken;
use crate::verified::LeaseState;
use crate::verified::claim_lease;
use crate::verified::evaluate_lease;
use crate::verified::next_lease_transitions;
use crate::verified::release_lease;
use crate::verified::renew_lease;

/// Label attached to every lease record created by a [`Mutex`].
pub const LOCK_LABEL: &str = "leasesync.io/lock";

/// A distributed mutex over a single lease record.
///
/// Holds no local ownership state: every call re-reads the record from the
/// store. Obtain one from [`Syncer::new_mutex`](crate::Syncer::new_mutex).
pub struct Mutex<S: LeaseStore + ?Sized> {
    store: Arc<S>,
    time: Arc<dyn TimeProvider>,
    namespace: String,
    name: String,
    identity: String,
    config: MutexConfig,
}

impl<S: LeaseStore + ?Sized> Mutex<S> {
    pub(crate) fn new(
        store: Arc<S>,
        time: Arc<dyn TimeProvider>,
        namespace: String,
        name: String,
        identity: String,
        config: MutexConfig,
    ) -> Self {
        Self {
            store,
            time,
            namespace,
            name,
            identity,
            config,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Identity written to `holderIdentity` when this mutex holds the lease.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn config(&self) -> &MutexConfig {
        &self.config
    }

    /// Block until the lease is acquired.
    ///
    /// Polls every `retry_interval` while another identity holds an unexpired
    /// claim, and takes over expired claims. Returns the fencing token of the
    /// new claim, or [`MutexError::Cancelled`] once `cancel` fires. A token
    /// that is already cancelled returns before any store call.
    pub async fn lock(&self, cancel: &CancellationToken) -> Result<FencingToken, MutexError> {
        self.ensure_lease(cancel).await?;
        let duration_seconds = self.config.lease_duration_seconds();

        loop {
            let lease = run_or_cancel(self.store.get(&self.namespace, &self.name), cancel)
                .await?
                .context(StoreSnafu {
                    operation: LeaseOperation::Get,
                    namespace: &self.namespace,
                    name: &self.name,
                })?;

            let now = self.time.now();
            match evaluate_lease(&lease.spec, now) {
                Err(malformed) => {
                    warn!(
                        namespace = %self.namespace,
                        name = %self.name,
                        reason = %malformed,
                        "refusing to claim malformed lease"
                    );
                    return MalformedRecordSnafu {
                        namespace: &self.namespace,
                        name: &self.name,
                        reason: malformed.to_string(),
                    }
                    .fail();
                }
                Ok(LeaseState::Held { holder, expires_at }) => {
                    debug!(
                        namespace = %self.namespace,
                        name = %self.name,
                        holder = %holder,
                        expires_at = %expires_at,
                        "lease held, retrying"
                    );
                    self.pause(cancel).await?;
                    continue;
                }
                Ok(LeaseState::Expired { holder, expired_at }) => {
                    debug!(
                        namespace = %self.namespace,
                        name = %self.name,
                        previous_holder = %holder,
                        expired_at = %expired_at,
                        "taking expired lease"
                    );
                }
                Ok(LeaseState::Unlocked) => {}
            }

            let token = FencingToken::from_transitions(next_lease_transitions(lease.spec.lease_transitions));
            let mut claim = lease;
            claim.spec = claim_lease(&claim.spec, &self.identity, now, duration_seconds);

            match run_or_cancel(self.store.update(claim), cancel).await? {
                Ok(_) => {
                    debug!(
                        namespace = %self.namespace,
                        name = %self.name,
                        identity = %self.identity,
                        fencing_token = token.value(),
                        lease_duration_seconds = duration_seconds,
                        "lock acquired"
                    );
                    return Ok(token);
                }
                Err(err) => {
                    // Another contender won the race, or the store hiccuped.
                    debug!(
                        namespace = %self.namespace,
                        name = %self.name,
                        error = %err,
                        "claim rejected, retrying"
                    );
                    self.pause(cancel).await?;
                }
            }
        }
    }

    /// Renew the claim held by this identity.
    ///
    /// Sets `renewTime` to now, restarting the TTL. Fails with
    /// [`MutexError::NotLocked`] if the record cannot be read or has no holder,
    /// and with [`MutexError::LockedByAnother`] if a different identity holds
    /// it. Performs no retries.
    pub async fn extend(&self, cancel: &CancellationToken) -> Result<(), MutexError> {
        let mut lease = self.fetch_owned(cancel).await?;
        lease.spec = renew_lease(&lease.spec, self.time.now());

        run_or_cancel(self.store.update(lease), cancel).await?.context(StoreSnafu {
            operation: LeaseOperation::Extend,
            namespace: &self.namespace,
            name: &self.name,
        })?;

        debug!(namespace = %self.namespace, name = %self.name, identity = %self.identity, "lease extended");
        Ok(())
    }

    /// Release the claim held by this identity.
    ///
    /// Clears the holder and timing fields while keeping the transition count.
    /// Ownership errors match [`extend`](Self::extend); another identity's
    /// claim is never cleared.
    pub async fn unlock(&self, cancel: &CancellationToken) -> Result<(), MutexError> {
        let mut lease = self.fetch_owned(cancel).await?;
        lease.spec = release_lease(&lease.spec);

        run_or_cancel(self.store.update(lease), cancel).await?.context(StoreSnafu {
            operation: LeaseOperation::Unlock,
            namespace: &self.namespace,
            name: &self.name,
        })?;

        debug!(namespace = %self.namespace, name = %self.name, identity = %self.identity, "lock released");
        Ok(())
    }

    /// Create the lease record if it does not exist yet.
    async fn ensure_lease(&self, cancel: &CancellationToken) -> Result<(), MutexError> {
        let lease = Lease::new(&self.namespace, &self.name).with_label(LOCK_LABEL, "true");

        match run_or_cancel(self.store.create(lease), cancel).await? {
            Ok(_) => {
                debug!(namespace = %self.namespace, name = %self.name, "created lease");
                Ok(())
            }
            Err(err) if err.is_already_exists() => Ok(()),
            Err(source) => Err(MutexError::Store {
                operation: LeaseOperation::Create,
                namespace: self.namespace.clone(),
                name: self.name.clone(),
                source,
            }),
        }
    }

    /// Fetch the record and check that this identity holds it.
    async fn fetch_owned(&self, cancel: &CancellationToken) -> Result<Lease, MutexError> {
        let lease = match run_or_cancel(self.store.get(&self.namespace, &self.name), cancel).await? {
            Ok(lease) => lease,
            Err(err) => {
                debug!(namespace = %self.namespace, name = %self.name, error = %err, "failed to read lease");
                return NotLockedSnafu {
                    namespace: &self.namespace,
                    name: &self.name,
                }
                .fail();
            }
        };

        match &lease.spec.holder_identity {
            None => {
                return NotLockedSnafu {
                    namespace: &self.namespace,
                    name: &self.name,
                }
                .fail();
            }
            Some(holder) if *holder != self.identity => {
                return LockedByAnotherSnafu {
                    namespace: &self.namespace,
                    name: &self.name,
                    holder: holder.clone(),
                }
                .fail();
            }
            Some(_) => {}
        }

        Ok(lease)
    }

    async fn pause(&self, cancel: &CancellationToken) -> Result<(), MutexError> {
        sleep_or_cancel(self.time.as_ref(), self.config.retry_interval(), cancel).await?;
        Ok(())
    }
}

impl<S: LeaseStore + ?Sized> std::fmt::Debug for Mutex<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mutex")
            .field("namespace", &self.namespace)
            .field("name", &self.name)
            .field("identity", &self.identity)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
