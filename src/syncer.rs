//! Factory for mutexes sharing one store, namespace and identity.

use std::sync::Arc;

use leasesync_store::LeaseStore;
use leasesync_time::SystemTimeProvider;
use leasesync_time::TimeProvider;
use rand::RngCore;

use crate::config::MutexConfig;
use crate::error::ConfigError;
use crate::identity::generate_identity;
use crate::mutex::Mutex;

/// Produces [`Mutex`] handles for one process instance.
///
/// Every mutex created by a syncer shares its store handle, namespace and
/// holder identity. Two syncers never share an identity, even with the same
/// instance label.
pub struct Syncer<S: LeaseStore + ?Sized> {
    store: Arc<S>,
    time: Arc<dyn TimeProvider>,
    namespace: String,
    identity: String,
    config: MutexConfig,
}

impl<S: LeaseStore + ?Sized> Syncer<S> {
    /// Create a syncer with a random identity derived from `instance_label`.
    pub fn new(store: Arc<S>, namespace: impl Into<String>, instance_label: &str) -> Self {
        Self::with_rng(store, namespace, instance_label, &mut rand::rng())
    }

    /// Create a syncer drawing its identity from `rng`.
    pub fn with_rng<R: RngCore + ?Sized>(
        store: Arc<S>,
        namespace: impl Into<String>,
        instance_label: &str,
        rng: &mut R,
    ) -> Self {
        Self {
            store,
            time: Arc::new(SystemTimeProvider),
            namespace: namespace.into(),
            identity: generate_identity(instance_label, rng),
            config: MutexConfig::default(),
        }
    }

    /// Use `config` for every mutex created afterwards.
    ///
    /// Rejects configurations that fail [`MutexConfig::validate`]: a TTL that
    /// rounds to zero seconds would let any contender take over a fresh claim.
    pub fn with_config(mut self, config: MutexConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    /// Use `time` as the clock and sleep source for every mutex created afterwards.
    pub fn with_time_provider(mut self, time: Arc<dyn TimeProvider>) -> Self {
        self.time = time;
        self
    }

    /// Create a mutex over the lease named `name`.
    ///
    /// Does not touch the store; the record is created on the first `lock`.
    pub fn new_mutex(&self, name: impl Into<String>) -> Mutex<S> {
        Mutex::new(
            Arc::clone(&self.store),
            Arc::clone(&self.time),
            self.namespace.clone(),
            name.into(),
            self.identity.clone(),
            self.config.clone(),
        )
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn config(&self) -> &MutexConfig {
        &self.config
    }
}

impl<S: LeaseStore + ?Sized> Clone for Syncer<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            time: Arc::clone(&self.time),
            namespace: self.namespace.clone(),
            identity: self.identity.clone(),
            config: self.config.clone(),
        }
    }
}

impl<S: LeaseStore + ?Sized> std::fmt::Debug for Syncer<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Syncer")
            .field("namespace", &self.namespace)
            .field("identity", &self.identity)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
