//! Time utilities for leasesync.
//!
//! Lease expiration is decided by comparing wall-clock timestamps stored in the
//! lease record, and acquisition polls on a fixed interval. Both the clock and
//! the delay are reached through [`TimeProvider`] so the lock protocol can be
//! exercised deterministically.
//!
//! # TimeProvider Trait
//!
//! Use [`SystemTimeProvider`] in production and [`SimulatedTimeProvider`]
//! (behind the `simulation` feature) for tests.
//!
//! # Cancellation
//!
//! [`sleep_or_cancel`] and [`run_or_cancel`] race a delay or a future against a
//! [`CancellationToken`]. A token that already fired wins immediately, before
//! the raced future is polled.

mod micro_time;

#[cfg(feature = "simulation")]
use std::sync::Arc;
#[cfg(feature = "simulation")]
use std::sync::atomic::AtomicI64;
#[cfg(feature = "simulation")]
use std::sync::atomic::Ordering;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
pub use micro_time::MicroTime;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

// ============================================================================
// Cancellation
// ============================================================================

/// The caller's cancellation token fired before the operation completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("operation cancelled")]
pub struct Cancelled;

/// Sleep for `duration` on the given clock unless `cancel` fires first.
///
/// Returns `Err(Cancelled)` without sleeping if the token is already cancelled.
pub async fn sleep_or_cancel<T>(time: &T, duration: Duration, cancel: &CancellationToken) -> Result<(), Cancelled>
where
    T: TimeProvider + ?Sized,
{
    run_or_cancel(time.sleep(duration), cancel).await
}

/// Drive `future` to completion unless `cancel` fires first.
///
/// The token is checked before the future is polled, so an already-cancelled
/// token never lets the future make progress.
pub async fn run_or_cancel<F>(future: F, cancel: &CancellationToken) -> Result<F::Output, Cancelled>
where
    F: Future,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Cancelled),
        output = future => Ok(output),
    }
}

// ============================================================================
// TimeProvider Trait
// ============================================================================

/// Injectable source of "now" and of delays.
///
/// # Example
///
/// ```
/// use std::time::Duration;
///
/// use leasesync_time::{SystemTimeProvider, TimeProvider};
///
/// let time = SystemTimeProvider;
/// let deadline = time.now() + Duration::from_secs(10);
/// assert!(deadline > time.now());
/// ```
#[async_trait]
pub trait TimeProvider: Send + Sync {
    /// Current UTC time at microsecond precision.
    fn now(&self) -> MicroTime;

    /// Wait for `duration` to pass on this clock.
    async fn sleep(&self, duration: Duration);
}

#[async_trait]
impl<T: TimeProvider + ?Sized> TimeProvider for std::sync::Arc<T> {
    fn now(&self) -> MicroTime {
        (**self).now()
    }

    async fn sleep(&self, duration: Duration) {
        (**self).sleep(duration).await
    }
}

// ============================================================================
// SystemTimeProvider (Production)
// ============================================================================

/// Production time provider: system clock plus tokio timers.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeProvider;

#[async_trait]
impl TimeProvider for SystemTimeProvider {
    #[inline]
    fn now(&self) -> MicroTime {
        MicroTime::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await
    }
}

// ============================================================================
// SimulatedTimeProvider (Testing)
// ============================================================================

/// Simulated clock for deterministic testing.
///
/// `sleep` does not wait: it advances the clock by the requested duration and
/// yields to the scheduler, so a polling loop observes time passing at exactly
/// the rate it sleeps. Clones share the same clock.
///
/// ```
/// use std::time::Duration;
///
/// use leasesync_time::{MicroTime, SimulatedTimeProvider, TimeProvider};
///
/// let time = SimulatedTimeProvider::new(MicroTime::from_unix_micros(0).unwrap());
/// time.advance(Duration::from_secs(5));
/// assert_eq!(time.now().unix_micros(), 5_000_000);
/// ```
#[cfg(feature = "simulation")]
#[derive(Debug, Clone)]
pub struct SimulatedTimeProvider {
    current_micros: Arc<AtomicI64>,
}

#[cfg(feature = "simulation")]
impl SimulatedTimeProvider {
    /// Create a simulated clock starting at `initial`.
    pub fn new(initial: MicroTime) -> Self {
        Self {
            current_micros: Arc::new(AtomicI64::new(initial.unix_micros())),
        }
    }

    /// Create a simulated clock starting at the current system time.
    pub fn from_system_time() -> Self {
        Self::new(MicroTime::now())
    }

    /// Move the clock forward.
    pub fn advance(&self, delta: Duration) {
        let micros = i64::try_from(delta.as_micros()).unwrap_or(i64::MAX);
        let _ = self
            .current_micros
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| Some(current.saturating_add(micros)));
    }

    /// Jump to an absolute time (may move backwards).
    pub fn set(&self, time: MicroTime) {
        self.current_micros.store(time.unix_micros(), Ordering::SeqCst);
    }
}

#[cfg(feature = "simulation")]
impl Default for SimulatedTimeProvider {
    fn default() -> Self {
        Self::from_system_time()
    }
}

#[cfg(feature = "simulation")]
#[async_trait]
impl TimeProvider for SimulatedTimeProvider {
    fn now(&self) -> MicroTime {
        MicroTime::from_unix_micros(self.current_micros.load(Ordering::SeqCst)).unwrap_or_default()
    }

    async fn sleep(&self, duration: Duration) {
        self.advance(duration);
        tokio::task::yield_now().await;
    }
}

// ============================================================================
// Tests
// ============================================================================


#[cfg(all(test, feature = "simulation"))]
mod simulation_tests {
    use super::*;

    fn epoch() -> MicroTime {
        MicroTime::from_unix_micros(1_000_000).unwrap()
    }

    #[test]
    fn simulated_time_initial_value() {
        let time = SimulatedTimeProvider::new(epoch());
        assert_eq!(time.now(), epoch());
    }

    #[test]
    fn simulated_time_advance() {
        let time = SimulatedTimeProvider::new(epoch());
        time.advance(Duration::from_millis(500));
        assert_eq!(time.now().unix_micros(), 1_500_000);
    }

    #[test]
    fn simulated_time_set_can_move_backwards() {
        let time = SimulatedTimeProvider::new(epoch());
        time.set(MicroTime::from_unix_micros(10).unwrap());
        assert_eq!(time.now().unix_micros(), 10);
    }

    #[test]
    fn simulated_time_clone_shares_state() {
        let time1 = SimulatedTimeProvider::new(epoch());
        let time2 = time1.clone();
        time1.advance(Duration::from_secs(1));
        assert_eq!(time2.now().unix_micros(), 2_000_000);
    }

    #[tokio::test]
    async fn simulated_sleep_advances_clock() {
        let time = SimulatedTimeProvider::new(epoch());
        time.sleep(Duration::from_millis(250)).await;
        assert_eq!(time.now().unix_micros(), 1_250_000);
    }

    #[tokio::test]
    async fn cancelled_simulated_sleep_leaves_clock_alone() {
        let time = SimulatedTimeProvider::new(epoch());
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert_eq!(sleep_or_cancel(&time, Duration::from_secs(5), &cancel).await, Err(Cancelled));
        assert_eq!(time.now(), epoch());
    }
}
