//! Pure lease-state computation functions.
//!
//! Everything the lock protocol decides about a lease record lives here: is it
//! held, has it expired, and what the record looks like after a claim, renewal
//! or release. Functions are deterministic and side-effect free.
//!
//! # Tiger Style
//!
//! - Uses saturating arithmetic for all counters and timestamps
//! - Time is passed explicitly (no calls to system time)
//! - Deterministic behavior for testing and verification

use std::fmt;
use std::time::Duration;

use leasesync_store::LeaseSpec;
use leasesync_time::MicroTime;

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Ownership state of a lease record at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaseState<'a> {
    /// No holder recorded.
    Unlocked,
    /// Held and not yet expired.
    Held { holder: &'a str, expires_at: MicroTime },
    /// Held, but the TTL has run out. Anyone may claim it.
    Expired { holder: &'a str, expired_at: MicroTime },
}

impl LeaseState<'_> {
    /// Returns true if a new holder may claim the record.
    pub fn is_claimable(&self) -> bool {
        !matches!(self, LeaseState::Held { .. })
    }
}

/// Why a held lease record cannot be evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedLease {
    MissingDuration,
    MissingAcquireTime,
}

impl fmt::Display for MalformedLease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MalformedLease::MissingDuration => f.write_str("held lease has no leaseDurationSeconds"),
            MalformedLease::MissingAcquireTime => f.write_str("held lease has no acquireTime"),
        }
    }
}

/// Compute when a held lease expires.
///
/// The TTL counts from the last renewal, or from acquisition if the holder
/// never renewed. Returns `Ok(None)` for an unlocked record. Negative durations
/// are treated as zero.
pub fn lease_expiration(spec: &LeaseSpec) -> Result<Option<MicroTime>, MalformedLease> {
    if !spec.is_held() {
        return Ok(None);
    }

    let seconds = spec.lease_duration_seconds.ok_or(MalformedLease::MissingDuration)?;
    let acquired = spec.acquire_time.ok_or(MalformedLease::MissingAcquireTime)?;
    let base = spec.renew_time.unwrap_or(acquired);
    let ttl = Duration::from_secs(u64::try_from(seconds).unwrap_or(0));

    Ok(Some(base.saturating_add(ttl)))
}

/// Check if a lease whose TTL ends at `expires_at` has expired.
///
/// An expiration that is not strictly in the future counts as expired.
#[inline]
pub fn is_lease_expired(expires_at: MicroTime, now: MicroTime) -> bool {
    expires_at <= now
}

/// Classify a lease record at time `now`.
pub fn evaluate_lease(spec: &LeaseSpec, now: MicroTime) -> Result<LeaseState<'_>, MalformedLease> {
    let Some(holder) = spec.holder_identity.as_deref() else {
        return Ok(LeaseState::Unlocked);
    };

    match lease_expiration(spec)? {
        Some(expires_at) if is_lease_expired(expires_at, now) => Ok(LeaseState::Expired {
            holder,
            expired_at: expires_at,
        }),
        Some(expires_at) => Ok(LeaseState::Held { holder, expires_at }),
        None => Ok(LeaseState::Unlocked),
    }
}

/// Transition count after one more unlocked-to-locked transition.
///
/// # Tiger Style
///
/// - Uses saturating_add to prevent overflow
/// - Always returns >= 1 for non-negative input
#[inline]
pub fn next_lease_transitions(current: Option<i32>) -> i32 {
    current.unwrap_or(0).saturating_add(1)
}

/// Round a TTL to whole seconds, half away from zero.
///
/// Returns `None` if the result does not fit in an `i32`.
pub fn checked_lease_seconds(ttl: Duration) -> Option<i32> {
    let rounded = ttl.as_nanos().saturating_add(NANOS_PER_SEC / 2) / NANOS_PER_SEC;
    i32::try_from(rounded).ok()
}

/// Round a TTL to whole seconds, half away from zero, clamped to `i32::MAX`.
#[inline]
pub fn rounded_lease_seconds(ttl: Duration) -> i32 {
    checked_lease_seconds(ttl).unwrap_or(i32::MAX)
}

/// Record state after `identity` claims the lease at `now`.
///
/// Any renewal time left by an expired holder is cleared, so the claim's
/// expiration counts from `now`.
pub fn claim_lease(spec: &LeaseSpec, identity: &str, now: MicroTime, duration_seconds: i32) -> LeaseSpec {
    LeaseSpec {
        holder_identity: Some(identity.to_string()),
        acquire_time: Some(now),
        renew_time: None,
        lease_duration_seconds: Some(duration_seconds),
        lease_transitions: Some(next_lease_transitions(spec.lease_transitions)),
    }
}

/// Record state after the holder renews at `now`.
pub fn renew_lease(spec: &LeaseSpec, now: MicroTime) -> LeaseSpec {
    LeaseSpec {
        renew_time: Some(now),
        ..spec.clone()
    }
}

/// Record state after the holder releases the lease.
///
/// Only the transition count survives.
pub fn release_lease(spec: &LeaseSpec) -> LeaseSpec {
    LeaseSpec {
        lease_transitions: spec.lease_transitions,
        ..LeaseSpec::default()
    }
}
