//! Microsecond-precision UTC timestamps.

use std::fmt;
use std::ops::Add;
use std::str::FromStr;
use std::time::Duration;

use chrono::DateTime;
use chrono::SecondsFormat;
use chrono::SubsecRound;
use chrono::TimeDelta;
use chrono::Utc;
use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;

/// A UTC instant truncated to whole microseconds.
///
/// Lease records exchange timestamps at microsecond precision. Truncating on
/// construction keeps a value read back from the store equal to the value
/// that was written, so comparisons never flip because of dropped nanoseconds.
///
/// Serialized as RFC 3339 with exactly six fractional digits, e.g.
/// `2026-10-16T08:30:00.123456Z`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MicroTime(DateTime<Utc>);

impl MicroTime {
    /// Wrap a timestamp, discarding anything below one microsecond.
    pub fn new(time: DateTime<Utc>) -> Self {
        Self(time.trunc_subsecs(6))
    }

    /// Current wall-clock time.
    pub fn now() -> Self {
        Self::new(Utc::now())
    }

    /// Build from microseconds since the Unix epoch.
    ///
    /// Returns `None` when the value is outside chrono's representable range.
    pub fn from_unix_micros(micros: i64) -> Option<Self> {
        DateTime::from_timestamp_micros(micros).map(Self)
    }

    /// Microseconds since the Unix epoch.
    pub fn unix_micros(&self) -> i64 {
        self.0.timestamp_micros()
    }

    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }

    /// Add a duration, returning `None` on overflow.
    pub fn checked_add(&self, duration: Duration) -> Option<Self> {
        let delta = TimeDelta::from_std(duration).ok()?;
        self.0.checked_add_signed(delta).map(Self::new)
    }

    /// Add a duration, clamping to the latest representable instant.
    pub fn saturating_add(&self, duration: Duration) -> Self {
        self.checked_add(duration).unwrap_or_else(|| Self::new(DateTime::<Utc>::MAX_UTC))
    }

    /// Time elapsed from `earlier` to `self`, zero if `earlier` is later.
    pub fn saturating_duration_since(&self, earlier: MicroTime) -> Duration {
        (self.0 - earlier.0).to_std().unwrap_or(Duration::ZERO)
    }
}

impl From<DateTime<Utc>> for MicroTime {
    fn from(time: DateTime<Utc>) -> Self {
        Self::new(time)
    }
}

impl Add<Duration> for MicroTime {
    type Output = MicroTime;

    fn add(self, rhs: Duration) -> Self::Output {
        self.saturating_add(rhs)
    }
}

impl fmt::Display for MicroTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_rfc3339_opts(SecondsFormat::Micros, true))
    }
}

impl FromStr for MicroTime {
    type Err = chrono::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parsed = DateTime::parse_from_rfc3339(s)?;
        Ok(Self::new(parsed.with_timezone(&Utc)))
    }
}

impl Serialize for MicroTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MicroTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn sample() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, 8, 30, 0).single().unwrap() + TimeDelta::nanoseconds(123_456_789)
    }

    #[test]
    fn new_truncates_to_microseconds() {
        let time = MicroTime::new(sample());
        assert_eq!(time.as_datetime().timestamp_subsec_nanos(), 123_456_000);
    }

    #[test]
    fn display_uses_six_fractional_digits() {
        let time = MicroTime::new(sample());
        assert_eq!(time.to_string(), "2026-10-16T08:30:00.123456Z");
    }

    #[test]
    fn parses_offsets_into_utc() {
        let time: MicroTime = "2026-10-16T10:30:00.123456+02:00".parse().unwrap();
        assert_eq!(time, MicroTime::new(sample()));
    }

    #[test]
    fn serde_uses_rfc3339_string() {
        let time = MicroTime::new(sample());
        let json = serde_json::to_string(&time).unwrap();
        assert_eq!(json, "\"2026-10-16T08:30:00.123456Z\"");
        let back: MicroTime = serde_json::from_str(&json).unwrap();
        assert_eq!(back, time);
    }

    #[test]
    fn rejects_garbage() {
        assert!(serde_json::from_str::<MicroTime>("\"yesterday\"").is_err());
    }

    #[test]
    fn add_duration() {
        let time = MicroTime::new(sample());
        let later = time + Duration::from_secs(10);
        assert_eq!(later.saturating_duration_since(time), Duration::from_secs(10));
        assert_eq!(time.saturating_duration_since(later), Duration::ZERO);
    }

    #[test]
    fn add_saturates_instead_of_panicking() {
        let time = MicroTime::new(DateTime::<Utc>::MAX_UTC);
        let later = time + Duration::from_secs(u64::MAX);
        assert!(later >= time);
    }

    #[test]
    fn unix_micros_round_trip() {
        let time = MicroTime::from_unix_micros(1_700_000_000_123_456).unwrap();
        assert_eq!(time.unix_micros(), 1_700_000_000_123_456);
    }
}
