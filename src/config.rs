//! Mutex timing configuration.
//!
//! Values come from defaults, an optional TOML document, and environment
//! overrides, in that order:
//!
//! ```toml
//! retry_interval_ms = 250
//! lease_ttl_ms = 10000
//! ```

use std::env::VarError;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use snafu::ResultExt;

use crate::error::ConfigError;
use crate::error::ParseSnafu;
use crate::verified::checked_lease_seconds;
use crate::verified::rounded_lease_seconds;

/// Environment variable overriding [`MutexConfig::retry_interval_ms`].
pub const RETRY_INTERVAL_ENV: &str = "LEASESYNC_RETRY_INTERVAL_MS";
/// Environment variable overriding [`MutexConfig::lease_ttl_ms`].
pub const LEASE_TTL_ENV: &str = "LEASESYNC_LEASE_TTL_MS";

/// Timing parameters shared by every mutex a syncer produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MutexConfig {
    /// Delay between acquisition attempts while the lease is held.
    pub retry_interval_ms: u64,
    /// Lease TTL written on acquisition, rounded to whole seconds.
    pub lease_ttl_ms: u64,
}

impl Default for MutexConfig {
    fn default() -> Self {
        Self {
            retry_interval_ms: 250,
            lease_ttl_ms: 10_000,
        }
    }
}

impl MutexConfig {
    /// Parse a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(input).context(ParseSnafu)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults plus environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env_overrides()?;
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(val) = Self::env_u64(RETRY_INTERVAL_ENV)? {
            self.retry_interval_ms = val;
        }
        if let Some(val) = Self::env_u64(LEASE_TTL_ENV)? {
            self.lease_ttl_ms = val;
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retry_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "retry_interval_ms".into(),
                value: self.retry_interval_ms.to_string(),
                reason: "must be greater than zero".into(),
            });
        }

        match checked_lease_seconds(self.lease_ttl()) {
            Some(seconds) if seconds >= 1 => {}
            Some(_) => {
                return Err(ConfigError::InvalidValue {
                    key: "lease_ttl_ms".into(),
                    value: self.lease_ttl_ms.to_string(),
                    reason: "must round to at least one second".into(),
                });
            }
            None => {
                return Err(ConfigError::InvalidValue {
                    key: "lease_ttl_ms".into(),
                    value: self.lease_ttl_ms.to_string(),
                    reason: "does not fit in a 32-bit second count".into(),
                });
            }
        }

        Ok(())
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }

    pub fn lease_ttl(&self) -> Duration {
        Duration::from_millis(self.lease_ttl_ms)
    }

    /// TTL as written to `lease_duration_seconds`.
    pub fn lease_duration_seconds(&self) -> i32 {
        rounded_lease_seconds(self.lease_ttl())
    }

    fn env_u64(key: &str) -> Result<Option<u64>, ConfigError> {
        match std::env::var(key) {
            Ok(raw) => raw.trim().parse().map(Some).map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value: raw,
                reason: "expected an unsigned integer".into(),
            }),
            Err(VarError::NotPresent) => Ok(None),
            Err(VarError::NotUnicode(raw)) => Err(ConfigError::InvalidValue {
                key: key.to_string(),
                value: raw.to_string_lossy().into_owned(),
                reason: "not valid unicode".into(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = MutexConfig::default();
        assert_eq!(config.retry_interval(), Duration::from_millis(250));
        assert_eq!(config.lease_ttl(), Duration::from_secs(10));
        assert_eq!(config.lease_duration_seconds(), 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn toml_overrides_some_fields() {
        let config = MutexConfig::from_toml_str("lease_ttl_ms = 1500").unwrap();
        assert_eq!(config.retry_interval_ms, 250);
        assert_eq!(config.lease_ttl_ms, 1500);
        assert_eq!(config.lease_duration_seconds(), 2);
    }

    #[test]
    fn toml_parse_error() {
        let err = MutexConfig::from_toml_str("lease_ttl_ms = \"soon\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn zero_retry_interval_rejected() {
        let config = MutexConfig {
            retry_interval_ms: 0,
            ..Default::default()
        };
        match config.validate() {
            Err(ConfigError::InvalidValue { key, .. }) => assert_eq!(key, "retry_interval_ms"),
            other => panic!("expected InvalidValue, got {other:?}"),
        }
    }

    #[test]
    fn sub_second_ttl_rejected() {
        let config = MutexConfig {
            lease_ttl_ms: 499,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = MutexConfig {
            lease_ttl_ms: 500,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
        assert_eq!(config.lease_duration_seconds(), 1);
    }

    #[test]
    fn unset_env_is_none() {
        assert!(MutexConfig::env_u64("LEASESYNC_TEST_UNSET_VARIABLE").unwrap().is_none());
    }

    #[cfg(unix)]
    #[test]
    fn non_unicode_env_rejected() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let key = "LEASESYNC_TEST_NON_UNICODE_MS";
        // SAFETY: the key is unique to this test, no other thread reads it.
        unsafe { std::env::set_var(key, OsStr::from_bytes(b"25\xff0")) };
        let result = MutexConfig::env_u64(key);
        unsafe { std::env::remove_var(key) };

        match result {
            Err(ConfigError::InvalidValue { key: k, reason, .. }) => {
                assert_eq!(k, key);
                assert_eq!(reason, "not valid unicode");
            }
            other => panic!("expected InvalidValue, got {other:?}"),
        }
    }

    #[test]
    fn oversized_ttl_rejected() {
        let config = MutexConfig {
            lease_ttl_ms: u64::MAX,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
