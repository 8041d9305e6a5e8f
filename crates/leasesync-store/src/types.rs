//! Lease record model.
//!
//! Field names follow the control-plane lease wire format (camelCase) so a
//! record can be exchanged with a real backend verbatim.

use std::collections::BTreeMap;

use leasesync_time::MicroTime;
use serde::Deserialize;
use serde::Serialize;

/// Identity and bookkeeping of a lease record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaseMeta {
    /// Primary key within the namespace. Immutable once created.
    pub name: String,
    /// Coordination namespace the record lives in.
    pub namespace: String,
    /// Discovery labels. Not interpreted by the lock protocol.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    /// Opaque version marker assigned by the store on every write.
    ///
    /// Updates are accepted only when this matches the stored version.
    #[serde(default)]
    pub resource_version: u64,
}

/// Ownership state of a lease record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaseSpec {
    /// Identity of the current holder. `None` means unlocked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub holder_identity: Option<String>,
    /// When the current holder claimed the record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acquire_time: Option<MicroTime>,
    /// When the current holder last extended its claim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub renew_time: Option<MicroTime>,
    /// TTL in whole seconds, counted from `renew_time` or `acquire_time`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lease_duration_seconds: Option<i32>,
    /// Number of unlocked-to-locked transitions the record has seen.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lease_transitions: Option<i32>,
}

impl LeaseSpec {
    /// Returns true if any holder is recorded.
    pub fn is_held(&self) -> bool {
        self.holder_identity.is_some()
    }

    /// Returns true if `identity` is the recorded holder.
    pub fn is_held_by(&self, identity: &str) -> bool {
        self.holder_identity.as_deref() == Some(identity)
    }
}

/// A lease record as stored by a [`LeaseStore`](crate::LeaseStore).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lease {
    #[serde(rename = "metadata")]
    pub meta: LeaseMeta,
    #[serde(default)]
    pub spec: LeaseSpec,
}

impl Lease {
    /// A fresh, unlocked record that has never been persisted.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            meta: LeaseMeta {
                name: name.into(),
                namespace: namespace.into(),
                ..Default::default()
            },
            spec: LeaseSpec::default(),
        }
    }

    /// Attach a discovery label.
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.meta.labels.insert(key.into(), value.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.meta.name
    }

    pub fn namespace(&self) -> &str {
        &self.meta.namespace
    }

    pub fn resource_version(&self) -> u64 {
        self.meta.resource_version
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_lease_is_unlocked() {
        let lease = Lease::new("default", "jobs");
        assert_eq!(lease.name(), "jobs");
        assert_eq!(lease.namespace(), "default");
        assert_eq!(lease.resource_version(), 0);
        assert!(!lease.spec.is_held());
    }

    #[test]
    fn is_held_by_matches_exact_identity() {
        let spec = LeaseSpec {
            holder_identity: Some("node-a-1".to_string()),
            ..Default::default()
        };
        assert!(spec.is_held());
        assert!(spec.is_held_by("node-a-1"));
        assert!(!spec.is_held_by("node-a"));
    }

    #[test]
    fn serializes_with_wire_field_names() {
        let lease = Lease {
            meta: LeaseMeta {
                name: "jobs".into(),
                namespace: "default".into(),
                labels: BTreeMap::new(),
                resource_version: 7,
            },
            spec: LeaseSpec {
                holder_identity: Some("node-a".into()),
                acquire_time: MicroTime::from_unix_micros(1_700_000_000_000_001),
                renew_time: None,
                lease_duration_seconds: Some(10),
                lease_transitions: Some(3),
            },
        };

        let json = serde_json::to_value(&lease).unwrap();
        assert_eq!(json["metadata"]["resourceVersion"], 7);
        assert_eq!(json["spec"]["holderIdentity"], "node-a");
        assert_eq!(json["spec"]["acquireTime"], "2023-11-14T22:13:20.000001Z");
        assert_eq!(json["spec"]["leaseDurationSeconds"], 10);
        assert_eq!(json["spec"]["leaseTransitions"], 3);
        assert!(json["spec"].get("renewTime").is_none());
        assert!(json["metadata"].get("labels").is_none());
    }

    #[test]
    fn missing_spec_deserializes_as_unlocked() {
        let lease: Lease = serde_json::from_str(r#"{"metadata":{"name":"jobs","namespace":"default"}}"#).unwrap();
        assert_eq!(lease.spec, LeaseSpec::default());
        assert_eq!(lease.resource_version(), 0);
    }
}
