//! Shared types: timestamps, provider metadata, and the two ledgers.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// UTC instant stored in the ledgers.
///
/// Written as RFC 3339 with microsecond precision. Reading also accepts naive
/// ISO-8601 timestamps without an offset (treated as UTC), which is what
/// ledgers produced by earlier tooling contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    pub fn now() -> Self {
        Self(Utc::now())
    }

    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Build from Unix seconds plus nanoseconds; `None` when out of range.
    pub fn from_unix(secs: i64, nanos: u32) -> Option<Self> {
        DateTime::<Utc>::from_timestamp(secs, nanos).map(Self)
    }

    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_rfc3339_opts(SecondsFormat::Micros, true))
    }
}

impl FromStr for Timestamp {
    type Err = chrono::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match DateTime::parse_from_rfc3339(s) {
            Ok(dt) => Ok(Self(dt.with_timezone(&Utc))),
            Err(rfc_err) => NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
                .map(|naive| Self(naive.and_utc()))
                .map_err(|_| rfc_err),
        }
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse()
            .map_err(|err| serde::de::Error::custom(format!("invalid timestamp '{raw}': {err}")))
    }
}

/// Provider-side deprecation flag of a resource type.
///
/// Values other than `LIVE` and `DEPRECATED` are kept verbatim so a ledger
/// written by other tooling still loads and round-trips.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeprecationStatus {
    Live,
    Deprecated,
    Other(String),
}

impl DeprecationStatus {
    /// Parse the provider's wire value.
    pub fn from_provider(value: &str) -> Self {
        match value {
            "LIVE" => Self::Live,
            "DEPRECATED" => Self::Deprecated,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Live => "LIVE",
            Self::Deprecated => "DEPRECATED",
            Self::Other(value) => value,
        }
    }
}

impl Serialize for DeprecationStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for DeprecationStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::from_provider(&raw))
    }
}

/// Metadata the provider reports alongside a schema.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderMetadata {
    pub time_created: Option<Timestamp>,
    pub deprecation_status: Option<DeprecationStatus>,
}

/// One resource type as returned by the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedType {
    pub type_name: String,
    pub schema: Value,
    pub metadata: ProviderMetadata,
}

/// Ledger entry for a resource type currently in the catalog.
///
/// Fields are declared in alphabetical order so the serialized ledger keeps
/// sorted keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecation_status: Option<DeprecationStatus>,
    pub first_seen: Timestamp,
    pub last_updated: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_created: Option<Timestamp>,
}

impl VersionRecord {
    /// Record for a type observed for the first time at `now`.
    pub fn first_observed(now: Timestamp, metadata: &ProviderMetadata) -> Self {
        Self {
            deprecation_status: metadata.deprecation_status.clone(),
            first_seen: now,
            last_updated: now,
            time_created: metadata.time_created,
        }
    }

    /// Copy non-null provider metadata into the record.
    ///
    /// Returns `true` when a stored value changed. Null provider values never
    /// clear what the ledger already knows.
    pub fn refresh_metadata(&mut self, metadata: &ProviderMetadata) -> bool {
        let mut changed = false;
        if let Some(created) = metadata.time_created
            && self.time_created != Some(created)
        {
            self.time_created = Some(created);
            changed = true;
        }
        if let Some(status) = &metadata.deprecation_status
            && self.deprecation_status.as_ref() != Some(status)
        {
            self.deprecation_status = Some(status.clone());
            changed = true;
        }
        changed
    }
}

/// Ledger entry for a resource type that left the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovedRecord {
    #[serde(flatten)]
    pub record: VersionRecord,
    pub removed_date: Timestamp,
}

/// `version_metadata.json`: type name -> record.
pub type ActiveLedger = BTreeMap<String, VersionRecord>;

/// `removed_schemas.json`: type name -> removed record.
pub type RemovedLedger = BTreeMap<String, RemovedRecord>;

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn ts(raw: &str) -> Timestamp {
        raw.parse().unwrap()
    }

    #[test]
    fn test_timestamp_accepts_naive_iso() {
        let naive = ts("2024-03-01T12:30:45.123456");
        let rfc = ts("2024-03-01T12:30:45.123456Z");
        assert_eq!(naive, rfc);
        assert_eq!(rfc.to_string(), "2024-03-01T12:30:45.123456Z");
    }

    #[test]
    fn test_timestamp_accepts_offsets() {
        assert_eq!(ts("2024-03-01T14:30:45+02:00"), ts("2024-03-01T12:30:45Z"));
        assert!("yesterday".parse::<Timestamp>().is_err());
    }

    #[test]
    fn test_version_record_omits_missing_metadata() {
        let now = ts("2024-01-01T00:00:00Z");
        let record = VersionRecord::first_observed(now, &ProviderMetadata::default());
        let json = serde_json::to_value(&record).unwrap();
        let object = json.as_object().unwrap();
        assert_eq!(object.len(), 2);
        assert!(object.contains_key("first_seen"));
        assert!(object.contains_key("last_updated"));
    }

    #[test]
    fn test_removed_record_flattens_version_fields() {
        let now = ts("2024-01-01T00:00:00Z");
        let removed = RemovedRecord {
            record: VersionRecord::first_observed(
                now,
                &ProviderMetadata {
                    time_created: None,
                    deprecation_status: Some(DeprecationStatus::Deprecated),
                },
            ),
            removed_date: ts("2024-02-01T00:00:00Z"),
        };
        let json = serde_json::to_value(&removed).unwrap();
        assert_eq!(json["deprecation_status"], "DEPRECATED");
        assert_eq!(json["removed_date"], "2024-02-01T00:00:00.000000Z");

        let back: RemovedRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, removed);
    }

    #[test]
    fn test_unknown_deprecation_status_round_trips() {
        let status: DeprecationStatus = serde_json::from_value(json!("RETIRED")).unwrap();
        assert_eq!(status, DeprecationStatus::Other("RETIRED".to_string()));
        assert_eq!(serde_json::to_value(&status).unwrap(), json!("RETIRED"));
        assert_eq!(
            DeprecationStatus::from_provider("DEPRECATED"),
            DeprecationStatus::Deprecated
        );
    }

    #[test]
    fn test_refresh_metadata_ignores_nulls() {
        let now = ts("2024-01-01T00:00:00Z");
        let mut record = VersionRecord::first_observed(
            now,
            &ProviderMetadata {
                time_created: Some(now),
                deprecation_status: Some(DeprecationStatus::Live),
            },
        );
        assert!(!record.refresh_metadata(&ProviderMetadata::default()));
        assert_eq!(record.deprecation_status, Some(DeprecationStatus::Live));

        let changed = record.refresh_metadata(&ProviderMetadata {
            time_created: None,
            deprecation_status: Some(DeprecationStatus::Deprecated),
        });
        assert!(changed);
        assert_eq!(record.deprecation_status, Some(DeprecationStatus::Deprecated));
        assert_eq!(record.time_created, Some(now));
    }
}
