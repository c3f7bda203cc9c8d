//! Reconciliation of a freshly fetched catalog against the stored snapshot.
//!
//! Pure: takes the snapshot and fetch result by value/reference and returns the
//! new state. Nothing here touches the filesystem.

use std::collections::BTreeMap;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::catalog::CatalogFetch;
use crate::errors::{Result, TrackerError};
use crate::store::Snapshot;
use crate::types::{
    ActiveLedger, ProviderMetadata, RemovedLedger, RemovedRecord, Timestamp, VersionRecord,
};

/// What to do with a type that shows up again after being removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReappearPolicy {
    /// Start a new record: `first_seen` is the run time.
    #[default]
    Fresh,
    /// Revive the removed record, keeping its `first_seen`.
    Restore,
}

/// Refuses to apply a catalog that would wipe out most of the ledger.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollapseGuard {
    /// Largest share of tracked types a single run may remove.
    pub max_removal_ratio: f64,
    pub enabled: bool,
}

impl Default for CollapseGuard {
    fn default() -> Self {
        Self {
            max_removal_ratio: 0.5,
            enabled: true,
        }
    }
}

impl CollapseGuard {
    /// `previous` tracked types, `listed` types in the new catalog, `removals`
    /// tracked types missing from it.
    pub fn check(&self, previous: usize, listed: usize, removals: usize) -> Result<()> {
        if !self.enabled || previous == 0 {
            return Ok(());
        }

        let collapsed =
            listed == 0 || removals as f64 > previous as f64 * self.max_removal_ratio;
        if collapsed {
            return Err(TrackerError::CatalogCollapse {
                previous,
                listed,
                removals,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ReconcileOptions {
    pub reappear_policy: ReappearPolicy,
    pub guard: CollapseGuard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Added,
    Updated,
    MetadataRefreshed,
    Removed,
    Reappeared,
}

impl ChangeKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Updated => "updated",
            Self::MetadataRefreshed => "metadata refreshed",
            Self::Removed => "removed",
            Self::Reappeared => "reappeared",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeChange {
    pub type_name: String,
    pub kind: ChangeKind,
}

/// New state produced by [`reconcile`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reconciliation {
    /// Documents whose content is new or differs from the snapshot.
    pub document_writes: BTreeMap<String, Value>,
    pub active: ActiveLedger,
    pub removed: RemovedLedger,
    /// One entry per type that changed in any way. Unchanged types are absent.
    pub changes: Vec<TypeChange>,
}

impl Reconciliation {
    pub fn count(&self, kind: ChangeKind) -> usize {
        self.changes.iter().filter(|c| c.kind == kind).count()
    }
}

/// Compare `fetch` against `snapshot` at time `now`.
///
/// Fails with [`TrackerError::CatalogCollapse`] before producing any state when
/// the collapse guard trips.
pub fn reconcile(
    snapshot: Snapshot,
    fetch: &CatalogFetch,
    now: Timestamp,
    options: &ReconcileOptions,
) -> Result<Reconciliation> {
    let Snapshot {
        documents,
        mut active,
        mut removed,
    } = snapshot;

    let removals: Vec<String> = active
        .keys()
        .filter(|name| !fetch.listed.contains(*name))
        .cloned()
        .collect();
    options
        .guard
        .check(active.len(), fetch.listed.len(), removals.len())?;

    let mut document_writes = BTreeMap::new();
    let mut changes = Vec::new();

    for fetched in &fetch.fetched {
        let type_name = &fetched.type_name;
        let content_changed = documents.get(type_name) != Some(&fetched.schema);
        if content_changed {
            document_writes.insert(type_name.clone(), fetched.schema.clone());
        }

        let kind = match active.get_mut(type_name) {
            Some(record) => {
                let metadata_changed = record.refresh_metadata(&fetched.metadata);
                if content_changed {
                    record.last_updated = now;
                    Some(ChangeKind::Updated)
                } else if metadata_changed {
                    Some(ChangeKind::MetadataRefreshed)
                } else {
                    None
                }
            }
            None => {
                let fresh = VersionRecord::first_observed(now, &fetched.metadata);
                let (record, kind) = match removed.remove(type_name) {
                    Some(previous) => {
                        let record = match options.reappear_policy {
                            ReappearPolicy::Fresh => fresh,
                            ReappearPolicy::Restore => {
                                restore(previous, &fetched.metadata, content_changed, now)
                            }
                        };
                        (record, ChangeKind::Reappeared)
                    }
                    None => (fresh, ChangeKind::Added),
                };
                active.insert(type_name.clone(), record);
                Some(kind)
            }
        };

        match kind {
            Some(kind) => {
                info!("{type_name}: {}", kind.label());
                changes.push(TypeChange {
                    type_name: type_name.clone(),
                    kind,
                });
            }
            None => debug!("{type_name}: unchanged"),
        }
    }

    for type_name in removals {
        if let Some(record) = active.remove(&type_name) {
            warn!("Schema removed: {type_name}");
            removed.insert(
                type_name.clone(),
                RemovedRecord {
                    record,
                    removed_date: now,
                },
            );
            changes.push(TypeChange {
                type_name,
                kind: ChangeKind::Removed,
            });
        }
    }

    // A type is tracked in exactly one ledger.
    removed.retain(|type_name, _| !active.contains_key(type_name));

    Ok(Reconciliation {
        document_writes,
        active,
        removed,
        changes,
    })
}

/// Revive a removed record: `first_seen` survives, metadata is refreshed.
fn restore(
    previous: RemovedRecord,
    metadata: &ProviderMetadata,
    content_changed: bool,
    now: Timestamp,
) -> VersionRecord {
    let mut record = previous.record;
    record.refresh_metadata(metadata);
    if content_changed {
        record.last_updated = now;
    }
    record
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::types::{DeprecationStatus, FetchedType};

    fn ts(raw: &str) -> Timestamp {
        raw.parse().unwrap()
    }

    fn fetched(name: &str, schema: Value) -> FetchedType {
        FetchedType {
            type_name: name.to_string(),
            schema,
            metadata: ProviderMetadata::default(),
        }
    }

    #[test]
    fn test_guard_trips_on_empty_catalog() {
        let guard = CollapseGuard::default();
        assert!(guard.check(500, 0, 500).is_err());
        assert!(guard.check(0, 0, 0).is_ok());
    }

    #[test]
    fn test_guard_ratio_boundary() {
        let guard = CollapseGuard::default();
        assert!(guard.check(2, 1, 1).is_ok());
        assert!(guard.check(10, 4, 6).is_err());
        let disabled = CollapseGuard {
            enabled: false,
            ..CollapseGuard::default()
        };
        assert!(disabled.check(500, 0, 500).is_ok());
    }

    #[test]
    fn test_metadata_refresh_does_not_bump_last_updated() {
        let first = ts("2024-01-01T00:00:00Z");
        let second = ts("2024-01-02T00:00:00Z");
        let schema = json!({"typeName": "AWS::S3::Bucket"});

        let mut snapshot = Snapshot::default();
        snapshot
            .documents
            .insert("AWS::S3::Bucket".to_string(), schema.clone());
        snapshot.active.insert(
            "AWS::S3::Bucket".to_string(),
            VersionRecord::first_observed(first, &ProviderMetadata::default()),
        );

        let mut bucket = fetched("AWS::S3::Bucket", schema);
        bucket.metadata.deprecation_status = Some(DeprecationStatus::Deprecated);
        let result = reconcile(
            snapshot,
            &CatalogFetch::from_fetched(vec![bucket]),
            second,
            &ReconcileOptions::default(),
        )
        .unwrap();

        assert!(result.document_writes.is_empty());
        let record = &result.active["AWS::S3::Bucket"];
        assert_eq!(record.last_updated, first);
        assert_eq!(
            record.deprecation_status,
            Some(DeprecationStatus::Deprecated)
        );
        assert_eq!(result.count(ChangeKind::MetadataRefreshed), 1);
    }

    #[test]
    fn test_restore_policy_keeps_first_seen() {
        let first = ts("2023-06-01T00:00:00Z");
        let gone = ts("2023-09-01T00:00:00Z");
        let back = ts("2024-01-01T00:00:00Z");

        let mut snapshot = Snapshot::default();
        snapshot.removed.insert(
            "AWS::Old::Thing".to_string(),
            RemovedRecord {
                record: VersionRecord::first_observed(first, &ProviderMetadata::default()),
                removed_date: gone,
            },
        );
        let fetch = CatalogFetch::from_fetched(vec![fetched("AWS::Old::Thing", json!({"v": 2}))]);

        let restored = reconcile(
            snapshot.clone(),
            &fetch,
            back,
            &ReconcileOptions {
                reappear_policy: ReappearPolicy::Restore,
                ..ReconcileOptions::default()
            },
        )
        .unwrap();
        assert_eq!(restored.active["AWS::Old::Thing"].first_seen, first);
        assert_eq!(restored.active["AWS::Old::Thing"].last_updated, back);
        assert!(restored.removed.is_empty());

        let fresh = reconcile(snapshot, &fetch, back, &ReconcileOptions::default()).unwrap();
        assert_eq!(fresh.active["AWS::Old::Thing"].first_seen, back);
        assert!(fresh.removed.is_empty());
        assert_eq!(fresh.count(ChangeKind::Reappeared), 1);
    }

    #[test]
    fn test_stale_removed_entry_dropped_for_active_type() {
        let now = ts("2024-01-01T00:00:00Z");
        let schema = json!({"a": 1});

        let mut snapshot = Snapshot::default();
        snapshot
            .documents
            .insert("AWS::S3::Bucket".to_string(), schema.clone());
        let record = VersionRecord::first_observed(now, &ProviderMetadata::default());
        snapshot
            .active
            .insert("AWS::S3::Bucket".to_string(), record.clone());
        snapshot.removed.insert(
            "AWS::S3::Bucket".to_string(),
            RemovedRecord {
                record,
                removed_date: now,
            },
        );

        let result = reconcile(
            snapshot,
            &CatalogFetch::from_fetched(vec![fetched("AWS::S3::Bucket", schema)]),
            now,
            &ReconcileOptions::default(),
        )
        .unwrap();
        assert!(result.removed.is_empty());
        assert!(result.changes.is_empty());
    }

    #[test]
    fn test_failed_describe_is_not_a_removal() {
        let now = ts("2024-01-01T00:00:00Z");
        let mut snapshot = Snapshot::default();
        for name in ["AWS::S3::Bucket", "AWS::SQS::Queue"] {
            snapshot.active.insert(
                name.to_string(),
                VersionRecord::first_observed(now, &ProviderMetadata::default()),
            );
        }

        let mut fetch = CatalogFetch::from_fetched(vec![fetched("AWS::S3::Bucket", json!({}))]);
        fetch.listed.insert("AWS::SQS::Queue".to_string());

        let result = reconcile(snapshot, &fetch, now, &ReconcileOptions::default()).unwrap();
        assert!(result.active.contains_key("AWS::SQS::Queue"));
        assert!(result.removed.is_empty());
    }
}
