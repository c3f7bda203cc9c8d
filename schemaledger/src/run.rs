//! One scheduled run: fetch, reconcile, persist.

use log::info;
use serde::Serialize;

use crate::catalog::{FetchFailure, FetchOptions, SchemaCatalog, fetch_catalog};
use crate::errors::Result;
use crate::reconcile::{ChangeKind, ReconcileOptions, Reconciliation, TypeChange, reconcile};
use crate::store::{Snapshot, SnapshotStore};
use crate::types::Timestamp;

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub fetch: FetchOptions,
    pub reconcile: ReconcileOptions,
    /// Reconcile and report, but write nothing.
    pub dry_run: bool,
}

/// Summary of a run, suitable for display or JSON output.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_time: Timestamp,
    pub dry_run: bool,
    pub listed: usize,
    pub fetched: usize,
    pub added: usize,
    pub updated: usize,
    pub metadata_refreshed: usize,
    pub reappeared: usize,
    pub removed: usize,
    pub unchanged: usize,
    pub documents_written: usize,
    pub active_ledger_written: bool,
    pub removed_ledger_written: bool,
    pub changes: Vec<TypeChange>,
    pub failures: Vec<FetchFailure>,
}

impl RunReport {
    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }
}

/// Which files a reconciliation needs to rewrite.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WritePlan {
    pub documents: usize,
    pub active_ledger: bool,
    pub removed_ledger: bool,
}

impl WritePlan {
    pub fn for_reconciliation(prior: &Snapshot, reconciliation: &Reconciliation) -> Self {
        Self {
            documents: reconciliation.document_writes.len(),
            active_ledger: prior.active != reconciliation.active,
            removed_ledger: prior.removed != reconciliation.removed,
        }
    }
}

/// Fetch the catalog, reconcile it against `store` at `now`, and persist the result.
///
/// A collapse-guard trip or listing failure returns before anything is written.
pub async fn run_sync(
    catalog: &dyn SchemaCatalog,
    store: &SnapshotStore,
    options: &RunOptions,
    now: Timestamp,
) -> Result<RunReport> {
    let fetch = fetch_catalog(catalog, &options.fetch).await?;
    let snapshot = store.load_snapshot(fetch.fetched.iter().map(|t| t.type_name.as_str()))?;
    let prior = Snapshot {
        documents: Default::default(),
        active: snapshot.active.clone(),
        removed: snapshot.removed.clone(),
    };

    let reconciliation = reconcile(snapshot, &fetch, now, &options.reconcile)?;
    let plan = WritePlan::for_reconciliation(&prior, &reconciliation);

    let written = if options.dry_run {
        info!("Dry run: skipping writes");
        WritePlan::default()
    } else {
        persist(store, &reconciliation, plan)?;
        plan
    };

    let changed = reconciliation.changes.len();
    let removed = reconciliation.count(ChangeKind::Removed);
    Ok(RunReport {
        run_time: now,
        dry_run: options.dry_run,
        listed: fetch.listed.len(),
        fetched: fetch.fetched.len(),
        added: reconciliation.count(ChangeKind::Added),
        updated: reconciliation.count(ChangeKind::Updated),
        metadata_refreshed: reconciliation.count(ChangeKind::MetadataRefreshed),
        reappeared: reconciliation.count(ChangeKind::Reappeared),
        removed,
        unchanged: fetch.fetched.len().saturating_sub(changed - removed),
        documents_written: written.documents,
        active_ledger_written: written.active_ledger,
        removed_ledger_written: written.removed_ledger,
        changes: reconciliation.changes,
        failures: fetch.failures,
    })
}

/// Write the removed ledger, then the active ledger, then the documents.
///
/// Ledgers go first so an interrupted run leaves stored documents behind the
/// ledger: the next run still sees the content difference and records it.
/// A removal lands in the removed ledger before it leaves the active one.
pub fn persist(
    store: &SnapshotStore,
    reconciliation: &Reconciliation,
    plan: WritePlan,
) -> Result<()> {
    if plan.removed_ledger {
        store.save_removed_ledger(&reconciliation.removed)?;
    }
    if plan.active_ledger {
        store.save_active_ledger(&reconciliation.active)?;
    }
    for (type_name, document) in &reconciliation.document_writes {
        store.save_document(type_name, document)?;
    }

    info!(
        "Wrote {} document(s); active ledger {}, removed ledger {}",
        plan.documents,
        if plan.active_ledger { "updated" } else { "unchanged" },
        if plan.removed_ledger { "updated" } else { "unchanged" },
    );
    Ok(())
}
