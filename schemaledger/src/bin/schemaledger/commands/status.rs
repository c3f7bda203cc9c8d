use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use comfy_table::{Cell, Table};
use schemaledger::{DeprecationStatus, SnapshotStore, Timestamp};
use serde::Serialize;

use crate::commands::load_context;
use crate::examples::ExampleGroup;
use crate::output::{OutputManager, TableDisplay};

pub const EXAMPLES: &[ExampleGroup] = &[ExampleGroup {
    title: "Ledger Status",
    commands: &[
        "schemaledger status                    # Counts and the most recent updates",
        "schemaledger status --recent 25        # Show more recent updates",
    ],
}];

#[derive(Args)]
pub struct StatusArgs {
    /// Number of most recently updated types to list
    #[arg(long, default_value_t = 10)]
    pub recent: usize,
}

#[derive(Debug, Serialize)]
pub struct RecentUpdate {
    pub type_name: String,
    pub last_updated: Timestamp,
}

#[derive(Debug, Serialize)]
pub struct StatusSummary {
    pub active: usize,
    pub removed: usize,
    pub deprecated: usize,
    pub documents: usize,
    /// Stored documents with no record in either ledger.
    pub untracked_documents: Vec<String>,
    /// Active records without a stored document.
    pub missing_documents: Vec<String>,
    pub recent: Vec<RecentUpdate>,
}

pub async fn handle_status(args: StatusArgs, root: &Path, output: &OutputManager) -> Result<()> {
    let ctx = load_context(root, output)?;
    let store = SnapshotStore::new(ctx.layout());

    let summary = summarize(&store, args.recent)?;

    output.heading("Ledger Status");
    output.display(&summary)?;

    if !summary.untracked_documents.is_empty() {
        output.warning(&format!(
            "{} document(s) have no ledger record; the next sync will adopt them",
            summary.untracked_documents.len()
        ));
    }
    if !summary.missing_documents.is_empty() {
        output.warning(&format!(
            "{} active type(s) have no stored document",
            summary.missing_documents.len()
        ));
    }

    Ok(())
}

pub fn summarize(store: &SnapshotStore, recent: usize) -> Result<StatusSummary> {
    let active = store
        .load_active_ledger()
        .context("Failed to load active ledger")?;
    let removed = store
        .load_removed_ledger()
        .context("Failed to load removed ledger")?;
    let documents: BTreeSet<String> = store
        .list_documents()
        .context("Failed to list schema documents")?
        .into_iter()
        .collect();

    let untracked_documents = documents
        .iter()
        .filter(|name| !active.contains_key(*name) && !removed.contains_key(*name))
        .cloned()
        .collect();
    let missing_documents = active
        .keys()
        .filter(|name| !documents.contains(*name))
        .cloned()
        .collect();
    let deprecated = active
        .values()
        .filter(|record| record.deprecation_status == Some(DeprecationStatus::Deprecated))
        .count();

    let mut by_update: Vec<RecentUpdate> = active
        .iter()
        .map(|(type_name, record)| RecentUpdate {
            type_name: type_name.clone(),
            last_updated: record.last_updated,
        })
        .collect();
    by_update.sort_by(|a, b| {
        b.last_updated
            .cmp(&a.last_updated)
            .then_with(|| a.type_name.cmp(&b.type_name))
    });
    by_update.truncate(recent);

    Ok(StatusSummary {
        active: active.len(),
        removed: removed.len(),
        deprecated,
        documents: documents.len(),
        untracked_documents,
        missing_documents,
        recent: by_update,
    })
}

impl TableDisplay for StatusSummary {
    fn to_table(&self, output: &OutputManager) -> Table {
        let mut table = output.create_table();
        output.add_table_header(&mut table, vec!["Metric", "Value"]);
        table.add_row(vec![Cell::new("Active types"), Cell::new(self.active)]);
        table.add_row(vec![Cell::new("Removed types"), Cell::new(self.removed)]);
        table.add_row(vec![Cell::new("Deprecated"), Cell::new(self.deprecated)]);
        table.add_row(vec![Cell::new("Stored documents"), Cell::new(self.documents)]);

        for update in &self.recent {
            table.add_row(vec![
                Cell::new(&update.type_name),
                Cell::new(update.last_updated.as_datetime().format("%Y-%m-%d %H:%M:%S UTC")),
            ]);
        }
        table
    }

    fn to_compact(&self) -> String {
        format!(
            "active={} removed={} deprecated={} documents={}",
            self.active, self.removed, self.deprecated, self.documents
        )
    }
}
