use std::path::Path;

use anyhow::{Result, bail};
use clap::Args;
use comfy_table::{Cell, Table};
use schemaledger::{SnapshotStore, Timestamp, VersionRecord};
use serde::Serialize;

use crate::commands::load_context;
use crate::examples::ExampleGroup;
use crate::output::{OutputManager, TableDisplay};

pub const EXAMPLES: &[ExampleGroup] = &[ExampleGroup {
    title: "Single Type",
    commands: &[
        "schemaledger show AWS::S3::Bucket      # Ledger record for one resource type",
    ],
}];

#[derive(Args)]
pub struct ShowArgs {
    /// Resource type name, e.g. AWS::S3::Bucket
    pub type_name: String,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeState {
    Active,
    Removed,
}

#[derive(Debug, Serialize)]
pub struct TypeDetails {
    pub type_name: String,
    pub state: TypeState,
    #[serde(flatten)]
    pub record: VersionRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub removed_date: Option<Timestamp>,
    pub document_path: String,
    pub document_exists: bool,
}

pub async fn handle_show(args: ShowArgs, root: &Path, output: &OutputManager) -> Result<()> {
    let ctx = load_context(root, output)?;
    let store = SnapshotStore::new(ctx.layout());

    let Some(details) = lookup(&store, &args.type_name)? else {
        output.error(&format!("{} is not in either ledger", args.type_name));
        bail!("Unknown resource type: {}", args.type_name);
    };

    output.heading(&details.type_name);
    output.display(&details)?;
    Ok(())
}

pub fn lookup(store: &SnapshotStore, type_name: &str) -> Result<Option<TypeDetails>> {
    let (state, record, removed_date) =
        if let Some(record) = store.load_active_ledger()?.remove(type_name) {
            (TypeState::Active, record, None)
        } else if let Some(removed) = store.load_removed_ledger()?.remove(type_name) {
            (TypeState::Removed, removed.record, Some(removed.removed_date))
        } else {
            return Ok(None);
        };

    let document_path = store.document_path(type_name)?;
    Ok(Some(TypeDetails {
        type_name: type_name.to_string(),
        state,
        record,
        removed_date,
        document_exists: document_path.exists(),
        document_path: document_path.display().to_string(),
    }))
}

fn fmt_ts(ts: &Timestamp) -> String {
    ts.as_datetime().format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

impl TableDisplay for TypeDetails {
    fn to_table(&self, output: &OutputManager) -> Table {
        let mut table = output.create_table();
        let state = match self.state {
            TypeState::Active => "active",
            TypeState::Removed => "removed",
        };
        table.add_row(vec![Cell::new("State"), Cell::new(state)]);
        table.add_row(vec![
            Cell::new("First seen"),
            Cell::new(fmt_ts(&self.record.first_seen)),
        ]);
        table.add_row(vec![
            Cell::new("Last updated"),
            Cell::new(fmt_ts(&self.record.last_updated)),
        ]);
        if let Some(created) = &self.record.time_created {
            table.add_row(vec![Cell::new("Created (provider)"), Cell::new(fmt_ts(created))]);
        }
        if let Some(status) = &self.record.deprecation_status {
            table.add_row(vec![Cell::new("Deprecation"), Cell::new(status.as_str())]);
        }
        if let Some(removed) = &self.removed_date {
            table.add_row(vec![Cell::new("Removed"), Cell::new(fmt_ts(removed))]);
        }
        let document = if self.document_exists {
            self.document_path.clone()
        } else {
            format!("{} (missing)", self.document_path)
        };
        table.add_row(vec![Cell::new("Document"), Cell::new(document)]);
        table
    }

    fn to_compact(&self) -> String {
        format!(
            "{} state={:?} first_seen={} last_updated={}",
            self.type_name, self.state, self.record.first_seen, self.record.last_updated
        )
    }
}
