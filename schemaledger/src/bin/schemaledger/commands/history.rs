use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use comfy_table::{Cell, Table};
use schemaledger::SnapshotStore;
use schemaledger::history::{HistoryEntry, schema_history};
use serde::Serialize;

use crate::commands::load_context;
use crate::examples::ExampleGroup;
use crate::output::{OutputManager, TableDisplay};

pub const EXAMPLES: &[ExampleGroup] = &[ExampleGroup {
    title: "Schema History",
    commands: &[
        "schemaledger history AWS::S3::Bucket           # Last 5 commits touching the schema",
        "schemaledger history AWS::S3::Bucket --limit 20",
    ],
}];

#[derive(Args)]
pub struct HistoryArgs {
    /// Resource type name, e.g. AWS::S3::Bucket
    pub type_name: String,

    /// Maximum number of commits to show
    #[arg(long, default_value_t = 5)]
    pub limit: usize,
}

#[derive(Debug, Serialize)]
pub struct SchemaHistory {
    pub type_name: String,
    pub entries: Vec<HistoryEntry>,
}

pub async fn handle_history(args: HistoryArgs, root: &Path, output: &OutputManager) -> Result<()> {
    let ctx = load_context(root, output)?;
    let store = SnapshotStore::new(ctx.layout());
    let path = store.document_path(&args.type_name)?;

    let entries = schema_history(&ctx.root, &path, args.limit)
        .with_context(|| format!("Failed to read git history for {}", path.display()))?;

    output.heading(&format!("History: {}", args.type_name));
    if entries.is_empty() {
        output.info("No commits touch this schema yet");
    }
    output.display(&SchemaHistory {
        type_name: args.type_name,
        entries,
    })?;
    Ok(())
}

impl TableDisplay for SchemaHistory {
    fn to_table(&self, output: &OutputManager) -> Table {
        let mut table = output.create_table();
        output.add_table_header(&mut table, vec!["Commit", "Date"]);
        for entry in &self.entries {
            table.add_row(vec![Cell::new(&entry.commit), Cell::new(&entry.date)]);
        }
        table
    }

    fn to_compact(&self) -> String {
        format!(
            "{} updates={} latest={}",
            self.type_name,
            self.entries.len(),
            self.entries.first().map_or("-", |e| e.date.as_str())
        )
    }
}
