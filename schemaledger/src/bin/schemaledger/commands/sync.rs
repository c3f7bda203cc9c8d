use std::path::Path;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use comfy_table::{Cell, Table};
use schemaledger::{
    ChangeKind, CloudFormationCatalog, ReappearPolicy, RunOptions, RunReport, SnapshotStore,
    Timestamp, run_sync,
};

use crate::commands::load_context;
use crate::examples::ExampleGroup;
use crate::output::{OutputManager, TableDisplay};
use crate::theme::ICONS;

pub const EXAMPLES: &[ExampleGroup] = &[
    ExampleGroup {
        title: "Scheduled Run",
        commands: &[
            "schemaledger sync                      # Fetch, reconcile, and write the snapshot",
            "schemaledger --output json sync        # Same, with a JSON run report",
        ],
    },
    ExampleGroup {
        title: "Inspection",
        commands: &[
            "schemaledger sync --dry-run            # Report changes without writing",
            "schemaledger sync --reappear restore   # Keep first_seen for returning types",
        ],
    },
];

#[derive(Args)]
pub struct SyncArgs {
    /// Reconcile and report without writing any file
    #[arg(long)]
    pub dry_run: bool,

    /// Apply the catalog even if it would remove most tracked types
    #[arg(long)]
    pub allow_mass_removal: bool,

    /// How to record types that reappear after removal (overrides config)
    #[arg(long, value_enum)]
    pub reappear: Option<ReappearArg>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ReappearArg {
    /// New record, first_seen = now
    Fresh,
    /// Reuse the removed record's first_seen
    Restore,
}

impl From<ReappearArg> for ReappearPolicy {
    fn from(arg: ReappearArg) -> Self {
        match arg {
            ReappearArg::Fresh => ReappearPolicy::Fresh,
            ReappearArg::Restore => ReappearPolicy::Restore,
        }
    }
}

pub async fn handle_sync(args: SyncArgs, root: &Path, output: &OutputManager) -> Result<()> {
    let ctx = load_context(root, output)?;

    let mut reconcile = ctx.reconcile_options();
    if args.allow_mass_removal {
        reconcile.guard.enabled = false;
        output.warning("Catalog collapse guard disabled");
    }
    if let Some(reappear) = args.reappear {
        reconcile.reappear_policy = reappear.into();
    }
    let options = RunOptions {
        fetch: ctx.fetch_options(),
        reconcile,
        dry_run: args.dry_run,
    };

    output.heading("Schema Sync");
    output.key_value("Snapshot", &ctx.root.display().to_string());

    let aws = &ctx.config.aws;
    let catalog = CloudFormationCatalog::connect(
        aws.resolved_region().as_deref(),
        aws.resolved_endpoint_url().as_deref(),
    )
    .await;
    let store = SnapshotStore::new(ctx.layout());

    let report = run_sync(&catalog, &store, &options, Timestamp::now())
        .await
        .context("Schema sync failed")?;

    output.display(&report)?;

    for failure in &report.failures {
        output.warning(&format!("Skipped {}: {}", failure.type_name, failure.message));
    }
    if report.dry_run {
        output.info("Dry run: no files were written");
    } else if report.has_changes() {
        output.success(&format!("{} change(s) recorded", report.changes.len()));
    } else {
        output.success("No schema changes detected");
    }

    Ok(())
}

pub fn change_icon(kind: ChangeKind) -> &'static str {
    match kind {
        ChangeKind::Added | ChangeKind::Reappeared => ICONS.plus,
        ChangeKind::Removed => ICONS.minus,
        ChangeKind::Updated => ICONS.changed,
        ChangeKind::MetadataRefreshed => ICONS.info,
    }
}

impl TableDisplay for RunReport {
    fn to_table(&self, output: &OutputManager) -> Table {
        let mut table = output.create_table();
        output.add_table_header(&mut table, vec!["", "Resource type", "Change"]);

        for change in &self.changes {
            table.add_row(vec![
                Cell::new(change_icon(change.kind)),
                Cell::new(&change.type_name),
                Cell::new(change.kind.label()),
            ]);
        }
        if self.changes.is_empty() {
            table.add_row(vec![Cell::new(""), Cell::new("No changes"), Cell::new("")]);
        }

        table.add_row(vec![
            Cell::new(""),
            Cell::new(format!(
                "{} listed, {} fetched, {} unchanged, {} skipped",
                self.listed,
                self.fetched,
                self.unchanged,
                self.failures.len()
            )),
            Cell::new(format!("{} document(s) written", self.documents_written)),
        ]);
        table
    }

    fn to_compact(&self) -> String {
        format!(
            "listed={} fetched={} added={} updated={} metadata={} reappeared={} removed={} skipped={} written={}",
            self.listed,
            self.fetched,
            self.added,
            self.updated,
            self.metadata_refreshed,
            self.reappeared,
            self.removed,
            self.failures.len(),
            self.documents_written
        )
    }
}
