use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use schemaledger::TrackerContext;

use crate::examples::ExampleGroup;
use crate::output::OutputManager;
use crate::theme::ICONS;

pub const EXAMPLES: &[ExampleGroup] = &[ExampleGroup {
    title: "Setup",
    commands: &[
        "schemaledger init                      # Write schemaledger.toml in the current directory",
        "schemaledger --root ./cfn-schemas init # Initialize another checkout",
    ],
}];

#[derive(Args)]
pub struct InitArgs {}

pub async fn handle_init(_args: InitArgs, root: &Path, output: &OutputManager) -> Result<()> {
    output.heading("Initialize schemaledger");

    std::fs::create_dir_all(root)
        .with_context(|| format!("Failed to create {}", root.display()))?;
    let config_path = TrackerContext::write_default_config(root)?;
    output.success(&format!("Created {}", config_path.display()));

    let ctx = TrackerContext::from_root(root)?;
    let layout = ctx.layout();
    std::fs::create_dir_all(&layout.schemas_dir)
        .with_context(|| format!("Failed to create {}", layout.schemas_dir.display()))?;
    output.success(&format!("Created {}", layout.schemas_dir.display()));

    output.info("Next steps:");
    output.indented(ICONS.arrow, "Configure AWS credentials (AWS_PROFILE or AWS_ACCESS_KEY_ID)");
    output.indented(ICONS.arrow, "Run 'schemaledger sync' and commit the result");

    Ok(())
}
