pub mod history;
pub mod init;
pub mod show;
pub mod status;
pub mod sync;

use std::path::Path;

use anyhow::{Context, Result};
use schemaledger::TrackerContext;

use crate::output::OutputManager;

/// Load the tracker context for `root`, noting when defaults are in use.
pub fn load_context(root: &Path, output: &OutputManager) -> Result<TrackerContext> {
    let ctx = TrackerContext::from_root(root)
        .with_context(|| format!("Failed to load configuration from {}", root.display()))?;
    if !ctx.config_loaded {
        output.info(&format!(
            "No {} found, using defaults",
            schemaledger::config::CONFIG_FILE_NAME
        ));
    }
    Ok(ctx)
}
