use crate::core::{command_init::CommandContext, error::Result, host::ConsoleHost, output::print_success};
use std::path::PathBuf;
use std::sync::Arc;

/// Update a snapshot-view file or directory; defaults to the whole view
pub async fn execute_update(context: &CommandContext, path: Option<PathBuf>) -> Result<()> {
    let path = match path {
        Some(path) => context.resolve_existing(&path)?,
        None => context.view_root.clone(),
    };
    let reconciler = context.reconciler(Arc::new(ConsoleHost::new()));

    reconciler.update(&path).await?;

    print_success(&format!("Updated {}", path.display()));
    println!();
    Ok(())
}
