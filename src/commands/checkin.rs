use crate::core::{command_init::CommandContext, error::Result, host::ConsoleHost, output::print_success};
use std::path::Path;
use std::sync::Arc;

/// Check in one file. Without `-m`, a template using `${comment}` prompts on stdin.
pub async fn execute_checkin(context: &CommandContext, file: &Path, message: Option<String>) -> Result<()> {
    let path = context.resolve_existing(file)?;
    let reconciler = context.reconciler(Arc::new(ConsoleHost::new()));

    reconciler.checkin(&path, message.as_deref()).await?;

    print_success(&format!("Checked in {}", file.display()));
    println!();
    Ok(())
}
