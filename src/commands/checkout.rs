use crate::core::{command_init::CommandContext, error::Result, host::ConsoleHost, output::print_success};
use std::path::PathBuf;
use std::sync::Arc;

/// Check out each file in turn; the first failure stops the run
pub async fn execute_checkout(context: &CommandContext, files: Vec<PathBuf>) -> Result<()> {
    let reconciler = context.reconciler(Arc::new(ConsoleHost::new()));

    let mut checked_out = 0;
    for file in &files {
        let path = context.resolve_existing(file)?;
        log::debug!("Checking out {}", path.display());
        reconciler.checkout(&path).await?;
        checked_out += 1;
    }

    print_success(&format!(
        "Checked out {checked_out} file(s), {} checked out in this view",
        reconciler.groups().counts().checkout
    ));
    println!();
    Ok(())
}
