use crate::core::{
    command_init::CommandContext,
    error::Result,
    host::{ConsoleHost, EditorHost},
    output::print_success,
};
use std::path::Path;
use std::sync::Arc;

pub async fn execute_undo_checkout(context: &CommandContext, file: &Path, yes: bool) -> Result<()> {
    let path = context.resolve_existing(file)?;
    let host = Arc::new(ConsoleHost::new().with_assume_yes(yes));
    let reconciler = context.reconciler(host.clone());

    let question = format!("Undo the checkout of {}?", file.display());
    if !host.confirm(&question).await {
        log::debug!("Undo checkout of {} declined", path.display());
        return Ok(());
    }

    reconciler.undo_checkout(&path).await?;

    print_success(&format!("Undid checkout of {}", file.display()));
    println!();
    Ok(())
}
