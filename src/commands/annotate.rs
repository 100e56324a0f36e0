use crate::core::{command_init::CommandContext, error::Result, process::FailurePolicy};
use std::path::Path;

/// Print annotate output as cleartool produces it
pub async fn execute_annotate(context: &CommandContext, file: &Path) -> Result<()> {
    let path = context.resolve_existing(file)?;
    let mut handle = context.cleartool.annotate(&path).await?;
    log::debug!("Streaming annotate of {} (pid {})", path.display(), handle.pid());

    let mut lines = 0usize;
    while let Some(line) = handle.lines().next_line().await {
        println!("{line}");
        lines += 1;
    }

    handle.output(FailurePolicy::ActiveSession).await?;
    log::debug!("Annotate printed {lines} line(s)");
    Ok(())
}
