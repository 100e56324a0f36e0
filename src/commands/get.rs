use crate::core::{command_init::CommandContext, error::Result, output::print_success};
use std::path::Path;

/// Fetch `file@@version` into the temp directory and print where it went
pub async fn execute_get(context: &CommandContext, file: &Path, version: &str) -> Result<()> {
    let path = context.resolve(file);
    let fetched = context.cleartool.fetch_version(&path, version).await?;
    print_success(&format!("{}@@{version}", file.display()));
    println!("{}\n", fetched.display());
    Ok(())
}
