use crate::core::{
    cleartool::VersionControl,
    command_init::CommandContext,
    error::Result,
    version::{VersionInfo, VersionState},
};
use colored::*;
use std::path::Path;

pub async fn execute_version(context: &CommandContext, file: &Path) -> Result<()> {
    let path = context.resolve_existing(file)?;
    let info = context.cleartool.version_info(&path).await?;
    println!("\n{}  {}\n", file.display().to_string().white(), describe(&info));
    Ok(())
}

fn describe(info: &VersionInfo) -> ColoredString {
    match info.state() {
        Some(VersionState::Hijacked) => format!("{} (hijacked)", info.label()).magenta().bold(),
        Some(VersionState::Untracked) => info.label().cyan(),
        Some(VersionState::Versioned) if info.is_checked_out() => info.label().yellow(),
        Some(VersionState::Versioned) => info.label().green(),
        None => "unknown".bright_black(),
    }
}
