use crate::core::{command_init::CommandContext, error::Result, print_info};
use colored::*;
use std::path::Path;

/// Show the changes of a file against its predecessor version
pub async fn execute_diff(context: &CommandContext, file: &Path) -> Result<()> {
    let path = context.resolve_existing(file)?;

    let Some(predecessor) = context.cleartool.predecessor(&path).await? else {
        print_info(&format!("{} has no predecessor version", file.display()));
        return Ok(());
    };

    print!("{}", "═══ ".bright_blue().bold());
    print!("{}", format!("{}@@{predecessor}", file.display()).bright_blue().bold());
    println!("{}", " ═══".bright_blue().bold());

    let diff = context.cleartool.diff_with_predecessor(&path).await?;
    if diff.trim().is_empty() {
        println!("No changes.");
    }
    for line in diff.lines() {
        println!("{}", colorize_diff_line(line));
    }
    println!();
    Ok(())
}

/// `diff -serial_format` prefixes removed lines with `<`, added ones with `>`
fn colorize_diff_line(line: &str) -> ColoredString {
    if line.starts_with('<') {
        line.red()
    } else if line.starts_with('>') {
        line.green()
    } else if line.starts_with("-----") || line.starts_with("*****") {
        line.bright_black()
    } else {
        line.normal()
    }
}
