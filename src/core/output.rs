//! Unified output formatting utilities for consistent CLI presentation.
//!
//! # Design Principles
//! - **Consistent color scheme**: Red for errors, yellow for warnings, green for success
//! - **Standardized spacing**: Newline before and after all command outputs

use crate::core::colors::format_file_status;
use crate::core::state::TrackedFile;
use colored::*;
use std::path::Path;

/// Formats and prints an error message with consistent styling
///
/// # Format
/// ```text
///
/// ✕ Error: <message>
///
/// ```
pub fn print_error(message: &str) {
    println!("\n{} {}\n", "✕ Error:".red(), message.white());
}

/// Formats and prints a warning
///
/// # Format
/// ```text
///
/// ! Warning: <message>
/// ```
pub fn print_warning(message: &str) {
    println!("\n{} {}", "! Warning:".yellow(), message.white());
}

/// Formats and prints a success message with consistent styling
///
/// # Format
/// ```text
///
/// ✓ <message>
/// ```
pub fn print_success(message: &str) {
    println!("\n{} {}", "✓".green(), message.white());
}

/// Formats and prints an informational message with consistent styling
pub fn print_info(message: &str) {
    println!("\n{}\n", message.white());
}

/// Formats and prints a section header with consistent styling
pub fn print_section_header(header: &str) {
    println!("\n{}:\n", header.white());
}

/// Print one resource group as a numbered list, paths relative to `root` where possible
pub fn print_group(header: &str, files: &[TrackedFile], root: &Path) {
    print_section_header(&format!("{header} ({})", files.len()));
    if files.is_empty() {
        println!("  {}", "(none)".bright_black());
        return;
    }
    for (i, file) in files.iter().enumerate() {
        let shown = file.path.strip_prefix(root).unwrap_or(&file.path);
        println!("{}", format_file_status(i + 1, file.status, &shown.display().to_string()));
    }
}
