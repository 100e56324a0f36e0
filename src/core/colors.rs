//! Unified color system for file status visualization.
//!
//! Every status letter and path printed by the CLI goes through this module so the
//! three resource groups keep one color each.
//!
//! # Public API
//! - [`get_status_color_style`]: Get color function for a file status
//! - [`get_aligned_status`]: Get properly aligned colored status text
//! - [`get_colored_path`]: Apply status color to file paths
//! - [`format_file_status`]: Complete file line formatting
//!
//! # Color Scheme
//! - **Modified** (checked out): Yellow
//! - **Hijacked**: Magenta bold, the file was changed without a checkout
//! - **Untracked** (view-private): Cyan

use crate::core::file_status::FileStatus;
use colored::*;

/// Returns a closure that applies the color of `status` to any text
pub fn get_status_color_style(status: FileStatus) -> Box<dyn Fn(&str) -> ColoredString> {
    match status {
        FileStatus::Modified => Box::new(|text: &str| text.yellow()),
        FileStatus::Hijacked => Box::new(|text: &str| text.magenta().bold()),
        FileStatus::Untracked => Box::new(|text: &str| text.cyan()),
    }
}

/// Get colored status symbol padded to a fixed width
pub fn get_aligned_status(status: FileStatus) -> ColoredString {
    let color_fn = get_status_color_style(status);
    color_fn(&format!("{} ", status.as_str()))
}

pub fn get_colored_path(status: FileStatus, path: &str) -> ColoredString {
    let color_fn = get_status_color_style(status);
    color_fn(path)
}

/// One listing line: `[index] S  path`
pub fn format_file_status(index: usize, status: FileStatus, path: &str) -> String {
    let index_colored = format!("[{index}]").cyan().bold();
    let status_colored = get_aligned_status(status);
    let path_colored = get_colored_path(status, path);
    format!("{index_colored} {status_colored} {path_colored}")
}
