//! Core functionality for the clearcase-navigator tool.
//!
//! This module provides the engine behind every subcommand: process supervision,
//! cleartool output parsing, the three resource groups and the reconciliation loop
//! that keeps them current.

pub mod cleartool;
pub mod colors;
pub mod command_args;
pub mod command_init;
pub mod config;
pub mod dirs;
pub mod error;
pub mod file_status;
pub mod groups;
pub mod host;
pub mod output;
pub mod path_mapper;
pub mod process;
pub mod reconcile;
pub mod state;
pub mod templates;
pub mod version;

// === Error handling ===
pub use error::{ClearCaseError, Result};

// === Process execution ===
// Identity-keyed invocations: a newer request kills the older one with the same key
pub use command_args::CommandArgs;
pub use path_mapper::{PathMapper, PathMapping};
pub use process::{
    CommandHandle, CommandOutput, CommandRegistry, CommandRequest, FailurePolicy, Outcome, ProcessRunner,
};

// === cleartool ===
pub use cleartool::{ClearTool, VersionControl, ViewType};
pub use version::{VersionInfo, VersionOracle, VersionState};

// === Resource groups ===
pub use file_status::{FileStatus, GroupKind};
pub use groups::{FileStateRegistry, GroupCounts, ResourceSink};
pub use state::{StateCache, TrackedFile};

// === Reconciliation ===
pub use host::{ConsoleHost, EditorContext, EditorHost, JsonLinesHost, NotifyLevel};
pub use reconcile::{CountingLock, Reconciler, SaveOutcome};

// === Configuration ===
pub use command_init::{CommandContext, CommandInit};
pub use config::{ConfigStore, Settings};

// === Output formatting ===
pub use colors::{format_file_status, get_aligned_status, get_colored_path, get_status_color_style};
pub use output::{print_error, print_group, print_info, print_section_header, print_success, print_warning};
