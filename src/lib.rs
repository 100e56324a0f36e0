//! ClearCase Navigator - ClearCase integration for editors and the command line.
//!
//! This library drives `cleartool` on behalf of an editor: it runs one process per
//! operation, kills stale invocations when a newer one with the same identity starts,
//! parses version output, and keeps three resource groups (checked out, hijacked and
//! view-private files) current as editor events arrive.
//!
//! # Public API
//! The main public interface is re-exported from the [`core`] module, which provides:
//! - Process execution with identity-based supersession
//! - Version output parsing
//! - Resource groups and the reconciliation loop
//! - Settings, error handling and result types

pub mod commands;
pub mod core;

// Re-export the core public API for external users
pub use core::{
    // Error handling
    ClearCaseError,
    // cleartool client
    ClearTool,
    CommandArgs,
    CommandRegistry,
    CommandRequest,
    ConsoleHost,
    EditorHost,
    FailurePolicy,
    FileStateRegistry,
    GroupKind,
    JsonLinesHost,
    Outcome,
    PathMapper,
    // Process execution
    ProcessRunner,
    // Reconciliation
    Reconciler,
    ResourceSink,
    Result,
    Settings,
    StateCache,
    TrackedFile,
    VersionControl,
    VersionInfo,
    VersionOracle,
    VersionState,
};
