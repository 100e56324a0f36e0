//! Type-safe file status enumeration for resource group entries.
//!
//! This module defines [`FileStatus`], the status letter shown next to each file in
//! a resource group, and [`GroupKind`], the three groups the registry maintains.
//!
//! # Public API
//! - [`FileStatus`]: Modified (checked out), Hijacked or Untracked (view-private)
//! - [`GroupKind`]: Checkout, Hijacked or ViewPrivate

use serde::{Deserialize, Serialize};
use std::fmt;

/// Display status of a tracked file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileStatus {
    /// Checked out (M)
    #[serde(rename = "M")]
    Modified,
    /// Modified without a checkout (H)
    #[serde(rename = "H")]
    Hijacked,
    /// View-private, unknown to the VOB (?)
    #[serde(rename = "?")]
    Untracked,
}

impl FileStatus {
    /// Status letter used by resource group renderers
    pub fn as_str(&self) -> &'static str {
        match self {
            FileStatus::Modified => "M",
            FileStatus::Hijacked => "H",
            FileStatus::Untracked => "?",
        }
    }

    /// Get human-readable description for status
    pub fn description(&self) -> &'static str {
        match self {
            FileStatus::Modified => "checked out",
            FileStatus::Hijacked => "hijacked",
            FileStatus::Untracked => "view private",
        }
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The three resource groups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupKind {
    Checkout,
    Hijacked,
    ViewPrivate,
}

impl GroupKind {
    pub const ALL: [GroupKind; 3] = [GroupKind::Checkout, GroupKind::Hijacked, GroupKind::ViewPrivate];

    pub fn status(&self) -> FileStatus {
        match self {
            GroupKind::Checkout => FileStatus::Modified,
            GroupKind::Hijacked => FileStatus::Hijacked,
            GroupKind::ViewPrivate => FileStatus::Untracked,
        }
    }

    /// Operation identity of this group's rescan
    pub fn scan_operation(&self) -> &'static str {
        match self {
            GroupKind::Checkout => "find-checkouts",
            GroupKind::Hijacked => "find-hijacked",
            GroupKind::ViewPrivate => "find-view-private",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            GroupKind::Checkout => "Checked out",
            GroupKind::Hijacked => "Hijacked",
            GroupKind::ViewPrivate => "View private",
        }
    }
}
