//! Tracked file entries and the on-disk snapshot of the resource groups.
//!
//! # Public API
//! - [`TrackedFile`]: One entry of a resource group, derived from a version query
//! - [`StateCache`]: Snapshot of all three groups, written after a full rescan
//!
//! # Cache Strategy
//! - **JSON serialization**: Human-readable cache files for debugging
//! - **Timestamping**: Track when the groups were last rescanned
//! - **View isolation**: Separate cache per view root (md5 of the path)

use crate::core::{
    dirs::get_cache_directory,
    error::{ClearCaseError, Result},
    file_status::{FileStatus, GroupKind},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedFile {
    pub path: PathBuf,
    pub status: FileStatus,
    pub group: GroupKind,
}

impl TrackedFile {
    pub fn new(path: impl Into<PathBuf>, group: GroupKind) -> Self {
        Self {
            path: path.into(),
            status: group.status(),
            group,
        }
    }

    pub fn tooltip(&self) -> String {
        format!("{} ({})", self.path.display(), self.status.description())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateCache {
    pub checkout: Vec<TrackedFile>,
    pub hijacked: Vec<TrackedFile>,
    pub view_private: Vec<TrackedFile>,
    pub last_updated: DateTime<Utc>,
    pub view_root: PathBuf,
}

impl StateCache {
    pub fn new(view_root: PathBuf) -> Self {
        Self {
            checkout: Vec::new(),
            hijacked: Vec::new(),
            view_private: Vec::new(),
            last_updated: Utc::now(),
            view_root,
        }
    }

    pub fn group_mut(&mut self, kind: GroupKind) -> &mut Vec<TrackedFile> {
        match kind {
            GroupKind::Checkout => &mut self.checkout,
            GroupKind::Hijacked => &mut self.hijacked,
            GroupKind::ViewPrivate => &mut self.view_private,
        }
    }

    /// Write the snapshot under the cache directory, keyed by view root
    pub fn save(&self) -> Result<PathBuf> {
        let cache_dir = cache_dir_for(&self.view_root)?;
        fs::create_dir_all(&cache_dir)
            .map_err(|e| ClearCaseError::cache_write_failed(&cache_dir, e))?;

        let cache_file = cache_dir.join("groups.json");
        let json = serde_json::to_string_pretty(self)?;
        fs::write(&cache_file, json).map_err(|e| {
            log::error!("Failed to write cache file '{}': {}", cache_file.display(), e);
            ClearCaseError::cache_write_failed(&cache_file, e)
        })?;

        log::debug!("Saved group snapshot to {}", cache_file.display());
        Ok(cache_file)
    }
}

fn cache_dir_for(view_root: &Path) -> Result<PathBuf> {
    let view_hash = format!("{:x}", md5::compute(view_root.to_string_lossy().as_bytes()));
    Ok(get_cache_directory()?.join(view_hash))
}
