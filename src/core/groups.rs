//! The three resource groups: checked out, hijacked and view-private files.
//!
//! One [`Group`] type serves all three; what differs is a small [`GroupPolicy`]
//! record (membership predicate, visibility setting). Groups are fed by two kinds
//! of signal: full rescans ([`FileStateRegistry::create_list`]) and single-file
//! deltas ([`FileStateRegistry::handle_changed_file`],
//! [`FileStateRegistry::handle_delete_file`]).
//!
//! Invariants, after every mutation:
//! - no two entries share a path
//! - entries are in ascending path order

use crate::core::{
    cleartool::VersionControl,
    config::Settings,
    error::Result,
    file_status::GroupKind,
    state::{StateCache, TrackedFile},
    version::VersionInfo,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

/// Presentation side of a resource group (editor SCM view, console, JSON stream)
pub trait ResourceSink: Send + Sync {
    fn render(&self, kind: GroupKind, files: &[TrackedFile]);
    fn clear(&self, kind: GroupKind);
}

/// Declarative per-group rules
#[derive(Clone, Copy)]
pub struct GroupPolicy {
    pub kind: GroupKind,
    pub membership: fn(&Path, &VersionInfo, &Settings) -> bool,
    pub visible: fn(&Settings) -> bool,
}

impl GroupPolicy {
    pub fn for_kind(kind: GroupKind) -> Self {
        match kind {
            GroupKind::Checkout => Self {
                kind,
                membership: |_, info, _| info.is_checked_out(),
                visible: |_| true,
            },
            GroupKind::Hijacked => Self {
                kind,
                membership: |_, info, _| info.is_hijacked(),
                visible: |settings| settings.show_hijacked,
            },
            GroupKind::ViewPrivate => Self {
                kind,
                membership: |path, info, settings| {
                    info.is_untracked() && !is_filtered_view_private(path, settings)
                },
                visible: |settings| settings.show_view_private,
            },
        }
    }

    pub fn is_visible(&self, settings: &Settings) -> bool {
        (self.visible)(settings)
    }
}

fn is_filtered_view_private(path: &Path, settings: &Settings) -> bool {
    match settings.view_private_regex() {
        Ok(Some(filter)) => filter.is_match(&path.to_string_lossy()),
        Ok(None) => false,
        Err(e) => {
            log::warn!("Ignoring view-private filter: {e}");
            false
        }
    }
}

pub struct Group {
    policy: GroupPolicy,
    files: Vec<TrackedFile>,
    sink: Arc<dyn ResourceSink>,
}

impl Group {
    pub fn new(policy: GroupPolicy, sink: Arc<dyn ResourceSink>) -> Self {
        Self {
            policy,
            files: Vec::new(),
            sink,
        }
    }

    pub fn kind(&self) -> GroupKind {
        self.policy.kind
    }

    pub fn files(&self) -> &[TrackedFile] {
        &self.files
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.position(path).is_ok()
    }

    pub fn is_visible(&self, settings: &Settings) -> bool {
        self.policy.is_visible(settings)
    }

    /// Entries are ordered by the path string, not component-wise
    fn position(&self, path: &Path) -> std::result::Result<usize, usize> {
        self.files
            .binary_search_by(|f| f.path.as_os_str().cmp(path.as_os_str()))
    }

    /// Replace the whole collection with a fresh scan result
    pub fn replace(&mut self, mut paths: Vec<PathBuf>) {
        paths.sort_by(|a, b| a.as_os_str().cmp(b.as_os_str()));
        paths.dedup();
        let kind = self.kind();
        self.files = paths.into_iter().map(|p| TrackedFile::new(p, kind)).collect();
    }

    /// Apply one file's fresh classification. Returns true when membership changed.
    ///
    /// Visibility only gates rendering; a hidden group keeps tracking its files.
    pub fn handle_changed_file(&mut self, path: &Path, info: &VersionInfo, settings: &Settings) -> bool {
        let belongs = (self.policy.membership)(path, info, settings);
        match (self.position(path), belongs) {
            (Ok(index), false) => {
                self.files.remove(index);
                true
            }
            (Err(index), true) => {
                self.files.insert(index, TrackedFile::new(path, self.kind()));
                true
            }
            _ => false,
        }
    }

    /// Drop an entry; a no-op when absent
    pub fn handle_delete_file(&mut self, path: &Path) -> bool {
        match self.position(path) {
            Ok(index) => {
                self.files.remove(index);
                true
            }
            Err(_) => false,
        }
    }

    /// Push the collection to the sink, or clear it and stop scanning when hidden
    pub fn update_resource_group(&self, settings: &Settings, backend: &dyn VersionControl) {
        if self.is_visible(settings) {
            self.sink.render(self.kind(), &self.files);
        } else {
            self.sink.clear(self.kind());
            backend.cancel_scan(self.kind());
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GroupCounts {
    pub checkout: usize,
    pub hijacked: usize,
    pub view_private: usize,
}

/// Owner of the three groups
pub struct FileStateRegistry {
    checkout: Mutex<Group>,
    hijacked: Mutex<Group>,
    view_private: Mutex<Group>,
}

impl FileStateRegistry {
    pub fn new(sink: Arc<dyn ResourceSink>) -> Self {
        let group = |kind| Mutex::new(Group::new(GroupPolicy::for_kind(kind), Arc::clone(&sink)));
        Self {
            checkout: group(GroupKind::Checkout),
            hijacked: group(GroupKind::Hijacked),
            view_private: group(GroupKind::ViewPrivate),
        }
    }

    fn group(&self, kind: GroupKind) -> MutexGuard<'_, Group> {
        let group = match kind {
            GroupKind::Checkout => &self.checkout,
            GroupKind::Hijacked => &self.hijacked,
            GroupKind::ViewPrivate => &self.view_private,
        };
        group.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn files(&self, kind: GroupKind) -> Vec<TrackedFile> {
        self.group(kind).files().to_vec()
    }

    pub fn contains(&self, kind: GroupKind, path: &Path) -> bool {
        self.group(kind).contains(path)
    }

    pub fn counts(&self) -> GroupCounts {
        GroupCounts {
            checkout: self.group(GroupKind::Checkout).files().len(),
            hijacked: self.group(GroupKind::Hijacked).files().len(),
            view_private: self.group(GroupKind::ViewPrivate).files().len(),
        }
    }

    /// Full rescan of one group. A newer scan of the same kind supersedes this one,
    /// in which case nothing changes and `Ok(false)` is returned.
    pub async fn create_list(
        &self,
        kind: GroupKind,
        backend: &dyn VersionControl,
        settings: &Settings,
    ) -> Result<bool> {
        if !self.group(kind).is_visible(settings) {
            self.group(kind).update_resource_group(settings, backend);
            return Ok(false);
        }

        let Some(paths) = backend.scan(kind).await? else {
            log::debug!("{kind:?} scan superseded");
            return Ok(false);
        };

        let mut group = self.group(kind);
        group.replace(paths);
        group.update_resource_group(settings, backend);
        Ok(true)
    }

    /// Route one file's classification to a single group and re-render it
    pub fn handle_changed_file(
        &self,
        kind: GroupKind,
        path: &Path,
        info: &VersionInfo,
        settings: &Settings,
        backend: &dyn VersionControl,
    ) -> bool {
        let mut group = self.group(kind);
        let changed = group.handle_changed_file(path, info, settings);
        if changed {
            group.update_resource_group(settings, backend);
        }
        changed
    }

    /// Route one file's classification to every group
    pub fn handle_changed_file_all(
        &self,
        path: &Path,
        info: &VersionInfo,
        settings: &Settings,
        backend: &dyn VersionControl,
    ) {
        for kind in GroupKind::ALL {
            self.handle_changed_file(kind, path, info, settings, backend);
        }
    }

    pub fn handle_delete_file(&self, path: &Path, settings: &Settings, backend: &dyn VersionControl) {
        for kind in GroupKind::ALL {
            let mut group = self.group(kind);
            if group.handle_delete_file(path) {
                group.update_resource_group(settings, backend);
            }
        }
    }

    /// Re-render (or clear) one group without rescanning
    pub fn update_resource_group(&self, kind: GroupKind, settings: &Settings, backend: &dyn VersionControl) {
        self.group(kind).update_resource_group(settings, backend);
    }

    pub fn snapshot(&self, view_root: PathBuf) -> StateCache {
        let mut cache = StateCache::new(view_root);
        for kind in GroupKind::ALL {
            *cache.group_mut(kind) = self.files(kind);
        }
        cache
    }
}
