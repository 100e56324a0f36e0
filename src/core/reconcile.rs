//! The reconciliation loop: editor events in, group updates out.
//!
//! [`Reconciler`] owns the three resource groups and reacts to save, focus,
//! file-system and command-completion events by querying the backend and folding
//! the answers into the groups. Version-query failures never escape a handler; the
//! file is treated as unknown and the groups stay as they were.
//!
//! Single-file deltas are throttled by a [`CountingLock`] of capacity one. A burst
//! of change events therefore reconciles the first file and drops the rest instead
//! of queueing them.

use crate::core::{
    cleartool::VersionControl,
    config::{ConfigStore, Settings, RESTART_REQUIRED},
    error::{ClearCaseError, Result},
    file_status::GroupKind,
    groups::{FileStateRegistry, ResourceSink},
    host::{EditorContext, EditorHost, NotifyLevel},
    process::CommandOutput,
    templates::requires_comment,
    version::VersionInfo,
};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Best-effort counting lock. `reserve` always counts the caller; it reports
/// whether the caller is within capacity.
#[derive(Debug)]
pub struct CountingLock {
    count: AtomicUsize,
    limit: usize,
}

impl CountingLock {
    pub fn new(limit: usize) -> Self {
        Self {
            count: AtomicUsize::new(0),
            limit,
        }
    }

    pub fn reserve(&self) -> bool {
        self.count.fetch_add(1, Ordering::SeqCst) < self.limit
    }

    pub fn release(&self) {
        let _ = self
            .count
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    /// Reserve and release on drop, whether or not the reservation was within capacity
    pub fn reservation(&self) -> Reservation<'_> {
        let within = self.reserve();
        Reservation { lock: self, within }
    }
}

pub struct Reservation<'a> {
    lock: &'a CountingLock,
    within: bool,
}

impl Reservation<'_> {
    pub fn is_within(&self) -> bool {
        self.within
    }
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        self.lock.release();
    }
}

/// How a will-save event was handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveOutcome {
    /// Nothing to do, save goes through
    Proceed,
    /// The file was checked out before the save
    CheckedOut,
    /// The user declined the checkout; the save will hit a read-only file
    Declined,
}

pub struct Reconciler {
    backend: Arc<dyn VersionControl>,
    config: Arc<ConfigStore>,
    host: Arc<dyn EditorHost>,
    groups: FileStateRegistry,
    delta_lock: CountingLock,
    known_versions: Mutex<HashMap<PathBuf, VersionInfo>>,
    active_editor: Mutex<Option<PathBuf>>,
    drift_warned: Mutex<BTreeSet<String>>,
}

impl Reconciler {
    pub fn new(
        backend: Arc<dyn VersionControl>,
        config: Arc<ConfigStore>,
        host: Arc<dyn EditorHost>,
        sink: Arc<dyn ResourceSink>,
    ) -> Self {
        Self {
            backend,
            config,
            host,
            groups: FileStateRegistry::new(sink),
            delta_lock: CountingLock::new(1),
            known_versions: Mutex::new(HashMap::new()),
            active_editor: Mutex::new(None),
            drift_warned: Mutex::new(BTreeSet::new()),
        }
    }

    pub fn groups(&self) -> &FileStateRegistry {
        &self.groups
    }

    pub fn delta_lock(&self) -> &CountingLock {
        &self.delta_lock
    }

    fn settings(&self) -> Settings {
        self.config.snapshot()
    }

    pub fn known_version(&self, path: &Path) -> Option<VersionInfo> {
        self.known_versions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(path)
            .cloned()
    }

    pub fn active_editor(&self) -> Option<PathBuf> {
        self.active_editor
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Query one file. Failures degrade to the unknown state.
    pub async fn query_version(&self, path: &Path) -> VersionInfo {
        match self.backend.version_info(path).await {
            Ok(info) => {
                self.known_versions
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .insert(path.to_path_buf(), info.clone());
                info
            }
            Err(e) => {
                log::warn!("Version query for {} failed: {e}", path.display());
                VersionInfo::unknown()
            }
        }
    }

    /// Rescan all three groups concurrently
    pub async fn refresh_all(&self) -> Result<()> {
        let settings = self.settings();
        let backend = self.backend.as_ref();
        let (checkout, hijacked, view_private) = tokio::join!(
            self.groups.create_list(GroupKind::Checkout, backend, &settings),
            self.groups.create_list(GroupKind::Hijacked, backend, &settings),
            self.groups.create_list(GroupKind::ViewPrivate, backend, &settings),
        );
        self.publish_context();
        checkout?;
        hijacked?;
        view_private?;
        Ok(())
    }

    pub async fn handle_will_save(&self, path: &Path, read_only: bool) -> Result<SaveOutcome> {
        if !read_only {
            if self.known_version(path).is_some_and(|v| v.is_untracked()) {
                self.handle_file_changed(path).await;
            }
            return Ok(SaveOutcome::Proceed);
        }

        let settings = self.settings();
        if !settings.auto_checkout_on_save && !settings.confirm_checkout_on_save {
            log::debug!("{} is read-only and checkout on save is off", path.display());
            return Ok(SaveOutcome::Proceed);
        }

        if settings.confirm_checkout_on_save {
            let message = format!("{} is read-only. Check it out?", display_name(path));
            if !self.host.confirm(&message).await {
                log::debug!("Checkout of {} declined", path.display());
                return Ok(SaveOutcome::Declined);
            }
        }

        self.checkout(path).await?;
        Ok(SaveOutcome::CheckedOut)
    }

    pub async fn handle_active_editor_changed(&self, path: Option<PathBuf>) {
        *self.active_editor.lock().unwrap_or_else(|e| e.into_inner()) = path.clone();
        match path {
            Some(path) => self.reconcile_file(&path).await,
            None => self.publish_context(),
        }
    }

    /// After checkout, checkin, undo-checkout or update of `path`
    pub async fn handle_command_completed(&self, path: &Path) {
        self.reconcile_file(path).await;
    }

    /// Checkout rescan plus hijacked/view-private classification of one file
    async fn reconcile_file(&self, path: &Path) {
        let settings = self.settings();
        let backend = self.backend.as_ref();
        if let Err(e) = self.groups.create_list(GroupKind::Checkout, backend, &settings).await {
            log::warn!("Checkout rescan failed: {e}");
        }

        let info = self.query_version(path).await;
        if info.is_known() {
            for kind in [GroupKind::Hijacked, GroupKind::ViewPrivate] {
                self.groups.handle_changed_file(kind, path, &info, &settings, backend);
            }
        }
        self.publish_context();
    }

    /// Returns false when the event was dropped at the lock boundary
    pub async fn handle_file_changed(&self, path: &Path) -> bool {
        let reservation = self.delta_lock.reservation();
        if !reservation.is_within() {
            log::debug!("Reconciliation busy, skipping {}", path.display());
            return false;
        }

        let info = self.query_version(path).await;
        if info.is_known() {
            let settings = self.settings();
            self.groups
                .handle_changed_file_all(path, &info, &settings, self.backend.as_ref());
            self.publish_context();
        }
        true
    }

    pub async fn handle_file_created(&self, path: &Path) -> bool {
        self.handle_file_changed(path).await
    }

    pub fn handle_file_deleted(&self, path: &Path) {
        self.known_versions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(path);
        let settings = self.settings();
        self.groups
            .handle_delete_file(path, &settings, self.backend.as_ref());
        self.publish_context();
    }

    /// React to settings changes flagged in the config store
    pub async fn handle_configuration_changed(&self) {
        let settings = self.settings();

        for property in RESTART_REQUIRED {
            if self.config.take_changed(property) {
                let first = self
                    .drift_warned
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .insert(property.to_string());
                if first {
                    let warning = ClearCaseError::configuration_drift(*property);
                    log::warn!("{warning}");
                    self.host.notify(NotifyLevel::Warning, &warning.to_string());
                }
            }
        }

        let mapping_changed = self.config.take_changed("translate_paths") | self.config.take_changed("path_mappings");
        if mapping_changed {
            log::debug!("Path mapping changed");
        }
        self.backend.reconfigure(&settings);

        let hijacked = self.config.take_changed("show_hijacked");
        let view_private = self.config.take_changed("show_view_private") | self.config.take_changed("view_private_filter");
        for (kind, changed) in [(GroupKind::Hijacked, hijacked), (GroupKind::ViewPrivate, view_private)] {
            if changed {
                if let Err(e) = self.groups.create_list(kind, self.backend.as_ref(), &settings).await {
                    log::warn!("{} rescan failed: {e}", kind.label());
                }
            }
        }
        self.publish_context();
    }

    /// Forward every broadcast settings change to [`Self::handle_configuration_changed`]
    pub async fn watch_configuration(self: Arc<Self>) {
        let mut changes = self.config.subscribe();
        loop {
            match changes.recv().await {
                Ok(names) => {
                    log::debug!("Configuration changed: {}", names.join(", "));
                    self.handle_configuration_changed().await;
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    log::debug!("Skipped {skipped} configuration notifications");
                    self.handle_configuration_changed().await;
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    }

    pub async fn checkout(&self, path: &Path) -> Result<CommandOutput> {
        let output = self.backend.checkout(path).await?;
        self.report(&output);
        self.handle_command_completed(path).await;
        Ok(output)
    }

    /// Check in `path`. A template that wants `${comment}` and an empty comment make
    /// the host ask for one; no answer cancels the checkin.
    pub async fn checkin(&self, path: &Path, comment: Option<&str>) -> Result<CommandOutput> {
        let template = self.settings().checkin_template;
        let mut comment = comment.filter(|c| !c.trim().is_empty()).map(str::to_string);
        if comment.is_none() && requires_comment(&template) {
            comment = Some(self.host.prompt_comment(path).await.ok_or(ClearCaseError::Cancelled)?);
        }

        let output = self.backend.checkin(path, comment.as_deref()).await?;
        self.report(&output);
        self.handle_command_completed(path).await;
        Ok(output)
    }

    pub async fn undo_checkout(&self, path: &Path) -> Result<CommandOutput> {
        let output = self.backend.undo_checkout(path).await?;
        self.report(&output);
        self.handle_command_completed(path).await;
        Ok(output)
    }

    pub async fn update(&self, path: &Path) -> Result<CommandOutput> {
        let output = self.backend.update(path).await?;
        self.report(&output);
        self.handle_command_completed(path).await;
        Ok(output)
    }

    fn report(&self, output: &CommandOutput) {
        if let Some(line) = output.stdout_lines().last() {
            self.host.notify(NotifyLevel::Info, line);
        }
        if !output.stderr.trim().is_empty() {
            log::warn!("cleartool: {}", output.stderr.trim());
        }
    }

    pub fn context(&self) -> EditorContext {
        let path = self.active_editor();
        let info = path.as_deref().and_then(|p| self.known_version(p));
        EditorContext {
            is_tracked: info.as_ref().is_some_and(|v| v.is_known() && !v.is_untracked()),
            version: info.filter(VersionInfo::is_known).map(|v| v.label().to_string()),
            path,
            counts: self.groups.counts(),
        }
    }

    fn publish_context(&self) {
        self.host.update_context(&self.context());
    }

    /// Kill every live cleartool invocation
    pub fn dispose(&self) {
        self.backend.dispose();
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
