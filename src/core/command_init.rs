//! Centralized initialization for every subcommand.
//!
//! [`CommandInit`] takes the loaded settings, fixes the view root and builds the cleartool
//! client with its invocation registry. Commands then ask the resulting
//! [`CommandContext`] for a [`Reconciler`] wired to whichever host they present
//! through.
//!
//! # Initialization Steps
//! 1. **Settings**: loaded by `main` from `--config`, the default location, or defaults
//! 2. **View root**: the current directory
//! 3. **Client**: one [`CommandRegistry`] shared by every invocation of this process

use crate::core::{
    cleartool::ClearTool,
    config::{ConfigStore, Settings},
    error::{ClearCaseError, Result},
    groups::ResourceSink,
    host::EditorHost,
    process::CommandRegistry,
    reconcile::Reconciler,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Everything a subcommand needs
pub struct CommandContext {
    pub config: Arc<ConfigStore>,
    pub registry: Arc<CommandRegistry>,
    pub cleartool: Arc<ClearTool>,
    pub view_root: PathBuf,
}

impl CommandContext {
    pub fn settings(&self) -> Settings {
        self.config.snapshot()
    }

    /// Reconciliation loop presenting through `host`
    pub fn reconciler<H>(&self, host: Arc<H>) -> Reconciler
    where
        H: EditorHost + ResourceSink + 'static,
    {
        Reconciler::new(
            self.cleartool.clone(),
            self.config.clone(),
            host.clone(),
            host,
        )
    }

    /// Command-line paths are relative to the view root
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.view_root.join(path)
        }
    }

    /// Like [`Self::resolve`], but the file must exist
    pub fn resolve_existing(&self, path: &Path) -> Result<PathBuf> {
        let resolved = self.resolve(path);
        if !resolved.exists() {
            return Err(ClearCaseError::file_not_found(resolved));
        }
        Ok(resolved)
    }
}

pub struct CommandInit;

impl CommandInit {
    /// Settings are loaded by the caller, which needs them for logging first
    pub fn with_settings(view_root: PathBuf, settings: Settings) -> CommandContext {
        log::debug!(
            "Initializing {} client for view root {}",
            settings.executable_name(),
            view_root.display()
        );
        let registry = Arc::new(CommandRegistry::new());
        let cleartool = Arc::new(ClearTool::new(settings.clone(), &view_root, registry.clone()));
        CommandContext {
            config: Arc::new(ConfigStore::new(settings)),
            registry,
            cleartool,
            view_root,
        }
    }
}
