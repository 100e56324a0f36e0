use crate::core::dirs::{get_config_directory, get_default_temp_directory};
use crate::core::error::{ClearCaseError, Result};
use crate::core::path_mapper::{PathMapper, PathMapping};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};
use tokio::sync::broadcast;

/// Properties that only take effect after a restart
pub const RESTART_REQUIRED: &[&str] = &["executable", "use_remote_client"];

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub executable: String,
    /// Use `rcleartool` against a CCRC server instead of a local client
    pub use_remote_client: bool,
    pub checkout_template: String,
    pub checkin_template: String,
    pub undo_checkout_template: String,
    pub update_template: String,
    pub annotate_format: String,
    pub confirm_checkout_on_save: bool,
    pub auto_checkout_on_save: bool,
    pub show_hijacked: bool,
    pub show_view_private: bool,
    /// View-private files whose path matches are not listed
    pub view_private_filter: String,
    pub translate_paths: bool,
    pub path_mappings: Vec<PathMapping>,
    pub temp_dir: Option<PathBuf>,
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            executable: "cleartool".to_string(),
            use_remote_client: false,
            checkout_template: "-nc ${filename}".to_string(),
            checkin_template: "-nc ${filename}".to_string(),
            undo_checkout_template: "-keep ${filename}".to_string(),
            update_template: "-force -rename ${filename}".to_string(),
            annotate_format: "%Sd %-16.16u %-16.16Vn |".to_string(),
            confirm_checkout_on_save: false,
            auto_checkout_on_save: false,
            show_hijacked: true,
            show_view_private: true,
            view_private_filter: r"\.(keep|contrib|orig)(\.\d+)?$".to_string(),
            translate_paths: false,
            path_mappings: Vec::new(),
            temp_dir: None,
            log_level: "info".to_string(),
        }
    }
}

macro_rules! changed_fields {
    ($old:expr, $new:expr, $($field:ident),* $(,)?) => {{
        let mut names = Vec::new();
        $(
            if $old.$field != $new.$field {
                names.push(stringify!($field).to_string());
            }
        )*
        names
    }};
}

impl Settings {
    /// Load settings from `path`, or from the default config location.
    /// A missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_file = match path {
            Some(path) => path.to_path_buf(),
            None => get_config_directory()?.join("config.json"),
        };

        if !config_file.exists() {
            log::debug!("No settings at {}, using defaults", config_file.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&config_file)
            .map_err(|e| ClearCaseError::config_read_failed(&config_file, e))?;
        let settings: Settings = serde_json::from_str(&content)
            .map_err(|e| ClearCaseError::config_parse_failed(&config_file, e))?;
        log::debug!("Loaded settings from {}", config_file.display());
        Ok(settings)
    }

    pub fn executable_name(&self) -> &str {
        if self.use_remote_client {
            "rcleartool"
        } else {
            &self.executable
        }
    }

    pub fn path_mapper(&self) -> PathMapper {
        PathMapper::new(self.path_mappings.clone(), self.translate_paths)
    }

    pub fn temp_directory(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(get_default_temp_directory)
    }

    pub fn view_private_regex(&self) -> Result<Option<Regex>> {
        if self.view_private_filter.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(Regex::new(&self.view_private_filter)?))
    }

    /// Names of the properties that differ between `self` and `other`
    pub fn changed_properties(&self, other: &Settings) -> Vec<String> {
        changed_fields!(
            self,
            other,
            executable,
            use_remote_client,
            checkout_template,
            checkin_template,
            undo_checkout_template,
            update_template,
            annotate_format,
            confirm_checkout_on_save,
            auto_checkout_on_save,
            show_hijacked,
            show_view_private,
            view_private_filter,
            translate_paths,
            path_mappings,
            temp_dir,
            log_level,
        )
    }
}

/// Live settings with per-property "changed since last read" flags and a change
/// notification channel carrying the names of changed properties.
pub struct ConfigStore {
    current: RwLock<Settings>,
    changed: Mutex<BTreeSet<String>>,
    notifier: broadcast::Sender<Vec<String>>,
}

impl ConfigStore {
    pub fn new(settings: Settings) -> Self {
        let (notifier, _) = broadcast::channel(16);
        Self {
            current: RwLock::new(settings),
            changed: Mutex::new(BTreeSet::new()),
            notifier,
        }
    }

    pub fn snapshot(&self) -> Settings {
        self.current.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Vec<String>> {
        self.notifier.subscribe()
    }

    /// Replace the settings; returns and broadcasts the changed property names
    pub fn apply(&self, settings: Settings) -> Vec<String> {
        let names = {
            let mut current = self.current.write().unwrap_or_else(|e| e.into_inner());
            let names = current.changed_properties(&settings);
            *current = settings;
            names
        };

        if !names.is_empty() {
            self.changed
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .extend(names.iter().cloned());
            log::debug!("Settings changed: {}", names.join(", "));
            // No subscribers is not an error
            let _ = self.notifier.send(names.clone());
        }
        names
    }

    /// Read and clear the changed flag of one property
    pub fn take_changed(&self, property: &str) -> bool {
        self.changed
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(property)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.executable_name(), "cleartool");
        assert!(settings.show_hijacked);
        assert!(settings.view_private_regex().unwrap().is_some());
    }

    #[test]
    fn test_remote_client_switches_executable() {
        let settings = Settings {
            use_remote_client: true,
            ..Settings::default()
        };
        assert_eq!(settings.executable_name(), "rcleartool");
    }

    #[test]
    fn test_load_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("config.json");
        std::fs::write(&file, r#"{"show_hijacked": false, "checkin_template": "-c ${comment}"}"#).unwrap();

        let settings = Settings::load(Some(&file)).unwrap();
        assert!(!settings.show_hijacked);
        assert_eq!(settings.checkin_template, "-c ${comment}");
        assert_eq!(settings.checkout_template, "-nc ${filename}");
    }

    #[test]
    fn test_load_missing_file_is_default() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::load(Some(&dir.path().join("absent.json"))).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_load_invalid_json() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("config.json");
        std::fs::write(&file, "{ nope").unwrap();
        assert!(matches!(
            Settings::load(Some(&file)),
            Err(ClearCaseError::ConfigParseFailed { .. })
        ));
    }

    #[test]
    fn test_invalid_filter_is_reported() {
        let settings = Settings {
            view_private_filter: "(".to_string(),
            ..Settings::default()
        };
        assert!(settings.view_private_regex().is_err());
    }

    #[test]
    fn test_apply_tracks_and_broadcasts_changes() {
        let store = ConfigStore::new(Settings::default());
        let mut rx = store.subscribe();

        let names = store.apply(Settings {
            show_view_private: false,
            translate_paths: true,
            ..Settings::default()
        });
        assert_eq!(names, vec!["show_view_private", "translate_paths"]);
        assert_eq!(rx.try_recv().unwrap(), names);

        assert!(store.take_changed("show_view_private"));
        assert!(!store.take_changed("show_view_private"));
        assert!(!store.take_changed("show_hijacked"));
    }

    #[test]
    fn test_apply_identical_settings_is_silent() {
        let store = ConfigStore::new(Settings::default());
        let mut rx = store.subscribe();
        assert!(store.apply(Settings::default()).is_empty());
        assert!(rx.try_recv().is_err());
    }
}
