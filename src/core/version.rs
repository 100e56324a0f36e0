//! Decoding of cleartool's version-query text output.
//!
//! `cleartool ls` prints one line per element:
//!
//! ```text
//! src/main.c@@/main/dev/4                        Rule: /main/dev/LATEST
//! src/main.c@@/main/CHECKEDOUT from /main/3      Rule: CHECKEDOUT
//! src/util.c@@/main/3 [hijacked]                 Rule: /main/LATEST
//! src/notes.txt
//! ```
//!
//! This is not a stable contract, so the grammar lives in one small hand-written
//! parser: split on the `@@` extended-naming marker, take the version token, then
//! look at the annotation that follows. Anything unrecognised degrades to
//! [`VersionState::Untracked`] instead of erroring.

use serde::{Deserialize, Serialize};
use std::fmt;

pub const VERSION_MARKER: &str = "@@";
pub const HIJACKED_MARKER: &str = "[hijacked]";
pub const CHECKEDOUT_MARKER: &str = "CHECKEDOUT";

pub const LABEL_VIEW_PRIVATE: &str = "view private";
pub const LABEL_NOT_IN_VOB: &str = "not in a VOB";

/// Classification of a single element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VersionState {
    Versioned,
    Hijacked,
    Untracked,
}

/// Result of one version query
///
/// `VersionInfo::default()` means "not queried yet" and is distinct from a
/// confirmed untracked element.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VersionInfo {
    label: String,
    state: Option<VersionState>,
}

impl VersionInfo {
    pub fn new(label: impl Into<String>, state: VersionState) -> Self {
        Self {
            label: label.into(),
            state: Some(state),
        }
    }

    pub fn unknown() -> Self {
        Self::default()
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// `None` until the element has been queried
    pub fn state(&self) -> Option<VersionState> {
        self.state
    }

    pub fn is_known(&self) -> bool {
        self.state.is_some()
    }

    pub fn is_untracked(&self) -> bool {
        self.state == Some(VersionState::Untracked)
    }

    pub fn is_hijacked(&self) -> bool {
        self.state == Some(VersionState::Hijacked)
    }

    pub fn is_checked_out(&self) -> bool {
        self.state == Some(VersionState::Versioned) && self.label.contains(CHECKEDOUT_MARKER)
    }
}

impl fmt::Display for VersionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.state {
            None => write!(f, "unknown"),
            Some(VersionState::Hijacked) => write!(f, "{} [hijacked]", self.label),
            Some(_) => write!(f, "{}", self.label),
        }
    }
}

/// One decoded output line: the element path as printed plus its classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionLine {
    pub path: String,
    pub info: VersionInfo,
}

/// Parser for cleartool version output
pub struct VersionOracle;

impl VersionOracle {
    /// Classify the response to a single-element query (`ls -d <file>`).
    ///
    /// Only the first non-blank line is considered.
    pub fn parse(raw: &str, normalize: bool) -> VersionInfo {
        match raw.lines().find(|l| !l.trim().is_empty()) {
            Some(line) => Self::parse_line(line, normalize).info,
            None => VersionInfo::new(LABEL_NOT_IN_VOB, VersionState::Untracked),
        }
    }

    /// Classify one line of `ls` output, keeping the element path.
    pub fn parse_line(line: &str, normalize: bool) -> VersionLine {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            return VersionLine {
                path: String::new(),
                info: VersionInfo::new(LABEL_NOT_IN_VOB, VersionState::Untracked),
            };
        }

        let Some(marker) = line.find(VERSION_MARKER) else {
            return VersionLine {
                path: line.trim().to_string(),
                info: VersionInfo::new(LABEL_VIEW_PRIVATE, VersionState::Untracked),
            };
        };

        let path = line[..marker].trim().to_string();
        let after = &line[marker + VERSION_MARKER.len()..];
        let version_end = after.find(char::is_whitespace).unwrap_or(after.len());
        let version = &after[..version_end];
        let annotation = after[version_end..].trim_start();

        if version.is_empty() {
            log::debug!("Unrecognised version output: {line:?}");
            return VersionLine {
                path,
                info: VersionInfo::new(LABEL_NOT_IN_VOB, VersionState::Untracked),
            };
        }

        let label = if normalize {
            normalize_label(version)
        } else {
            version.to_string()
        };

        let state = if annotation.starts_with(HIJACKED_MARKER) {
            VersionState::Hijacked
        } else {
            VersionState::Versioned
        };

        VersionLine {
            path,
            info: VersionInfo::new(label, state),
        }
    }
}

/// Backslashes become forward slashes and surrounding whitespace is dropped
pub fn normalize_label(label: &str) -> String {
    label.replace('\\', "/").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hijacked_line() {
        let info = VersionOracle::parse("file@@/main/3 [hijacked]   Rule: /main/LATEST", true);
        assert_eq!(info, VersionInfo::new("/main/3", VersionState::Hijacked));
        assert!(info.is_hijacked());
    }

    #[test]
    fn test_hijacked_windows_label_normalized() {
        let info = VersionOracle::parse("C:\\v\\a.c@@\\main\\dev\\7 [hijacked]   Rule: \\main\\LATEST", true);
        assert_eq!(info.label(), "/main/dev/7");
        assert_eq!(info.state(), Some(VersionState::Hijacked));
    }

    #[test]
    fn test_hijacked_windows_label_raw() {
        let info = VersionOracle::parse("a.c@@\\main\\7 [hijacked]   Rule: x", false);
        assert_eq!(info.label(), "\\main\\7");
        assert_eq!(info.state(), Some(VersionState::Hijacked));
    }

    #[test]
    fn test_versioned_line() {
        let info = VersionOracle::parse("src/main.c@@/main/dev/4          Rule: /main/dev/LATEST", true);
        assert_eq!(info, VersionInfo::new("/main/dev/4", VersionState::Versioned));
        assert!(!info.is_checked_out());
    }

    #[test]
    fn test_checked_out_line() {
        let info = VersionOracle::parse(
            "f.txt@@/main/CHECKEDOUT from /main/1             Rule: CHECKEDOUT",
            true,
        );
        assert_eq!(info.label(), "/main/CHECKEDOUT");
        assert!(info.is_checked_out());
    }

    #[test]
    fn test_versioned_without_trailing_text() {
        let info = VersionOracle::parse("f.txt@@/main/2\r\n", true);
        assert_eq!(info, VersionInfo::new("/main/2", VersionState::Versioned));
    }

    #[test]
    fn test_empty_output_is_not_in_vob() {
        for raw in ["", "   ", "\n\n"] {
            let info = VersionOracle::parse(raw, true);
            assert_eq!(info, VersionInfo::new(LABEL_NOT_IN_VOB, VersionState::Untracked));
        }
    }

    #[test]
    fn test_bare_path_is_view_private() {
        let info = VersionOracle::parse("notes/todo.txt", true);
        assert_eq!(info, VersionInfo::new(LABEL_VIEW_PRIVATE, VersionState::Untracked));
    }

    #[test]
    fn test_marker_without_version_is_not_in_vob() {
        let info = VersionOracle::parse("weird@@   Rule: nothing", true);
        assert_eq!(info, VersionInfo::new(LABEL_NOT_IN_VOB, VersionState::Untracked));
    }

    #[test]
    fn test_hijacked_marker_must_follow_version() {
        // A path that merely contains the word is still versioned
        let info = VersionOracle::parse("[hijacked].txt@@/main/1   Rule: x", true);
        assert_eq!(info.state(), Some(VersionState::Versioned));
    }

    #[test]
    fn test_parse_line_keeps_path() {
        let line = VersionOracle::parse_line("dir/my file.c@@/main/9 [hijacked]  Rule: x", true);
        assert_eq!(line.path, "dir/my file.c");
        assert!(line.info.is_hijacked());

        let private = VersionOracle::parse_line("  dir/new.c  ", true);
        assert_eq!(private.path, "dir/new.c");
        assert!(private.info.is_untracked());
    }

    #[test]
    fn test_default_is_unknown_not_untracked() {
        let info = VersionInfo::default();
        assert!(!info.is_known());
        assert!(!info.is_untracked());
        assert_ne!(info, VersionInfo::new(LABEL_NOT_IN_VOB, VersionState::Untracked));
        assert_eq!(info.to_string(), "unknown");
    }

    #[test]
    fn test_normalize_label() {
        assert_eq!(normalize_label(" \\main\\br\\3 "), "/main/br/3");
    }
}
