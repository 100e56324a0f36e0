//! Path translation between the host and a POSIX-style execution environment.
//!
//! When cleartool runs inside a compatibility layer (WSL and friends) every path
//! operand must be rewritten before the call and every path in the output must be
//! rewritten back. Explicit `{host, target}` prefix mappings are consulted first;
//! without a match, the drive-letter heuristic `C:\foo` ⇄ `/mnt/c/foo` applies
//! when translation is enabled. Translation is best-effort: anything that does not
//! match passes through unchanged.

use serde::{Deserialize, Serialize};

const MOUNT_ROOT: &str = "/mnt/";

/// One explicit prefix mapping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathMapping {
    pub host: String,
    pub target: String,
}

#[derive(Debug, Clone, Default)]
pub struct PathMapper {
    mappings: Vec<PathMapping>,
    translate: bool,
}

impl PathMapper {
    pub fn new(mappings: Vec<PathMapping>, translate: bool) -> Self {
        Self { mappings, translate }
    }

    /// A mapper that never rewrites anything
    pub fn passthrough() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.translate || !self.mappings.is_empty()
    }

    /// Host path → execution environment path
    pub fn to_target(&self, path: &str) -> String {
        // Already on the target side of an explicit mapping.
        if self
            .mappings
            .iter()
            .any(|m| has_prefix(path, &m.target, false))
        {
            return path.to_string();
        }

        for mapping in &self.mappings {
            if has_prefix(path, &mapping.host, true) {
                let rest = &path[mapping.host.len()..];
                return format!("{}{}", mapping.target, rest.replace('\\', "/"));
            }
        }

        if self.translate {
            if let Some(translated) = drive_to_mount(path) {
                return translated;
            }
        }

        path.to_string()
    }

    /// Execution environment path → host path
    pub fn to_host(&self, path: &str) -> String {
        if self.mappings.iter().any(|m| has_prefix(path, &m.host, true))
            && !self.mappings.iter().any(|m| has_prefix(path, &m.target, false))
        {
            return path.to_string();
        }

        for mapping in &self.mappings {
            if has_prefix(path, &mapping.target, false) {
                let rest = &path[mapping.target.len()..];
                let separator = host_separator(&mapping.host);
                return format!("{}{}", mapping.host, rest.replace('/', separator));
            }
        }

        if self.translate {
            if let Some(translated) = mount_to_drive(path) {
                return translated;
            }
        }

        path.to_string()
    }
}

/// Prefix match on a path component boundary. Host prefixes are compared case
/// insensitively since drive letters and Windows paths are.
fn has_prefix(path: &str, prefix: &str, case_insensitive: bool) -> bool {
    if prefix.is_empty() || path.len() < prefix.len() || !path.is_char_boundary(prefix.len()) {
        return false;
    }
    let head = &path[..prefix.len()];
    let matches = if case_insensitive {
        head.eq_ignore_ascii_case(prefix)
    } else {
        head == prefix
    };
    if !matches {
        return false;
    }
    let rest = &path[prefix.len()..];
    rest.is_empty()
        || rest.starts_with('/')
        || rest.starts_with('\\')
        || prefix.ends_with('/')
        || prefix.ends_with('\\')
}

fn host_separator(host_prefix: &str) -> &'static str {
    if host_prefix.contains('\\') || is_drive_path(host_prefix) {
        "\\"
    } else {
        "/"
    }
}

fn is_drive_path(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

fn drive_to_mount(path: &str) -> Option<String> {
    if !is_drive_path(path) {
        return None;
    }
    let drive = path[..1].to_ascii_lowercase();
    let rest = path[2..].replace('\\', "/");
    let rest = rest.trim_start_matches('/');
    if rest.is_empty() {
        Some(format!("{MOUNT_ROOT}{drive}"))
    } else {
        Some(format!("{MOUNT_ROOT}{drive}/{rest}"))
    }
}

fn mount_to_drive(path: &str) -> Option<String> {
    let rest = path.strip_prefix(MOUNT_ROOT)?;
    let mut chars = rest.chars();
    let drive = chars.next().filter(|c| c.is_ascii_alphabetic())?;
    let tail = chars.as_str();
    if !(tail.is_empty() || tail.starts_with('/')) {
        return None;
    }
    let tail = tail.trim_start_matches('/').replace('/', "\\");
    Some(format!("{}:\\{}", drive.to_ascii_uppercase(), tail))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wsl() -> PathMapper {
        PathMapper::new(Vec::new(), true)
    }

    fn mapped() -> PathMapper {
        PathMapper::new(
            vec![PathMapping {
                host: "X:\\views\\dev".to_string(),
                target: "/view/dev".to_string(),
            }],
            true,
        )
    }

    #[test]
    fn test_drive_heuristic_to_target() {
        assert_eq!(wsl().to_target("C:\\foo\\bar.c"), "/mnt/c/foo/bar.c");
        assert_eq!(wsl().to_target("D:\\"), "/mnt/d");
    }

    #[test]
    fn test_drive_heuristic_to_host() {
        assert_eq!(wsl().to_host("/mnt/c/foo/bar.c"), "C:\\foo\\bar.c");
        assert_eq!(wsl().to_host("/mnt/cdrom/x"), "/mnt/cdrom/x");
    }

    #[test]
    fn test_heuristic_disabled_passes_through() {
        let mapper = PathMapper::passthrough();
        assert_eq!(mapper.to_target("C:\\foo"), "C:\\foo");
        assert_eq!(mapper.to_host("/mnt/c/foo"), "/mnt/c/foo");
        assert!(!mapper.is_active());
    }

    #[test]
    fn test_explicit_mapping_wins_over_heuristic() {
        let mapper = mapped();
        assert_eq!(mapper.to_target("X:\\views\\dev\\src\\a.c"), "/view/dev/src/a.c");
        assert_eq!(mapper.to_host("/view/dev/src/a.c"), "X:\\views\\dev\\src\\a.c");
        // Unmapped drives still use the heuristic
        assert_eq!(mapper.to_target("C:\\tmp"), "/mnt/c/tmp");
    }

    #[test]
    fn test_mapping_respects_component_boundary() {
        let mapper = mapped();
        assert_eq!(mapper.to_target("X:\\views\\devel\\a.c"), "/mnt/x/views/devel/a.c");
    }

    #[test]
    fn test_to_target_is_idempotent() {
        let mapper = mapped();
        for path in [
            "C:\\foo\\bar",
            "X:\\views\\dev\\a.c",
            "/view/dev/a.c",
            "/mnt/c/foo",
            "relative/path.txt",
            "",
        ] {
            let once = mapper.to_target(path);
            assert_eq!(mapper.to_target(&once), once, "not idempotent for {path:?}");
        }
    }

    #[test]
    fn test_to_target_no_double_prefix_when_target_nests_host() {
        let mapper = PathMapper::new(
            vec![PathMapping {
                host: "/home/me".to_string(),
                target: "/home/me/wsl".to_string(),
            }],
            false,
        );
        let once = mapper.to_target("/home/me/src/a.c");
        assert_eq!(once, "/home/me/wsl/src/a.c");
        assert_eq!(mapper.to_target(&once), once);
    }

    #[test]
    fn test_to_host_is_idempotent() {
        let mapper = mapped();
        let once = mapper.to_host("/view/dev/x/y.h");
        assert_eq!(mapper.to_host(&once), once);
    }
}
