//! Temporary views backed by a fake cleartool
//!
//! The script answers the subset of cleartool the crate uses. State lives next to
//! the view:
//! - `checkouts`: one absolute path per line (`co` appends, `ci`/`unco` remove)
//! - `listing`: output of `ls -recurse`
//! - `private`: output of `ls -view_only -short -recurse`
//! - `snapshot`: present for a snapshot view
//! - `hang`: present to make `lsco` sleep, like a slow remote VOB
//! - `argv.log`: every invocation's arguments, one per line

#![allow(dead_code)]

use clearcase_navigator::core::config::Settings;
use clearcase_navigator::core::error::{ClearCaseError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const FAKE_CLEARTOOL: &str = r#"#!/bin/sh
STATE="__STATE__"
printf '%s\n' "$*" >> "$STATE/argv.log"
cmd="$1"
shift
last=""
for a in "$@"; do last="$a"; done

remove_checkout() {
    touch "$STATE/checkouts"
    grep -Fvx "$1" "$STATE/checkouts" > "$STATE/checkouts.tmp"
    mv "$STATE/checkouts.tmp" "$STATE/checkouts"
}

case "$cmd" in
    lsview)
        echo "Tag: test_view"
        if [ -f "$STATE/snapshot" ]; then
            echo "  View attributes: snapshot"
        else
            echo "  View attributes: dynamic"
        fi
        ;;
    lsco)
        [ -f "$STATE/hang" ] && sleep 15
        [ -f "$STATE/checkouts" ] && cat "$STATE/checkouts"
        ;;
    ls)
        case " $* " in
            *" -view_only "*) [ -f "$STATE/private" ] && cat "$STATE/private" ;;
            *" -recurse "*) [ -f "$STATE/listing" ] && cat "$STATE/listing" ;;
            *)
                if grep -Fqx "$last" "$STATE/checkouts" 2>/dev/null; then
                    echo "$last@@/main/CHECKEDOUT from /main/1             Rule: CHECKEDOUT"
                else
                    echo "$last@@/main/1                 Rule: /main/LATEST"
                fi
                ;;
        esac
        ;;
    co)
        echo "$last" >> "$STATE/checkouts"
        echo "Checked out \"$(basename "$last")\" from version \"/main/1\"."
        ;;
    ci)
        remove_checkout "$last"
        echo "Checked in \"$(basename "$last")\" version \"/main/2\"."
        ;;
    unco)
        remove_checkout "$last"
        echo "Checkout cancelled for \"$(basename "$last")\"."
        ;;
    update)
        echo "Log has been written to \"update.log\"."
        ;;
    describe)
        echo "/main/1"
        ;;
    annotate)
        printf 'line one\r\nline two\n\nline three\n'
        ;;
    diff)
        echo "********************************"
        echo "-----[after 1 inserted 2]-----"
        echo "> added line"
        exit 1
        ;;
    get)
        echo "content of $last" > "$2"
        ;;
    *)
        echo "cleartool: Error: Unrecognized command: \"$cmd\"" >&2
        exit 1
        ;;
esac
"#;

/// A view root plus the fake cleartool's state. Keep it alive for the whole test.
pub struct TestView {
    pub temp_dir: TempDir,
    pub path: PathBuf,
    pub state: PathBuf,
    pub cleartool: PathBuf,
    pub config: PathBuf,
    pub cache: PathBuf,
    pub tmp: PathBuf,
}

impl TestView {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file(&self, relative: &str) -> PathBuf {
        self.path.join(relative)
    }

    /// Settings pointing at the fake cleartool, with a private temp directory
    pub fn settings(&self) -> Settings {
        Settings {
            executable: self.cleartool.to_string_lossy().into_owned(),
            temp_dir: Some(self.tmp.clone()),
            ..Settings::default()
        }
    }

    pub fn write_settings(&self, settings: &Settings) -> Result<()> {
        fs::write(&self.config, serde_json::to_string_pretty(settings)?)?;
        Ok(())
    }

    pub fn argv_log(&self) -> Vec<String> {
        fs::read_to_string(self.state.join("argv.log"))
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    pub fn checkouts(&self) -> Vec<String> {
        fs::read_to_string(self.state.join("checkouts"))
            .unwrap_or_default()
            .lines()
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn set_snapshot(&self) -> Result<()> {
        fs::write(self.state.join("snapshot"), "")?;
        Ok(())
    }

    pub fn hang_scans(&self) -> Result<()> {
        fs::write(self.state.join("hang"), "")?;
        Ok(())
    }

    pub fn set_listing(&self, listing: &str) -> Result<()> {
        fs::write(self.state.join("listing"), listing)?;
        Ok(())
    }

    pub fn set_private(&self, listing: &str) -> Result<()> {
        fs::write(self.state.join("private"), listing)?;
        Ok(())
    }

    pub fn add_checkout(&self, path: &Path) -> Result<()> {
        let mut checkouts = self.checkouts();
        checkouts.push(path.to_string_lossy().into_owned());
        fs::write(self.state.join("checkouts"), checkouts.join("\n") + "\n")?;
        Ok(())
    }
}

/// Creates a view root, the fake cleartool and a settings file using it
pub fn setup_test_view() -> Result<TestView> {
    let temp_dir = TempDir::new().map_err(ClearCaseError::Io)?;
    let base = temp_dir.path().canonicalize()?;
    let path = base.join("view");
    let state = base.join("state");
    let bin = base.join("bin");
    let tmp = base.join("tmp");
    for dir in [&path, &state, &bin, &tmp] {
        fs::create_dir_all(dir)?;
    }

    let cleartool = bin.join("cleartool");
    let script = FAKE_CLEARTOOL.replace("__STATE__", &state.to_string_lossy());
    fs::write(&cleartool, script)?;
    make_executable(&cleartool)?;

    let view = TestView {
        config: base.join("config.json"),
        cache: base.join("cache"),
        tmp,
        temp_dir,
        path,
        state,
        cleartool,
    };
    view.write_settings(&view.settings())?;
    Ok(view)
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))?;
    Ok(())
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}

/// Creates a file (and its parent directories) inside the view
pub fn create_file(view: &TestView, relative: &str, content: &str) -> Result<PathBuf> {
    let file = view.file(relative);
    if let Some(parent) = file.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&file, content)?;
    Ok(file)
}
