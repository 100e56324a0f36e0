//! cleartool operations on top of the [`ProcessRunner`].
//!
//! This module provides [`ClearTool`], the concrete client for one view, and the
//! [`VersionControl`] trait the reconciliation loop drives. Every operation picks an
//! operation identity so that repeated requests supersede stale ones: scans use one
//! identity per group, per-file operations embed the path.
//!
//! # Public API
//! - [`VersionControl`]: the async seam between reconciliation and cleartool
//! - [`ClearTool`]: cleartool-backed implementation
//! - [`ViewType`]: dynamic or snapshot view, detected once per client
//! - [`checkout_params`], [`checkin_params`]: argv construction from templates

use crate::core::{
    config::Settings,
    error::{ClearCaseError, Result},
    file_status::GroupKind,
    path_mapper::PathMapper,
    process::{CommandHandle, CommandOutput, CommandRegistry, CommandRequest, FailurePolicy, ProcessRunner},
    templates::{render_args, TemplateContext},
    version::{normalize_label, VersionInfo, VersionOracle},
};
use async_trait::async_trait;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tokio::sync::OnceCell;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewType {
    Dynamic,
    Snapshot,
    Unknown,
}

/// Operations the reconciliation loop needs from the version control system
#[async_trait]
pub trait VersionControl: Send + Sync {
    /// Query one element. Failures are reported; the caller decides how to degrade.
    async fn version_info(&self, path: &Path) -> Result<VersionInfo>;

    /// Full rescan for one group. `None` means a newer scan superseded this one.
    async fn scan(&self, kind: GroupKind) -> Result<Option<Vec<PathBuf>>>;

    /// Kill a running scan, e.g. because its group was hidden
    fn cancel_scan(&self, kind: GroupKind);

    async fn checkout(&self, path: &Path) -> Result<CommandOutput>;

    async fn checkin(&self, path: &Path, comment: Option<&str>) -> Result<CommandOutput>;

    async fn undo_checkout(&self, path: &Path) -> Result<CommandOutput>;

    async fn update(&self, path: &Path) -> Result<CommandOutput>;

    /// Pick up hot-reloadable settings (templates, path mapping, filters)
    fn reconfigure(&self, settings: &Settings);

    /// Kill every live invocation; nothing new starts afterwards
    fn dispose(&self);
}

pub struct ClearTool {
    runner: ProcessRunner,
    settings: RwLock<Settings>,
    view_root: PathBuf,
    view_type: OnceCell<ViewType>,
}

impl ClearTool {
    pub fn new(settings: Settings, view_root: impl Into<PathBuf>, registry: Arc<CommandRegistry>) -> Self {
        let runner = ProcessRunner::new(settings.executable_name(), settings.path_mapper(), registry);
        Self {
            runner,
            settings: RwLock::new(settings),
            view_root: view_root.into(),
            view_type: OnceCell::new(),
        }
    }

    pub fn runner(&self) -> &ProcessRunner {
        &self.runner
    }

    pub fn view_root(&self) -> &Path {
        &self.view_root
    }

    fn settings(&self) -> Settings {
        self.settings.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Working directory for a per-file operation
    fn cwd_for(&self, path: &Path) -> PathBuf {
        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() && parent.is_dir() => parent.to_path_buf(),
            _ => self.view_root.clone(),
        }
    }

    pub async fn view_type(&self) -> ViewType {
        *self
            .view_type
            .get_or_init(|| async {
                let request = CommandRequest::new(
                    "lsview",
                    args(&["lsview", "-cview", "-long"]),
                    &self.view_root,
                );
                match self.runner.run(request, FailurePolicy::LogOnly).await {
                    Ok(output) => parse_view_type(&output.stdout),
                    Err(e) => {
                        log::warn!("Could not determine view type: {e}");
                        ViewType::Unknown
                    }
                }
            })
            .await
    }

    /// Stream `annotate` output line by line
    pub async fn annotate(&self, path: &Path) -> Result<CommandHandle> {
        let settings = self.settings();
        let params = vec![
            "annotate".to_string(),
            "-out".to_string(),
            "-".to_string(),
            "-nheader".to_string(),
            "-fmt".to_string(),
            format!("{}\\n", settings.annotate_format),
        ];
        let request = CommandRequest::new(op_id("annotate", path), params, self.cwd_for(path))
            .with_files(&[path.to_path_buf()]);
        self.runner.start(request).await
    }

    /// Predecessor version of an element, if it has one
    pub async fn predecessor(&self, path: &Path) -> Result<Option<String>> {
        let request = CommandRequest::new(
            op_id("describe", path),
            args(&["describe", "-fmt", "%PVn"]),
            self.cwd_for(path),
        )
        .with_files(&[path.to_path_buf()]);
        let output = self.runner.run(request, FailurePolicy::ActiveSession).await?;
        let version = normalize_label(&output.stdout);
        Ok(if version.is_empty() { None } else { Some(version) })
    }

    /// Fetch `path@@version` into the temp directory and return the copy's location.
    /// Already fetched versions are reused.
    pub async fn fetch_version(&self, path: &Path, version: &str) -> Result<PathBuf> {
        let settings = self.settings();
        let temp_dir = settings.temp_directory();
        if settings.temp_dir.is_some() {
            if !temp_dir.is_dir() {
                return Err(ClearCaseError::temp_directory_missing(&temp_dir));
            }
        } else {
            tokio::fs::create_dir_all(&temp_dir).await?;
        }

        let target = temp_dir.join(fetched_file_name(path, version));
        if tokio::fs::metadata(&target).await.is_ok() {
            log::debug!("Reusing fetched version {}", target.display());
            return Ok(target);
        }

        let mapper = self.runner.mapper();
        let params = vec![
            "get".to_string(),
            "-to".to_string(),
            mapper.to_target(&target.to_string_lossy()),
        ];
        let request = CommandRequest::new(op_id("get", path), params, self.cwd_for(path))
            .with_files(&[path.to_path_buf()])
            .with_version(version);
        self.runner.run(request, FailurePolicy::ActiveSession).await?;

        if tokio::fs::metadata(&target).await.is_err() {
            return Err(ClearCaseError::file_not_found(&target));
        }
        Ok(target)
    }

    /// Textual diff against the predecessor version
    pub async fn diff_with_predecessor(&self, path: &Path) -> Result<String> {
        let request = CommandRequest::new(
            op_id("diff", path),
            args(&["diff", "-pred", "-serial_format"]),
            self.cwd_for(path),
        )
        .with_files(&[path.to_path_buf()]);
        // Exit code 1 without stderr only means "files differ"
        let output = self.runner.run(request, FailurePolicy::ActiveSession).await?;
        Ok(output.stdout)
    }

    async fn run_file_operation(&self, verb: &str, params: Vec<String>, path: &Path) -> Result<CommandOutput> {
        let request = CommandRequest::new(op_id(verb, path), params, self.cwd_for(path))
            .with_files(&[path.to_path_buf()]);
        self.runner.run(request, FailurePolicy::ActiveSession).await
    }
}

#[async_trait]
impl VersionControl for ClearTool {
    async fn version_info(&self, path: &Path) -> Result<VersionInfo> {
        let request = CommandRequest::new(op_id("version", path), args(&["ls", "-d"]), self.cwd_for(path))
            .with_files(&[path.to_path_buf()]);
        let output = self.runner.run(request, FailurePolicy::LogOnly).await?;
        Ok(VersionOracle::parse(&output.stdout, true))
    }

    async fn scan(&self, kind: GroupKind) -> Result<Option<Vec<PathBuf>>> {
        let params = match kind {
            GroupKind::Checkout => args(&["lsco", "-me", "-cview", "-short", "-avobs"]),
            GroupKind::Hijacked => args(&["ls", "-recurse"]),
            GroupKind::ViewPrivate => args(&["ls", "-view_only", "-short", "-recurse"]),
        };
        let filter = match kind {
            GroupKind::ViewPrivate => self.settings().view_private_regex()?,
            _ => None,
        };

        let request = CommandRequest::new(kind.scan_operation(), params, &self.view_root);
        let handle = self.runner.start(request).await?;
        let output = match handle.output(FailurePolicy::LogOnly).await {
            Ok(output) => output,
            Err(ClearCaseError::Superseded { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };

        let files = parse_scan(
            kind,
            &output.stdout,
            &self.view_root,
            &self.runner.mapper(),
            filter.as_ref(),
        );
        log::debug!("Scan {:?} found {} file(s)", kind, files.len());
        Ok(Some(files))
    }

    fn cancel_scan(&self, kind: GroupKind) {
        if self.runner.cancel(kind.scan_operation()) {
            log::debug!("Cancelled running {} scan", kind.scan_operation());
        }
    }

    async fn checkout(&self, path: &Path) -> Result<CommandOutput> {
        let template = self.settings().checkout_template;
        let view_type = self.view_type().await;
        self.run_file_operation("checkout", checkout_params(&template, view_type), path)
            .await
    }

    async fn checkin(&self, path: &Path, comment: Option<&str>) -> Result<CommandOutput> {
        let template = self.settings().checkin_template;
        self.run_file_operation("checkin", checkin_params(&template, comment), path)
            .await
    }

    async fn undo_checkout(&self, path: &Path) -> Result<CommandOutput> {
        let template = self.settings().undo_checkout_template;
        let mut params = vec!["unco".to_string()];
        params.extend(render_args(&template, &TemplateContext::default()));
        self.run_file_operation("unco", params, path).await
    }

    async fn update(&self, path: &Path) -> Result<CommandOutput> {
        let template = self.settings().update_template;
        let mut params = vec!["update".to_string()];
        params.extend(render_args(&template, &TemplateContext::default()));
        self.run_file_operation("update", params, path).await
    }

    fn reconfigure(&self, settings: &Settings) {
        self.runner.set_mapper(settings.path_mapper());
        *self.settings.write().unwrap_or_else(|e| e.into_inner()) = settings.clone();
    }

    fn dispose(&self) {
        let killed = self.runner.registry().dispose();
        if killed > 0 {
            log::debug!("Killed {killed} running cleartool invocation(s)");
        }
    }
}

/// `co` argv from the checkout template. Snapshot views need `-usehijack` so a
/// hijacked file keeps its local content on checkout.
pub fn checkout_params(template: &str, view_type: ViewType) -> Vec<String> {
    let mut params = vec!["co".to_string()];
    if view_type == ViewType::Snapshot && !template.contains("usehijack") {
        params.push("-usehijack".to_string());
    }
    params.extend(render_args(template, &TemplateContext::default()));
    params
}

/// `ci` argv from the checkin template
pub fn checkin_params(template: &str, comment: Option<&str>) -> Vec<String> {
    let mut params = vec!["ci".to_string()];
    params.extend(render_args(template, &TemplateContext { comment }));
    params
}

pub fn parse_view_type(output: &str) -> ViewType {
    for line in output.lines() {
        let line = line.trim();
        let properties = line
            .strip_prefix("View attributes:")
            .or_else(|| line.strip_prefix("Properties:"));
        if let Some(properties) = properties {
            return if properties.contains("snapshot") {
                ViewType::Snapshot
            } else {
                ViewType::Dynamic
            };
        }
    }
    ViewType::Unknown
}

/// Decode one scan's stdout into sorted, absolute host paths
pub fn parse_scan(
    kind: GroupKind,
    stdout: &str,
    view_root: &Path,
    mapper: &PathMapper,
    filter: Option<&Regex>,
) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = stdout
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| match kind {
            GroupKind::Checkout => Some(line.trim().to_string()),
            GroupKind::Hijacked => {
                let parsed = VersionOracle::parse_line(line, true);
                parsed.info.is_hijacked().then_some(parsed.path)
            }
            GroupKind::ViewPrivate => {
                let parsed = VersionOracle::parse_line(line, true);
                (parsed.info.is_untracked() && !parsed.path.is_empty()).then_some(parsed.path)
            }
        })
        .filter(|path| !filter.is_some_and(|re| re.is_match(path)))
        .map(|path| absolutize(view_root, &mapper.to_host(&path)))
        .collect();
    files.sort_by(|a, b| a.as_os_str().cmp(b.as_os_str()));
    files.dedup();
    files
}

fn absolutize(root: &Path, path: &str) -> PathBuf {
    let candidate = PathBuf::from(path);
    // Drive paths count as absolute even when the host running us is POSIX
    let drive_path = path.len() >= 2 && path.as_bytes()[1] == b':';
    if candidate.is_absolute() || drive_path {
        return candidate;
    }
    let relative = path.strip_prefix("./").unwrap_or(path);
    root.join(relative)
}

fn fetched_file_name(path: &Path, version: &str) -> String {
    let key = format!("{}@@{}", path.display(), version);
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "element".to_string());
    format!("{:x}_{}", md5::compute(key.as_bytes()), name)
}

fn op_id(verb: &str, path: &Path) -> String {
    format!("{verb}:{}", path.display())
}

fn args(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
