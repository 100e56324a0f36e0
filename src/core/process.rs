//! Asynchronous cleartool invocation with per-operation supersession.
//!
//! Every invocation runs under an operation identity (`"find-hijacked"`,
//! `"version:/v/a.c"`, ...). The [`CommandRegistry`] keeps at most one live process
//! per identity: starting a new one kills the previous process group first, and the
//! killed invocation never reports completion. Different identities run fully
//! concurrently.
//!
//! # Public API
//! - [`ProcessRunner`]: spawns cleartool, maps file operands, builds argv
//! - [`CommandRegistry`]: identity → [`InvocationState`] table shared by all call sites
//! - [`CommandHandle`]: a live invocation; streams lines and resolves to an [`Outcome`]
//! - [`CommandOutput`]: `{exit_code, stdout, stderr}` of a finished invocation
//! - [`FailurePolicy`]: per call site decision whether stderr + non-zero exit is fatal

use crate::core::{
    command_args::CommandArgs,
    error::{ClearCaseError, Result},
    path_mapper::PathMapper,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tokio::io::AsyncReadExt;
use tokio::process::{ChildStderr, ChildStdout, Command};
use tokio::sync::{mpsc, oneshot};

/// Lifecycle of one operation identity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationState {
    Idle,
    Running { pid: u32 },
    /// Killed in favour of a newer invocation; cleared when its process closes
    Superseded { pid: u32 },
}

/// Identity registry of live invocations.
///
/// All transitions happen under one lock, and close handlers compare process ids so
/// a late close of a superseded process can never remove its successor's entry.
#[derive(Debug, Default)]
pub struct CommandRegistry {
    slots: Mutex<HashMap<String, InvocationState>>,
    disposed: AtomicBool,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, operation: &str) -> InvocationState {
        self.lock()
            .get(operation)
            .copied()
            .unwrap_or(InvocationState::Idle)
    }

    pub fn is_running(&self, operation: &str) -> bool {
        matches!(self.state(operation), InvocationState::Running { .. })
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    pub fn running_count(&self) -> usize {
        self.lock()
            .values()
            .filter(|s| matches!(s, InvocationState::Running { .. }))
            .count()
    }

    /// Kill the live invocation registered under `operation`, if any.
    /// Returns the pid that was terminated.
    pub fn supersede(&self, operation: &str) -> Option<u32> {
        let mut slots = self.lock();
        Self::supersede_locked(&mut slots, operation)
    }

    /// Kill every live invocation and refuse new ones from now on.
    /// Returns the number of processes killed.
    pub fn dispose(&self) -> usize {
        let mut slots = self.lock();
        self.disposed.store(true, Ordering::SeqCst);
        let operations: Vec<String> = slots.keys().cloned().collect();
        operations
            .iter()
            .filter(|op| Self::supersede_locked(&mut slots, op).is_some())
            .count()
    }

    /// Supersede, spawn and register atomically with respect to other starts and
    /// close handlers for the same identity.
    fn start<F, T>(&self, operation: &str, spawn: F) -> Result<(T, u32)>
    where
        F: FnOnce() -> Result<(T, u32)>,
    {
        let mut slots = self.lock();
        if self.is_disposed() {
            log::debug!("Not starting '{operation}': registry disposed");
            return Err(ClearCaseError::Cancelled);
        }
        if let Some(pid) = Self::supersede_locked(&mut slots, operation) {
            log::debug!("Superseded '{operation}' (pid {pid})");
        }
        let (value, pid) = spawn()?;
        slots.insert(operation.to_string(), InvocationState::Running { pid });
        Ok((value, pid))
    }

    /// Close handler. Returns true when `pid` was still the live invocation, i.e.
    /// its completion should be delivered.
    fn finish(&self, operation: &str, pid: u32) -> bool {
        let mut slots = self.lock();
        match slots.get(operation).copied() {
            Some(InvocationState::Running { pid: live }) if live == pid => {
                slots.remove(operation);
                true
            }
            Some(InvocationState::Superseded { pid: dead }) if dead == pid => {
                slots.remove(operation);
                false
            }
            _ => false,
        }
    }

    fn supersede_locked(
        slots: &mut HashMap<String, InvocationState>,
        operation: &str,
    ) -> Option<u32> {
        match slots.get(operation).copied() {
            Some(InvocationState::Running { pid }) => {
                kill_process_tree(pid);
                slots.insert(operation.to_string(), InvocationState::Superseded { pid });
                Some(pid)
            }
            _ => None,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, InvocationState>> {
        // A poisoned table is still structurally valid.
        self.slots.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(unix)]
fn kill_process_tree(pid: u32) {
    if pid == 0 {
        return;
    }
    // Children are spawned as process group leaders, so pgid == pid.
    let result = unsafe { libc::kill(-(pid as libc::pid_t), libc::SIGKILL) };
    if result != 0 {
        log::debug!(
            "kill of process group {pid} failed: {}",
            std::io::Error::last_os_error()
        );
    }
}

#[cfg(windows)]
fn kill_process_tree(pid: u32) {
    let status = std::process::Command::new("taskkill")
        .args(["/pid", &pid.to_string(), "/T", "/F"])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
    if let Err(e) = status {
        log::debug!("taskkill for pid {pid} failed: {e}");
    }
}

#[cfg(not(any(unix, windows)))]
fn kill_process_tree(_pid: u32) {}

/// Whether a non-zero exit accompanied by stderr rejects the operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// The user is waiting on this operation: surface failures
    ActiveSession,
    /// Background work: log stderr and let the caller inspect the output
    LogOnly,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandOutput {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0) && self.stderr.trim().is_empty()
    }

    pub fn stdout_lines(&self) -> Vec<String> {
        split_lines(&self.stdout)
    }

    /// Apply a call site's failure policy
    pub fn check(self, argv: &[String], policy: FailurePolicy) -> Result<Self> {
        let non_zero = matches!(self.exit_code, Some(code) if code != 0);
        let has_stderr = !self.stderr.trim().is_empty();
        if non_zero && has_stderr && policy == FailurePolicy::ActiveSession {
            log::error!(
                "cleartool {} failed with exit code {:?}: {}",
                argv.join(" "),
                self.exit_code,
                self.stderr.trim()
            );
            return Err(ClearCaseError::tool_invocation(
                argv.to_vec(),
                self.exit_code,
                self.stderr,
            ));
        }
        Ok(self)
    }
}

/// How an invocation ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Completed(CommandOutput),
    Superseded,
}

/// Line-by-line stdout of one invocation. Finite: ends when the process closes.
#[derive(Debug)]
pub struct OutputLines {
    rx: mpsc::UnboundedReceiver<String>,
}

impl OutputLines {
    pub async fn next_line(&mut self) -> Option<String> {
        self.rx.recv().await
    }
}

/// A live invocation
#[derive(Debug)]
pub struct CommandHandle {
    operation: String,
    argv: Vec<String>,
    pid: u32,
    lines: OutputLines,
    completion: oneshot::Receiver<CommandOutput>,
}

impl CommandHandle {
    pub fn operation(&self) -> &str {
        &self.operation
    }

    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn lines(&mut self) -> &mut OutputLines {
        &mut self.lines
    }

    pub async fn wait(self) -> Outcome {
        match self.completion.await {
            Ok(output) => Outcome::Completed(output),
            // The close handler drops the sender for superseded invocations.
            Err(_) => Outcome::Superseded,
        }
    }

    /// Wait for completion, turning supersession and policy failures into errors
    pub async fn output(self, policy: FailurePolicy) -> Result<CommandOutput> {
        let operation = self.operation.clone();
        let argv = self.argv.clone();
        match self.wait().await {
            Outcome::Completed(output) => output.check(&argv, policy),
            Outcome::Superseded => Err(ClearCaseError::superseded(operation)),
        }
    }
}

/// One invocation request
#[derive(Debug, Clone)]
pub struct CommandRequest {
    pub operation: String,
    pub params: Vec<String>,
    pub files: Vec<String>,
    pub version: Option<String>,
    pub cwd: PathBuf,
}

impl CommandRequest {
    pub fn new(operation: impl Into<String>, params: Vec<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            operation: operation.into(),
            params,
            files: Vec::new(),
            version: None,
            cwd: cwd.into(),
        }
    }

    pub fn with_files(mut self, files: &[PathBuf]) -> Self {
        self.files = files.iter().map(|p| p.to_string_lossy().into_owned()).collect();
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }
}

pub struct ProcessRunner {
    executable: PathBuf,
    mapper: RwLock<PathMapper>,
    registry: Arc<CommandRegistry>,
}

impl ProcessRunner {
    pub fn new(executable: impl Into<PathBuf>, mapper: PathMapper, registry: Arc<CommandRegistry>) -> Self {
        Self {
            executable: executable.into(),
            mapper: RwLock::new(mapper),
            registry,
        }
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    pub fn registry(&self) -> &Arc<CommandRegistry> {
        &self.registry
    }

    pub fn mapper(&self) -> PathMapper {
        self.mapper.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Replace the path mapping, e.g. after a configuration change
    pub fn set_mapper(&self, mapper: PathMapper) {
        *self.mapper.write().unwrap_or_else(|e| e.into_inner()) = mapper;
    }

    /// Map file operands to the execution environment and build the argv
    pub fn build_argv(&self, request: &CommandRequest) -> Result<Vec<String>> {
        let version = request.version.as_deref().filter(|v| !v.is_empty());
        if version.is_some() && request.files.len() > 1 {
            return Err(ClearCaseError::VersionWithMultipleFiles {
                count: request.files.len(),
            });
        }
        let mapper = self.mapper();
        let files: Vec<String> = request.files.iter().map(|f| mapper.to_target(f)).collect();
        Ok(CommandArgs::build(request.params.clone(), &files, version))
    }

    /// Start an invocation, superseding any live one with the same identity
    pub async fn start(&self, request: CommandRequest) -> Result<CommandHandle> {
        if tokio::fs::metadata(&request.cwd).await.is_err() {
            return Err(ClearCaseError::working_directory_missing(&request.cwd));
        }

        let argv = self.build_argv(&request)?;
        log::debug!(
            "[{}] {} {} (cwd {})",
            request.operation,
            self.executable.display(),
            argv.join(" "),
            request.cwd.display()
        );

        let mut command = Command::new(&self.executable);
        command
            .args(&argv)
            .current_dir(&request.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        #[cfg(unix)]
        command.process_group(0);

        let executable = self.executable.clone();
        let (mut child, pid) = self.registry.start(&request.operation, || {
            let child = command.spawn().map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => {
                    ClearCaseError::executable_not_found(executable.to_string_lossy())
                }
                _ => ClearCaseError::Io(e),
            })?;
            let pid = child.id().unwrap_or(0);
            Ok((child, pid))
        })?;

        let (line_tx, line_rx) = mpsc::unbounded_channel();
        let (done_tx, done_rx) = oneshot::channel();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let registry = Arc::clone(&self.registry);
        let operation = request.operation.clone();

        tokio::spawn(async move {
            let (stdout_text, stderr_text, status) = tokio::join!(
                pump_stdout(stdout, line_tx),
                read_stderr(stderr),
                child.wait()
            );
            let exit_code = match status {
                Ok(status) => status.code(),
                Err(e) => {
                    log::warn!("[{operation}] failed to wait for pid {pid}: {e}");
                    None
                }
            };

            if !registry.finish(&operation, pid) {
                log::debug!("[{operation}] pid {pid} closed after being superseded");
                return;
            }

            if !stderr_text.trim().is_empty() {
                log::warn!("[{operation}] stderr: {}", stderr_text.trim());
            }
            log::debug!("[{operation}] pid {pid} exited with {exit_code:?}");

            let _ = done_tx.send(CommandOutput {
                exit_code,
                stdout: stdout_text,
                stderr: stderr_text,
            });
        });

        Ok(CommandHandle {
            operation: request.operation,
            argv,
            pid,
            lines: OutputLines { rx: line_rx },
            completion: done_rx,
        })
    }

    /// Start and wait
    pub async fn run(&self, request: CommandRequest, policy: FailurePolicy) -> Result<CommandOutput> {
        self.start(request).await?.output(policy).await
    }

    /// Kill the live invocation for `operation`; its completion never fires
    pub fn cancel(&self, operation: &str) -> bool {
        self.registry.supersede(operation).is_some()
    }
}

/// Split on CRLF, LF or CR and drop blank lines
pub fn split_lines(text: &str) -> Vec<String> {
    text.split(['\r', '\n'])
        .filter(|l| !l.trim().is_empty())
        .map(str::to_string)
        .collect()
}

async fn pump_stdout(stdout: Option<ChildStdout>, lines: mpsc::UnboundedSender<String>) -> String {
    let Some(mut stdout) = stdout else {
        return String::new();
    };

    let mut collected = Vec::new();
    let mut pending: Vec<u8> = Vec::new();
    let mut buf = [0u8; 8192];

    loop {
        match stdout.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                collected.extend_from_slice(&buf[..n]);
                pending.extend_from_slice(&buf[..n]);
                if let Some(last_break) = pending.iter().rposition(|b| *b == b'\n' || *b == b'\r') {
                    let complete: Vec<u8> = pending.drain(..=last_break).collect();
                    for line in split_lines(&String::from_utf8_lossy(&complete)) {
                        // Nobody listening is fine; the buffer is still collected.
                        let _ = lines.send(line);
                    }
                }
            }
            Err(e) => {
                log::warn!("Failed to read cleartool stdout: {e}");
                break;
            }
        }
    }

    for line in split_lines(&String::from_utf8_lossy(&pending)) {
        let _ = lines.send(line);
    }

    String::from_utf8_lossy(&collected).into_owned()
}

async fn read_stderr(stderr: Option<ChildStderr>) -> String {
    let Some(mut stderr) = stderr else {
        return String::new();
    };
    let mut bytes = Vec::new();
    if let Err(e) = stderr.read_to_end(&mut bytes).await {
        log::warn!("Failed to read cleartool stderr: {e}");
    }
    String::from_utf8_lossy(&bytes).into_owned()
}
