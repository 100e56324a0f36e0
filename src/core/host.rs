//! Editor-side collaborators of the reconciliation loop.
//!
//! [`EditorHost`] is what the loop asks of the user interface: confirmations,
//! checkin comments, notifications and the "current file" context. Rendering the
//! resource groups goes through [`ResourceSink`] instead, so one host type usually
//! implements both.
//!
//! Two hosts ship:
//! - [`ConsoleHost`]: colored terminal output, prompts on stdin
//! - [`JsonLinesHost`]: one JSON object per stdout line, used by `serve`. Questions
//!   to the editor are `request` messages answered by `response` events on stdin.

use crate::core::{
    file_status::GroupKind,
    groups::{GroupCounts, ResourceSink},
    output::{print_error, print_info, print_warning},
    reconcile::SaveOutcome,
    state::TrackedFile,
};
use async_trait::async_trait;
use colored::*;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::oneshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifyLevel {
    Info,
    Warning,
    Error,
}

/// What the editor shows about the current file and the view
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EditorContext {
    pub path: Option<PathBuf>,
    pub is_tracked: bool,
    pub version: Option<String>,
    pub counts: GroupCounts,
}

#[async_trait]
pub trait EditorHost: Send + Sync {
    async fn confirm(&self, message: &str) -> bool;

    /// Ask for a checkin comment. `None` means the user cancelled.
    async fn prompt_comment(&self, path: &Path) -> Option<String>;

    fn notify(&self, level: NotifyLevel, message: &str);

    fn update_context(&self, context: &EditorContext);
}

/// Interactive terminal host
#[derive(Debug, Default)]
pub struct ConsoleHost {
    assume_yes: bool,
}

impl ConsoleHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every confirmation with yes
    pub fn with_assume_yes(mut self, yes: bool) -> Self {
        self.assume_yes = yes;
        self
    }

    async fn read_line(prompt: &str) -> Option<String> {
        print!("{prompt}");
        let _ = std::io::stdout().flush();
        let mut line = String::new();
        match BufReader::new(tokio::io::stdin()).read_line(&mut line).await {
            Ok(0) => None,
            Ok(_) => Some(line.trim().to_string()),
            Err(e) => {
                log::warn!("Failed to read from stdin: {e}");
                None
            }
        }
    }
}

#[async_trait]
impl EditorHost for ConsoleHost {
    async fn confirm(&self, message: &str) -> bool {
        if self.assume_yes {
            return true;
        }
        let prompt = format!("\n{} {} ", message.white(), "[y/N]".bright_black());
        matches!(
            Self::read_line(&prompt).await.as_deref().map(str::to_ascii_lowercase).as_deref(),
            Some("y" | "yes")
        )
    }

    async fn prompt_comment(&self, path: &Path) -> Option<String> {
        let prompt = format!("\n{} {}: ", "Comment for".white(), path.display().to_string().cyan());
        Self::read_line(&prompt).await.filter(|c| !c.is_empty())
    }

    fn notify(&self, level: NotifyLevel, message: &str) {
        match level {
            NotifyLevel::Info => print_info(message),
            NotifyLevel::Warning => print_warning(message),
            NotifyLevel::Error => print_error(message),
        }
    }

    fn update_context(&self, context: &EditorContext) {
        log::debug!(
            "Context: tracked={} version={:?} counts={:?}",
            context.is_tracked,
            context.version,
            context.counts
        );
    }
}

/// Subcommands print groups themselves, in a fixed order
impl ResourceSink for ConsoleHost {
    fn render(&self, kind: GroupKind, files: &[TrackedFile]) {
        log::debug!("{}: {} file(s)", kind.label(), files.len());
    }

    fn clear(&self, kind: GroupKind) {
        log::debug!("{} group hidden", kind.label());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    Confirm,
    Comment,
}

/// Messages written by [`JsonLinesHost`], one per line
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostMessage<'a> {
    Group {
        group: GroupKind,
        files: &'a [TrackedFile],
    },
    Clear {
        group: GroupKind,
    },
    Context(&'a EditorContext),
    Notify {
        level: NotifyLevel,
        message: &'a str,
    },
    Request {
        id: u64,
        kind: RequestKind,
        message: &'a str,
    },
    /// The editor may now write the file
    SaveReady {
        path: &'a Path,
        outcome: SaveOutcome,
    },
}

/// Host speaking JSON lines to an editor process
pub struct JsonLinesHost {
    out: Mutex<Box<dyn Write + Send>>,
    pending: Mutex<HashMap<u64, oneshot::Sender<Value>>>,
    next_id: AtomicU64,
    closed: AtomicBool,
}

impl JsonLinesHost {
    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
            pending: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            closed: AtomicBool::new(false),
        }
    }

    pub fn stdout() -> Self {
        Self::new(Box::new(std::io::stdout()))
    }

    pub fn emit(&self, message: &HostMessage<'_>) {
        let line = match serde_json::to_string(message) {
            Ok(line) => line,
            Err(e) => {
                log::error!("Failed to encode host message: {e}");
                return;
            }
        };
        let mut out = self.out.lock().unwrap_or_else(|e| e.into_inner());
        if let Err(e) = writeln!(out, "{line}").and_then(|_| out.flush()) {
            log::warn!("Failed to write host message: {e}");
        }
    }

    /// Deliver the editor's answer to an outstanding request
    pub fn resolve(&self, id: u64, value: Value) -> bool {
        let sender = self
            .pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&id);
        match sender {
            Some(sender) => sender.send(value).is_ok(),
            None => {
                log::warn!("Response for unknown request {id}");
                false
            }
        }
    }

    /// The editor is gone: outstanding and future requests get no answer
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.pending.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }

    async fn request(&self, kind: RequestKind, message: &str) -> Option<Value> {
        if self.closed.load(Ordering::SeqCst) {
            return None;
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        self.pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, tx);
        self.emit(&HostMessage::Request { id, kind, message });
        rx.await.ok()
    }
}

#[async_trait]
impl EditorHost for JsonLinesHost {
    async fn confirm(&self, message: &str) -> bool {
        self.request(RequestKind::Confirm, message)
            .await
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }

    async fn prompt_comment(&self, path: &Path) -> Option<String> {
        let message = format!("Checkin comment for {}", path.display());
        self.request(RequestKind::Comment, &message)
            .await
            .and_then(|v| v.as_str().map(str::to_string))
            .filter(|c| !c.is_empty())
    }

    fn notify(&self, level: NotifyLevel, message: &str) {
        self.emit(&HostMessage::Notify { level, message });
    }

    fn update_context(&self, context: &EditorContext) {
        self.emit(&HostMessage::Context(context));
    }
}

impl ResourceSink for JsonLinesHost {
    fn render(&self, kind: GroupKind, files: &[TrackedFile]) {
        self.emit(&HostMessage::Group { group: kind, files });
    }

    fn clear(&self, kind: GroupKind) {
        self.emit(&HostMessage::Clear { group: kind });
    }
}
