//! `serve`: the editor bridge.
//!
//! Reads one JSON event per stdin line and answers with JSON lines on stdout (see
//! [`JsonLinesHost`]). Every event runs as its own task against one shared
//! [`Reconciler`], so overlapping file events meet the reconciler's delta lock
//! exactly as they would inside an editor.

use crate::core::{
    command_init::CommandContext,
    config::Settings,
    error::{ClearCaseError, Result},
    host::{EditorHost, HostMessage, JsonLinesHost, NotifyLevel},
    reconcile::{Reconciler, SaveOutcome},
};
use serde::Deserialize;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinSet;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EditorEvent {
    WillSave {
        path: PathBuf,
        #[serde(default)]
        read_only: bool,
    },
    ActiveEditorChanged {
        #[serde(default)]
        path: Option<PathBuf>,
    },
    FileCreated {
        path: PathBuf,
    },
    FileChanged {
        path: PathBuf,
    },
    FileDeleted {
        path: PathBuf,
    },
    Checkout {
        path: PathBuf,
    },
    Checkin {
        path: PathBuf,
        #[serde(default)]
        comment: Option<String>,
    },
    UndoCheckout {
        path: PathBuf,
    },
    Update {
        path: PathBuf,
    },
    Refresh,
    ConfigurationChanged {
        settings: Settings,
    },
    /// Answer to a `request` message
    Response {
        id: u64,
        value: Value,
    },
    Shutdown,
}

impl EditorEvent {
    pub fn parse(line: &str) -> Result<Self> {
        Ok(serde_json::from_str(line)?)
    }
}

pub async fn execute_serve(context: &CommandContext) -> Result<()> {
    let host = Arc::new(JsonLinesHost::stdout());
    let reconciler = Arc::new(context.reconciler(host.clone()));
    let watcher = tokio::spawn(reconciler.clone().watch_configuration());

    let mut tasks = JoinSet::new();
    tasks.spawn(dispatch(reconciler.clone(), host.clone(), EditorEvent::Refresh));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let event = match EditorEvent::parse(&line) {
            Ok(event) => event,
            Err(e) => {
                log::warn!("Ignoring malformed event: {e}");
                host.notify(NotifyLevel::Error, &format!("Malformed event: {e}"));
                continue;
            }
        };
        log::debug!("Event: {event:?}");

        match event {
            EditorEvent::Shutdown => break,
            EditorEvent::Response { id, value } => {
                host.resolve(id, value);
            }
            EditorEvent::ConfigurationChanged { settings } => {
                context.config.apply(settings);
            }
            event => {
                tasks.spawn(dispatch(reconciler.clone(), host.clone(), event));
            }
        }

        while let Some(finished) = tasks.try_join_next() {
            if let Err(e) = finished {
                log::error!("Event task failed: {e}");
            }
        }
    }

    log::debug!("Shutting down, {} event task(s) still running", tasks.len());
    host.close();
    watcher.abort();
    // Killed invocations resolve as superseded, so the tasks below finish promptly
    reconciler.dispose();
    while let Some(finished) = tasks.join_next().await {
        if let Err(e) = finished {
            log::error!("Event task failed: {e}");
        }
    }
    Ok(())
}

async fn dispatch(reconciler: Arc<Reconciler>, host: Arc<JsonLinesHost>, event: EditorEvent) {
    if let Err(e) = handle_event(&reconciler, &host, event).await {
        report_error(host.as_ref(), &e);
    }
}

async fn handle_event(reconciler: &Reconciler, host: &JsonLinesHost, event: EditorEvent) -> Result<()> {
    match event {
        EditorEvent::WillSave { path, read_only } => {
            let outcome = reconciler.handle_will_save(&path, read_only).await;
            // The editor is blocked on this answer even when the checkout failed
            let reported = match &outcome {
                Ok(outcome) => *outcome,
                Err(_) => SaveOutcome::Proceed,
            };
            host.emit(&HostMessage::SaveReady {
                path: &path,
                outcome: reported,
            });
            outcome?;
        }
        EditorEvent::ActiveEditorChanged { path } => reconciler.handle_active_editor_changed(path).await,
        EditorEvent::FileCreated { path } => {
            reconciler.handle_file_created(&path).await;
        }
        EditorEvent::FileChanged { path } => {
            reconciler.handle_file_changed(&path).await;
        }
        EditorEvent::FileDeleted { path } => reconciler.handle_file_deleted(&path),
        EditorEvent::Checkout { path } => {
            reconciler.checkout(&path).await?;
        }
        EditorEvent::Checkin { path, comment } => {
            reconciler.checkin(&path, comment.as_deref()).await?;
        }
        EditorEvent::UndoCheckout { path } => {
            reconciler.undo_checkout(&path).await?;
        }
        EditorEvent::Update { path } => {
            reconciler.update(&path).await?;
        }
        EditorEvent::Refresh => reconciler.refresh_all().await?,
        EditorEvent::ConfigurationChanged { .. } | EditorEvent::Response { .. } | EditorEvent::Shutdown => {
            log::debug!("Event handled by the serve loop");
        }
    }
    Ok(())
}

/// Superseded work is dropped silently; a declined comment is not an error
fn report_error(host: &dyn EditorHost, error: &ClearCaseError) {
    match error {
        ClearCaseError::Superseded { .. } => log::debug!("{error}"),
        ClearCaseError::Cancelled => log::debug!("{error}"),
        _ => {
            log::error!("{error}");
            host.notify(NotifyLevel::Error, &error.to_string());
        }
    }
}
