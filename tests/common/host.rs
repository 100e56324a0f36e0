//! Recording editor host for in-process reconciliation tests

#![allow(dead_code)]

use async_trait::async_trait;
use clearcase_navigator::core::{
    file_status::GroupKind,
    groups::ResourceSink,
    host::{EditorContext, EditorHost, NotifyLevel},
    state::TrackedFile,
};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(Default)]
pub struct RecordingHost {
    pub confirm_answer: bool,
    pub comment_answer: Option<String>,
    pub renders: Mutex<Vec<(GroupKind, Vec<PathBuf>)>>,
    pub clears: Mutex<Vec<GroupKind>>,
    pub notifications: Mutex<Vec<(NotifyLevel, String)>>,
    pub contexts: Mutex<Vec<EditorContext>>,
}

impl RecordingHost {
    pub fn answering(confirm: bool, comment: Option<&str>) -> Self {
        Self {
            confirm_answer: confirm,
            comment_answer: comment.map(str::to_string),
            ..Default::default()
        }
    }

    pub fn messages(&self, level: NotifyLevel) -> Vec<String> {
        self.notifications
            .lock()
            .unwrap()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m.clone())
            .collect()
    }

    pub fn last_render(&self, kind: GroupKind) -> Option<Vec<PathBuf>> {
        self.renders
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(k, _)| *k == kind)
            .map(|(_, files)| files.clone())
    }
}

#[async_trait]
impl EditorHost for RecordingHost {
    async fn confirm(&self, _message: &str) -> bool {
        self.confirm_answer
    }

    async fn prompt_comment(&self, _path: &Path) -> Option<String> {
        self.comment_answer.clone()
    }

    fn notify(&self, level: NotifyLevel, message: &str) {
        self.notifications.lock().unwrap().push((level, message.to_string()));
    }

    fn update_context(&self, context: &EditorContext) {
        self.contexts.lock().unwrap().push(context.clone());
    }
}

impl ResourceSink for RecordingHost {
    fn render(&self, kind: GroupKind, files: &[TrackedFile]) {
        let paths = files.iter().map(|f| f.path.clone()).collect();
        self.renders.lock().unwrap().push((kind, paths));
    }

    fn clear(&self, kind: GroupKind) {
        self.clears.lock().unwrap().push(kind);
    }
}
