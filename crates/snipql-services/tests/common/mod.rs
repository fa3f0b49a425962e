//! Common test utilities and fakes

#![allow(dead_code)]

use std::sync::Arc;

use snipql_core::{Clipboard, Confirm, Notifier, Result, Severity, SnipqlError};
use snipql_services::{Collaborators, QueryView, QueryWorkspace};
use snipql_store::{MemoryStorage, StoreSnapshot};

pub const KEY: &str = "sql_query_manager";

/// Notifier that records every message for assertions
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    pub messages: Arc<parking_lot::Mutex<Vec<(Severity, String)>>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<(Severity, String)> {
        self.messages.lock().clone()
    }

    pub fn last(&self) -> Option<(Severity, String)> {
        self.messages.lock().last().cloned()
    }

    pub fn clear(&self) {
        self.messages.lock().clear();
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, severity: Severity, message: &str) {
        self.messages.lock().push((severity, message.to_string()));
    }
}

/// Confirmation gate with a scripted answer, logging each prompt
#[derive(Clone)]
pub struct ScriptedConfirm {
    pub answer: Arc<parking_lot::Mutex<bool>>,
    pub prompts: Arc<parking_lot::Mutex<Vec<String>>>,
}

impl ScriptedConfirm {
    pub fn answering(answer: bool) -> Self {
        Self {
            answer: Arc::new(parking_lot::Mutex::new(answer)),
            prompts: Arc::new(parking_lot::Mutex::new(Vec::new())),
        }
    }

    pub fn set_answer(&self, answer: bool) {
        *self.answer.lock() = answer;
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

impl Confirm for ScriptedConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        self.prompts.lock().push(prompt.to_string());
        *self.answer.lock()
    }
}

/// Clipboard that keeps the last written text, or rejects every write
#[derive(Clone, Default)]
pub struct MockClipboard {
    pub contents: Arc<parking_lot::Mutex<Option<String>>>,
    pub should_fail: bool,
}

impl MockClipboard {
    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }

    pub fn contents(&self) -> Option<String> {
        self.contents.lock().clone()
    }
}

impl Clipboard for MockClipboard {
    fn write_text(&self, text: &str) -> Result<()> {
        if self.should_fail {
            return Err(SnipqlError::Clipboard("write rejected".to_string()));
        }
        *self.contents.lock() = Some(text.to_string());
        Ok(())
    }
}

/// View that keeps every snapshot it was given
#[derive(Clone, Default)]
pub struct RecordingView {
    pub snapshots: Arc<parking_lot::Mutex<Vec<StoreSnapshot>>>,
}

impl RecordingView {
    pub fn render_count(&self) -> usize {
        self.snapshots.lock().len()
    }

    pub fn latest(&self) -> Option<StoreSnapshot> {
        self.snapshots.lock().last().cloned()
    }
}

impl QueryView for RecordingView {
    fn render(&self, snapshot: &StoreSnapshot) {
        self.snapshots.lock().push(snapshot.clone());
    }
}

/// A workspace over memory storage plus handles to its fakes
pub struct Harness {
    pub workspace: QueryWorkspace<MemoryStorage>,
    pub notifier: RecordingNotifier,
    pub confirm: ScriptedConfirm,
    pub clipboard: MockClipboard,
    pub view: RecordingView,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_storage(MemoryStorage::new(), MockClipboard::default())
    }

    pub fn with_storage(storage: MemoryStorage, clipboard: MockClipboard) -> Self {
        let notifier = RecordingNotifier::default();
        let confirm = ScriptedConfirm::answering(true);
        let view = RecordingView::default();

        let collaborators =
            Collaborators::new(notifier.clone(), confirm.clone(), clipboard.clone())
                .with_view(view.clone());
        let workspace = QueryWorkspace::open(storage, KEY, collaborators);

        Self {
            workspace,
            notifier,
            confirm,
            clipboard,
            view,
        }
    }

    /// Type `sql` into the editor as a user would
    pub fn type_template(&mut self, sql: &str) {
        self.workspace.editor_mut().set_template_text(sql);
        self.workspace.on_template_changed();
    }
}
