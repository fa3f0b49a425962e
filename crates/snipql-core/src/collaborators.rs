//! Collaborator traits implemented by the presentation layer
//!
//! The query store never talks to a terminal, a clipboard or an editor
//! widget directly. The services layer drives these traits instead, and each
//! front end supplies its own implementations.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::Result;

/// Severity of a user-visible notification
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Success,
    Info,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Success => "success",
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Transient notification surface ("toast")
pub trait Notifier {
    fn notify(&self, severity: Severity, message: &str);
}

/// Explicit yes/no gate used before destructive operations
pub trait Confirm {
    fn confirm(&self, prompt: &str) -> bool;
}

/// Platform clipboard
pub trait Clipboard {
    /// Write text to the clipboard.
    ///
    /// Implementations report a rejected write as [`crate::SnipqlError::Clipboard`].
    fn write_text(&self, text: &str) -> Result<()>;
}

/// Text-editing widget holding the current template and the read-only preview
pub trait TemplateEditor {
    fn template_text(&self) -> String;
    fn set_template_text(&mut self, text: &str);
    fn preview_text(&self) -> String;
    fn set_preview_text(&mut self, text: &str);
}

/// Plain in-memory editor buffer, used by headless front ends and tests
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BufferEditor {
    pub template: String,
    pub preview: String,
}

impl TemplateEditor for BufferEditor {
    fn template_text(&self) -> String {
        self.template.clone()
    }

    fn set_template_text(&mut self, text: &str) {
        self.template = text.to_string();
    }

    fn preview_text(&self) -> String {
        self.preview.clone()
    }

    fn set_preview_text(&mut self, text: &str) {
        self.preview = text.to_string();
    }
}

/// Notifier that only forwards to `tracing`
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, severity: Severity, message: &str) {
        match severity {
            Severity::Error => tracing::error!(%severity, "{}", message),
            Severity::Warning => tracing::warn!(%severity, "{}", message),
            Severity::Success | Severity::Info => tracing::info!(%severity, "{}", message),
        }
    }
}
