//! snipql core - shared types for the query snippet manager
//!
//! This crate provides the pieces every other snipql crate depends on:
//!
//! - `SnipqlError` - the error type shared by store, services and front ends
//! - Collaborator traits (`Notifier`, `Confirm`, `Clipboard`, `TemplateEditor`)
//!   that a presentation layer implements
//! - `SnipqlSettings` and the well-known config/data paths

mod collaborators;
mod error;
pub mod settings;

pub use collaborators::{
    BufferEditor, Clipboard, Confirm, Notifier, Severity, TemplateEditor, TracingNotifier,
};
pub use error::{Result, SnipqlError};
pub use settings::SnipqlSettings;
