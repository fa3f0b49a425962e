//! snipql services layer
//!
//! This crate sits between a front end and the query store. It turns user
//! actions into store operations and talks back through the collaborator
//! traits from `snipql-core`.
//!
//! # Architecture
//!
//! ```text
//! Front end (snipql-cli)
//!     ↓
//! Service layer (snipql-services) ← This crate
//!     ↓
//! Domain layer (snipql-store, snipql-templates)
//!     ↓
//! Infrastructure (snipql-core, storage backends)
//! ```
//!
//! # Design Principles
//!
//! 1. **No front-end dependencies** - terminals, clipboards and editors are
//!    reached only through traits
//! 2. **Snapshots out** - views receive a `StoreSnapshot`, never the store
//! 3. **Every failure is reported** - through the notifier, and as a `Result`

mod view_models;
mod workspace;

pub use view_models::{ExportFile, ImportProgress, QueryView};
pub use workspace::{Collaborators, DELETE_PROMPT, QueryWorkspace};
