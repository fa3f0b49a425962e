//! snipql templates - bracket placeholders in SQL snippets
//!
//! Templates are plain SQL text with `[name]` placeholders. This crate finds
//! them, keeps a variable map in sync with the template text, and produces the
//! substituted query.
//!
//! ## Example
//!
//! ```rust
//! use snipql_templates::{VariableMap, extract_placeholders, reconcile_variables, substitute};
//!
//! let sql = "SELECT * FROM orders WHERE status = '[status]' LIMIT [limit]";
//! assert_eq!(extract_placeholders(sql), vec!["status", "limit"]);
//!
//! let mut vars = reconcile_variables(sql, &VariableMap::new());
//! vars.insert("status".to_string(), "open".to_string());
//! vars.insert("limit".to_string(), "10".to_string());
//!
//! assert_eq!(
//!     substitute(sql, &vars),
//!     "SELECT * FROM orders WHERE status = 'open' LIMIT 10"
//! );
//! ```

mod placeholders;
mod substitute;
mod variables;

pub use placeholders::{
    Placeholder, extract_placeholders, has_placeholders, placeholder_token, scan_placeholders,
};
pub use substitute::{substitute, unfilled_variables};
pub use variables::{VariableChanges, VariableMap, reconcile_variables};
