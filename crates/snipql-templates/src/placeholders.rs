//! Lexical placeholder scanning
//!
//! A placeholder is `[name]`: an opening bracket, one or more characters that
//! are not a closing bracket, and a closing bracket. There is no nesting and no
//! escaping, and SQL quoting is ignored entirely.

use std::ops::Range;

use indexmap::IndexSet;
use once_cell::sync::Lazy;
use regex::Regex;

static PLACEHOLDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([^\]]+)\]").expect("placeholder pattern is valid"));

/// A placeholder occurrence inside a template
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Placeholder {
    /// Text between the brackets
    pub name: String,
    /// Byte range of the whole token, brackets included
    pub span: Range<usize>,
}

impl Placeholder {
    /// The token as it appears in the template, e.g. `[start_date]`
    pub fn token(&self) -> String {
        placeholder_token(&self.name)
    }
}

/// Render the bracket form of a placeholder name
pub fn placeholder_token(name: &str) -> String {
    format!("[{}]", name)
}

/// Every placeholder occurrence, left to right, duplicates included
pub fn scan_placeholders(template: &str) -> Vec<Placeholder> {
    PLACEHOLDER_RE
        .captures_iter(template)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let name = caps.get(1)?;
            Some(Placeholder {
                name: name.as_str().to_string(),
                span: whole.range(),
            })
        })
        .collect()
}

/// Distinct placeholder names in order of first appearance
pub fn extract_placeholders(template: &str) -> Vec<String> {
    let names: IndexSet<&str> = PLACEHOLDER_RE
        .captures_iter(template)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .collect();

    names.into_iter().map(str::to_string).collect()
}

/// Check whether a template contains any placeholder at all
pub fn has_placeholders(template: &str) -> bool {
    PLACEHOLDER_RE.is_match(template)
}
