//! Variable maps and reconciliation against a template

use indexmap::IndexMap;

use crate::placeholders::extract_placeholders;

/// Placeholder name to current value, in first-seen order
pub type VariableMap = IndexMap<String, String>;

/// Rebuild a variable map for `template`.
///
/// Every placeholder now present keeps its previous value when it had one and
/// defaults to an empty string otherwise. Names no longer present are dropped.
/// The result is ordered by first appearance in `template`.
pub fn reconcile_variables(template: &str, previous: &VariableMap) -> VariableMap {
    extract_placeholders(template)
        .into_iter()
        .map(|name| {
            let value = previous.get(&name).cloned().unwrap_or_default();
            (name, value)
        })
        .collect()
}

/// Names that `reconcile_variables` would add or drop, for change reporting
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VariableChanges {
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

impl VariableChanges {
    pub fn between(before: &VariableMap, after: &VariableMap) -> Self {
        Self {
            added: after
                .keys()
                .filter(|k| !before.contains_key(*k))
                .cloned()
                .collect(),
            removed: before
                .keys()
                .filter(|k| !after.contains_key(*k))
                .cloned()
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}
