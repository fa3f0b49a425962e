//! Query record model

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use snipql_templates::{VariableChanges, VariableMap, reconcile_variables};

/// A saved SQL snippet with its placeholder values
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRecord {
    /// Unique for the lifetime of the collection
    pub id: i64,
    pub name: String,
    /// Template text containing `[name]` placeholders
    pub sql: String,
    /// Values keyed by the placeholders currently present in `sql`
    pub variables: VariableMap,
    /// Display position; dense `0..N-1` after any normalizing operation
    pub order: i64,
}

impl QueryRecord {
    /// Create a blank record
    pub fn new(id: i64, name: impl Into<String>, order: i64) -> Self {
        Self {
            id,
            name: name.into(),
            sql: String::new(),
            variables: VariableMap::new(),
            order,
        }
    }

    /// Set the template text and reconcile variables in one go
    pub fn with_sql(mut self, sql: impl Into<String>) -> Self {
        self.set_sql(sql);
        self
    }

    /// Set a variable value while building a record
    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    /// Replace the template text and re-derive the variable map
    pub fn set_sql(&mut self, sql: impl Into<String>) -> VariableChanges {
        self.sql = sql.into();
        self.reconcile()
    }

    /// Re-derive the variable map from the current template text
    pub fn reconcile(&mut self) -> VariableChanges {
        let reconciled = reconcile_variables(&self.sql, &self.variables);
        let changes = VariableChanges::between(&self.variables, &reconciled);
        self.variables = reconciled;
        changes
    }

    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }
}

/// Record shape accepted from storage, where `order` may predate the field.
///
/// Missing text fields load as empty and scalar variable values become text.
#[derive(Clone, Debug, Deserialize)]
pub(crate) struct StoredRecord {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub sql: String,
    #[serde(default, deserialize_with = "lenient_variables")]
    pub variables: VariableMap,
    #[serde(default)]
    pub order: Option<i64>,
}

impl StoredRecord {
    pub(crate) fn into_record(self, position: usize) -> QueryRecord {
        let mut record = QueryRecord {
            id: self.id,
            name: self.name,
            sql: self.sql,
            variables: self.variables,
            order: self.order.unwrap_or(position as i64),
        };
        record.reconcile();
        record
    }
}

/// Text form of a scalar variable value; `None` for arrays and objects
pub(crate) fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Null => Some(String::new()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

fn lenient_variables<'de, D>(deserializer: D) -> Result<VariableMap, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<IndexMap<String, Value>>::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|(name, value)| {
            let text = scalar_text(&value).unwrap_or_else(|| value.to_string());
            (name, text)
        })
        .collect())
}

/// The record installed when storage is empty or unreadable
pub fn default_example_record() -> QueryRecord {
    QueryRecord::new(1, "Example - User Lookup", 0)
        .with_sql(
            "SELECT u.id, u.name, u.email, u.created_at\n\
             FROM users u\n\
             WHERE u.active = [active]\n\
             AND u.created_at >= '[start_date]'\n\
             ORDER BY u.name",
        )
        .with_variable("active", "1")
        .with_variable("start_date", "2024-01-01")
}

/// Stable sort by `order`, then renumber to `0..N-1`
pub fn normalize_order(queries: &mut [QueryRecord]) {
    queries.sort_by_key(|q| q.order);
    renumber(queries);
}

/// Assign `order` from the current positions
pub fn renumber(queries: &mut [QueryRecord]) {
    for (index, query) in queries.iter_mut().enumerate() {
        query.order = index as i64;
    }
}
