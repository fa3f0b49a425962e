//! Export and import of the query collection
//!
//! The transferable format is
//! `{ "version": "1.0", "exportDate": "<ISO-8601>", "queries": [record, ...] }`.
//! Imports are validated in full before anything touches the store.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use snipql_core::{Result, SnipqlError};
use snipql_templates::VariableMap;

use crate::record::{QueryRecord, scalar_text};

/// Format version written into every export
pub const EXPORT_FORMAT_VERSION: &str = "1.0";

/// Largest id an import may carry, the range where JSON numbers stay exact
pub const MAX_RECORD_ID: i64 = 9_007_199_254_740_991;

/// Export document
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryExport {
    pub version: String,
    pub export_date: DateTime<Utc>,
    pub queries: Vec<QueryRecord>,
}

impl QueryExport {
    pub fn new(queries: Vec<QueryRecord>) -> Self {
        Self {
            version: EXPORT_FORMAT_VERSION.to_string(),
            export_date: Utc::now(),
            queries,
        }
    }

    pub fn query_count(&self) -> usize {
        self.queries.len()
    }

    /// Pretty-printed JSON, as written to export files
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Suggested file name for an export made on `date`
pub fn export_file_name(date: NaiveDate) -> String {
    format!("sql-queries-{}.json", date.format("%Y-%m-%d"))
}

/// How imported records combine with a non-empty store
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MergeMode {
    /// Append with fresh ids, unique names and orders after the current ones
    Add,
    /// Discard the current collection
    Replace,
}

impl MergeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            MergeMode::Add => "add",
            MergeMode::Replace => "replace",
        }
    }
}

impl fmt::Display for MergeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MergeMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "add" | "a" => Ok(MergeMode::Add),
            "replace" | "r" => Ok(MergeMode::Replace),
            other => Err(format!("unknown merge mode `{}` (expected add or replace)", other)),
        }
    }
}

/// A record from an import file that passed validation
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportedRecord {
    pub id: i64,
    pub name: String,
    pub sql: String,
    pub variables: VariableMap,
    pub order: Option<i64>,
}

/// A structurally valid import file
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportBundle {
    pub version: Option<String>,
    pub export_date: Option<String>,
    pub records: Vec<ImportedRecord>,
}

impl ImportBundle {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Parse and validate the content of an import file.
///
/// Fails with [`SnipqlError::ImportFormat`] when the document is not JSON or has
/// no `queries` array, and with [`SnipqlError::ImportRecord`] (1-based position)
/// for the first record missing `id`, `name`, a string `sql` or a `variables`
/// object.
pub fn parse_import(content: &str) -> Result<ImportBundle> {
    let document: Value = serde_json::from_str(content)
        .map_err(|e| SnipqlError::ImportFormat(format!("not valid JSON: {}", e)))?;

    let queries = document
        .get("queries")
        .and_then(Value::as_array)
        .ok_or_else(|| SnipqlError::ImportFormat("missing `queries` array".to_string()))?;

    let mut seen_ids = HashSet::new();
    let mut records = Vec::with_capacity(queries.len());

    for (index, raw) in queries.iter().enumerate() {
        let position = index + 1;
        let record = parse_record(raw)
            .map_err(|reason| SnipqlError::ImportRecord { position, reason })?;

        if !seen_ids.insert(record.id) {
            return Err(SnipqlError::ImportRecord {
                position,
                reason: format!("duplicate id {}", record.id),
            });
        }
        records.push(record);
    }

    Ok(ImportBundle {
        version: document
            .get("version")
            .and_then(Value::as_str)
            .map(str::to_string),
        export_date: document
            .get("exportDate")
            .and_then(Value::as_str)
            .map(str::to_string),
        records,
    })
}

fn parse_record(raw: &Value) -> std::result::Result<ImportedRecord, String> {
    let object = raw.as_object().ok_or("not an object")?;

    let id = match object.get("id") {
        Some(value) => as_integer(value).ok_or("`id` must be a non-zero integer")?,
        None => return Err("missing `id`".to_string()),
    };
    if id == 0 {
        return Err("`id` must be a non-zero integer".to_string());
    }
    if id.unsigned_abs() > MAX_RECORD_ID as u64 {
        return Err(format!("`id` must be between -{MAX_RECORD_ID} and {MAX_RECORD_ID}"));
    }

    let name = match object.get("name").and_then(Value::as_str) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => return Err("missing `name`".to_string()),
    };

    let sql = object
        .get("sql")
        .and_then(Value::as_str)
        .ok_or("`sql` must be a string")?
        .to_string();

    let variables = object
        .get("variables")
        .and_then(Value::as_object)
        .ok_or("`variables` must be an object")
        .and_then(parse_variables)?;

    let order = match object.get("order") {
        None | Some(Value::Null) => None,
        Some(value) => Some(as_integer(value).ok_or("`order` must be an integer")?),
    };

    Ok(ImportedRecord {
        id,
        name,
        sql,
        variables,
        order,
    })
}

fn parse_variables(map: &Map<String, Value>) -> std::result::Result<VariableMap, &'static str> {
    map.iter()
        .map(|(name, value)| {
            scalar_text(value)
                .map(|text| (name.clone(), text))
                .ok_or("variable values must be text")
        })
        .collect()
}

/// Integers, including floats with no fractional part
fn as_integer(value: &Value) -> Option<i64> {
    if let Some(i) = value.as_i64() {
        return Some(i);
    }
    value
        .as_f64()
        .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
        .map(|f| f as i64)
}

/// Append ` (n)` to `base` until it no longer clashes with `taken`
pub fn unique_name(base: &str, taken: &HashSet<String>) -> String {
    let mut candidate = base.to_string();
    let mut counter = 1;

    while taken.contains(&candidate) {
        candidate = format!("{} ({})", base, counter);
        counter += 1;
    }

    candidate
}

/// An import waiting for the user to pick a merge mode
#[derive(Clone, Debug)]
pub struct PendingImport {
    pub(crate) bundle: ImportBundle,
    pub(crate) current_count: usize,
}

impl PendingImport {
    /// Records already in the store when the import started
    pub fn current_count(&self) -> usize {
        self.current_count
    }

    /// Records in the import file
    pub fn incoming_count(&self) -> usize {
        self.bundle.len()
    }
}

/// Next step after a validated import file is handed to the store
#[derive(Debug)]
pub enum ImportStep {
    /// The store was empty and the records were added immediately
    Completed(ImportSummary),
    /// The store has records; nothing changed until a mode is chosen
    NeedsMergeMode(PendingImport),
}

/// Outcome of an applied import
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportSummary {
    pub mode: MergeMode,
    /// Records taken from the file
    pub imported: usize,
    /// Collection size afterwards
    pub total: usize,
}

impl ImportSummary {
    /// User-facing description of the result
    pub fn message(&self) -> String {
        match self.mode {
            MergeMode::Add => format!(
                "{} queries added successfully! Total: {}",
                self.imported, self.total
            ),
            MergeMode::Replace => format!("{} queries imported successfully!", self.imported),
        }
    }
}
