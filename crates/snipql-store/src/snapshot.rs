//! Read-only views of the store for presentation layers

use snipql_templates::substitute;

use crate::record::QueryRecord;

/// Preview shown when nothing is selected
pub const NO_SELECTION_PREVIEW: &str = "-- The processed query will appear here...";

/// Preview shown when the substituted query is empty
pub const EMPTY_QUERY_PREVIEW: &str = "-- Empty query...";

/// One row of the query list
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuerySummary {
    pub id: i64,
    pub name: String,
    pub variable_count: usize,
    pub order: i64,
    pub is_selected: bool,
}

/// The selected record together with its substituted text
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectedQuery {
    pub index: usize,
    pub record: QueryRecord,
    pub preview: String,
}

/// State of the store after an operation
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StoreSnapshot {
    pub queries: Vec<QuerySummary>,
    pub selected: Option<SelectedQuery>,
}

impl StoreSnapshot {
    pub(crate) fn build(queries: &[QueryRecord], selected: Option<usize>) -> Self {
        let summaries = queries
            .iter()
            .enumerate()
            .map(|(index, q)| QuerySummary {
                id: q.id,
                name: q.name.clone(),
                variable_count: q.variable_count(),
                order: q.order,
                is_selected: selected == Some(index),
            })
            .collect();

        let selected = selected.and_then(|index| {
            queries.get(index).map(|record| SelectedQuery {
                index,
                record: record.clone(),
                preview: preview_text(Some(record)),
            })
        });

        Self {
            queries: summaries,
            selected,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected.as_ref().map(|s| s.index)
    }

    /// Preview text for the editor's read-only pane
    pub fn preview(&self) -> &str {
        self.selected
            .as_ref()
            .map(|s| s.preview.as_str())
            .unwrap_or(NO_SELECTION_PREVIEW)
    }
}

/// Preview text for a record, or the placeholder text when there is none
pub fn preview_text(record: Option<&QueryRecord>) -> String {
    match record {
        None => NO_SELECTION_PREVIEW.to_string(),
        Some(record) => {
            let sql = substitute(&record.sql, &record.variables);
            if sql.is_empty() {
                EMPTY_QUERY_PREVIEW.to_string()
            } else {
                sql
            }
        }
    }
}
