//! Integration tests for query persistence on SQLite storage

use indoc::indoc;
use pretty_assertions::assert_eq;
use snipql_store::{
    KeyValueStorage, LoadOutcome, QueryEdit, QueryStore, SqliteStorage, default_example_record,
};
use tempfile::tempdir;

const KEY: &str = "sql_query_manager";

#[test]
fn test_queries_survive_reopen() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("storage.db");

    let created_id = {
        let storage = SqliteStorage::open(&db_path).unwrap();
        let (mut store, outcome) = QueryStore::open(storage, KEY);
        assert!(matches!(outcome, LoadOutcome::FirstRun { persist_error: None }));

        let id = store.create().id;
        store
            .update(
                QueryEdit::name("Orders by status").with_sql(indoc! {"
                    SELECT *
                    FROM orders
                    WHERE status = '[status]'
                    LIMIT [limit]"}),
            )
            .unwrap();
        store.set_variable("status", "open").unwrap();
        store.set_variable("limit", "50").unwrap();
        store.persist().unwrap();
        id
    };

    {
        let storage = SqliteStorage::open(&db_path).unwrap();
        let (mut store, outcome) = QueryStore::open(storage, KEY);
        assert!(matches!(outcome, LoadOutcome::Loaded { count: 2 }));

        assert_eq!(store.queries()[0], default_example_record());
        let index = store.position_of(created_id).unwrap();
        assert_eq!(index, 1);

        store.select(index);
        let record = store.selected().unwrap();
        assert_eq!(record.name, "Orders by status");
        assert_eq!(record.order, 1);
        let keys: Vec<&str> = record.variables.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["status", "limit"]);
        assert_eq!(
            store.substituted().unwrap(),
            "SELECT *\nFROM orders\nWHERE status = 'open'\nLIMIT 50"
        );
    }
}

#[test]
fn test_reorder_is_persisted_densely() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("storage.db");

    {
        let (mut store, _) = QueryStore::open(SqliteStorage::open(&db_path).unwrap(), KEY);
        for _ in 0..4 {
            store.create();
        }
        store.reorder(4, 0).unwrap();
        store.persist().unwrap();
    }

    let (store, _) = QueryStore::open(SqliteStorage::open(&db_path).unwrap(), KEY);
    let orders: Vec<i64> = store.queries().iter().map(|q| q.order).collect();
    assert_eq!(orders, vec![0, 1, 2, 3, 4]);
    assert_eq!(store.queries()[0].name, "New Query 5");
    assert_eq!(store.queries()[1].name, default_example_record().name);
}

#[test]
fn test_corrupt_document_is_replaced_by_example() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("storage.db");

    let mut storage = SqliteStorage::open(&db_path).unwrap();
    storage.set(KEY, "[{\"id\": \"not a number\"}]").unwrap();

    let (store, outcome) = QueryStore::open(storage, KEY);
    assert!(matches!(outcome, LoadOutcome::Recovered { .. }));
    assert_eq!(store.len(), 1);
    assert_eq!(store.queries()[0].order, 0);

    let rewritten = store.storage().get(KEY).unwrap().unwrap();
    assert!(rewritten.contains("Example - User Lookup"));
}

#[test]
fn test_separate_keys_are_independent() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("storage.db");

    let (mut work, _) = QueryStore::open(SqliteStorage::open(&db_path).unwrap(), "work");
    work.create();
    work.persist().unwrap();

    let (home, _) = QueryStore::open(SqliteStorage::open(&db_path).unwrap(), "home");
    assert_eq!(home.len(), 1);
    assert_eq!(home.storage_key(), "home");
}

#[test]
fn test_loose_record_values_load_without_reset() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("storage.db");

    let mut storage = SqliteStorage::open(&db_path).unwrap();
    storage
        .set(
            KEY,
            r#"[
                {"id": 5, "name": "Limit", "sql": "SELECT * FROM t LIMIT [n]", "variables": {"n": 10}, "order": 0},
                {"id": 6, "name": "Draft", "variables": {}, "order": 1}
            ]"#,
        )
        .unwrap();

    let (mut store, outcome) = QueryStore::open(storage, KEY);
    assert!(matches!(outcome, LoadOutcome::Loaded { count: 2 }));

    store.select(0);
    assert_eq!(store.substituted().unwrap(), "SELECT * FROM t LIMIT 10");
    assert_eq!(store.queries()[1].name, "Draft");
    assert_eq!(store.queries()[1].sql, "");

    let stored = store.storage().get(KEY).unwrap().unwrap();
    assert!(!stored.contains("Example - User Lookup"));
}

#[test]
fn test_delete_then_create_persists_distinct_orders() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("storage.db");

    {
        let (mut store, _) = QueryStore::open(SqliteStorage::open(&db_path).unwrap(), KEY);
        store.create();
        store.create();
        store.select(0);
        store.delete_selected().unwrap();
        store.create();

        let orders: Vec<i64> = store.queries().iter().map(|q| q.order).collect();
        assert_eq!(orders, vec![0, 1, 2]);
        store.persist().unwrap();
    }

    let raw = SqliteStorage::open(&db_path).unwrap().get(KEY).unwrap().unwrap();
    let stored: Vec<serde_json::Value> = serde_json::from_str(&raw).unwrap();
    let orders: Vec<i64> = stored.iter().filter_map(|q| q["order"].as_i64()).collect();
    assert_eq!(orders, vec![0, 1, 2]);
}
