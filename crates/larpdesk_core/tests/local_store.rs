use larpdesk_core::db::migrations::latest_version;
use larpdesk_core::db::{open_db, open_db_in_memory, DbError};
use larpdesk_core::local::{
    read_collection, write_collection, LocalStore, LocalStoreError, MirrorError, SqliteLocalStore,
};
use rusqlite::Connection;
use serde_json::{json, Value};

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "kv_entries");
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mirror.db");

    let conn_first = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_first), latest_version());
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    assert_table_exists(&conn_second, "kv_entries");
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    match SqliteLocalStore::open(&path) {
        Err(LocalStoreError::Db(DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        })) => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("newer schema must be rejected"),
    }
}

#[test]
fn sqlite_store_persists_values_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("mirror.db");

    let store = SqliteLocalStore::open(&path).unwrap();
    store.set("larp_campaigns", "[]").unwrap();
    store.set("larp_plots_3", "[{\"id\":1}]").unwrap();
    store.set("larp_plots_3", "[{\"id\":2}]").unwrap();
    store.set("notes_public", "[]").unwrap();
    drop(store);

    let reopened = SqliteLocalStore::open(&path).unwrap();
    assert_eq!(
        reopened.get("larp_plots_3").unwrap().as_deref(),
        Some("[{\"id\":2}]")
    );
    assert_eq!(
        reopened.keys("larp_").unwrap(),
        vec!["larp_campaigns".to_string(), "larp_plots_3".to_string()]
    );

    reopened.remove("larp_plots_3").unwrap();
    reopened.remove("never_written").unwrap();
    assert!(reopened.get("larp_plots_3").unwrap().is_none());
}

#[test]
fn prefix_matching_is_literal() {
    let store = SqliteLocalStore::open_in_memory().unwrap();
    store.set("notes_%", "[]").unwrap();
    store.set("notes_abc", "[]").unwrap();

    assert_eq!(store.keys("notes_%").unwrap(), vec!["notes_%".to_string()]);
}

#[test]
fn mirror_collections_round_trip_and_detect_corruption() {
    let store = SqliteLocalStore::open_in_memory().unwrap();
    let rows = vec![json!({"id": 5, "title": "Harvest festival"})];

    assert!(read_collection::<Value>(&store, "larp_events_2")
        .unwrap()
        .is_empty());
    write_collection(&store, "larp_events_2", &rows).unwrap();
    assert_eq!(read_collection::<Value>(&store, "larp_events_2").unwrap(), rows);

    store.set("larp_events_2", "not json").unwrap();
    let err = read_collection::<Value>(&store, "larp_events_2").unwrap_err();
    assert!(matches!(err, MirrorError::Corrupt { ref key, .. } if key == "larp_events_2"));
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
