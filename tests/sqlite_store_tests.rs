#![cfg(feature = "sqlite")]

use support_tracker::{
    Dashboard, DashboardConfig, DeadlineEntry, ScheduleEntry, SqliteTableStore, StoreError, Table,
    TableRecord, TableStore,
};
use rusqlite::{Connection, params};
use tempfile::NamedTempFile;

fn row(cells: &[&str]) -> Vec<String> {
    cells.iter().map(|c| c.to_string()).collect()
}

#[test]
fn sqlite_store_round_trip_rows() {
    let file = NamedTempFile::new().unwrap();
    let store = SqliteTableStore::new(file.path()).unwrap();

    assert!(store.load(Table::Notes).unwrap().is_empty());
    store
        .save(Table::Notes, &[row(&["A", "one"]), row(&["B", "two"])])
        .unwrap();
    store.append(Table::Notes, &[row(&["C", "three"])]).unwrap();

    let reopened = SqliteTableStore::new(file.path()).unwrap();
    assert_eq!(
        reopened.load(Table::Notes).unwrap(),
        vec![row(&["A", "one"]), row(&["B", "two"]), row(&["C", "three"])]
    );

    reopened.save(Table::Notes, &[row(&["D", "four"])]).unwrap();
    assert_eq!(reopened.load(Table::Notes).unwrap(), vec![row(&["D", "four"])]);
}

#[test]
fn sqlite_rejects_rows_of_the_wrong_width() {
    let store = SqliteTableStore::in_memory().unwrap();
    store.save(Table::Notes, &[row(&["A", "keep"])]).unwrap();
    assert!(matches!(
        store.save(Table::Notes, &[row(&["A", "x", "y"])]),
        Err(StoreError::InvalidData(_))
    ));
    assert_eq!(store.load(Table::Notes).unwrap(), vec![row(&["A", "keep"])]);
}

#[test]
fn sqlite_rejects_tables_written_with_another_header() {
    let file = NamedTempFile::new().unwrap();
    let store = SqliteTableStore::new(file.path()).unwrap();
    store.save(Table::Notes, &[row(&["A", "hello"])]).unwrap();
    drop(store);

    let conn = Connection::open(file.path()).unwrap();
    conn.execute(
        "UPDATE table_headers SET header_json = ?1 WHERE name = ?2",
        params![r#"["Student","Comment"]"#, Table::Notes.as_str()],
    )
    .unwrap();
    drop(conn);

    let store = SqliteTableStore::new(file.path()).unwrap();
    assert!(matches!(
        store.load(Table::Notes),
        Err(StoreError::SchemaMismatch { table: Table::Notes, .. })
    ));
    assert!(matches!(
        store.append(Table::Notes, &[row(&["B", "bye"])]),
        Err(StoreError::SchemaMismatch { .. })
    ));
}

#[test]
fn dashboard_runs_on_sqlite() {
    let store = SqliteTableStore::in_memory().unwrap();
    store
        .save(
            ScheduleEntry::TABLE,
            &[ScheduleEntry::new("A", "1-1", "Math", "Smith").to_row()],
        )
        .unwrap();
    let dashboard = Dashboard::new(store, DashboardConfig::default());

    dashboard
        .reconciler()
        .submit_deadlines(&[DeadlineEntry::new("Quiz1", "Math", "1-1", "Smith", "2024-05-01")])
        .unwrap();
    let visible = dashboard.tasks().list_visible_tasks("A").unwrap();
    assert_eq!(visible.rows.len(), 1);
}
