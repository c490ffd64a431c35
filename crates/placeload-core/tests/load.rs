//! End-to-end loads into in-memory DuckDB

use std::io::Write;

use duckdb::Connection;
use placeload_core::{
    BatchErrorPolicy, ConflictPolicy, DuckDbTarget, LoadConfig, LoadError, LoadState, Loader,
    TableSchema,
};
use tempfile::NamedTempFile;

fn input(content: &str) -> NamedTempFile {
    let mut f = NamedTempFile::new().unwrap();
    f.write_all(content.as_bytes()).unwrap();
    f.flush().unwrap();
    f
}

fn count(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM place", [], |row| row.get(0))
        .unwrap()
}

fn admin1_of(conn: &Connection, woeid: i32) -> String {
    conn.query_row("SELECT admin1 FROM place WHERE woeid = ?", [woeid], |row| {
        row.get(0)
    })
    .unwrap()
}

fn places_config(file: &NamedTempFile, capacity: usize) -> LoadConfig {
    let mut config = LoadConfig::new(":memory:", file.path(), 8);
    config.batch_capacity = capacity;
    config
}

/// Load `file` into a fresh in-memory database with the `places` table.
fn load_places(
    file: &NamedTempFile,
    capacity: usize,
    conflict: ConflictPolicy,
) -> (Loader<DuckDbTarget>, Result<placeload_core::LoadSummary, LoadError>) {
    let target = DuckDbTarget::open(":memory:").unwrap();
    let mut loader = Loader::new(
        target,
        places_config(file, capacity),
        TableSchema::places(),
        conflict,
    )
    .unwrap();
    let result = loader.run();
    (loader, result)
}

#[test]
fn two_places_one_per_batch() {
    let file = input("1,A,B,C,10.0,20.0,30.0,40.0\n2,D,E,F,11.0,21.0,31.0,41.0\n");
    let (loader, result) = load_places(&file, 1, ConflictPolicy::Ignore);
    let summary = result.unwrap();

    assert_eq!(summary.records, 2);
    assert_eq!(summary.batches, 2);
    assert_eq!(summary.rows_written, 2);
    assert_eq!(loader.state(), LoadState::Done);

    let conn = loader.target().connection();
    assert_eq!(count(conn), 2);
    assert_eq!(admin1_of(conn, 2), "D");
    let nelng: f64 = conn
        .query_row("SELECT nelng::DOUBLE FROM place WHERE woeid = 1", [], |row| {
            row.get(0)
        })
        .unwrap();
    assert!((nelng - 40.0).abs() < 1e-6);
}

#[test]
fn short_line_in_place_bounds() {
    let file = input("1,Paris,48.8,2.2,48.9,2.4\n2,Lyon,45.7,4.8,45.8\n");
    let mut config = LoadConfig::new(":memory:", file.path(), 6);
    config.batch_capacity = 10_000;
    let mut loader = Loader::new(
        DuckDbTarget::open(":memory:").unwrap(),
        config,
        TableSchema::place_bounds(),
        ConflictPolicy::Ignore,
    )
    .unwrap();
    let summary = loader.run().unwrap();

    assert_eq!(summary.records, 1);
    assert_eq!(summary.batches, 1);
    assert_eq!(summary.final_batch_rows, 1);
    let conn = loader.target().connection();
    assert_eq!(count(conn), 1);
    let name: String = conn
        .query_row("SELECT name FROM place", [], |row| row.get(0))
        .unwrap();
    assert_eq!(name, "Paris");
}

#[test]
fn reload_replaces_previous_contents() {
    let content: String = (1..=7)
        .map(|i| format!("{i},A{i},B{i},C{i},1.0,2.0,3.0,4.0\n"))
        .collect();
    let file = input(&content);

    let (loader, result) = load_places(&file, 3, ConflictPolicy::Ignore);
    result.unwrap();
    let target = loader.into_target();
    assert_eq!(count(target.connection()), 7);

    let mut second = Loader::new(
        target,
        places_config(&file, 3),
        TableSchema::places(),
        ConflictPolicy::Ignore,
    )
    .unwrap();
    let summary = second.run().unwrap();
    assert_eq!(summary.records, 7);
    assert_eq!(summary.rows_written, 7);
    assert_eq!(count(second.target().connection()), 7);
}

#[test]
fn duplicate_woeid_in_later_batch_is_ignored() {
    let file = input(
        "1,A,B,C,1,2,3,4\n\
         2,D,E,F,1,2,3,4\n\
         1,X,Y,Z,1,2,3,4\n\
         3,G,H,I,1,2,3,4\n",
    );
    let (loader, result) = load_places(&file, 1, ConflictPolicy::Ignore);
    let summary = result.unwrap();

    assert_eq!(summary.records, 4);
    assert_eq!(summary.failed_batches, 0);
    let conn = loader.target().connection();
    assert_eq!(count(conn), 3);
    assert_eq!(admin1_of(conn, 1), "A");
}

#[test]
fn duplicate_woeid_within_one_batch_is_ignored() {
    let file = input(
        "1,A,B,C,1,2,3,4\n\
         2,D,E,F,1,2,3,4\n\
         1,X,Y,Z,1,2,3,4\n\
         3,A,B,C,1,2,3,4\n",
    );
    let (loader, result) = load_places(&file, 10, ConflictPolicy::Ignore);
    let summary = result.unwrap();

    assert_eq!(summary.records, 4);
    assert_eq!(summary.batches, 1);
    assert_eq!(summary.failed_batches, 0);
    assert_eq!(summary.rows_written, 2);
    assert_eq!(summary.rows_ignored(), 2);
    let conn = loader.target().connection();
    assert_eq!(count(conn), 2);
    assert_eq!(admin1_of(conn, 1), "A");
}

#[test]
fn duplicate_name_triple_across_batches_is_ignored() {
    let file = input("1,A,B,C,1,2,3,4\n2,A,B,C,5,6,7,8\n");
    let (loader, result) = load_places(&file, 1, ConflictPolicy::Ignore);
    result.unwrap();
    let conn = loader.target().connection();
    assert_eq!(count(conn), 1);
}

#[test]
fn failing_batch_is_skipped_and_load_continues() {
    let file = input(
        "1,A,B,C,1,2,3,4\n\
         2,D,E,F,1,2,3,4\n\
         1,X,Y,Z,1,2,3,4\n\
         3,G,H,I,1,2,3,4\n",
    );
    let (loader, result) = load_places(&file, 1, ConflictPolicy::Fail);
    let summary = result.unwrap();

    assert_eq!(summary.batches, 4);
    assert_eq!(summary.failed_batches, 1);
    assert_eq!(summary.failed_rows, 1);
    assert_eq!(count(loader.target().connection()), 3);
}

#[test]
fn failing_batch_aborts_under_abort_policy() {
    let file = input(
        "1,A,B,C,1,2,3,4\n\
         2,D,E,F,1,2,3,4\n\
         1,X,Y,Z,1,2,3,4\n\
         3,G,H,I,1,2,3,4\n",
    );
    let mut config = places_config(&file, 1);
    config.on_batch_error = BatchErrorPolicy::Abort;
    let mut loader = Loader::new(
        DuckDbTarget::open(":memory:").unwrap(),
        config,
        TableSchema::places(),
        ConflictPolicy::Fail,
    )
    .unwrap();

    let err = loader.run().unwrap_err();
    assert!(matches!(err, LoadError::BatchExecution { batch: 3, .. }));
    assert_eq!(loader.state(), LoadState::Failed);
    assert_eq!(count(loader.target().connection()), 2);
}

#[test]
fn bad_column_type_fails_schema_init() {
    let file = input("1,A,B,C,1,2,3,4\n");
    let mut schema = TableSchema::places();
    schema.columns[4].sql_type = "NOTATYPE".to_string();
    let mut loader = Loader::new(
        DuckDbTarget::open(":memory:").unwrap(),
        places_config(&file, 10),
        schema,
        ConflictPolicy::Ignore,
    )
    .unwrap();

    let err = loader.run().unwrap_err();
    assert!(matches!(err, LoadError::SchemaInit { .. }));
    assert_eq!(loader.summary().records, 0);
}

#[test]
fn tab_delimited_input() {
    let file = input("10\tGB\tLondon\tCamden\t51.5\t-0.2\t51.6\t-0.1\n");
    let mut config = places_config(&file, 10);
    config.field_delimiter = "\t".to_string();
    let mut loader = Loader::new(
        DuckDbTarget::open(":memory:").unwrap(),
        config,
        TableSchema::places(),
        ConflictPolicy::Ignore,
    )
    .unwrap();
    loader.run().unwrap();
    assert_eq!(admin1_of(loader.target().connection(), 10), "GB");
}

#[test]
fn run_into_database_file() {
    let dir = tempfile::TempDir::new().unwrap();
    let db_path = dir.path().join("places.duckdb");
    let file = input("1,A,B,C,1,2,3,4\n2,D,E,F,1,2,3,4\n3,G,H\n");

    let mut config = places_config(&file, 2);
    config.data_source = db_path.to_str().unwrap().to_string();
    let summary = placeload_core::run(
        config,
        TableSchema::places(),
        ConflictPolicy::Ignore,
        indicatif::ProgressBar::hidden(),
    )
    .unwrap();
    assert_eq!(summary.records, 2);
    assert_eq!(summary.skipped_lines, 1);

    let conn = Connection::open(&db_path).unwrap();
    assert_eq!(count(&conn), 2);
    let indexes: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM duckdb_indexes() WHERE table_name = 'place'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(indexes, 2);
}
