//! Store tests: schema, parameterized lookup/update/bulk insert, history rotation, file-DB reopen.

use chrono::{DateTime, Utc};
use fixity::error::StoreError;
use fixity::{BaselineStore, FileRecord, SqliteStore};
use std::path::{Path, PathBuf};

fn t(micros: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_micros(micros).unwrap()
}

fn record(path: &str, hash: &str, scanned_micros: i64) -> FileRecord {
    FileRecord {
        path: PathBuf::from(path),
        extension: ".txt".into(),
        permissions: "-rw-r--r--".into(),
        current_hash: hash.into(),
        scanned_at: t(scanned_micros),
        modified_at: DateTime::from_timestamp(1_600_000_000, 0).unwrap(),
        previous_hash: None,
        previous_scanned_at: None,
    }
}

#[test]
fn test_empty_store_has_no_rows() {
    let store = SqliteStore::open_in_memory().unwrap();
    assert_eq!(store.row_count().unwrap(), 0);
    assert_eq!(store.lookup(Path::new("/nope")).unwrap(), None);
}

#[test]
fn test_insert_batch_then_lookup() {
    let mut store = SqliteStore::open_in_memory().unwrap();
    let recs = vec![
        record("/r/a.txt", "aa", 1_700_000_000_000_001),
        record("/r/b.txt", "bb", 1_700_000_000_000_002),
        record("/r/it's \"quoted\".txt", "cc", 1_700_000_000_000_003),
    ];
    store.insert_batch(&recs).unwrap();
    assert_eq!(store.row_count().unwrap(), 3);

    let row = store.lookup(Path::new("/r/b.txt")).unwrap().unwrap();
    assert_eq!(row.hash, "bb");
    assert_eq!(row.scanned_at, t(1_700_000_000_000_002));
    assert_eq!(row.modified_at, recs[1].modified_at);

    let quoted = store
        .lookup(Path::new("/r/it's \"quoted\".txt"))
        .unwrap()
        .unwrap();
    assert_eq!(quoted.hash, "cc");

    let full = store.load_row(Path::new("/r/a.txt")).unwrap().unwrap();
    assert_eq!(full.extension, ".txt");
    assert_eq!(full.permissions, "-rw-r--r--");
    assert_eq!(full.previous_hash, None);
    assert_eq!(full.previous_scanned_at, None);
}

#[test]
fn test_empty_batch_is_noop() {
    let mut store = SqliteStore::open_in_memory().unwrap();
    store.insert_batch(&[]).unwrap();
    assert_eq!(store.row_count().unwrap(), 0);
}

#[test]
fn test_duplicate_path_fails_whole_batch() {
    let mut store = SqliteStore::open_in_memory().unwrap();
    store
        .insert_batch(&[record("/r/a.txt", "aa", 1)])
        .unwrap();
    let err = store
        .insert_batch(&[record("/r/new.txt", "nn", 2), record("/r/a.txt", "zz", 3)])
        .unwrap_err();
    assert!(matches!(err, StoreError::Sqlite(_)));
    // All-or-nothing: the other row of the failed batch is absent.
    assert_eq!(store.lookup(Path::new("/r/new.txt")).unwrap(), None);
    assert_eq!(store.row_count().unwrap(), 1);
}

#[test]
fn test_update_rotates_one_generation() {
    let mut store = SqliteStore::open_in_memory().unwrap();
    store
        .insert_batch(&[record("/r/a.txt", "first", 10)])
        .unwrap();

    let mut second = record("/r/a.txt", "second", 20);
    second.permissions = "-rw-------".into();
    second.previous_hash = Some("first".into());
    second.previous_scanned_at = Some(t(10));
    store.update(&second).unwrap();

    let row = store.load_row(Path::new("/r/a.txt")).unwrap().unwrap();
    assert_eq!(row.hash, "second");
    assert_eq!(row.scanned_at, t(20));
    assert_eq!(row.permissions, "-rw-------");
    assert_eq!(row.previous_hash.as_deref(), Some("first"));
    assert_eq!(row.previous_scanned_at, Some(t(10)));

    let mut third = record("/r/a.txt", "third", 30);
    third.previous_hash = Some("second".into());
    third.previous_scanned_at = Some(t(20));
    store.update(&third).unwrap();
    let row = store.load_row(Path::new("/r/a.txt")).unwrap().unwrap();
    assert_eq!(row.hash, "third");
    assert_eq!(row.previous_hash.as_deref(), Some("second"));
    assert_eq!(store.row_count().unwrap(), 1);
}

#[test]
fn test_load_paths_under_is_component_wise() {
    let mut store = SqliteStore::open_in_memory().unwrap();
    store
        .insert_batch(&[
            record("/r/b/x.txt", "1", 1),
            record("/r/a.txt", "2", 2),
            record("/r2/y.txt", "3", 3),
        ])
        .unwrap();
    let paths = store.load_paths_under(Path::new("/r")).unwrap();
    assert_eq!(
        paths,
        vec![PathBuf::from("/r/a.txt"), PathBuf::from("/r/b/x.txt")]
    );
}

#[test]
fn test_bad_stored_timestamp_is_store_error() {
    let store = SqliteStore::open_in_memory().unwrap();
    store
        .connection()
        .execute(
            "INSERT INTO files (path, extension, permissions, hash, hash_time, last_modified) \
             VALUES (?1, '', '', 'h', 'yesterday', '2020-01-01 00:00:00')",
            ["/r/bad"],
        )
        .unwrap();
    let err = store.lookup(Path::new("/r/bad")).unwrap_err();
    assert!(matches!(err, StoreError::Timestamp(ref s) if s == "yesterday"));
}

#[test]
fn test_file_db_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("fixity.db");
    {
        let mut store = SqliteStore::open(&db).unwrap();
        store
            .insert_batch(&[record("/r/a.txt", "aa", 5)])
            .unwrap();
        store.checkpoint().unwrap();
    }
    let store = SqliteStore::open(&db).unwrap();
    assert_eq!(store.row_count().unwrap(), 1);
    let mode: String = store
        .connection()
        .query_row("PRAGMA journal_mode", [], |row| row.get(0))
        .unwrap();
    assert_eq!(mode.to_lowercase(), "wal");
}

#[cfg(unix)]
#[test]
fn test_non_utf8_paths_are_distinct_keys() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;
    let raw = |bytes: &[u8]| PathBuf::from(OsStr::from_bytes(bytes));
    let (a, b) = (raw(b"/r/a\xff"), raw(b"/r/a\xfe"));
    let mut ra = record("/r/x", "aa", 1);
    ra.path = a.clone();
    let mut rb = record("/r/x", "bb", 2);
    rb.path = b.clone();

    let mut store = SqliteStore::open_in_memory().unwrap();
    store
        .insert_batch(&[ra, rb, record("/r/ok.txt", "cc", 3)])
        .unwrap();
    assert_eq!(store.row_count().unwrap(), 3);
    assert_eq!(store.lookup(&a).unwrap().unwrap().hash, "aa");
    assert_eq!(store.lookup(&b).unwrap().unwrap().hash, "bb");
    assert_eq!(store.load_row(&a).unwrap().unwrap().path, a);

    let under = store.load_paths_under(Path::new("/r")).unwrap();
    assert_eq!(under.len(), 3);
    assert!(under.contains(&a) && under.contains(&b));
}
