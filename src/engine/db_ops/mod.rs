//! Database operations: schema, the store trait, the SQLite store, and the streaming persister.

mod connection;
mod persist;

pub use connection::SqliteStore;
pub use persist::{PersistParams, Persister, persist_stream};

use std::path::Path;

use crate::error::StoreError;
use crate::{FileRecord, StoredRow};

/// What the persister needs from a baseline store. The handle is passed in explicitly, so tests
/// can substitute an in-memory double.
pub trait BaselineStore {
    /// Existing row for `path`, if any.
    fn lookup(&self, path: &Path) -> Result<Option<StoredRow>, StoreError>;

    /// Overwrite an existing row: `record.previous_*` go to the history columns, the rest become current.
    fn update(&mut self, record: &FileRecord) -> Result<(), StoreError>;

    /// Insert all records as new rows in one statement. All-or-nothing.
    fn insert_batch(&mut self, records: &[FileRecord]) -> Result<(), StoreError>;
}

/// WAL tuning pragmas (synchronous, autocheckpoint, size limit). Use after PRAGMA journal_mode = WAL.
pub(crate) const WAL_PRAGMAS: &str = r#"
        PRAGMA synchronous = NORMAL;
        PRAGMA wal_autocheckpoint = 10000;
        PRAGMA journal_size_limit = 67108864;
        "#;

/// Baseline table. `path` holds TEXT for UTF-8 paths and a BLOB of the raw OS bytes otherwise.
/// `old_hash`/`old_time` are NULL until a path is seen a second time.
pub(crate) const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS files (
    path TEXT PRIMARY KEY,
    extension TEXT NOT NULL,
    permissions TEXT NOT NULL,
    hash TEXT NOT NULL,
    hash_time TEXT NOT NULL,
    last_modified TEXT NOT NULL,
    old_hash TEXT,
    old_time TEXT
);
"#;

pub(crate) const LOOKUP_SQL: &str =
    "SELECT hash, hash_time, last_modified FROM files WHERE path = ?1";

pub(crate) const UPDATE_SQL: &str = "UPDATE files SET old_hash = ?2, old_time = ?3, hash = ?4, \
     hash_time = ?5, last_modified = ?6, extension = ?7, permissions = ?8 WHERE path = ?1";

pub(crate) const INSERT_PREFIX_SQL: &str =
    "INSERT INTO files (path, extension, permissions, hash, hash_time, last_modified) VALUES ";

/// Placeholder group for one inserted row.
pub(crate) const INSERT_ROW_PLACEHOLDERS: &str = "(?, ?, ?, ?, ?, ?)";

/// Multi-row insert statement for `rows` records (placeholders only; values are bound).
pub(crate) fn multi_row_insert_sql(rows: usize) -> String {
    let mut sql = String::with_capacity(INSERT_PREFIX_SQL.len() + rows * (INSERT_ROW_PLACEHOLDERS.len() + 2));
    sql.push_str(INSERT_PREFIX_SQL);
    for i in 0..rows {
        if i > 0 {
            sql.push_str(", ");
        }
        sql.push_str(INSERT_ROW_PLACEHOLDERS);
    }
    sql
}
