//! SQLite-backed baseline store: open, schema, parameterized lookup/update/bulk insert.

use anyhow::{Context, Result};
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use std::path::{Path, PathBuf};

use crate::engine::tools::{
    format_modified_time, format_scan_time, parse_stored_time, path_from_db_key, path_to_db_key,
};
use crate::error::StoreError;
use crate::{BaselineRow, FileRecord, StoredRow};

use super::{BaselineStore, LOOKUP_SQL, SCHEMA, UPDATE_SQL, WAL_PRAGMAS, multi_row_insert_sql};

/// The one connection a run uses. Owned by the persister for the whole pass.
pub struct SqliteStore {
    conn: Connection,
}

/// Enable WAL and apply schema to an open connection (idempotent).
fn apply_wal_and_schema(conn: &Connection) -> Result<()> {
    conn.query_row("PRAGMA journal_mode = WAL", [], |_| Ok(()))
        .context("enable WAL")?;
    conn.execute_batch(WAL_PRAGMAS).context("set WAL pragmas")?;
    conn.execute_batch(SCHEMA).context("create schema")?;
    Ok(())
}

impl SqliteStore {
    /// Open or create the baseline DB at `path` and ensure schema + WAL.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("open database {}", path.display()))?;
        apply_wal_and_schema(&conn)?;
        Ok(Self { conn })
    }

    /// In-memory DB with the same schema (tests, dry runs). No WAL pragmas needed.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory database")?;
        conn.execute_batch(SCHEMA).context("create schema")?;
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn row_count(&self) -> Result<usize> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM files", [], |row| row.get(0))
            .context("count rows")?;
        Ok(n.max(0) as usize)
    }

    /// Full row for `path`, including history columns.
    pub fn load_row(&self, path: &Path) -> Result<Option<BaselineRow>> {
        let raw = self
            .conn
            .query_row(
                "SELECT path, extension, permissions, hash, hash_time, last_modified, old_hash, old_time \
                 FROM files WHERE path = ?1",
                [path_to_db_key(path)],
                |row| {
                    Ok((
                        row.get::<_, Value>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, Option<String>>(6)?,
                        row.get::<_, Option<String>>(7)?,
                    ))
                },
            )
            .optional()
            .context("load row")?;
        let Some((p, extension, permissions, hash, hash_time, modified, old_hash, old_time)) = raw
        else {
            return Ok(None);
        };
        Ok(Some(BaselineRow {
            path: path_from_db_key(p)?,
            extension,
            permissions,
            hash,
            scanned_at: parse_stored_time(&hash_time)?,
            modified_at: parse_stored_time(&modified)?,
            previous_hash: old_hash,
            previous_scanned_at: old_time.as_deref().map(parse_stored_time).transpose()?,
        }))
    }

    /// All stored paths that lie under `root` (component-wise), sorted.
    pub fn load_paths_under(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let mut stmt = self.conn.prepare("SELECT path FROM files")?;
        let rows = stmt.query_map([], |row| row.get::<_, Value>(0))?;
        let mut out = Vec::new();
        for row in rows {
            let path = path_from_db_key(row?)?;
            if path.starts_with(root) {
                out.push(path);
            }
        }
        out.sort();
        Ok(out)
    }

    /// Reclaim WAL space after a run. No-op for in-memory stores.
    pub fn checkpoint(&self) -> Result<()> {
        self.conn
            .query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |_| Ok(()))
            .context("WAL checkpoint")?;
        Ok(())
    }
}

impl BaselineStore for SqliteStore {
    fn lookup(&self, path: &Path) -> Result<Option<StoredRow>, StoreError> {
        let raw = self
            .conn
            .prepare_cached(LOOKUP_SQL)?
            .query_row([path_to_db_key(path)], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })
            .optional()?;
        let Some((hash, hash_time, modified)) = raw else {
            return Ok(None);
        };
        Ok(Some(StoredRow {
            hash,
            scanned_at: parse_stored_time(&hash_time)?,
            modified_at: parse_stored_time(&modified)?,
        }))
    }

    fn update(&mut self, record: &FileRecord) -> Result<(), StoreError> {
        self.conn.prepare_cached(UPDATE_SQL)?.execute(params![
            path_to_db_key(&record.path),
            record.previous_hash,
            record.previous_scanned_at.as_ref().map(format_scan_time),
            record.current_hash,
            format_scan_time(&record.scanned_at),
            format_modified_time(&record.modified_at),
            record.extension,
            record.permissions,
        ])?;
        Ok(())
    }

    fn insert_batch(&mut self, records: &[FileRecord]) -> Result<(), StoreError> {
        if records.is_empty() {
            return Ok(());
        }
        let mut values: Vec<Value> = Vec::with_capacity(records.len() * 6);
        for r in records {
            values.push(path_to_db_key(&r.path));
            values.push(Value::Text(r.extension.clone()));
            values.push(Value::Text(r.permissions.clone()));
            values.push(Value::Text(r.current_hash.clone()));
            values.push(Value::Text(format_scan_time(&r.scanned_at)));
            values.push(Value::Text(format_modified_time(&r.modified_at)));
        }
        self.conn
            .execute(&multi_row_insert_sql(records.len()), params_from_iter(values.iter()))?;
        Ok(())
    }
}
