//! Per-item error taxonomy. These never abort a run; they are rendered into fault lines
//! for the error sink. Run-level failures use `anyhow`.

use std::io;
use std::path::PathBuf;

/// Failure to stat, open, or read one entry during the walk.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("FILE ERROR: {}: {source}", .path.display())]
    Stat { path: PathBuf, source: io::Error },

    #[error("OPEN ERROR: {}: {source}", .path.display())]
    Open { path: PathBuf, source: io::Error },

    #[error("FILE ERROR: {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },

    /// Traversal error below the root (e.g. unreadable subdirectory).
    #[error("FILE ERROR: {}: {msg}", .path.display())]
    Walk { path: PathBuf, msg: String },
}

/// Store-level failure.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error("unparseable timestamp {0:?} in store")]
    Timestamp(String),

    #[error("unreadable path key in store: {0}")]
    PathKey(String),
}

/// Failure to persist one record or one batch.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("DB LOOKUP ERROR: {}: {source}", .path.display())]
    Lookup { path: PathBuf, source: StoreError },

    #[error("DB UPDATE ERROR: {}: {source}", .path.display())]
    Update { path: PathBuf, source: StoreError },

    #[error("DB INSERT ERROR: batch of {count} rows: {source}")]
    Insert { count: usize, source: StoreError },
}
