//! Public and internal types for the fixity API and pipeline.

use chrono::{DateTime, Utc};
use std::path::PathBuf;

use crate::utils::config::DB_INSERT_BATCH_SIZE;

/// One scanned regular file. Built by a hashing worker, consumed once by the persister.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileRecord {
    /// Absolute path (unique key in the store).
    pub path: PathBuf,
    /// Extension with leading dot (`.txt`), or empty.
    pub extension: String,
    /// `ls`-style mode string, e.g. `-rw-r--r--`.
    pub permissions: String,
    /// Lowercase hex blake3 digest of the contents.
    pub current_hash: String,
    /// When the digest was computed (microsecond precision).
    pub scanned_at: DateTime<Utc>,
    /// Filesystem mtime (second precision).
    pub modified_at: DateTime<Utc>,
    /// Prior `current_hash`; `None` until the persister finds an existing row.
    pub previous_hash: Option<String>,
    /// Prior `scanned_at`; `None` until the persister finds an existing row.
    pub previous_scanned_at: Option<DateTime<Utc>>,
}

/// Existing row returned by a store lookup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredRow {
    pub hash: String,
    pub scanned_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

/// Full row as persisted, including the rotated generation. Used by check mode and tests.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BaselineRow {
    pub path: PathBuf,
    pub extension: String,
    pub permissions: String,
    pub hash: String,
    pub scanned_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub previous_hash: Option<String>,
    pub previous_scanned_at: Option<DateTime<Utc>>,
}

/// How the persister resolved one record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// No prior row; queued for the next bulk insert.
    New,
    /// Prior row found and rotated (content may or may not differ).
    Changed,
    /// Prior row found with the same digest and left untouched (`skip_unchanged` only).
    Unchanged,
    /// Lookup or update failed; reported to the error sink and dropped.
    Dropped,
}

/// Counters for one pipeline pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScanSummary {
    /// Records pulled off the record channel.
    pub received: usize,
    /// Rows inserted by successful batches.
    pub inserted: usize,
    /// NEW records lost to failed batches.
    pub insert_failed: usize,
    pub changed: usize,
    pub unchanged: usize,
    pub dropped: usize,
    /// Number of bulk inserts issued (successful or not).
    pub batches: usize,
    /// Batch insert failures (one line per failed batch).
    pub batch_errors: Vec<String>,
    /// Fault lines drained by the log writer (scan and persist faults).
    pub faults: usize,
    /// True when the run stopped early on Ctrl+C; the pending batch was still flushed.
    pub cancelled: bool,
}

impl ScanSummary {
    /// NEW classifications, whether or not their batch made it to the store.
    pub fn new_records(&self) -> usize {
        self.inserted + self.insert_failed
    }
}

/// Result of comparing a tree to its baseline without writing (check mode).
#[derive(Clone, Debug, Default)]
pub struct CheckReport {
    /// Files with no baseline row.
    pub added: Vec<PathBuf>,
    /// Files whose digest differs from the baseline.
    pub modified: Vec<PathBuf>,
    /// Baseline rows under the root that no longer exist on disk (or failed to scan).
    pub missing: Vec<PathBuf>,
    pub unchanged: usize,
    /// Lookups that failed; reported to the error sink.
    pub lookup_failed: usize,
    pub faults: usize,
}

impl CheckReport {
    pub fn is_clean(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.missing.is_empty()
    }
}

/// What [`fixity_dir`](crate::fixity_dir) did: a baseline scan or a compare-only check.
#[derive(Clone, Debug)]
pub enum RunOutcome {
    Baseline(ScanSummary),
    Check(CheckReport),
}

/// Options for a scan (CLI and lib).
#[derive(Clone, Debug)]
pub struct Opts {
    /// Baseline store path. When None, `fixity.db` in the working directory.
    pub db_path: Option<PathBuf>,
    /// Fault log path. When None, `fixity-errors.log` in the working directory.
    pub log_path: Option<PathBuf>,
    /// Override hashing pool size. When None, derived from drive type and FD limit.
    pub num_threads: Option<usize>,
    /// NEW records per bulk insert.
    pub batch_size: usize,
    /// Follow symbolic links.
    pub follow_links: bool,
    /// Exclude patterns (glob syntax, e.g. `*.tmp`, `node_modules`).
    pub exclude: Vec<String>,
    /// Progress bar and debug logging.
    pub verbose: bool,
    /// Leave rows whose digest is unchanged untouched instead of rotating them.
    pub skip_unchanged: bool,
    /// Compare against the baseline only; never write.
    pub check: bool,
}

impl Default for Opts {
    fn default() -> Self {
        Self {
            db_path: None,
            log_path: None,
            num_threads: None,
            batch_size: DB_INSERT_BATCH_SIZE,
            follow_links: false,
            exclude: Vec::new(),
            verbose: false,
            skip_unchanged: false,
            check: false,
        }
    }
}
