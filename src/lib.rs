//! Fixity: concurrent BLAKE3 baseline of a directory tree in SQLite, with one generation of history per file.

pub mod check;
pub mod disk_detect;
pub mod engine;
pub mod error;
pub mod index;
pub mod pipeline;
pub mod types;
pub mod utils;

/// Re-export types for API
pub use types::*;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

/// Result alias used by the public fixity API
pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;

pub use engine::db_ops::{BaselineStore, SqliteStore};

/// Single entry point: scan `root` into the SQLite baseline named by `opts` (or `fixity.db` in the
/// working directory), or compare against it when `opts.check` is set.
///
/// ```ignore
/// let opts = fixity::Opts { db_path: Some("/var/lib/fixity/home.db".into()), ..Default::default() };
/// if let fixity::RunOutcome::Baseline(summary) = fixity::fixity_dir(Path::new("/home"), &opts, None)? {
///     println!("{} new, {} rotated", summary.inserted, summary.changed);
/// }
/// ```
pub fn fixity_dir(
    root: &Path,
    opts: &Opts,
    cancel: Option<Arc<AtomicBool>>,
) -> Result<RunOutcome> {
    log::debug!(
        "{} CONFIG:{:#?}",
        env!("CARGO_PKG_NAME").to_uppercase(),
        opts
    );
    if opts.check {
        return check::check_dir(root, opts).map(RunOutcome::Check);
    }
    index::baseline_dir(root, opts, cancel).map(RunOutcome::Baseline)
}

/// Returns `(num_threads, drive_type)` the scan would use for `path` when no thread count is set.
pub fn tuning_for_path(path: &Path) -> (usize, disk_detect::DriveType) {
    disk_detect::determine_threads_for_drive(
        path,
        &utils::config::WorkerThreadLimits::current(),
        None,
    )
}
