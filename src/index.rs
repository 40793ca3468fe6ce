//! Baseline scan: walk + hash pipeline streamed into a store, with progress, cancel and fault log.

use anyhow::{Context, Result};
use log::{debug, info};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::thread;

use crossbeam_channel::Receiver;

use crate::engine::db_ops::{BaselineStore, PersistParams, SqliteStore, persist_stream};
use crate::engine::progress::{
    ProgressBar, create_counter, progress_callback, refresh_bar, set_bar_total,
};
use crate::engine::tools::{check_root_and_canonicalize, own_output_files};
use crate::pipeline::{
    ErrorSink, PipelineHandles, run_pipeline, shutdown_pipeline_handles, spawn_log_writer,
};
use crate::utils::config::PackagePaths;
use crate::{Opts, ScanSummary};

/// Store path from opts, else the package default in the working directory.
pub fn resolved_db_path(opts: &Opts) -> PathBuf {
    opts.db_path
        .clone()
        .unwrap_or_else(|| PathBuf::from(PackagePaths::get().db_filename()))
}

/// Fault log path from opts, else the package default in the working directory.
pub fn resolved_log_path(opts: &Opts) -> PathBuf {
    opts.log_path
        .clone()
        .unwrap_or_else(|| PathBuf::from(PackagePaths::get().log_filename()))
}

/// Counter bar (verbose only). The walk's path count arrives on its own thread, since the
/// caller is busy persisting.
fn setup_progress(verbose: bool, path_count_rx: Receiver<usize>) -> Option<ProgressBar> {
    let bar = verbose.then(|| {
        let b = create_counter("Hashing");
        refresh_bar(&b);
        b
    });
    if let Some(bar) = bar.as_ref() {
        let bar_clone = Arc::clone(bar);
        thread::spawn(move || {
            if let Ok(total) = path_count_rx.recv() {
                set_bar_total(&bar_clone, total);
            }
        });
    }
    bar
}

/// Run one pipeline pass over `root` into `store`.
///
/// Faults go to `errors`; the caller owns the log writer and must drop its sink handles and join
/// it afterwards (see [`scan_dir`]). `own_files` are never dispatched. `summary.faults` is left
/// at zero here because only the log writer knows the final count.
pub fn scan_with_store<S: BaselineStore>(
    root: &Path,
    store: &mut S,
    opts: &Opts,
    own_files: Vec<PathBuf>,
    errors: &ErrorSink,
    cancel: Option<Arc<AtomicBool>>,
) -> Result<ScanSummary> {
    let PipelineHandles {
        record_rx,
        path_count_rx,
        walk_handle,
        worker_handles,
        is_network_drive,
    } = run_pipeline(root, opts, own_files, errors)?;
    debug!("Pipeline started (network drive: {})", is_network_drive);

    let bar = setup_progress(opts.verbose, path_count_rx);
    let params = PersistParams {
        batch_size: opts.batch_size,
        skip_unchanged: opts.skip_unchanged,
        errors,
        on_progress: progress_callback(&bar),
        cancel_check: cancel,
    };
    // Consumes record_rx: on cancel the workers see a closed channel and wind down.
    let summary = persist_stream(store, record_rx, &params);

    let path_count = shutdown_pipeline_handles(walk_handle, worker_handles)?;
    debug!(
        "Walk dispatched {} paths; persister received {}",
        path_count, summary.received
    );
    Ok(summary)
}

/// Scan `root` into an injected store, writing faults to the log (opts or default path).
/// Returns the summary with `faults` filled from the log writer.
pub fn scan_dir<S: BaselineStore>(
    root: &Path,
    store: &mut S,
    opts: &Opts,
    cancel: Option<Arc<AtomicBool>>,
) -> Result<ScanSummary> {
    // Root problems are fatal before any thread exists.
    let root = check_root_and_canonicalize(root)?;
    let db_path = resolved_db_path(opts);
    let log_path = resolved_log_path(opts);
    let own_files = own_output_files(Some(&db_path), Some(&log_path));

    let (errors, log_handle) = spawn_log_writer(Some(&log_path));
    let result = scan_with_store(&root, store, opts, own_files, &errors, cancel);
    drop(errors);
    let faults = log_handle
        .join()
        .map_err(|_| anyhow::anyhow!("log writer thread panicked"))?;

    let mut summary = result?;
    summary.faults = faults;
    Ok(summary)
}

/// Open (or create) the SQLite baseline and scan `root` into it. Checkpoints WAL afterwards.
pub fn baseline_dir(
    root: &Path,
    opts: &Opts,
    cancel: Option<Arc<AtomicBool>>,
) -> Result<ScanSummary> {
    check_root_and_canonicalize(root)?;
    let db_path = resolved_db_path(opts);
    let mut store = SqliteStore::open(&db_path)
        .with_context(|| format!("open baseline store {}", db_path.display()))?;
    let summary = scan_dir(root, &mut store, opts, cancel)?;
    store.checkpoint()?;
    info!(
        "Baseline {} now holds {} rows",
        db_path.display(),
        store.row_count()?
    );
    Ok(summary)
}
