//! Check mode: compare a tree to its baseline without writing to the store.

use anyhow::{Result, bail};
use log::{debug, info};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::engine::db_ops::{BaselineStore, SqliteStore};
use crate::engine::tools::{check_root_and_canonicalize, own_output_files};
use crate::error::PersistError;
use crate::index::{resolved_db_path, resolved_log_path};
use crate::pipeline::{
    ErrorSink, PipelineHandles, run_pipeline, shutdown_pipeline_handles, spawn_log_writer,
};
use crate::utils::Colors;
use crate::utils::config::LIST_THRESHOLD;
use crate::{CheckReport, Opts};

/// Compare `root` to the baseline named by opts. Fails if the baseline does not exist yet.
pub fn check_dir(root: &Path, opts: &Opts) -> Result<CheckReport> {
    let root = check_root_and_canonicalize(root)?;
    let db_path = resolved_db_path(opts);
    if !db_path.exists() {
        bail!(
            "no baseline at {}; run without --check first",
            db_path.display()
        );
    }
    let store = SqliteStore::open(&db_path)?;
    let log_path = resolved_log_path(opts);
    let own_files = own_output_files(Some(&db_path), Some(&log_path));

    let (errors, log_handle) = spawn_log_writer(Some(&log_path));
    let result = compare_with_store(&root, &store, opts, own_files, &errors);
    drop(errors);
    let faults = log_handle
        .join()
        .map_err(|_| anyhow::anyhow!("log writer thread panicked"))?;

    let mut report = result?;
    report.faults = faults;
    print_report(&report);
    Ok(report)
}

/// Stream the pipeline's records against `store` lookups; then every stored path under `root`
/// that was not seen is missing. Paths in each list are sorted.
pub fn compare_with_store(
    root: &Path,
    store: &SqliteStore,
    opts: &Opts,
    own_files: Vec<PathBuf>,
    errors: &ErrorSink,
) -> Result<CheckReport> {
    let PipelineHandles {
        record_rx,
        walk_handle,
        worker_handles,
        ..
    } = run_pipeline(root, opts, own_files, errors)?;

    let mut report = CheckReport::default();
    let mut seen: HashSet<PathBuf> = HashSet::new();
    for record in record_rx.iter() {
        match store.lookup(&record.path) {
            Ok(None) => report.added.push(record.path.clone()),
            Ok(Some(row)) if row.hash != record.current_hash => {
                report.modified.push(record.path.clone())
            }
            Ok(Some(_)) => report.unchanged += 1,
            Err(source) => {
                errors.report(PersistError::Lookup {
                    path: record.path.clone(),
                    source,
                });
                report.lookup_failed += 1;
            }
        }
        seen.insert(record.path);
    }
    let path_count = shutdown_pipeline_handles(walk_handle, worker_handles)?;
    debug!("Check walked {} paths", path_count);

    let root = check_root_and_canonicalize(root)?;
    report.missing = store
        .load_paths_under(&root)?
        .into_iter()
        .filter(|p| !seen.contains(p))
        .collect();
    report.added.sort();
    report.modified.sort();
    Ok(report)
}

fn print_paths(label: &str, color: &str, paths: &[PathBuf]) {
    if paths.is_empty() {
        return;
    }
    if paths.len() > LIST_THRESHOLD {
        info!(
            "{} {} paths (over {}, not listed)",
            Colors::colorize(color, label),
            paths.len(),
            LIST_THRESHOLD
        );
        return;
    }
    for p in paths {
        info!("{} {}", Colors::colorize(color, label), p.display());
    }
}

/// Per-path lines (up to the list threshold per category), then a one-line summary.
fn print_report(report: &CheckReport) {
    print_paths("NEW", Colors::NEW, &report.added);
    print_paths("MODIFIED", Colors::CHANGED, &report.modified);
    print_paths("MISSING", Colors::MISSING, &report.missing);

    if report.is_clean() {
        info!(
            "No changes detected ({} files match the baseline).",
            report.unchanged
        );
    } else {
        info!(
            "{} | {} | {} | Unchanged: {}",
            Colors::colorize(Colors::NEW, &format!("New: {}", report.added.len())),
            Colors::colorize(
                Colors::CHANGED,
                &format!("Modified: {}", report.modified.len())
            ),
            Colors::colorize(Colors::MISSING, &format!("Missing: {}", report.missing.len())),
            report.unchanged
        );
    }
    if report.faults > 0 {
        info!(
            "{}",
            Colors::colorize(
                Colors::FAULT,
                &format!("{} faults written to the error log", report.faults)
            )
        );
    }
}
