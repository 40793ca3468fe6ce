//! Hashing pool: workers turn dispatched paths into `FileRecord`s.

use crossbeam_channel::{Receiver, Sender};
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};

use crate::FileRecord;
use crate::engine::hashing::hash_file;
use crate::engine::tools::{extension_of, modified_time, permission_string, scan_instant};
use crate::error::ScanError;

use super::error_sink::ErrorSink;

/// Single hashing worker: read paths from path_rx, turn regular files into records, send on record_tx.
/// Faults go to the sink; the path is then skipped.
fn hashing_worker_loop(path_rx: Receiver<PathBuf>, record_tx: Sender<FileRecord>, errors: ErrorSink) {
    while let Ok(abs_path) = path_rx.recv() {
        match path_to_record(&abs_path) {
            Ok(Some(record)) => {
                if record_tx.send(record).is_err() {
                    break;
                }
            }
            Ok(None) => {}
            Err(e) => errors.report(e),
        }
    }
    drop(record_tx);
}

/// Spawn the hashing pool. Caller must drop its own `record_tx` after this so the record channel
/// closes once the last worker exits.
pub fn spawn_hashing_workers(
    path_rx: Receiver<PathBuf>,
    record_tx: &Sender<FileRecord>,
    errors: &ErrorSink,
    num_threads: usize,
) -> Vec<JoinHandle<()>> {
    (0..num_threads.max(1))
        .map(|_| {
            let path_rx = path_rx.clone();
            let record_tx = record_tx.clone();
            let errors = errors.clone();
            thread::spawn(move || hashing_worker_loop(path_rx, record_tx, errors))
        })
        .collect()
}

/// Stat and hash one path. `Ok(None)` for anything that is not a regular file after following links
/// (directories reached through a symlink, sockets, fifos, devices).
pub fn path_to_record(abs_path: &Path) -> Result<Option<FileRecord>, ScanError> {
    let meta = std::fs::metadata(abs_path).map_err(|source| ScanError::Stat {
        path: abs_path.to_path_buf(),
        source,
    })?;
    if !meta.is_file() {
        return Ok(None);
    }
    let current_hash = hash_file(abs_path, meta.len())?;
    Ok(Some(FileRecord {
        path: abs_path.to_path_buf(),
        extension: extension_of(abs_path),
        permissions: permission_string(&meta),
        current_hash,
        scanned_at: scan_instant(),
        modified_at: modified_time(&meta),
        previous_hash: None,
        previous_scanned_at: None,
    }))
}
