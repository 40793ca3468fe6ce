//! Pipeline context and tuning: shared data passed into the walk thread and drive-derived settings.

use crossbeam_channel::{Receiver, Sender, bounded};
use std::path::{Path, PathBuf};
use std::thread::JoinHandle;

use crate::FileRecord;
use crate::Opts;

use super::error_sink::ErrorSink;

/// Tuning derived from drive type and FD limit.
#[derive(Clone, Debug)]
pub struct PipelineTuning {
    /// Hashing pool size.
    pub num_threads: usize,
    pub is_network_drive: bool,
    /// Capacity for the path and record channels.
    pub channel_cap: usize,
}

/// Shared context for the walk thread.
pub struct PipelineContext {
    pub root: PathBuf,
    /// Canonical store/log paths that must not be scanned.
    pub own_files: Vec<PathBuf>,
    pub exclude: Vec<String>,
    pub follow_links: bool,
    pub errors: ErrorSink,
}

/// Handles returned by [`run_pipeline`](crate::pipeline::run_pipeline).
/// The caller drains `record_rx`, then hands the rest to [`shutdown_pipeline_handles`](crate::pipeline::shutdown_pipeline_handles).
pub struct PipelineHandles {
    pub record_rx: Receiver<FileRecord>,
    /// Receives the number of paths the walk dispatched, once the walk finishes.
    pub path_count_rx: Receiver<usize>,
    pub walk_handle: JoinHandle<usize>,
    pub worker_handles: Vec<JoinHandle<()>>,
    pub is_network_drive: bool,
}

/// Channels for one pipeline pass. Walk thread gets path_tx, path_count_tx, ctx; workers get path_rx, record_tx.
pub struct PipelineChannels {
    pub path_tx: Sender<PathBuf>,
    pub path_rx: Receiver<PathBuf>,
    pub record_tx: Sender<FileRecord>,
    pub record_rx: Receiver<FileRecord>,
    pub path_count_tx: Sender<usize>,
    pub path_count_rx: Receiver<usize>,
    pub ctx: PipelineContext,
}

pub fn create_pipeline_channels(
    root: &Path,
    own_files: Vec<PathBuf>,
    opts: &Opts,
    errors: &ErrorSink,
    channel_cap: usize,
) -> PipelineChannels {
    let (path_tx, path_rx) = bounded::<PathBuf>(channel_cap);
    let (record_tx, record_rx) = bounded::<FileRecord>(channel_cap);
    let (path_count_tx, path_count_rx) = bounded::<usize>(1);

    let ctx = PipelineContext {
        root: root.to_path_buf(),
        own_files,
        exclude: opts.exclude.clone(),
        follow_links: opts.follow_links,
        errors: errors.clone(),
    };

    PipelineChannels {
        path_tx,
        path_rx,
        record_tx,
        record_rx,
        path_count_tx,
        path_count_rx,
        ctx,
    }
}
