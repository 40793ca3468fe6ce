use anyhow::Result;
use log::debug;
use std::path::{Path, PathBuf};
use std::thread::JoinHandle;

use crate::Opts;
use crate::disk_detect::determine_threads_for_drive;
use crate::engine::tools::check_root_and_canonicalize;
use crate::pipeline;
use crate::pipeline::error_sink::ErrorSink;
use crate::utils::config::{RECORD_CHANNEL_CAP, WorkerThreadLimits};

/// Start the walk + hashing pipeline. Returns the record receiver and thread handles; the caller
/// drains `record_rx` (or drops it to stop early) and then calls [`shutdown_pipeline_handles`].
///
/// `own_files` are canonical paths the walk must never dispatch (the store and its sidecars, the log).
pub fn run_pipeline(
    root: &Path,
    opts: &Opts,
    own_files: Vec<PathBuf>,
    errors: &ErrorSink,
) -> Result<pipeline::PipelineHandles> {
    let (root, tuning) = setup_pipeline_root_and_tuning(root, opts)?;

    let channels =
        pipeline::create_pipeline_channels(&root, own_files, opts, errors, tuning.channel_cap);

    let walk_handle =
        pipeline::spawn_walk_thread(channels.path_tx, channels.path_count_tx, channels.ctx);

    let worker_handles = pipeline::spawn_hashing_workers(
        channels.path_rx,
        &channels.record_tx,
        errors,
        tuning.num_threads,
    );

    // Workers hold the only remaining senders; the channel closes when the last one exits.
    drop(channels.record_tx);

    Ok(pipeline::PipelineHandles {
        record_rx: channels.record_rx,
        path_count_rx: channels.path_count_rx,
        walk_handle,
        worker_handles,
        is_network_drive: tuning.is_network_drive,
    })
}

/// Join the walk thread, then every worker. Call after the record stream is drained or dropped.
/// Returns the number of paths the walk dispatched.
pub fn shutdown_pipeline_handles(
    walk_handle: JoinHandle<usize>,
    worker_handles: Vec<JoinHandle<()>>,
) -> Result<usize> {
    let path_count = walk_handle
        .join()
        .map_err(|_| anyhow::anyhow!("walk thread panicked"))?;
    let mut panicked = 0_usize;
    for h in worker_handles {
        if h.join().is_err() {
            panicked += 1;
        }
    }
    if panicked > 0 {
        anyhow::bail!("{} hashing worker(s) panicked", panicked);
    }
    Ok(path_count)
}

/// Canonicalize and validate root, detect drive type, compute the pool size.
pub fn setup_pipeline_root_and_tuning(
    root: &Path,
    opts: &Opts,
) -> Result<(PathBuf, pipeline::PipelineTuning)> {
    let root = check_root_and_canonicalize(root)?;

    let (num_threads, drive_type) =
        determine_threads_for_drive(&root, &WorkerThreadLimits::current(), opts.num_threads);

    let tuning = pipeline::PipelineTuning {
        num_threads,
        is_network_drive: drive_type.is_network(),
        channel_cap: RECORD_CHANNEL_CAP,
    };
    debug!("Pipeline tuning for {}: {:?}", root.display(), tuning);
    Ok((root, tuning))
}
