//! Walk loop: consumes walkdir results, sends candidate paths to the hashing pool, reports traversal faults.

use crossbeam_channel::Sender;
use std::path::PathBuf;
use std::thread::{self, JoinHandle};

use crate::engine::tools::should_include_in_walk;
use crate::error::ScanError;

use super::context::PipelineContext;

/// One result from a directory walk: either a path to consider or an error with optional path.
pub enum WalkOutcome {
    /// A non-directory entry.
    File(PathBuf),
    /// A directory; descended into, never dispatched.
    Dir,
    Err { msg: String, path: Option<PathBuf> },
}

/// Convert a walkdir result into [`WalkOutcome`].
pub fn to_outcome_walkdir(r: Result<walkdir::DirEntry, walkdir::Error>) -> WalkOutcome {
    match r {
        Ok(entry) if entry.file_type().is_dir() => WalkOutcome::Dir,
        Ok(entry) => WalkOutcome::File(entry.into_path()),
        Err(err) => WalkOutcome::Err {
            msg: err
                .io_error()
                .map(|e| e.to_string())
                .unwrap_or_else(|| err.to_string()),
            path: err.path().map(PathBuf::from),
        },
    }
}

fn walkdir_iter(ctx: &PipelineContext) -> Box<dyn Iterator<Item = WalkOutcome>> {
    use walkdir::WalkDir;
    Box::new(
        WalkDir::new(&ctx.root)
            .follow_links(ctx.follow_links)
            .into_iter()
            .map(to_outcome_walkdir),
    )
}

pub fn spawn_walk_thread(
    path_tx: Sender<PathBuf>,
    path_count_tx: Sender<usize>,
    ctx: PipelineContext,
) -> JoinHandle<usize> {
    thread::spawn(move || {
        let iter = walkdir_iter(&ctx);
        run_walk_loop(path_tx, path_count_tx, ctx, iter)
    })
}

/// Run the walk loop: consume `iter`, filter with `should_include_in_walk`, send included paths to
/// `path_tx`, report traversal errors to the sink as `FILE ERROR` and keep going.
/// Sends total count on `path_count_tx` and drops `path_tx` when done (this is what lets the
/// hashing pool, and then the record channel, close). Returns the count of paths sent.
pub fn run_walk_loop<I>(
    path_tx: Sender<PathBuf>,
    path_count_tx: Sender<usize>,
    ctx: PipelineContext,
    iter: I,
) -> usize
where
    I: Iterator<Item = WalkOutcome>,
{
    let mut count = 0_usize;
    let mut last_path: Option<PathBuf> = None;
    for outcome in iter {
        match outcome {
            WalkOutcome::Dir => {}
            WalkOutcome::File(path) => {
                if !should_include_in_walk(&path, &ctx.root, &ctx.own_files, &ctx.exclude) {
                    continue;
                }
                last_path = Some(path.clone());
                if path_tx.send(path).is_err() {
                    break;
                }
                count += 1;
            }
            WalkOutcome::Err { msg, path } => {
                // Errors without a path still get a line so every fault is accounted for.
                let path = path.unwrap_or_else(|| {
                    PathBuf::from(format!(
                        "<no-path, last was {}>",
                        last_path
                            .as_ref()
                            .map(|p| p.display().to_string())
                            .unwrap_or_else(|| "<none>".to_string())
                    ))
                });
                ctx.errors.report(ScanError::Walk { path, msg });
            }
        }
    }
    let _ = path_count_tx.send(count);
    drop(path_tx);
    count
}
