//! CLI command handler: baseline scan by default; --check compares without writing.

use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::check::check_dir;
use crate::engine::arg_parser::Cli;
use crate::index::{baseline_dir, resolved_log_path};
use crate::utils::env_paths::apply_env_to_opts;
use crate::utils::fixity_toml::{apply_file_to_opts, load_fixity_toml};
use crate::utils::{Colors, setup_logging};
use crate::{Opts, ScanSummary};

/// Defaults, then `.fixity.toml` in DIR, then FIXITY_DB / FIXITY_LOG (env or `./.env`), then flags.
fn setup_opts(cli: &Cli) -> Opts {
    let mut opts = Opts::default();
    if let Some(file) = load_fixity_toml(&cli.dir) {
        debug!("Applying settings from {}", cli.dir.display());
        apply_file_to_opts(&file, &mut opts);
    }
    apply_env_to_opts(std::path::Path::new("."), &mut opts);

    if cli.db.is_some() {
        opts.db_path = cli.db.clone();
    }
    if cli.log.is_some() {
        opts.log_path = cli.log.clone();
    }
    if cli.threads.is_some() {
        opts.num_threads = cli.threads;
    }
    if let Some(n) = cli.clamped_batch_size() {
        opts.batch_size = n;
    }
    if !cli.exclude.is_empty() {
        opts.exclude = cli.exclude.clone();
    }
    if let Some(v) = cli.follow_links {
        opts.follow_links = v;
    }
    if let Some(v) = cli.skip_unchanged {
        opts.skip_unchanged = v;
    }
    if let Some(v) = cli.verbose {
        opts.verbose = v;
    }
    opts.check = cli.check;
    opts
}

fn print_summary(summary: &ScanSummary, opts: &Opts) {
    info!(
        "{} | {} | Unchanged: {} | Dropped: {}",
        Colors::colorize(Colors::NEW, &format!("New: {}", summary.inserted)),
        Colors::colorize(Colors::CHANGED, &format!("Rotated: {}", summary.changed)),
        summary.unchanged,
        summary.dropped
    );
    if !summary.batch_errors.is_empty() {
        warn!(
            "{} of {} batches failed ({} new records not stored)",
            summary.batch_errors.len(),
            summary.batches,
            summary.insert_failed
        );
    }
    if summary.faults > 0 {
        info!(
            "{}",
            Colors::colorize(
                Colors::FAULT,
                &format!(
                    "{} faults written to {}",
                    summary.faults,
                    resolved_log_path(opts).display()
                )
            )
        );
    }
}

/// Run a baseline scan (default) or a compare-only check.
pub fn handle_run(cli: &Cli) -> Result<()> {
    let opts = setup_opts(cli);
    setup_logging(opts.verbose);
    debug!("{} CONFIG: {:#?}", env!("CARGO_PKG_NAME").to_uppercase(), opts);

    if opts.check {
        warn!("CHECK MODE. THE BASELINE WILL NOT BE MODIFIED.");
        check_dir(&cli.dir, &opts)?;
        return Ok(());
    }

    let cancel_requested = Arc::new(AtomicBool::new(false));
    let cancel_handler = Arc::clone(&cancel_requested);
    ctrlc::set_handler(move || {
        cancel_handler.store(true, Ordering::Relaxed);
    })
    .context("set Ctrl+C handler")?;

    debug!("Building baseline for {}", cli.dir.display());
    let summary = baseline_dir(&cli.dir, &opts, Some(Arc::clone(&cancel_requested)))?;
    print_summary(&summary, &opts);

    if summary.cancelled {
        anyhow::bail!("Scan cancelled by user; the baseline is partial (pending rows were flushed)");
    }
    Ok(())
}
