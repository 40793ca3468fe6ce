//! Fixity CLI: baseline a directory tree; use --check to compare without writing.

use anyhow::Result;
use clap::Parser;
use fixity::engine::arg_parser::Cli;
use fixity::engine::handle_run;
use std::time::Instant;

fn main() -> Result<()> {
    let start_time = Instant::now();
    let cli = Cli::parse();
    handle_run(&cli)?;
    log::debug!("Total time: {:?}", start_time.elapsed());
    Ok(())
}
