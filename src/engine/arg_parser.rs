use clap::Parser;
use std::path::PathBuf;

use crate::utils::config::DB_INSERT_BATCH_MAX;

struct DefaultArgs;

impl DefaultArgs {
    pub const DIR: &'static str = ".";
}

/// Record a BLAKE3 fixity baseline for every file under a directory.
#[derive(Clone, Parser)]
#[command(name = "fixity")]
#[command(
    about = "Hash every file under DIR into a SQLite baseline; repeat runs keep the previous digest."
)]
pub struct Cli {
    /// Directory to scan. Default: current directory.
    #[arg(value_name = "DIR", default_value = DefaultArgs::DIR)]
    pub dir: PathBuf,

    /// Baseline database. Default: `fixity.db` in the working directory (or FIXITY_DB).
    #[arg(long, short)]
    pub db: Option<PathBuf>,

    /// Fault log. Default: `fixity-errors.log` in the working directory (or FIXITY_LOG).
    #[arg(long)]
    pub log: Option<PathBuf>,

    /// Hashing worker count. Default: derived from drive type and open-file limit.
    #[arg(long, short = 't', value_parser = clap::value_parser!(usize))]
    pub threads: Option<usize>,

    /// New records per bulk insert (1..=5000).
    #[arg(long, short = 'b', value_parser = clap::value_parser!(usize))]
    pub batch_size: Option<usize>,

    /// Exclude patterns (glob syntax). Can specify multiple: -e pattern1 pattern2 pattern3
    #[arg(long, short = 'e', num_args = 1..)]
    pub exclude: Vec<String>,

    /// Follow symbolic links while walking.
    #[arg(long, short = 'f', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub follow_links: Option<bool>,

    /// Leave rows whose digest did not change untouched instead of rotating them.
    #[arg(long, short = 's', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub skip_unchanged: Option<bool>,

    /// Compare against the baseline and report added/modified/missing; do not write.
    #[arg(long, short = 'c')]
    pub check: bool,

    /// Verbose output.
    #[arg(long, short = 'v', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub verbose: Option<bool>,
}

impl Cli {
    /// Batch size clamped to what one SQLite statement can bind.
    pub fn clamped_batch_size(&self) -> Option<usize> {
        self.batch_size.map(|n| n.clamp(1, DB_INSERT_BATCH_MAX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Opts;
    use crate::index::resolved_db_path;

    #[test]
    fn defaults() {
        let cli = Cli::parse_from(["fixity"]);
        assert_eq!(cli.dir, PathBuf::from("."));
        assert_eq!(cli.db, None);
        assert_eq!(resolved_db_path(&Opts::default()), PathBuf::from("fixity.db"));
        assert!(!cli.check);
        assert_eq!(cli.follow_links, None);
        assert_eq!(cli.clamped_batch_size(), None);
    }

    #[test]
    fn flags_and_clamping() {
        let cli = Cli::parse_from([
            "fixity", "/data", "-f", "--batch-size", "0", "-e", "*.tmp", "cache", "--check",
        ]);
        assert_eq!(cli.dir, PathBuf::from("/data"));
        assert_eq!(cli.follow_links, Some(true));
        assert_eq!(cli.clamped_batch_size(), Some(1));
        assert_eq!(cli.exclude, vec!["*.tmp".to_string(), "cache".to_string()]);
        assert!(cli.check);

        let cli = Cli::parse_from(["fixity", "-b", "99999"]);
        assert_eq!(cli.clamped_batch_size(), Some(DB_INSERT_BATCH_MAX));
    }
}
