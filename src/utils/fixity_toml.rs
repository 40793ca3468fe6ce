//! Load `.fixity.toml` from the scan root (CLI only). Library callers build [`Opts`] directly.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::Opts;
use crate::utils::config::{DB_INSERT_BATCH_MAX, PackagePaths};

#[derive(Debug, Default, Deserialize)]
pub(crate) struct FixityToml {
    #[serde(default)]
    settings: ScanSection,
}

#[derive(Debug, Default, Deserialize)]
struct ScanSection {
    db_path: Option<String>,
    log_path: Option<String>,
    threads: Option<usize>,
    batch_size: Option<usize>,
    follow_links: Option<bool>,
    exclude: Option<Vec<String>>,
    skip_unchanged: Option<bool>,
    verbose: Option<bool>,
}

/// Load the settings file from `dir` if present. None if missing; a parse error is warned and ignored.
pub(crate) fn load_fixity_toml(dir: &Path) -> Option<FixityToml> {
    let path = dir.join(PackagePaths::get().config_filename());
    let s = std::fs::read_to_string(&path).ok()?;
    toml::from_str(&s)
        .map_err(|e| log::warn!("{}: {}", path.display(), e))
        .ok()
}

macro_rules! apply_file_opt {
    ($sec:expr, $opts:expr, $sec_field:ident => $opts_field:ident) => {
        if let Some(v) = $sec.$sec_field {
            $opts.$opts_field = v;
        }
    };
}

/// Apply file settings to opts (only fields present in the file). Call before applying CLI flags.
/// Check mode is never read from the file.
pub(crate) fn apply_file_to_opts(file: &FixityToml, opts: &mut Opts) {
    let sec = &file.settings;
    if let Some(ref p) = sec.db_path {
        opts.db_path = Some(PathBuf::from(p));
    }
    if let Some(ref p) = sec.log_path {
        opts.log_path = Some(PathBuf::from(p));
    }
    if let Some(n) = sec.threads {
        opts.num_threads = Some(n);
    }
    if let Some(n) = sec.batch_size {
        opts.batch_size = n.clamp(1, DB_INSERT_BATCH_MAX);
    }
    apply_file_opt!(sec, opts, follow_links => follow_links);
    if let Some(ref v) = sec.exclude {
        opts.exclude = v.clone();
    }
    apply_file_opt!(sec, opts, skip_unchanged => skip_unchanged);
    apply_file_opt!(sec, opts, verbose => verbose);
}
