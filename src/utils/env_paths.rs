//! Store/log paths from the environment: process env first, then `.env` in `dir`.

use std::path::{Path, PathBuf};

use crate::Opts;
use crate::utils::config::PackagePaths;

fn non_empty_var(key: &str) -> Option<String> {
    let s = std::env::var(key).ok()?;
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

/// Value of `key` from the process env, else from `dir/.env` (loaded into the env if present).
pub(crate) fn try_env_then_dotenv(dir: &Path, key: &str) -> Option<String> {
    if let Some(s) = non_empty_var(key) {
        return Some(s);
    }
    let env_path = dir.join(".env");
    if env_path.is_file() {
        if let Err(e) = dotenvy::from_path(&env_path) {
            log::warn!("{}: {}", env_path.display(), e);
        }
        return non_empty_var(key);
    }
    None
}

/// Fill `db_path` / `log_path` from FIXITY_DB / FIXITY_LOG where present. Call after the settings
/// file and before CLI flags.
pub(crate) fn apply_env_to_opts(dir: &Path, opts: &mut Opts) {
    let names = PackagePaths::get();
    if let Some(p) = try_env_then_dotenv(dir, &names.env_db_var()) {
        opts.db_path = Some(PathBuf::from(p));
    }
    if let Some(p) = try_env_then_dotenv(dir, &names.env_log_var()) {
        opts.log_path = Some(PathBuf::from(p));
    }
}
