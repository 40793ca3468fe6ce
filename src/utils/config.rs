//! Application configuration constants.
//! Tuning and thresholds in one place.

use std::sync::OnceLock;

// ---- Package / paths (from CARGO_PKG_NAME, cached) ----

/// Package-derived file names: built once from `CARGO_PKG_NAME`, then cached.
pub struct PackagePaths {
    pkg_name: &'static str,
    db_filename: String,
    log_filename: String,
    config_filename: String,
}

static PACKAGE_PATHS: OnceLock<PackagePaths> = OnceLock::new();

impl PackagePaths {
    /// Build and cache names from `CARGO_PKG_NAME`. Called once on first use.
    pub fn get() -> &'static PackagePaths {
        PACKAGE_PATHS.get_or_init(|| {
            let pkg = env!("CARGO_PKG_NAME");
            PackagePaths {
                pkg_name: pkg,
                db_filename: format!("{pkg}.db"),
                log_filename: format!("{pkg}-errors.log"),
                config_filename: format!(".{pkg}.toml"),
            }
        })
    }

    pub fn pkg_name(&self) -> &str {
        self.pkg_name
    }

    /// Default baseline store file name (created in the working directory).
    pub fn db_filename(&self) -> &str {
        &self.db_filename
    }

    /// Default fault log file name (created in the working directory).
    pub fn log_filename(&self) -> &str {
        &self.log_filename
    }

    /// Per-tree settings file looked up in the scan root.
    pub fn config_filename(&self) -> &str {
        &self.config_filename
    }

    /// Env var names that may carry the store and log paths (also read from `.env`).
    pub fn env_db_var(&self) -> String {
        format!("{}_DB", self.pkg_name.to_uppercase())
    }

    pub fn env_log_var(&self) -> String {
        format!("{}_LOG", self.pkg_name.to_uppercase())
    }
}

// ---- Worker threads ----

/// Thread limits for drive-type-based tuning.
/// Use [`WorkerThreadLimits::current()`] to fill `all_threads` from rayon; the rest are const.
#[derive(Clone, Copy, Debug)]
pub struct WorkerThreadLimits {
    /// Available threads (from rayon); set by [`WorkerThreadLimits::current()`].
    pub all_threads: usize,
    /// Max threads for HDD (spinning disk).
    pub hdd_max: usize,
    /// Floor / minimum for network or unknown (conservative).
    pub floor: usize,
}

impl Default for WorkerThreadLimits {
    fn default() -> Self {
        Self {
            all_threads: 0, // use current() to set from rayon
            hdd_max: Self::HDD_THREADS,
            floor: Self::FLOOR_THREADS,
        }
    }
}

impl WorkerThreadLimits {
    pub const HDD_THREADS: usize = 4;
    pub const FLOOR_THREADS: usize = 2;

    /// Build limits with `all_threads` set from `rayon::current_num_threads()`.
    pub fn current() -> Self {
        Self {
            all_threads: rayon::current_num_threads(),
            ..Self::default()
        }
    }

    /// Half the hardware threads, never zero. Default hashing pool size on fast local disks.
    pub fn half(&self) -> usize {
        (self.all_threads / 2).max(1)
    }
}

// ---- Hashing ----

/// Hashing I/O buffer sizes.
pub struct HashingConsts;

impl HashingConsts {
    /// Largest read per hasher update (bytes). 1 MB.
    pub const HASH_READ_CHUNK_SIZE: usize = 1024 * 1024;
}

// ---- Pipeline / persistence ----

/// Capacity of the path and record channels. Also the default batch size so one full
/// channel's worth of NEW records becomes one bulk insert.
pub const RECORD_CHANNEL_CAP: usize = 250;

/// Default number of NEW records per multi-row insert.
pub const DB_INSERT_BATCH_SIZE: usize = RECORD_CHANNEL_CAP;

/// Upper bound for a user-supplied batch size. Each row binds 6 parameters and SQLite caps
/// host parameters per statement at 32766.
pub const DB_INSERT_BATCH_MAX: usize = 5_000;

/// Poll interval for the persister when a cancel flag is installed.
pub const CANCEL_POLL_MS: u64 = 200;

// ---- Progress ----

/// Progress bar update batching.
pub struct ProgressConsts;

impl ProgressConsts {
    /// Records persisted between progress bar updates.
    pub const PROGRESS_UPDATE_BATCH_SIZE: usize = 100;
}

// ---- Timestamps ----

/// Scan instant format (UTC, microseconds).
pub const SCAN_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// File modification time format (UTC, seconds).
pub const MODIFIED_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ---- Check output ----

/// In check mode, list at most this many paths per category before summarising.
pub const LIST_THRESHOLD: usize = 100;
