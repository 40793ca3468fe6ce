//! Cross-platform disk type detection for sizing the hashing pool.
//!
//! Hashing is read-bound, so the pool is sized per drive kind: wide on SSDs, narrow on spinning
//! disks and network mounts where parallel reads mostly add seeks or round-trips.
//! See [`determine_threads_for_drive`].

use log::debug;
use std::path::Path;

use crate::utils::config::WorkerThreadLimits;
use crate::utils::fd_limit::determine_threads_given_fd_limit;

// Platform-specific modules
#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "macos")]
mod macos;
#[cfg(target_os = "windows")]
mod windows;

pub mod network;

/// Drive type for performance tuning
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DriveType {
    SSD,
    HDD,
    Network,
    Unknown,
}

impl DriveType {
    /// Hashing pool size for this drive type, given the limits (with `all_threads` filled).
    pub fn worker_threads(&self, limits: &WorkerThreadLimits) -> usize {
        match self {
            DriveType::SSD => limits.half(),
            DriveType::HDD => limits.half().min(limits.hdd_max),
            DriveType::Network | DriveType::Unknown => limits.half().min(limits.floor),
        }
    }

    pub fn is_network(&self) -> bool {
        matches!(self, DriveType::Network)
    }
}

/// Disk whose mount point contains `path` (longest matching mount wins).
#[cfg(any(target_os = "macos", target_os = "linux", target_os = "windows"))]
fn containing_disk<'a>(
    disks: &'a sysinfo::Disks,
    path: &Path,
    contains: impl Fn(&Path) -> bool,
) -> Option<&'a sysinfo::Disk> {
    for d in disks.list() {
        debug!(
            "  disk mount={}, fs={}, kind={:?}",
            d.mount_point().display(),
            d.file_system().to_string_lossy(),
            d.kind()
        );
    }
    let disk = disks
        .list()
        .iter()
        .filter(|d| contains(d.mount_point()))
        .max_by_key(|d| d.mount_point().as_os_str().len());
    if let Some(d) = disk {
        debug!(
            "Disk for {}: mount={}, fs={}",
            path.display(),
            d.mount_point().display(),
            d.file_system().to_string_lossy()
        );
    }
    disk
}

/// Detect drive type for the given path.
pub fn drive_type_for_path(path: &Path) -> DriveType {
    #[cfg(target_os = "macos")]
    {
        macos::detect(path)
    }

    #[cfg(target_os = "linux")]
    {
        linux::detect(path)
    }

    #[cfg(target_os = "windows")]
    {
        windows::detect(path)
    }

    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    {
        debug!("Unsupported platform for drive detection: {}", path.display());
        DriveType::Unknown
    }
}

/// Returns `(num_threads, drive_type)` for the hashing pool.
///
/// `thread_override` forces the pool size and skips detection; either way the result is capped by
/// the FD limit and is at least 1.
pub fn determine_threads_for_drive(
    path: &Path,
    limits: &WorkerThreadLimits,
    thread_override: Option<usize>,
) -> (usize, DriveType) {
    if let Some(n) = thread_override {
        let n = determine_threads_given_fd_limit(n);
        debug!("Thread override: using {} hashing threads", n);
        return (n, DriveType::Unknown);
    }
    let drive_type = drive_type_for_path(path);
    let num_threads = determine_threads_given_fd_limit(drive_type.worker_threads(limits));
    debug!(
        "Drive type: {:?}, using {} hashing threads",
        drive_type, num_threads
    );
    (num_threads, drive_type)
}
