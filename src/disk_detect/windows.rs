//! Windows drive detection using sysinfo (WMI-backed disk kind).

use super::network::{is_network_fs, is_network_mount};
use super::{DriveType, containing_disk};
use log::debug;
use std::path::Path;
use sysinfo::{DiskKind, Disks};

/// Normalise to backslashes and drop the `\\?\` verbatim prefix that canonicalize adds.
fn normalise(p: &str) -> String {
    let p = p.replace('/', "\\");
    p.strip_prefix("\\\\?\\").map(str::to_string).unwrap_or(p)
}

pub fn detect(path: &Path) -> DriveType {
    let path_str = normalise(&path.to_string_lossy()).to_lowercase();
    if is_network_mount(&path_str) {
        return DriveType::Network;
    }

    let disks = Disks::new_with_refreshed_list();
    let Some(disk) = containing_disk(&disks, path, |mount| {
        path_str.starts_with(&normalise(&mount.to_string_lossy()).to_lowercase())
    }) else {
        debug!("No disk found for path: {}", path.display());
        return DriveType::Unknown;
    };

    let mount_point = disk.mount_point().to_string_lossy();
    if is_network_fs(&disk.file_system().to_string_lossy()) || is_network_mount(&mount_point) {
        return DriveType::Network;
    }
    match disk.kind() {
        DiskKind::HDD => DriveType::HDD,
        DiskKind::SSD => DriveType::SSD,
        // WMI can fail or report Unknown for removable/virtual/NVMe; use conservative parallelism
        DiskKind::Unknown(_) => DriveType::Unknown,
    }
}
