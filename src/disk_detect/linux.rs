//! Linux drive detection: sysinfo mount table, falling back to /sys/block rotational flag.

use super::network::is_network_fs;
use super::{DriveType, containing_disk};
use log::debug;
use std::path::Path;
use sysinfo::{Disk, DiskKind, Disks};

pub fn detect(path: &Path) -> DriveType {
    let disks = Disks::new_with_refreshed_list();
    let Some(disk) = containing_disk(&disks, path, |mount| path.starts_with(mount)) else {
        debug!("No disk found for path: {}", path.display());
        return DriveType::Unknown;
    };

    if is_network_fs(&disk.file_system().to_string_lossy()) {
        debug!("Detected network filesystem at {}", disk.mount_point().display());
        return DriveType::Network;
    }

    match disk.kind() {
        DiskKind::HDD => DriveType::HDD,
        DiskKind::SSD => DriveType::SSD,
        DiskKind::Unknown(_) => read_rotational_from_sys(disk).unwrap_or(DriveType::SSD),
    }
}

/// Read /sys/block/{device}/queue/rotational to distinguish HDD (1) vs SSD (0).
fn read_rotational_from_sys(disk: &Disk) -> Option<DriveType> {
    let name = disk.name().to_str()?;
    let dev_name = name.strip_prefix("/dev/")?;
    let base_dev = base_block_device(dev_name);
    let rotational = std::fs::read_to_string(format!("/sys/block/{base_dev}/queue/rotational")).ok()?;
    Some(if rotational.trim() == "1" {
        DriveType::HDD
    } else {
        DriveType::SSD
    })
}

/// Strip the partition suffix: sda1 -> sda, nvme0n1p1 -> nvme0n1, mmcblk0p2 -> mmcblk0.
fn base_block_device(dev: &str) -> &str {
    if dev.starts_with("nvme") || dev.starts_with("mmcblk") {
        match dev.rsplit_once('p') {
            Some((base, part)) if !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()) => {
                base
            }
            _ => dev,
        }
    } else {
        dev.trim_end_matches(|c: char| c.is_ascii_digit())
    }
}
