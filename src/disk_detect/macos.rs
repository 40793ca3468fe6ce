//! macOS drive detection: statfs for network mounts, sysinfo for SSD/HDD.

use super::network::is_network_fs;
use super::{DriveType, containing_disk};
use log::debug;
use std::ffi::{CStr, CString};
use std::mem::MaybeUninit;
use std::path::Path;
use sysinfo::{DiskKind, Disks};

/// Filesystem type name from statfs (catches SMB/NFS/AFP mounts sysinfo misses).
fn statfs_type(path: &Path) -> Option<String> {
    let path_cstr = CString::new(path.to_string_lossy().as_bytes()).ok()?;
    let mut stat: MaybeUninit<libc::statfs> = MaybeUninit::uninit();
    unsafe {
        if libc::statfs(path_cstr.as_ptr(), stat.as_mut_ptr()) != 0 {
            return None;
        }
        let stat = stat.assume_init();
        Some(CStr::from_ptr(stat.f_fstypename.as_ptr()).to_string_lossy().into_owned())
    }
}

pub fn detect(path: &Path) -> DriveType {
    if let Some(fs_type) = statfs_type(path) {
        debug!("macOS statfs: path={}, fs_type={}", path.display(), fs_type);
        if is_network_fs(&fs_type) {
            return DriveType::Network;
        }
    }

    let disks = Disks::new_with_refreshed_list();
    let Some(disk) = containing_disk(&disks, path, |mount| path.starts_with(mount)) else {
        debug!("No disk found for path: {}", path.display());
        return DriveType::Unknown;
    };
    if is_network_fs(&disk.file_system().to_string_lossy()) {
        return DriveType::Network;
    }
    match disk.kind() {
        DiskKind::HDD => DriveType::HDD,
        // Apple hardware since ~2015 ships SSDs; sysinfo reports Unknown for APFS containers
        DiskKind::SSD | DiskKind::Unknown(_) => DriveType::SSD,
    }
}
