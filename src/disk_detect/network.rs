/// Check if filesystem type indicates network storage
#[inline]
pub(crate) fn is_network_fs(fs_type: &str) -> bool {
    let fs = fs_type.to_lowercase();
    ["nfs", "smb", "cifs", "afp", "webdav", "sshfs", "9p"]
        .iter()
        .any(|n| fs.contains(n))
}

/// Check if mount point indicates network path (UNC or `//host/share`)
#[inline]
#[cfg_attr(not(target_os = "windows"), allow(dead_code))]
pub(crate) fn is_network_mount(mount: &str) -> bool {
    mount.starts_with("\\\\") || mount.starts_with("//")
}
