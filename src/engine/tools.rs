//! Path, filter, metadata, and timestamp utilities

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::types::Value;
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use crate::error::StoreError;
use crate::utils::config::{MODIFIED_TIME_FORMAT, SCAN_TIME_FORMAT};

/// Extension with a leading dot (`.txt`), or empty. Dotfiles such as `.bashrc` have none.
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default()
}

/// `ls`-style mode string: type char plus three rwx triplets, with setuid/setgid/sticky shown as s/S/t/T.
#[cfg(unix)]
pub fn permission_string(meta: &Metadata) -> String {
    use std::os::unix::fs::{FileTypeExt, PermissionsExt};
    let mode = meta.permissions().mode();
    let ft = meta.file_type();
    let kind = if ft.is_dir() {
        'd'
    } else if ft.is_symlink() {
        'l'
    } else if ft.is_block_device() {
        'b'
    } else if ft.is_char_device() {
        'c'
    } else if ft.is_fifo() {
        'p'
    } else if ft.is_socket() {
        's'
    } else {
        '-'
    };
    mode_bits_string(kind, mode)
}

#[cfg(not(unix))]
pub fn permission_string(meta: &Metadata) -> String {
    let kind = if meta.is_dir() { 'd' } else { '-' };
    let mode = if meta.permissions().readonly() {
        0o444
    } else {
        0o666
    };
    mode_bits_string(kind, mode)
}

/// Render permission bits after a leading type char.
pub fn mode_bits_string(kind: char, mode: u32) -> String {
    let mut s = String::with_capacity(10);
    s.push(kind);
    let special = [(0o4000, 's', 'S'), (0o2000, 's', 'S'), (0o1000, 't', 'T')];
    for (i, shift) in [6u32, 3, 0].into_iter().enumerate() {
        let bits = (mode >> shift) & 0o7;
        s.push(if bits & 0o4 != 0 { 'r' } else { '-' });
        s.push(if bits & 0o2 != 0 { 'w' } else { '-' });
        let (flag, set_exec, set_noexec) = special[i];
        let exec = bits & 0o1 != 0;
        s.push(match (mode & flag != 0, exec) {
            (true, true) => set_exec,
            (true, false) => set_noexec,
            (false, true) => 'x',
            (false, false) => '-',
        });
    }
    s
}

/// Filesystem mtime truncated to whole seconds (UTC). Unavailable mtimes map to the epoch.
pub fn modified_time(meta: &Metadata) -> DateTime<Utc> {
    let secs = meta
        .modified()
        .ok()
        .and_then(|t| match t.duration_since(UNIX_EPOCH) {
            Ok(d) => i64::try_from(d.as_secs()).ok(),
            Err(e) => i64::try_from(e.duration().as_secs()).ok().map(|s| -s),
        })
        .unwrap_or(0);
    DateTime::from_timestamp(secs, 0).unwrap_or_default()
}

/// Current instant truncated to microseconds (the precision the store keeps).
pub fn scan_instant() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp_micros(now.timestamp_micros()).unwrap_or(now)
}

pub fn format_scan_time(t: &DateTime<Utc>) -> String {
    t.format(SCAN_TIME_FORMAT).to_string()
}

pub fn format_modified_time(t: &DateTime<Utc>) -> String {
    t.format(MODIFIED_TIME_FORMAT).to_string()
}

/// Parse a stored scan instant or mtime. Both formats are accepted (`%.f` tolerates no fraction).
pub fn parse_stored_time(s: &str) -> Result<DateTime<Utc>, StoreError> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .map(|n| n.and_utc())
        .map_err(|_| StoreError::Timestamp(s.to_string()))
}

/// Store key for a path. UTF-8 paths are stored as TEXT; anything else as a BLOB of the raw
/// OS bytes, so distinct names never share a key.
pub fn path_to_db_key(path: &Path) -> Value {
    match path.to_str() {
        Some(s) => Value::Text(s.to_string()),
        None => Value::Blob(os_path_bytes(path)),
    }
}

/// Inverse of [`path_to_db_key`].
pub fn path_from_db_key(value: Value) -> Result<PathBuf, StoreError> {
    match value {
        Value::Text(s) => Ok(PathBuf::from(s)),
        Value::Blob(bytes) => os_path_from_bytes(bytes),
        other => Err(StoreError::PathKey(format!("{:?}", other.data_type()))),
    }
}

#[cfg(unix)]
fn os_path_bytes(path: &Path) -> Vec<u8> {
    use std::os::unix::ffi::OsStrExt;
    path.as_os_str().as_bytes().to_vec()
}

#[cfg(unix)]
fn os_path_from_bytes(bytes: Vec<u8>) -> Result<PathBuf, StoreError> {
    use std::ffi::OsString;
    use std::os::unix::ffi::OsStringExt;
    Ok(PathBuf::from(OsString::from_vec(bytes)))
}

/// UTF-16 code units, little-endian.
#[cfg(windows)]
fn os_path_bytes(path: &Path) -> Vec<u8> {
    use std::os::windows::ffi::OsStrExt;
    path.as_os_str()
        .encode_wide()
        .flat_map(u16::to_le_bytes)
        .collect()
}

#[cfg(windows)]
fn os_path_from_bytes(bytes: Vec<u8>) -> Result<PathBuf, StoreError> {
    use std::ffi::OsString;
    use std::os::windows::ffi::OsStringExt;
    if bytes.len() % 2 != 0 {
        return Err(StoreError::PathKey("odd-length wide path".to_string()));
    }
    let wide: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .collect();
    Ok(PathBuf::from(OsString::from_wide(&wide)))
}

#[cfg(not(any(unix, windows)))]
fn os_path_bytes(path: &Path) -> Vec<u8> {
    path.to_string_lossy().into_owned().into_bytes()
}

#[cfg(not(any(unix, windows)))]
fn os_path_from_bytes(bytes: Vec<u8>) -> Result<PathBuf, StoreError> {
    String::from_utf8(bytes)
        .map(PathBuf::from)
        .map_err(|e| StoreError::PathKey(e.to_string()))
}

/// Returns true if the path should be scanned: not the root itself, not one of our own
/// output files (store, WAL/SHM, fault log), not matching an exclude glob.
pub fn should_include_in_walk(
    path: &Path,
    root: &Path,
    own_files: &[PathBuf],
    exclude_patterns: &[String],
) -> bool {
    if path == root {
        return false;
    }
    if own_files.iter().any(|f| f == path) {
        return false;
    }
    if exclude_patterns.is_empty() {
        return true;
    }
    let name = match path.file_name().and_then(|n| n.to_str()) {
        Some(n) => n,
        None => return true,
    };
    let path_str = path.to_str().unwrap_or("");
    !exclude_patterns
        .iter()
        .any(|pattern| glob_match(pattern, name) || glob_match(pattern, path_str))
}

/// Simple glob pattern matching (supports * and ?)
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern = pattern.strip_prefix('!').unwrap_or(pattern);
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    glob_match_chars(&p, &t)
}

fn glob_match_chars(p: &[char], t: &[char]) -> bool {
    match p.split_first() {
        None => t.is_empty(),
        Some(('*', rest)) => {
            if rest.is_empty() {
                return true; // trailing * matches everything
            }
            (0..=t.len()).any(|i| glob_match_chars(rest, &t[i..]))
        }
        Some(('?', rest)) => !t.is_empty() && glob_match_chars(rest, &t[1..]),
        Some((c, rest)) => t.first() == Some(c) && glob_match_chars(rest, &t[1..]),
    }
}

/// Store file plus its SQLite side files, and the fault log: canonical paths to keep out of the walk.
/// Files that do not exist yet are resolved through their parent directory.
pub fn own_output_files(db_path: Option<&Path>, log_path: Option<&Path>) -> Vec<PathBuf> {
    let mut out = Vec::new();
    if let Some(db) = db_path {
        let name = db
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let parent = db.parent().unwrap_or(Path::new("."));
        for suffix in ["", "-wal", "-shm", "-journal"] {
            out.extend(canonical_maybe_missing(
                &parent.join(format!("{name}{suffix}")),
            ));
        }
    }
    if let Some(log) = log_path {
        out.extend(canonical_maybe_missing(log));
    }
    out
}

fn canonical_maybe_missing(path: &Path) -> Option<PathBuf> {
    if let Ok(p) = path.canonicalize() {
        return Some(p);
    }
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let name = path.file_name()?;
    parent.canonicalize().ok().map(|p| p.join(name))
}

/// True if the process is running with effective uid 0 (e.g. via sudo).
#[cfg(unix)]
pub fn running_as_root() -> bool {
    unsafe { libc::geteuid() == 0 }
}

#[cfg(not(unix))]
pub fn running_as_root() -> bool {
    false
}

/// Canonicalize the scan root and make sure it is a readable directory.
/// Failure here is fatal for the run.
pub fn check_root_and_canonicalize(path: &Path) -> Result<PathBuf> {
    let root = path
        .canonicalize()
        .with_context(|| format!("canonicalize scan root {}", path.display()))?;
    let meta = std::fs::metadata(&root)
        .with_context(|| format!("read scan root metadata {}", root.display()))?;
    if !meta.is_dir() {
        anyhow::bail!("scan root is not a directory: {}", root.display());
    }
    std::fs::read_dir(&root).with_context(|| format!("read scan root {}", root.display()))?;
    Ok(root)
}
