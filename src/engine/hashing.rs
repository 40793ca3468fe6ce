//! File hashing utilities

use blake3::Hasher;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::ScanError;
use crate::utils::config::HashingConsts;

/// Hash an already-open file with blake3 and return the lowercase hex digest.
/// Always streams: `size` (from the earlier stat) only sizes the buffer, so a file that
/// shrinks or grows while we read is hashed as it is read, never faulted on.
pub fn hash_reader(mut file: File, size: u64, path: &Path) -> Result<String, ScanError> {
    let chunk = usize::try_from(size)
        .unwrap_or(usize::MAX)
        .clamp(1, HashingConsts::HASH_READ_CHUNK_SIZE);
    let mut buffer = vec![0u8; chunk];
    let mut hasher = Hasher::new();
    loop {
        let n = match file.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(source) => {
                return Err(ScanError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        hasher.update(&buffer[..n]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}

/// Open `path` and hash it. Open failures map to [`ScanError::Open`], read failures to [`ScanError::Read`].
pub fn hash_file(path: &Path, size: u64) -> Result<String, ScanError> {
    let file = File::open(path).map_err(|source| ScanError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    hash_reader(file, size, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn digest_is_64_lowercase_hex_and_matches_blake3() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"hi").unwrap();
        let h = hash_file(f.path(), 2).unwrap();
        assert_eq!(h.len(), 64);
        assert!(h.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(h, blake3::hash(b"hi").to_hex().to_string());
    }

    #[test]
    fn same_content_same_digest() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        std::fs::write(&a, b"content").unwrap();
        std::fs::write(&b, b"content").unwrap();
        assert_eq!(hash_file(&a, 7).unwrap(), hash_file(&b, 7).unwrap());
    }

    #[test]
    fn missing_file_is_open_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = hash_file(&dir.path().join("nope"), 0).unwrap_err();
        assert!(matches!(err, ScanError::Open { .. }));
        assert!(err.to_string().starts_with("OPEN ERROR: "));
    }

    #[test]
    fn stale_size_still_hashes_what_is_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("rotated.log");
        std::fs::write(&p, b"after truncation").unwrap();
        let claimed = 200 * 1024 * 1024;
        assert_eq!(
            hash_file(&p, claimed).unwrap(),
            blake3::hash(b"after truncation").to_hex().to_string()
        );
        // Grown past the stat size: the tail is still hashed.
        assert_eq!(
            hash_file(&p, 3).unwrap(),
            blake3::hash(b"after truncation").to_hex().to_string()
        );
    }

    #[test]
    fn multi_chunk_file_matches_one_shot_digest() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("big.bin");
        let data: Vec<u8> = (0..HashingConsts::HASH_READ_CHUNK_SIZE * 2 + 17)
            .map(|i| (i % 251) as u8)
            .collect();
        std::fs::write(&p, &data).unwrap();
        assert_eq!(
            hash_file(&p, data.len() as u64).unwrap(),
            blake3::hash(&data).to_hex().to_string()
        );
    }

    #[test]
    fn empty_file_hashes() {
        let f = tempfile::NamedTempFile::new().unwrap();
        assert_eq!(
            hash_file(f.path(), 0).unwrap(),
            blake3::hash(b"").to_hex().to_string()
        );
    }
}
