//! Atomic file write using the write-rename pattern.
//!
//! Writes data to a temporary file (`{path}.tmp`), calls `sync_all()` to
//! ensure bytes are flushed to persistent storage, then atomically renames
//! the temp file to the final path.  This guarantees that a crash during
//! write cannot corrupt an existing artifact.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Atomically writes `data` to `path` using the write-rename pattern.
///
/// 1. Write to `{path}.tmp`
/// 2. `sync_all()` to flush to disk
/// 3. `rename` temp to final path (atomic on POSIX; near-atomic on Windows)
///
/// If the process crashes during step 1 or 2, the original file at `path`
/// remains untouched.
pub fn atomic_write(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut tmp_path: PathBuf = path.to_path_buf();
    tmp_path.set_extension(match path.extension() {
        Some(ext) => format!("{}.tmp", ext.to_string_lossy()),
        None => "tmp".to_string(),
    });

    // Ensure parent directory exists.
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    // Step 1: Write to temporary file.
    let mut file = File::create(&tmp_path)?;
    file.write_all(data)?;

    // Step 2: Flush to persistent storage.
    file.sync_all()?;

    // Step 3: Atomically rename temp file to final path.
    fs::rename(&tmp_path, path)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Helper to create a unique temp directory for each test.
    fn test_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("trajectory_atomic_write_test_{name}"));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_atomic_write_creates_file() {
        let dir = test_dir("creates_file");
        let path = dir.join("index.cache");

        atomic_write(&path, b"hello world").unwrap();

        let contents = fs::read(&path).unwrap();
        assert_eq!(contents, b"hello world");

        // Temp file should not remain.
        assert!(!dir.join("index.cache.tmp").exists());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_atomic_write_overwrites_existing() {
        let dir = test_dir("overwrites");
        let path = dir.join("index.cache");

        atomic_write(&path, b"version 1").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"version 1");

        atomic_write(&path, b"version 2").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"version 2");

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_atomic_write_creates_parent_dirs() {
        let dir = test_dir("parent_dirs");
        let path = dir.join("nested/deep/index.cache");

        atomic_write(&path, b"nested data").unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"nested data");

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_atomic_write_cleans_leftover_tmp() {
        // A .tmp file left behind by a crashed write must not break the
        // next write.
        let dir = test_dir("leftover_tmp");
        let path = dir.join("index.cache");
        let tmp_path = dir.join("index.cache.tmp");

        fs::write(&path, b"original").unwrap();
        fs::write(&tmp_path, b"partial garbage").unwrap();

        atomic_write(&path, b"new artifact").unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"new artifact");
        assert!(!tmp_path.exists());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_atomic_write_large_data() {
        let dir = test_dir("large_data");
        let path = dir.join("index.cache");

        let data = vec![0xAB_u8; 1024 * 1024];
        atomic_write(&path, &data).unwrap();

        let contents = fs::read(&path).unwrap();
        assert_eq!(contents.len(), 1024 * 1024);
        assert!(contents.iter().all(|&b| b == 0xAB));

        let _ = fs::remove_dir_all(&dir);
    }
}
