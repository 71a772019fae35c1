//! Atomic I/O operations
//!
//! Everything that becomes visible in a mirror tree or a database file goes
//! through write-to-temp-then-rename: the temp sibling lives in the target's
//! directory (same filesystem), so the rename is atomic and a crash never
//! leaves a partially written artifact at a final path.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::{Error, Result};

/// Process-wide counter folded into temp names so concurrent conversion
/// tasks never collide on intermediate files.
static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a unique dot-prefixed temp path in the same directory as `path`.
pub fn temp_sibling(path: &Path) -> PathBuf {
    let seq = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    let name = format!(
        ".{}.{}-{}.tmp",
        path.file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default(),
        std::process::id(),
        seq
    );
    path.with_file_name(name)
}

/// Write content atomically to a file.
///
/// Creates parent directories as needed, writes to a temp sibling, flushes,
/// and renames into place.
pub fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }

    let temp_path = temp_sibling(path);
    let mut temp_file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&temp_path)
        .map_err(|e| Error::io(&temp_path, e))?;

    temp_file
        .write_all(content)
        .map_err(|e| Error::io(&temp_path, e))?;
    temp_file
        .sync_all()
        .map_err(|e| Error::io(&temp_path, e))?;
    drop(temp_file);

    fs::rename(&temp_path, path).map_err(|e| Error::io(path, e))?;
    Ok(())
}

/// Copy `src` to `dst` byte-for-byte, atomically.
///
/// The copy lands in a temp sibling of `dst` and is renamed into place on
/// success, so a crash mid-copy never leaves a partial file at `dst`.
pub fn copy_atomic(src: &Path, dst: &Path) -> Result<()> {
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }

    let temp_path = temp_sibling(dst);
    if let Err(e) = fs::copy(src, &temp_path) {
        let _ = fs::remove_file(&temp_path);
        return Err(Error::io(src, e));
    }

    fs::rename(&temp_path, dst).map_err(|e| Error::io(dst, e))?;
    Ok(())
}

/// Remove a file, tolerating "already absent".
///
/// Returns `true` if a file was actually removed.
pub fn remove_existing(path: &Path) -> Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(Error::io(path, e)),
    }
}

/// Remove directories left empty by artifact removal, walking up from
/// `start` until `stop` (exclusive) or the first non-empty directory.
pub fn prune_empty_dirs(start: &Path, stop: &Path) {
    let mut current = start;
    while current != stop && current.starts_with(stop) {
        // remove_dir fails on non-empty directories, which ends the walk
        if fs::remove_dir(current).is_err() {
            break;
        }
        match current.parent() {
            Some(parent) => current = parent,
            None => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_siblings_are_unique_and_colocated() {
        let target = Path::new("/mirror/albums/track.mp3");
        let a = temp_sibling(target);
        let b = temp_sibling(target);
        assert_ne!(a, b);
        assert_eq!(a.parent(), target.parent());
        assert!(a.file_name().unwrap().to_string_lossy().starts_with('.'));
    }

    #[test]
    fn write_atomic_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.txt");

        write_atomic(&path, b"content").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "content");
        let siblings: Vec<_> = std::fs::read_dir(path.parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(siblings.len(), 1);
    }

    #[test]
    fn copy_atomic_copies_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src.bin");
        let dst = dir.path().join("sub").join("dst.bin");
        std::fs::write(&src, b"payload").unwrap();

        copy_atomic(&src, &dst).unwrap();

        assert_eq!(std::fs::read(&dst).unwrap(), b"payload");
    }

    #[test]
    fn copy_atomic_missing_source_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let dst = dir.path().join("dst.bin");

        let result = copy_atomic(&dir.path().join("absent"), &dst);

        assert!(result.is_err());
        assert!(!dst.exists());
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert!(leftovers.is_empty(), "leftovers: {:?}", leftovers);
    }

    #[test]
    fn remove_existing_tolerates_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("file");
        std::fs::write(&path, b"x").unwrap();

        assert!(remove_existing(&path).unwrap());
        assert!(!remove_existing(&path).unwrap());
    }

    #[test]
    fn prune_stops_at_root_and_non_empty() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let deep = root.join("a").join("b").join("c");
        std::fs::create_dir_all(&deep).unwrap();
        std::fs::write(root.join("a").join("keep.txt"), b"x").unwrap();

        prune_empty_dirs(&deep, root);

        assert!(!root.join("a").join("b").exists());
        assert!(root.join("a").exists(), "non-empty dir must survive");
        assert!(root.exists());
    }
}
