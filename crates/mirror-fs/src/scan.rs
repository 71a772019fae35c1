//! Source tree scanning
//!
//! Walks a directory tree and yields one entry per regular file with the
//! metadata the diff engine needs: relative path, size and modification
//! time. Unreadable entries surface as per-entry errors so one bad file
//! never aborts a whole traversal.

use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use walkdir::WalkDir;

use crate::path::RelativePath;
use crate::{Error, Result};

/// One regular file observed under a scan root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanEntry {
    /// Path relative to the scan root
    pub path: RelativePath,
    /// File size in bytes
    pub size: u64,
    /// Modification time, Unix seconds
    pub mtime: i64,
}

/// Lazy iterator over the regular files under a root.
///
/// Directories are not emitted and symbolic links are not followed. The
/// traversal is sorted by file name, so scan order is deterministic.
pub struct Scanner {
    root: PathBuf,
    walker: walkdir::IntoIter,
}

impl Iterator for Scanner {
    type Item = Result<ScanEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.walker.next()? {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e
                        .path()
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| self.root.clone());
                    let source = e
                        .into_io_error()
                        .unwrap_or_else(|| std::io::Error::other("directory loop"));
                    tracing::warn!("Unreadable entry at {}: {}", path.display(), source);
                    return Some(Err(Error::Scan { path, source }));
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let full_path = entry.path();
            let metadata = match entry.metadata() {
                Ok(metadata) => metadata,
                Err(e) => {
                    let source = e
                        .into_io_error()
                        .unwrap_or_else(|| std::io::Error::other("metadata unavailable"));
                    return Some(Err(Error::Scan {
                        path: full_path.to_path_buf(),
                        source,
                    }));
                }
            };

            let path = match RelativePath::new(&self.root, full_path) {
                Ok(path) => path,
                Err(e) => return Some(Err(e)),
            };

            return Some(Ok(ScanEntry {
                path,
                size: metadata.len(),
                mtime: unix_mtime(&metadata),
            }));
        }
    }
}

/// Scan the tree rooted at `root`.
///
/// Re-invoking `scan` always reflects the current on-disk state.
pub fn scan(root: &Path) -> Scanner {
    Scanner {
        root: root.to_path_buf(),
        walker: WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter(),
    }
}

/// Observe a file's current (size, mtime) without reading its contents.
pub fn file_stamp(path: &Path) -> Result<(u64, i64)> {
    let metadata = std::fs::metadata(path).map_err(|e| Error::io(path, e))?;
    Ok((metadata.len(), unix_mtime(&metadata)))
}

fn unix_mtime(metadata: &Metadata) -> i64 {
    match metadata.modified() {
        Ok(modified) => match modified.duration_since(UNIX_EPOCH) {
            Ok(d) => d.as_secs() as i64,
            Err(e) => -(e.duration().as_secs() as i64),
        },
        Err(_) => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(root: &Path) -> Vec<ScanEntry> {
        scan(root).map(|e| e.unwrap()).collect()
    }

    #[test]
    fn emits_files_not_directories() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("albums/live")).unwrap();
        std::fs::write(dir.path().join("track.flac"), b"a").unwrap();
        std::fs::write(dir.path().join("albums/live/intro.wav"), b"bb").unwrap();

        let entries = collect(dir.path());

        let paths: Vec<_> = entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["albums/live/intro.wav", "track.flac"]);
    }

    #[test]
    fn records_size_and_mtime() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), b"12345").unwrap();

        let entries = collect(dir.path());

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].size, 5);
        assert!(entries[0].mtime > 0);
    }

    #[test]
    fn empty_tree_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(collect(dir.path()).is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_are_not_followed() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("real.txt"), b"x").unwrap();
        std::os::unix::fs::symlink(dir.path().join("real.txt"), dir.path().join("link.txt"))
            .unwrap();

        let entries = collect(dir.path());

        let paths: Vec<_> = entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["real.txt"]);
    }

    #[test]
    fn rescan_reflects_changes() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), b"x").unwrap();
        assert_eq!(collect(dir.path()).len(), 1);

        std::fs::write(dir.path().join("b.txt"), b"y").unwrap();
        assert_eq!(collect(dir.path()).len(), 2);
    }

    #[test]
    fn file_stamp_matches_scan() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, b"123").unwrap();

        let (size, mtime) = file_stamp(&path).unwrap();
        let entries = collect(dir.path());
        assert_eq!(size, entries[0].size);
        assert_eq!(mtime, entries[0].mtime);
    }
}
