//! The persistent mirror database
//!
//! One database file per mirror, holding the mirror's configuration and one
//! [`FileRecord`] per known source path. The database is the unit of
//! persistence: loaded once at the start of a sync run, replaced wholesale
//! at the end via temp-file-plus-rename, never mutated in place on disk.

mod record;

pub use record::{FileRecord, FilterBinding};

use std::fs::{File, OpenOptions};
use std::io::Read;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use serde::{Deserialize, Serialize};

use mirror_fs::{RelativePath, database_stem, write_atomic};

use crate::config::MirrorConfig;
use crate::{Error, Result};

/// Current database schema version
pub const DB_VERSION: &str = "1";

/// Suffix of every mirror database file
pub const DB_SUFFIX: &str = ".mirror.toml";

/// The full sync state of one mirror.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirrorDatabase {
    /// Schema version for forward compatibility
    version: String,
    /// The mirror this database belongs to
    config: MirrorConfig,
    /// One record per known source path
    #[serde(default)]
    records: Vec<FileRecord>,
}

impl MirrorDatabase {
    /// Create an empty database for a freshly initialized mirror.
    pub fn new(config: MirrorConfig) -> Self {
        Self {
            version: DB_VERSION.to_string(),
            config,
            records: Vec::new(),
        }
    }

    /// Create and persist a new database, refusing to clobber an existing
    /// one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DatabaseExists`] if a database file is already
    /// present at `path`.
    pub fn create(path: &Path, config: MirrorConfig) -> Result<Self> {
        if path.exists() {
            return Err(Error::DatabaseExists {
                path: path.to_path_buf(),
            });
        }
        let database = Self::new(config);
        database.save(path)?;
        Ok(database)
    }

    /// Load a database from disk with a shared lock.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if it was
    /// written by an incompatible schema version.
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| mirror_fs::Error::io(path, e))?;
        file.lock_shared()
            .map_err(|e| mirror_fs::Error::io(path, e))?;

        // Read through the locked handle to avoid a TOCTOU race
        let mut content = String::new();
        (&file)
            .read_to_string(&mut content)
            .map_err(|e| mirror_fs::Error::io(path, e))?;
        let database: Self = toml::from_str(&content)?;

        if database.version != DB_VERSION {
            return Err(Error::UnsupportedVersion {
                path: path.to_path_buf(),
                found: database.version,
                expected: DB_VERSION.to_string(),
            });
        }

        Ok(database)
    }

    /// Save the database atomically with an exclusive lock.
    ///
    /// The on-disk file is always either the previous or the new complete
    /// version, never a partial write.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;

        let lock_file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|e| mirror_fs::Error::io(path, e))?;
        lock_file
            .lock_exclusive()
            .map_err(|e| mirror_fs::Error::io(path, e))?;

        write_atomic(path, content.as_bytes())?;

        // Lock released when lock_file is dropped
        Ok(())
    }

    /// The mirror configuration this database belongs to.
    pub fn config(&self) -> &MirrorConfig {
        &self.config
    }

    /// All records, in insertion order.
    pub fn records(&self) -> &[FileRecord] {
        &self.records
    }

    /// Look up the record for a source-relative path.
    pub fn get(&self, path: &RelativePath) -> Option<&FileRecord> {
        self.records.iter().find(|r| &r.path == path)
    }

    /// Mutable lookup for a source-relative path.
    pub fn get_mut(&mut self, path: &RelativePath) -> Option<&mut FileRecord> {
        self.records.iter_mut().find(|r| &r.path == path)
    }

    /// Insert a record, replacing any existing record for the same path.
    pub fn upsert(&mut self, record: FileRecord) {
        match self.records.iter_mut().find(|r| r.path == record.path) {
            Some(existing) => *existing = record,
            None => self.records.push(record),
        }
    }

    /// Remove the record for a path, returning it if present.
    pub fn remove(&mut self, path: &RelativePath) -> Option<FileRecord> {
        let pos = self.records.iter().position(|r| &r.path == path)?;
        Some(self.records.remove(pos))
    }

    /// The database file name for a mirror rooted at `mirror_root`.
    pub fn file_name(mirror_root: &Path) -> String {
        format!("{}{}", database_stem(mirror_root), DB_SUFFIX)
    }

    /// The lock file colocated with a database file.
    pub fn lock_path(database_path: &Path) -> PathBuf {
        let mut name = database_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        name.push_str(".lock");
        database_path.with_file_name(name)
    }

    /// Find all mirror database files in a search directory, sorted.
    pub fn discover(dir: &Path) -> Result<Vec<PathBuf>> {
        let mut found = Vec::new();
        let entries = std::fs::read_dir(dir).map_err(|e| mirror_fs::Error::io(dir, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| mirror_fs::Error::io(dir, e))?;
            let name = entry.file_name();
            if name.to_string_lossy().ends_with(DB_SUFFIX) && entry.path().is_file() {
                found.push(entry.path());
            }
        }
        found.sort();
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn sample_config() -> MirrorConfig {
        MirrorConfig::new(
            PathBuf::from("/music"),
            PathBuf::from("/mirror"),
            vec!["mp3ify".to_string()],
        )
    }

    fn sample_record(path: &str) -> FileRecord {
        FileRecord {
            path: RelativePath::from(path),
            fingerprint: "sha256:aa".to_string(),
            size: 1,
            mtime: 1,
            binding: FilterBinding::Verbatim,
            mirror_path: Some(RelativePath::from(path)),
            mirror_fingerprint: Some("sha256:aa".to_string()),
            mirror_mtime: Some(1),
        }
    }

    #[test]
    fn new_database_has_current_version() {
        let database = MirrorDatabase::new(sample_config());
        assert_eq!(database.version, DB_VERSION);
        assert!(database.records().is_empty());
    }

    #[test]
    fn create_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("music.mirror.toml");

        let mut database = MirrorDatabase::create(&path, sample_config()).unwrap();
        database.upsert(sample_record("a.flac"));
        database.save(&path).unwrap();

        let loaded = MirrorDatabase::load(&path).unwrap();
        assert_eq!(loaded.records().len(), 1);
        assert_eq!(loaded.config(), &sample_config());
    }

    #[test]
    fn create_refuses_existing_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("music.mirror.toml");

        MirrorDatabase::create(&path, sample_config()).unwrap();
        let second = MirrorDatabase::create(&path, sample_config());

        assert!(matches!(second, Err(Error::DatabaseExists { .. })));
    }

    #[test]
    fn load_rejects_unknown_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("music.mirror.toml");

        let mut database = MirrorDatabase::new(sample_config());
        database.version = "99".to_string();
        database.save(&path).unwrap();

        let result = MirrorDatabase::load(&path);
        assert!(matches!(result, Err(Error::UnsupportedVersion { .. })));
    }

    #[test]
    fn save_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("music.mirror.toml");

        MirrorDatabase::new(sample_config()).save(&path).unwrap();

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["music.mirror.toml"]);
    }

    #[test]
    fn upsert_replaces_by_path() {
        let mut database = MirrorDatabase::new(sample_config());
        database.upsert(sample_record("a.flac"));

        let mut updated = sample_record("a.flac");
        updated.fingerprint = "sha256:bb".to_string();
        database.upsert(updated);

        assert_eq!(database.records().len(), 1);
        assert_eq!(database.records()[0].fingerprint, "sha256:bb");
    }

    #[test]
    fn remove_returns_record() {
        let mut database = MirrorDatabase::new(sample_config());
        database.upsert(sample_record("a.flac"));

        let removed = database.remove(&RelativePath::from("a.flac"));
        assert!(removed.is_some());
        assert!(database.records().is_empty());
        assert!(database.remove(&RelativePath::from("a.flac")).is_none());
    }

    #[test]
    fn file_name_includes_suffix() {
        let name = MirrorDatabase::file_name(Path::new("/media/music"));
        assert_eq!(name, "media_music.mirror.toml");
    }

    #[test]
    fn lock_path_is_colocated() {
        let lock = MirrorDatabase::lock_path(Path::new("/work/music.mirror.toml"));
        assert_eq!(lock, PathBuf::from("/work/music.mirror.toml.lock"));
    }

    #[test]
    fn discover_finds_only_databases() {
        let dir = tempfile::tempdir().unwrap();
        MirrorDatabase::new(sample_config())
            .save(&dir.path().join("a.mirror.toml"))
            .unwrap();
        MirrorDatabase::new(sample_config())
            .save(&dir.path().join("b.mirror.toml"))
            .unwrap();
        std::fs::write(dir.path().join("notes.toml"), "x = 1").unwrap();
        std::fs::create_dir(dir.path().join("sub.mirror.toml.d")).unwrap();

        let found = MirrorDatabase::discover(dir.path()).unwrap();
        let names: Vec<_> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.mirror.toml", "b.mirror.toml"]);
    }
}
