//! Error types for mirror-core
//!
//! Only conditions that threaten the database's consistency surface as
//! `Err`; per-entry conversion failures are ordinary outcomes collected in
//! the sync report.

use std::path::PathBuf;

/// Result type for mirror-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in mirror-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A database already exists where `init` would create one
    #[error("A mirror database already exists at {path}")]
    DatabaseExists { path: PathBuf },

    /// The database on disk was written by an incompatible schema version
    #[error("Unsupported database version {found} at {path} (expected {expected})")]
    UnsupportedVersion {
        path: PathBuf,
        found: String,
        expected: String,
    },

    /// The configured source root does not exist
    #[error("Source directory {path} does not exist")]
    SourceMissing { path: PathBuf },

    /// Filesystem error from mirror-fs
    #[error(transparent)]
    Fs(#[from] mirror_fs::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// TOML deserialization error
    #[error(transparent)]
    TomlDe(#[from] toml::de::Error),

    /// TOML serialization error
    #[error(transparent)]
    TomlSer(#[from] toml::ser::Error),

    /// Worker pool construction error
    #[error(transparent)]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl Error {
    /// Whether this error is lock contention from another active sync.
    pub fn is_lock_held(&self) -> bool {
        matches!(self, Self::Fs(mirror_fs::Error::LockHeld { .. }))
    }
}
