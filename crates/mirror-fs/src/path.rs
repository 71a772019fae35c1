//! Normalized relative path handling
//!
//! Database records are keyed by source-relative paths. To keep the on-disk
//! database stable across platforms, relative paths are normalized to forward
//! slashes internally and converted to platform-native form only at I/O
//! boundaries.

use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A forward-slash-normalized path relative to a mirror's source or mirror
/// root.
///
/// Serializes as a plain string, which makes it usable as a stable record
/// key in the mirror database.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelativePath {
    inner: String,
}

impl RelativePath {
    /// Create a relative path by stripping `root` from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotRelative`] if `path` does not live under `root`.
    pub fn new(root: &Path, path: &Path) -> Result<Self> {
        let stripped = path.strip_prefix(root).map_err(|_| Error::NotRelative {
            path: path.to_path_buf(),
            root: root.to_path_buf(),
        })?;

        let mut parts = Vec::new();
        for component in stripped.components() {
            match component {
                Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
                Component::CurDir => {}
                _ => {
                    return Err(Error::NotRelative {
                        path: path.to_path_buf(),
                        root: root.to_path_buf(),
                    });
                }
            }
        }

        Ok(Self {
            inner: parts.join("/"),
        })
    }

    /// Get the normalized string representation.
    pub fn as_str(&self) -> &str {
        &self.inner
    }

    /// Resolve this path against a root, producing a native path for I/O.
    pub fn join_onto(&self, root: &Path) -> PathBuf {
        let mut out = root.to_path_buf();
        for part in self.inner.split('/') {
            if !part.is_empty() {
                out.push(part);
            }
        }
        out
    }

    /// Get the extension of the final component, if present.
    pub fn extension(&self) -> Option<&str> {
        let name = self.inner.rsplit('/').next()?;
        let idx = name.rfind('.')?;
        if idx == 0 { None } else { Some(&name[idx + 1..]) }
    }

    /// Return a copy with the final component's extension replaced.
    ///
    /// A component without an extension gets one appended.
    pub fn with_extension(&self, extension: &str) -> Self {
        let (dir, name) = match self.inner.rfind('/') {
            Some(idx) => (&self.inner[..=idx], &self.inner[idx + 1..]),
            None => ("", self.inner.as_str()),
        };

        let stem = match name.rfind('.') {
            Some(idx) if idx > 0 => &name[..idx],
            _ => name,
        };

        Self {
            inner: format!("{}{}.{}", dir, stem, extension),
        }
    }
}

impl std::fmt::Display for RelativePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl From<&str> for RelativePath {
    fn from(s: &str) -> Self {
        Self {
            inner: s.replace('\\', "/"),
        }
    }
}

/// Derive a filesystem-safe stem for a mirror's database file from the
/// mirror root path.
///
/// Databases for different mirrors live side by side in a shared search
/// directory; folding the mirror path into the filename keeps them from
/// colliding.
pub fn database_stem(mirror_root: &Path) -> String {
    let stem = mirror_root
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().to_lowercase()),
            _ => None,
        })
        .map(|part| part.replace(['.', ' '], "_"))
        .collect::<Vec<_>>()
        .join("_");

    if stem.is_empty() {
        "mirror".to_string()
    } else {
        stem
    }
}
