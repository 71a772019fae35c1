//! Per-file sync records

use mirror_fs::RelativePath;
use serde::{Deserialize, Serialize};

/// How a source file's mirror artifact was (or was not) produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FilterBinding {
    /// No filter claimed the extension; the file was copied byte-for-byte
    Verbatim,
    /// No filter claimed the extension and unmatched files are skipped
    Ignored,
    /// A filter produced the artifact
    Converted {
        /// The configured filter executable reference
        name: String,
    },
}

/// Sync metadata for one source-relative path.
///
/// Created when a source file is first seen and successfully handled,
/// updated when its content or resolved filter changes, deleted when the
/// source file disappears and its artifact has been removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Source path relative to the source root; unique within a mirror
    pub path: RelativePath,
    /// Fingerprint of the source contents as last converted
    pub fingerprint: String,
    /// Source size in bytes as last observed
    pub size: u64,
    /// Source mtime (Unix seconds) as last observed
    pub mtime: i64,
    /// Artifact path relative to the mirror root; `None` for ignored files.
    /// Unique within a mirror database when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mirror_path: Option<RelativePath>,
    /// Fingerprint of the artifact as last produced
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mirror_fingerprint: Option<String>,
    /// Artifact mtime (Unix seconds) as last produced
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mirror_mtime: Option<i64>,
    /// How the artifact was produced
    pub binding: FilterBinding,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FileRecord {
        FileRecord {
            path: RelativePath::from("albums/track.flac"),
            fingerprint: "sha256:aa".to_string(),
            size: 10,
            mtime: 1_700_000_000,
            binding: FilterBinding::Converted {
                name: "mp3ify".to_string(),
            },
            mirror_path: Some(RelativePath::from("albums/track.mp3")),
            mirror_fingerprint: Some("sha256:bb".to_string()),
            mirror_mtime: Some(1_700_000_001),
        }
    }

    #[test]
    fn binding_is_tagged_in_toml() {
        let toml = toml::to_string(&sample()).unwrap();
        assert!(toml.contains("kind = \"converted\""));
        assert!(toml.contains("name = \"mp3ify\""));
    }

    #[test]
    fn ignored_record_omits_mirror_fields() {
        let record = FileRecord {
            binding: FilterBinding::Ignored,
            mirror_path: None,
            mirror_fingerprint: None,
            mirror_mtime: None,
            ..sample()
        };
        let toml = toml::to_string(&record).unwrap();
        assert!(!toml.contains("mirror_path"));
        assert!(toml.contains("kind = \"ignored\""));
    }

    #[test]
    fn round_trips_through_toml() {
        let record = sample();
        let serialized = toml::to_string(&record).unwrap();
        let deserialized: FileRecord = toml::from_str(&serialized).unwrap();
        assert_eq!(deserialized, record);
    }
}
