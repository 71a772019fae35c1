//! Mirror configuration
//!
//! One `MirrorConfig` identifies one mirror: where to read, where to write,
//! and which filters to consult in which order. It is created at `init`
//! time, embedded in the database, and immutable afterwards.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for one mirror.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MirrorConfig {
    /// Root of the tree to mirror
    pub source_root: PathBuf,
    /// Root of the derived tree
    pub mirror_root: PathBuf,
    /// Filter executables, in precedence order
    pub filters: Vec<String>,
    /// Skip files no filter claims instead of copying them verbatim
    #[serde(default)]
    pub skip_unmatched: bool,
    /// Conversion worker pool size; defaults to available parallelism
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jobs: Option<usize>,
    /// Wall-clock limit for a single filter invocation, in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_timeout_secs: Option<u64>,
}

impl MirrorConfig {
    /// Create a configuration with default options.
    pub fn new(source_root: PathBuf, mirror_root: PathBuf, filters: Vec<String>) -> Self {
        Self {
            source_root,
            mirror_root,
            filters,
            skip_unmatched: false,
            jobs: None,
            filter_timeout_secs: None,
        }
    }

    /// The worker pool size to use for conversions.
    pub fn effective_jobs(&self) -> usize {
        self.jobs.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }

    /// The per-invocation filter timeout, if configured.
    pub fn filter_timeout(&self) -> Option<Duration> {
        self.filter_timeout_secs.map(Duration::from_secs)
    }
}
