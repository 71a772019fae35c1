//! The conversion executor
//!
//! Turns one plan entry into one outcome: an artifact produced through a
//! filter or a verbatim copy, an artifact removed, or a recorded failure.
//! Everything that lands at a final mirror path goes through a temp sibling
//! and a rename, so an interrupted task never leaves a partial artifact
//! visible and a failed task leaves the prior artifact untouched.

use std::fs;
use std::path::Path;

use mirror_fs::{
    RelativePath, copy_atomic, file_stamp, fingerprint_file, prune_empty_dirs, remove_existing,
    temp_sibling,
};

use crate::config::MirrorConfig;
use crate::database::{FileRecord, FilterBinding};
use crate::diff::{ConvertItem, PlanEntry};
use crate::filter::{FilterRegistry, Resolution};

/// Result of executing one plan entry.
#[derive(Debug)]
pub enum Outcome {
    /// An artifact was produced; the record replaces the previous one
    Converted { record: FileRecord },
    /// The file is ignored; the record replaces the previous one
    Skipped { record: FileRecord },
    /// No work; `refreshed` carries a stamp update for the record
    Unchanged {
        path: RelativePath,
        refreshed: Option<(u64, i64)>,
    },
    /// Artifact and record are gone
    Removed { path: RelativePath },
    /// The entry failed; the record is left as it was so the next sync
    /// retries
    Failed { path: RelativePath, reason: String },
}

/// Executes plan entries against the mirror tree.
///
/// Tasks for distinct paths are independent; the executor is shared across
/// worker threads by reference.
pub struct ConversionExecutor<'a> {
    config: &'a MirrorConfig,
    registry: &'a FilterRegistry,
}

impl<'a> ConversionExecutor<'a> {
    pub fn new(config: &'a MirrorConfig, registry: &'a FilterRegistry) -> Self {
        Self { config, registry }
    }

    /// Execute one plan entry.
    pub fn execute(&self, entry: &PlanEntry) -> Outcome {
        match entry {
            PlanEntry::Unchanged { path, refreshed } => Outcome::Unchanged {
                path: path.clone(),
                refreshed: *refreshed,
            },
            PlanEntry::Remove { record } => self.remove(record),
            PlanEntry::Convert(item) => self.convert(item),
        }
    }

    fn remove(&self, record: &FileRecord) -> Outcome {
        if let Some(mirror_path) = &record.mirror_path {
            let artifact = mirror_path.join_onto(&self.config.mirror_root);
            match remove_existing(&artifact) {
                Ok(removed) => {
                    if removed {
                        tracing::debug!("Removed `{}`", artifact.display());
                    }
                    if let Some(parent) = artifact.parent() {
                        prune_empty_dirs(parent, &self.config.mirror_root);
                    }
                }
                Err(e) => {
                    return Outcome::Failed {
                        path: record.path.clone(),
                        reason: e.to_string(),
                    };
                }
            }
        }
        Outcome::Removed {
            path: record.path.clone(),
        }
    }

    fn convert(&self, item: &ConvertItem) -> Outcome {
        let source = item.path.join_onto(&self.config.source_root);

        // The diff may have fingerprinted the source already; don't read it
        // twice.
        let fingerprint = match &item.fingerprint {
            Some(fingerprint) => fingerprint.clone(),
            None => match fingerprint_file(&source) {
                Ok(fingerprint) => fingerprint,
                Err(e) => return self.failed(item, e.to_string()),
            },
        };

        match &item.resolution {
            Resolution::Skip => self.skip(item, fingerprint),
            Resolution::Verbatim => {
                let Some(mirror_path) = &item.mirror_path else {
                    return self.failed(item, "no output path resolved".to_string());
                };
                let dest = mirror_path.join_onto(&self.config.mirror_root);
                if let Err(e) = copy_atomic(&source, &dest) {
                    return self.failed(item, e.to_string());
                }
                self.cleanup_previous(item, mirror_path);
                self.finish(item, fingerprint, FilterBinding::Verbatim, mirror_path, &dest)
            }
            Resolution::Convert { filter, .. } => {
                let Some(descriptor) = self.registry.descriptor(filter) else {
                    return self.failed(item, format!("filter `{}` is not configured", filter));
                };
                let Some(mirror_path) = &item.mirror_path else {
                    return self.failed(item, "no output path resolved".to_string());
                };
                let dest = mirror_path.join_onto(&self.config.mirror_root);
                if let Some(parent) = dest.parent() {
                    if let Err(e) = fs::create_dir_all(parent) {
                        return self.failed(item, e.to_string());
                    }
                }

                let temp = temp_sibling(&dest);
                if let Err(e) = descriptor.run(&source, &temp, self.config.filter_timeout()) {
                    let _ = fs::remove_file(&temp);
                    return self.failed(item, e.to_string());
                }
                if let Err(e) = fs::rename(&temp, &dest) {
                    let _ = fs::remove_file(&temp);
                    return self.failed(item, e.to_string());
                }

                self.cleanup_previous(item, mirror_path);
                self.finish(
                    item,
                    fingerprint,
                    FilterBinding::Converted {
                        name: filter.clone(),
                    },
                    mirror_path,
                    &dest,
                )
            }
        }
    }

    fn skip(&self, item: &ConvertItem, fingerprint: String) -> Outcome {
        // A binding change can leave an artifact from a previous
        // conversion behind; it no longer belongs to this file.
        if let Some(stale) = item.previous.as_ref().and_then(|p| p.mirror_path.as_ref()) {
            let artifact = stale.join_onto(&self.config.mirror_root);
            if let Err(e) = remove_existing(&artifact) {
                return self.failed(item, e.to_string());
            }
            if let Some(parent) = artifact.parent() {
                prune_empty_dirs(parent, &self.config.mirror_root);
            }
        }

        Outcome::Skipped {
            record: FileRecord {
                path: item.path.clone(),
                fingerprint,
                size: item.size,
                mtime: item.mtime,
                binding: FilterBinding::Ignored,
                mirror_path: None,
                mirror_fingerprint: None,
                mirror_mtime: None,
            },
        }
    }

    /// Observe the artifact just produced and build the updated record.
    fn finish(
        &self,
        item: &ConvertItem,
        fingerprint: String,
        binding: FilterBinding,
        mirror_path: &RelativePath,
        dest: &Path,
    ) -> Outcome {
        let mirror_fingerprint = match fingerprint_file(dest) {
            Ok(fingerprint) => fingerprint,
            Err(e) => return self.failed(item, e.to_string()),
        };
        let (_, mirror_mtime) = match file_stamp(dest) {
            Ok(stamp) => stamp,
            Err(e) => return self.failed(item, e.to_string()),
        };

        tracing::debug!("Produced `{}` ({})", mirror_path, item.kind);
        Outcome::Converted {
            record: FileRecord {
                path: item.path.clone(),
                fingerprint,
                size: item.size,
                mtime: item.mtime,
                binding,
                mirror_path: Some(mirror_path.clone()),
                mirror_fingerprint: Some(mirror_fingerprint),
                mirror_mtime: Some(mirror_mtime),
            },
        }
    }

    /// Remove the previous artifact when reconversion moved the output path.
    fn cleanup_previous(&self, item: &ConvertItem, current: &RelativePath) {
        let Some(stale) = item.previous.as_ref().and_then(|p| p.mirror_path.as_ref()) else {
            return;
        };
        if stale == current {
            return;
        }
        let artifact = stale.join_onto(&self.config.mirror_root);
        match remove_existing(&artifact) {
            Ok(_) => {
                if let Some(parent) = artifact.parent() {
                    prune_empty_dirs(parent, &self.config.mirror_root);
                }
            }
            Err(e) => {
                tracing::warn!("Failed to remove stale artifact `{}`: {}", stale, e);
            }
        }
    }

    fn failed(&self, item: &ConvertItem, reason: String) -> Outcome {
        tracing::warn!("Conversion of `{}` failed: {}", item.path, reason);
        Outcome::Failed {
            path: item.path.clone(),
            reason,
        }
    }
}
