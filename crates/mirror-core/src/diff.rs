//! The diff engine
//!
//! Compares a fresh scan of the source tree against the database's previous
//! snapshot and classifies every path: unchanged, added, modified, filter
//! changed, or removed. The diff only reads the database; all mutation
//! happens later, when outcomes are merged.
//!
//! Change detection is timestamp-before-hash: a file whose (mtime, size)
//! match its record is unchanged without re-reading its bytes. When the
//! stamp differs the fingerprint decides: a touched-but-identical file
//! stays unchanged and only its stored stamp is refreshed.

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;

use mirror_fs::{RelativePath, ScanEntry, fingerprint_file};

use crate::database::{FileRecord, MirrorDatabase};
use crate::filter::{FilterRegistry, Resolution};

/// Why a file needs (re)conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// Not present in the database
    Added,
    /// Content fingerprint differs from the record
    Modified,
    /// The resolved filter or output path differs from the record
    FilterChanged,
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Added => write!(f, "added"),
            Self::Modified => write!(f, "modified"),
            Self::FilterChanged => write!(f, "filter changed"),
        }
    }
}

/// One file that needs conversion work.
#[derive(Debug, Clone)]
pub struct ConvertItem {
    /// Source-relative path
    pub path: RelativePath,
    /// Why the work is needed
    pub kind: ChangeKind,
    /// Source size observed by the scan
    pub size: u64,
    /// Source mtime observed by the scan
    pub mtime: i64,
    /// Source fingerprint, when the diff already computed it
    pub fingerprint: Option<String>,
    /// The resolved conversion decision
    pub resolution: Resolution,
    /// Artifact path the resolution produces; `None` for skipped files
    pub mirror_path: Option<RelativePath>,
    /// The prior record, when one exists (stale artifacts get cleaned up)
    pub previous: Option<FileRecord>,
}

/// One classified path in a sync plan.
#[derive(Debug, Clone)]
pub enum PlanEntry {
    /// Nothing to do; `refreshed` carries a new (size, mtime) stamp when
    /// the file was touched without a content change
    Unchanged {
        path: RelativePath,
        refreshed: Option<(u64, i64)>,
    },
    /// Produce (or reproduce) the mirror artifact
    Convert(ConvertItem),
    /// The source file disappeared; drop its artifact and record
    Remove { record: FileRecord },
}

/// Two source files resolving to the same output path.
#[derive(Debug, Clone)]
pub struct Conflict {
    /// The losing source path
    pub path: RelativePath,
    /// The contested output path
    pub mirror_path: RelativePath,
    /// The source path that keeps the output (first in scan order)
    pub kept_by: RelativePath,
}

/// Ephemeral classification of every path touched by one sync run.
///
/// Consumed entirely within one run, never persisted.
#[derive(Debug, Default)]
pub struct SyncPlan {
    /// Every scanned or remembered path, each in exactly one bucket
    pub entries: Vec<PlanEntry>,
    /// Output-path collisions; reported as per-entry failures
    pub conflicts: Vec<Conflict>,
    /// Per-entry scan and fingerprint errors; reported as failures
    pub scan_failures: Vec<String>,
}

/// Bucket counts for one plan, for reports and previews.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PlanSummary {
    pub unchanged: usize,
    pub added: usize,
    pub modified: usize,
    pub filter_changed: usize,
    pub removed: usize,
    pub conflicts: usize,
    pub scan_failures: usize,
}

impl SyncPlan {
    /// Count every bucket.
    pub fn summary(&self) -> PlanSummary {
        let mut summary = PlanSummary {
            conflicts: self.conflicts.len(),
            scan_failures: self.scan_failures.len(),
            ..PlanSummary::default()
        };
        for entry in &self.entries {
            match entry {
                PlanEntry::Unchanged { .. } => summary.unchanged += 1,
                PlanEntry::Convert(item) => match item.kind {
                    ChangeKind::Added => summary.added += 1,
                    ChangeKind::Modified => summary.modified += 1,
                    ChangeKind::FilterChanged => summary.filter_changed += 1,
                },
                PlanEntry::Remove { .. } => summary.removed += 1,
            }
        }
        summary
    }

    /// Whether a sync over this plan would do no work at all.
    pub fn is_noop(&self) -> bool {
        self.conflicts.is_empty()
            && self.scan_failures.is_empty()
            && self.entries.iter().all(|e| {
                matches!(
                    e,
                    PlanEntry::Unchanged {
                        refreshed: None,
                        ..
                    }
                )
            })
    }
}

/// Classify a scan of the source tree against the database snapshot.
pub fn diff<I>(database: &MirrorDatabase, scan: I, registry: &FilterRegistry) -> SyncPlan
where
    I: IntoIterator<Item = mirror_fs::Result<ScanEntry>>,
{
    let source_root = &database.config().source_root;
    let by_path: HashMap<&RelativePath, &FileRecord> =
        database.records().iter().map(|r| (&r.path, r)).collect();

    let mut plan = SyncPlan::default();
    let mut seen = BTreeSet::new();
    let mut claimed: HashMap<RelativePath, RelativePath> = HashMap::new();

    for item in scan {
        let entry = match item {
            Ok(entry) => entry,
            Err(e) => {
                plan.scan_failures.push(e.to_string());
                continue;
            }
        };
        seen.insert(entry.path.clone());

        let resolution = registry.resolve(entry.path.extension());
        let mirror_path = match &resolution {
            Resolution::Convert {
                output_extension, ..
            } => Some(entry.path.with_extension(output_extension)),
            Resolution::Verbatim => Some(entry.path.clone()),
            Resolution::Skip => None,
        };

        // Two sources must never land on the same artifact. First claimant
        // in scan order (which is sorted, hence deterministic) wins.
        if let Some(mirror_path) = &mirror_path {
            if let Some(winner) = claimed.get(mirror_path) {
                tracing::warn!(
                    "`{}` and `{}` both resolve to `{}`; keeping the first",
                    winner,
                    entry.path,
                    mirror_path
                );
                plan.conflicts.push(Conflict {
                    path: entry.path,
                    mirror_path: mirror_path.clone(),
                    kept_by: winner.clone(),
                });
                continue;
            }
            claimed.insert(mirror_path.clone(), entry.path.clone());
        }

        let convert = |kind, fingerprint, previous: Option<&FileRecord>| {
            PlanEntry::Convert(ConvertItem {
                path: entry.path.clone(),
                kind,
                size: entry.size,
                mtime: entry.mtime,
                fingerprint,
                resolution: resolution.clone(),
                mirror_path: mirror_path.clone(),
                previous: previous.cloned(),
            })
        };

        let entry_plan = match by_path.get(&entry.path) {
            None => convert(ChangeKind::Added, None, None),
            Some(&record) => {
                if record.binding != resolution.binding() || record.mirror_path != mirror_path {
                    convert(ChangeKind::FilterChanged, None, Some(record))
                } else if record.size == entry.size && record.mtime == entry.mtime {
                    PlanEntry::Unchanged {
                        path: entry.path.clone(),
                        refreshed: None,
                    }
                } else {
                    match fingerprint_file(&entry.path.join_onto(source_root)) {
                        Err(e) => {
                            plan.scan_failures.push(format!("{}: {}", entry.path, e));
                            continue;
                        }
                        Ok(fingerprint) if fingerprint == record.fingerprint => {
                            PlanEntry::Unchanged {
                                path: entry.path.clone(),
                                refreshed: Some((entry.size, entry.mtime)),
                            }
                        }
                        Ok(fingerprint) => {
                            convert(ChangeKind::Modified, Some(fingerprint), Some(record))
                        }
                    }
                }
            }
        };
        plan.entries.push(entry_plan);
    }

    for record in database.records() {
        if !seen.contains(&record.path) {
            plan.entries.push(PlanEntry::Remove {
                record: record.clone(),
            });
        }
    }

    plan
}
