//! The sync orchestrator
//!
//! One [`SyncEngine`] owns one mirror database for the duration of a run:
//! acquire the lock, load the database, scan the source, diff, convert
//! under a bounded worker pool, merge outcomes, save once at the end. A run
//! with per-entry failures still completes with a consistent database; only
//! conditions that would corrupt the database abort the run.

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::Serialize;

use mirror_fs::{SyncLock, scan};

use crate::config::MirrorConfig;
use crate::database::MirrorDatabase;
use crate::diff::{PlanEntry, SyncPlan, diff};
use crate::executor::{ConversionExecutor, Outcome};
use crate::filter::FilterRegistry;
use crate::{Error, Result};

/// Aggregate result of one sync run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    /// Artifacts produced or reproduced
    pub converted: usize,
    /// Files already correct in the mirror
    pub unchanged: usize,
    /// Artifacts and records removed
    pub removed: usize,
    /// Files ignored because no filter claims them
    pub skipped: usize,
    /// Entries that failed and will be retried next run
    pub failed: usize,
    /// One message per failure
    pub errors: Vec<String>,
}

impl SyncReport {
    /// Whether the run completed with zero per-entry failures.
    pub fn success(&self) -> bool {
        self.failed == 0
    }
}

/// Orchestrates sync runs for one mirror database.
pub struct SyncEngine {
    database_path: PathBuf,
}

impl SyncEngine {
    /// Create an engine for the database at `database_path`.
    pub fn new(database_path: impl Into<PathBuf>) -> Self {
        Self {
            database_path: database_path.into(),
        }
    }

    /// Path of the database this engine operates on.
    pub fn database_path(&self) -> &Path {
        &self.database_path
    }

    /// Initialize a new mirror: create the mirror root and persist an empty
    /// database into `search_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DatabaseExists`] if the mirror was already
    /// initialized.
    pub fn init(search_dir: &Path, config: MirrorConfig) -> Result<PathBuf> {
        std::fs::create_dir_all(&config.mirror_root)
            .map_err(|e| mirror_fs::Error::io(&config.mirror_root, e))?;
        let path = search_dir.join(MirrorDatabase::file_name(&config.mirror_root));
        MirrorDatabase::create(&path, config)?;
        Ok(path)
    }

    /// Compute what a sync would do, without converting anything.
    pub fn plan(&self) -> Result<(MirrorDatabase, SyncPlan)> {
        let database = MirrorDatabase::load(&self.database_path)?;
        let config = database.config().clone();
        if !config.source_root.exists() {
            return Err(Error::SourceMissing {
                path: config.source_root,
            });
        }

        let registry = FilterRegistry::from_config(&config);
        let plan = diff(&database, scan(&config.source_root), &registry);
        Ok((database, plan))
    }

    /// Run one full sync.
    ///
    /// # Errors
    ///
    /// Fails fast with a lock error if another run is in progress; fails if
    /// the database cannot be loaded or saved or the source root is gone.
    /// Per-entry conversion failures are counted in the report instead.
    pub fn sync(&self) -> Result<SyncReport> {
        let _lock = SyncLock::acquire(&MirrorDatabase::lock_path(&self.database_path))?;

        let mut database = MirrorDatabase::load(&self.database_path)?;
        let config = database.config().clone();
        if !config.source_root.exists() {
            return Err(Error::SourceMissing {
                path: config.source_root,
            });
        }

        tracing::info!(
            "Syncing `{}` into `{}`",
            config.source_root.display(),
            config.mirror_root.display()
        );

        let registry = FilterRegistry::from_config(&config);
        let plan = diff(&database, scan(&config.source_root), &registry);
        let executor = ConversionExecutor::new(&config, &registry);

        // Removals run first and sequentially: a removed file's output path
        // may be reclaimed by a conversion in the same run.
        let (removals, work): (Vec<_>, Vec<_>) = plan
            .entries
            .iter()
            .partition(|entry| matches!(entry, PlanEntry::Remove { .. }));

        let mut outcomes: Vec<Outcome> =
            removals.iter().map(|entry| executor.execute(entry)).collect();

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.effective_jobs())
            .build()?;
        outcomes.extend(
            pool.install(|| {
                work.par_iter()
                    .map(|entry| executor.execute(entry))
                    .collect::<Vec<_>>()
            }),
        );

        let mut report = SyncReport::default();
        for conflict in &plan.conflicts {
            report.failed += 1;
            report.errors.push(format!(
                "{}: output path `{}` is already produced by `{}`",
                conflict.path, conflict.mirror_path, conflict.kept_by
            ));
        }
        for failure in &plan.scan_failures {
            report.failed += 1;
            report.errors.push(failure.clone());
        }

        for outcome in outcomes {
            match outcome {
                Outcome::Converted { record } => {
                    report.converted += 1;
                    database.upsert(record);
                }
                Outcome::Skipped { record } => {
                    report.skipped += 1;
                    database.upsert(record);
                }
                Outcome::Unchanged { path, refreshed } => {
                    report.unchanged += 1;
                    if let Some((size, mtime)) = refreshed {
                        if let Some(record) = database.get_mut(&path) {
                            record.size = size;
                            record.mtime = mtime;
                        }
                    }
                }
                Outcome::Removed { path } => {
                    report.removed += 1;
                    database.remove(&path);
                }
                Outcome::Failed { path, reason } => {
                    report.failed += 1;
                    report.errors.push(format!("{}: {}", path, reason));
                }
            }
        }

        database.save(&self.database_path)?;

        tracing::info!(
            "Sync complete: {} converted, {} unchanged, {} removed, {} skipped, {} failed",
            report.converted,
            report.unchanged,
            report.removed,
            report.skipped,
            report.failed
        );
        Ok(report)
    }
}
