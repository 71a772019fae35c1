//! Init command implementation
//!
//! Binds a source tree to a mirror tree and persists a fresh, empty
//! database for it.

use std::fs;
use std::path::Path;

use colored::Colorize;

use mirror_core::{MirrorConfig, SyncEngine};

use crate::error::{CliError, Result};

/// Options carried from the command line into the new mirror's config.
pub struct InitOptions {
    pub skip_unmatched: bool,
    pub jobs: Option<usize>,
    pub timeout_secs: Option<u64>,
}

/// Run the init command
pub fn run_init(
    dir: &Path,
    source: &Path,
    mirror: &Path,
    filters: &[String],
    options: InitOptions,
) -> Result<()> {
    if !source.is_dir() {
        return Err(CliError::user(format!(
            "Source directory `{}` does not exist",
            source.display()
        )));
    }

    // Roots are stored canonicalized so later syncs work from any
    // working directory.
    let source = fs::canonicalize(source)?;
    fs::create_dir_all(mirror)?;
    let mirror = fs::canonicalize(mirror)?;

    if mirror.starts_with(&source) {
        return Err(CliError::user(format!(
            "Mirror directory `{}` must not live inside the source",
            mirror.display()
        )));
    }

    let mut config = MirrorConfig::new(source.clone(), mirror.clone(), filters.to_vec());
    config.skip_unmatched = options.skip_unmatched;
    config.jobs = options.jobs;
    config.filter_timeout_secs = options.timeout_secs;

    let database = SyncEngine::init(dir, config)?;

    println!(
        "{} Initialized mirror `{}` -> `{}`",
        "OK".green().bold(),
        source.display(),
        mirror.display()
    );
    if !filters.is_empty() {
        println!("   Filters: {}", filters.join(", ").yellow());
    }
    println!("   Database: {}", database.display());
    println!("Run {} to populate the mirror.", "mirror sync".cyan());

    Ok(())
}
