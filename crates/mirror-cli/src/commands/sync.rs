//! Sync command implementation
//!
//! Discovers every mirror database in the search directory and runs the
//! engine on each. Per-mirror failures never stop the remaining mirrors;
//! they only shape the exit code.

use std::path::Path;

use colored::Colorize;

use mirror_core::{MirrorDatabase, SyncEngine, SyncReport};

use crate::error::{CliError, Result};

/// Run the sync command
pub fn run_sync(dir: &Path, json: bool) -> Result<()> {
    let databases = MirrorDatabase::discover(dir)?;
    if databases.is_empty() {
        println!(
            "No mirror databases found in `{}`. Run {} first.",
            dir.display(),
            "mirror init".cyan()
        );
        return Ok(());
    }

    let mut failures = 0;
    let mut fatal = 0;
    let mut lock_contended = false;
    let mut results = Vec::new();

    for database in &databases {
        if !json {
            println!(
                "{} Syncing mirror `{}`...",
                "=>".blue().bold(),
                database.display()
            );
        }

        match SyncEngine::new(database).sync() {
            Ok(report) => {
                failures += report.failed;
                if !json {
                    print_report(&report);
                }
                results.push(serde_json::json!({
                    "database": database.display().to_string(),
                    "report": report,
                }));
            }
            Err(e) if e.is_lock_held() => {
                lock_contended = true;
                if !json {
                    println!("   {} {}", "!".red(), e);
                }
                results.push(serde_json::json!({
                    "database": database.display().to_string(),
                    "error": e.to_string(),
                }));
            }
            Err(e) => {
                fatal += 1;
                if !json {
                    println!("   {} {}", "!".red(), e);
                }
                results.push(serde_json::json!({
                    "database": database.display().to_string(),
                    "error": e.to_string(),
                }));
            }
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    }

    if fatal > 0 {
        return Err(CliError::user(format!("{} mirror(s) failed to sync", fatal)));
    }
    if failures > 0 {
        return Err(CliError::ConversionsFailed { failures });
    }
    if lock_contended {
        return Err(CliError::LockContended);
    }
    Ok(())
}

fn print_report(report: &SyncReport) {
    if report.success() {
        println!(
            "{} {} converted, {} unchanged, {} removed, {} skipped",
            "OK".green().bold(),
            report.converted,
            report.unchanged,
            report.removed,
            report.skipped
        );
    } else {
        println!(
            "{} {} converted, {} unchanged, {} removed, {} skipped, {} failed",
            "FAILED".red().bold(),
            report.converted,
            report.unchanged,
            report.removed,
            report.skipped,
            report.failed
        );
        for error in &report.errors {
            println!("   {} {}", "!".red(), error);
        }
    }
}
