//! Status command implementation
//!
//! A read-only preview: diffs every mirror against its database and prints
//! what a sync would do, without converting anything.

use std::path::Path;

use colored::Colorize;

use mirror_core::{MirrorDatabase, PlanSummary, SyncEngine};

use crate::error::{CliError, Result};

/// Run the status command
pub fn run_status(dir: &Path, json: bool) -> Result<()> {
    let databases = MirrorDatabase::discover(dir)?;
    if databases.is_empty() {
        println!(
            "No mirror databases found in `{}`. Run {} first.",
            dir.display(),
            "mirror init".cyan()
        );
        return Ok(());
    }

    let mut broken = 0;
    let mut results = Vec::new();

    for database in &databases {
        match SyncEngine::new(database).plan() {
            Ok((_, plan)) => {
                let summary = plan.summary();
                if !json {
                    print_summary(database, &summary);
                }
                results.push(serde_json::json!({
                    "database": database.display().to_string(),
                    "summary": summary,
                }));
            }
            Err(e) => {
                broken += 1;
                if !json {
                    println!(
                        "{} `{}`: {}",
                        "BROKEN".red().bold(),
                        database.display(),
                        e
                    );
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

    if broken > 0 {
        return Err(CliError::user(format!(
            "{} mirror(s) could not be inspected",
            broken
        )));
    }
    Ok(())
}

fn print_summary(database: &Path, summary: &PlanSummary) {
    let pending =
        summary.added + summary.modified + summary.filter_changed + summary.removed;
    if pending == 0 && summary.conflicts == 0 && summary.scan_failures == 0 {
        println!(
            "{} `{}` is up to date ({} files)",
            "OK".green().bold(),
            database.display(),
            summary.unchanged
        );
        return;
    }

    println!(
        "{} `{}` has pending work:",
        "PENDING".yellow().bold(),
        database.display()
    );
    if summary.added > 0 {
        println!("   {} {} added", "+".green(), summary.added);
    }
    if summary.modified > 0 {
        println!("   {} {} modified", "~".yellow(), summary.modified);
    }
    if summary.filter_changed > 0 {
        println!("   {} {} filter changed", "~".yellow(), summary.filter_changed);
    }
    if summary.removed > 0 {
        println!("   {} {} removed", "-".red(), summary.removed);
    }
    if summary.conflicts > 0 {
        println!("   {} {} output conflicts", "!".red(), summary.conflicts);
    }
    if summary.scan_failures > 0 {
        println!("   {} {} unreadable entries", "!".red(), summary.scan_failures);
    }
    println!("Run {} to apply.", "mirror sync".cyan());
}
