//! Mirror Maker CLI
//!
//! The command-line interface for mirroring directory trees through
//! conversion filters.

mod cli;
mod commands;
mod error;

use clap::Parser;
use colored::Colorize;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use cli::{Cli, Commands};
use commands::InitOptions;
use error::Result;

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(e.exit_code());
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    // Setup tracing if verbose
    if cli.verbose {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(Level::DEBUG)
            .with_target(true)
            .finish();
        tracing::subscriber::set_global_default(subscriber)
            .expect("Failed to set tracing subscriber");
        tracing::debug!("Verbose mode enabled");
    }

    match cli.command {
        Some(cmd) => execute_command(cmd),
        None => {
            println!("{} Mirror Maker CLI", "mirror".green().bold());
            println!();
            println!("Run {} for available commands.", "mirror --help".cyan());
            Ok(())
        }
    }
}

fn execute_command(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Init {
            source,
            mirror,
            filters,
            skip_unmatched,
            jobs,
            timeout_secs,
            dir,
        } => commands::run_init(
            &dir,
            &source,
            &mirror,
            &filters,
            InitOptions {
                skip_unmatched,
                jobs,
                timeout_secs,
            },
        ),
        Commands::Sync { dir, json } => commands::run_sync(&dir, json),
        Commands::Status { dir, json } => commands::run_status(&dir, json),
    }
}
