//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Mirror Maker - Mirror directory trees through conversion filters
#[derive(Parser, Debug)]
#[command(name = "mirror")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// The command to run
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Initialize a new mirror
    ///
    /// Binds a source tree to a mirror tree and an ordered list of filter
    /// executables, and creates the mirror's database in the search
    /// directory. Fails if the mirror was already initialized.
    ///
    /// Examples:
    ///   mirror init ~/music /srv/phone-music mp3ify
    ///   mirror init ~/photos /srv/web-photos rawdev --skip-unmatched
    Init {
        /// Source directory to mirror
        source: PathBuf,

        /// Directory the mirror is produced into
        mirror: PathBuf,

        /// Filter executables, in precedence order
        filters: Vec<String>,

        /// Skip files no filter claims instead of copying them verbatim
        #[arg(long)]
        skip_unmatched: bool,

        /// Conversion worker pool size (default: available CPUs)
        #[arg(short, long)]
        jobs: Option<usize>,

        /// Kill a filter invocation after this many seconds
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Directory the mirror database is stored in
        #[arg(long, default_value = ".")]
        dir: PathBuf,
    },

    /// Synchronize every mirror found in the search directory
    Sync {
        /// Directory to search for mirror databases
        #[arg(long, default_value = ".")]
        dir: PathBuf,

        /// Output reports as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Preview what sync would change, without converting
    Status {
        /// Directory to search for mirror databases
        #[arg(long, default_value = ".")]
        dir: PathBuf,

        /// Output the preview as JSON for scripting
        #[arg(long)]
        json: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_init_with_filters() {
        let cli = Cli::parse_from([
            "mirror",
            "init",
            "/music",
            "/phone",
            "mp3ify",
            "rawdev",
            "--skip-unmatched",
        ]);
        match cli.command {
            Some(Commands::Init {
                source,
                mirror,
                filters,
                skip_unmatched,
                ..
            }) => {
                assert_eq!(source, PathBuf::from("/music"));
                assert_eq!(mirror, PathBuf::from("/phone"));
                assert_eq!(filters, vec!["mp3ify", "rawdev"]);
                assert!(skip_unmatched);
            }
            other => panic!("expected Init, got {:?}", other),
        }
    }

    #[test]
    fn sync_defaults_to_current_directory() {
        let cli = Cli::parse_from(["mirror", "sync"]);
        match cli.command {
            Some(Commands::Sync { dir, json }) => {
                assert_eq!(dir, PathBuf::from("."));
                assert!(!json);
            }
            other => panic!("expected Sync, got {:?}", other),
        }
    }
}
