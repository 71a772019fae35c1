//! Filter plugin driver
//!
//! A filter is an arbitrary executable speaking a two-mode protocol:
//!
//! - `<exe> ext <input-extension>`: exit 0 means the trimmed stdout is the
//!   output extension this filter produces for that input; non-zero exit
//!   means the filter does not handle the extension.
//! - `<exe> run <source> <dest>`: exit 0 and an existing `<dest>` means the
//!   conversion completed; anything else is a failure and partial output is
//!   discarded by the caller.

use std::collections::HashMap;
use std::path::Path;
use std::process::Command;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Why a filter `run` invocation failed.
#[derive(Debug, thiserror::Error)]
pub enum FilterRunError {
    #[error("failed to invoke filter: {0}")]
    Spawn(std::io::Error),

    #[error("filter exited with {0}")]
    Exit(std::process::ExitStatus),

    #[error("filter did not finish within {}s", .0.as_secs())]
    TimedOut(Duration),

    #[error("filter reported success but produced no output file")]
    MissingOutput,
}

/// One configured filter executable plus its per-run extension cache.
///
/// The cache is never persisted: a filter's behavior may change between
/// runs and must be re-verified each time.
#[derive(Debug)]
pub struct FilterDescriptor {
    name: String,
    extensions: Mutex<HashMap<String, Option<String>>>,
}

impl FilterDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            extensions: Mutex::new(HashMap::new()),
        }
    }

    /// The configured executable reference.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The output extension this filter produces for `extension`, if it
    /// claims it. Memoized per (filter, extension) for the run.
    pub fn output_extension(&self, extension: &str) -> Option<String> {
        let mut cache = match self.extensions.lock() {
            Ok(cache) => cache,
            Err(poisoned) => poisoned.into_inner(),
        };
        cache
            .entry(extension.to_string())
            .or_insert_with(|| self.query_extension(extension))
            .clone()
    }

    /// Ask the filter whether it handles `extension`.
    ///
    /// Any non-zero exit is "no match", not a fault. A spawn failure is
    /// logged and also treated as no-match so one broken filter cannot
    /// wedge the run.
    fn query_extension(&self, extension: &str) -> Option<String> {
        let output = match Command::new(&self.name).arg("ext").arg(extension).output() {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!("Failed to invoke filter `{}`: {}", self.name, e);
                return None;
            }
        };

        if !output.status.success() {
            return None;
        }

        match String::from_utf8(output.stdout) {
            Ok(stdout) => {
                let mapped = stdout.trim().to_string();
                if mapped.is_empty() {
                    tracing::warn!(
                        "Filter `{}` claimed `{}` but printed no output extension",
                        self.name,
                        extension
                    );
                    None
                } else {
                    tracing::debug!("Filter `{}` maps `{}` to `{}`", self.name, extension, mapped);
                    Some(mapped)
                }
            }
            Err(e) => {
                tracing::warn!("Filter `{}` produced non-UTF-8 output: {}", self.name, e);
                None
            }
        }
    }

    /// Run the conversion, writing into `dest`.
    ///
    /// With a timeout, the child is polled and killed on expiry; its
    /// partial output is the caller's to discard.
    pub fn run(
        &self,
        source: &Path,
        dest: &Path,
        timeout: Option<Duration>,
    ) -> std::result::Result<(), FilterRunError> {
        let mut command = Command::new(&self.name);
        command.arg("run").arg(source).arg(dest);

        let status = match timeout {
            None => command.status().map_err(FilterRunError::Spawn)?,
            Some(limit) => {
                let mut child = command.spawn().map_err(FilterRunError::Spawn)?;
                let started = Instant::now();
                loop {
                    match child.try_wait() {
                        Ok(Some(status)) => break status,
                        Ok(None) => {
                            if started.elapsed() >= limit {
                                let _ = child.kill();
                                let _ = child.wait();
                                return Err(FilterRunError::TimedOut(limit));
                            }
                            std::thread::sleep(Duration::from_millis(25));
                        }
                        Err(e) => return Err(FilterRunError::Spawn(e)),
                    }
                }
            }
        };

        if !status.success() {
            return Err(FilterRunError::Exit(status));
        }
        if !dest.exists() {
            return Err(FilterRunError::MissingOutput);
        }
        Ok(())
    }
}
