//! Core synchronization engine for Mirror Maker
//!
//! Mirrors a source directory tree into a derived tree, converting files
//! through pluggable external filters and keeping the result incrementally
//! synchronized. This crate provides:
//!
//! - **Mirror database**: the persistent per-mirror record of what has been
//!   mirrored, replaced atomically at the end of each run
//! - **Filter registry**: extension-based dispatch over out-of-process
//!   filter plugins
//! - **Diff engine**: timestamp-before-hash classification of every path
//! - **Conversion executor**: crash-safe artifact production and removal
//! - **Sync orchestrator**: one locked, bounded-concurrency run per mirror
//!
//! # Architecture
//!
//! ```text
//!            CLI
//!             |
//!        mirror-core
//!             |
//!         mirror-fs
//! ```

pub mod config;
pub mod database;
pub mod diff;
pub mod engine;
pub mod error;
pub mod executor;
pub mod filter;

pub use config::MirrorConfig;
pub use database::{DB_SUFFIX, DB_VERSION, FileRecord, FilterBinding, MirrorDatabase};
pub use diff::{ChangeKind, Conflict, ConvertItem, PlanEntry, PlanSummary, SyncPlan, diff};
pub use engine::{SyncEngine, SyncReport};
pub use error::{Error, Result};
pub use executor::{ConversionExecutor, Outcome};
pub use filter::{FilterDescriptor, FilterRegistry, FilterRunError, Resolution};
