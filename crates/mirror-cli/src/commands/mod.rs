//! Command implementations

mod init;
mod status;
mod sync;

pub use init::{InitOptions, run_init};
pub use status::run_status;
pub use sync::run_sync;
