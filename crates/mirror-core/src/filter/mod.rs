//! Filter plugins: out-of-process converters selected by extension
//!
//! Filters implement a single capability interface (query an extension
//! mapping, run a conversion) as external executables. The registry picks
//! the filter for each extension; the descriptor drives the subprocess.

mod descriptor;
mod registry;

pub use descriptor::{FilterDescriptor, FilterRunError};
pub use registry::{FilterRegistry, Resolution};
