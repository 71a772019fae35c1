//! SHA-256 fingerprint utilities
//!
//! Provides a single canonical fingerprint format (`sha256:<hex>`) used to
//! detect genuine content changes independent of file metadata.

use std::fs::File;
use std::io;
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::{Error, Result};

/// Prefix for all fingerprints produced by this module
pub const FINGERPRINT_PREFIX: &str = "sha256:";

/// Compute the fingerprint of an in-memory byte slice.
pub fn fingerprint_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{}{:x}", FINGERPRINT_PREFIX, hasher.finalize())
}

/// Compute the fingerprint of a file's contents.
///
/// The file is streamed through the hasher rather than read into memory,
/// since mirrored sources are often large media files.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or read.
pub fn fingerprint_file(path: &Path) -> Result<String> {
    let mut file = File::open(path).map_err(|e| Error::io(path, e))?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher).map_err(|e| Error::io(path, e))?;
    Ok(format!("{}{:x}", FINGERPRINT_PREFIX, hasher.finalize()))
}
