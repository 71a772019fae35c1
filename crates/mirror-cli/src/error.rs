//! Error types for mirror-cli

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

/// Errors that can occur in CLI operations
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Error from mirror-core
    #[error(transparent)]
    Core(#[from] mirror_core::Error),

    /// Error from mirror-fs
    #[error(transparent)]
    Fs(#[from] mirror_fs::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// User-facing error with a message
    #[error("{message}")]
    User { message: String },

    /// One or more conversions failed across the synced mirrors
    #[error("{failures} conversion(s) failed")]
    ConversionsFailed { failures: usize },

    /// Another sync holds the lock for at least one mirror
    #[error("sync already in progress")]
    LockContended,
}

impl CliError {
    /// Create a new user error with the given message
    pub fn user(message: impl Into<String>) -> Self {
        Self::User {
            message: message.into(),
        }
    }

    /// The process exit code for this error.
    ///
    /// `2` means conversions failed, `3` means a lock was held; everything
    /// else is a generic failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConversionsFailed { .. } => 2,
            Self::LockContended => 3,
            Self::Core(e) if e.is_lock_held() => 3,
            Self::Fs(mirror_fs::Error::LockHeld { .. }) => 3,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_are_distinct() {
        assert_eq!(CliError::user("bad").exit_code(), 1);
        assert_eq!(CliError::ConversionsFailed { failures: 2 }.exit_code(), 2);
        assert_eq!(CliError::LockContended.exit_code(), 3);
    }

    #[test]
    fn lock_errors_map_to_lock_code() {
        let e = CliError::Fs(mirror_fs::Error::LockHeld {
            path: "db.lock".into(),
        });
        assert_eq!(e.exit_code(), 3);
    }
}
