//! Error taxonomy for the bridge pipeline.
//!
//! Each variant maps onto one process exit code so the CLI can report
//! failures without inspecting messages.

use std::path::PathBuf;
use thiserror::Error;

/// Exit code for a successful run.
pub const EXIT_SUCCESS: u8 = 0;
/// Exit code for malformed input (request list, arguments).
pub const EXIT_INVALID_INPUT: u8 = 1;
/// Exit code for a missing launch target or input file.
pub const EXIT_NOT_FOUND: u8 = 2;
/// Exit code for a failed or failing launched application.
pub const EXIT_APPLICATION_ERROR: u8 = 3;
/// Exit code for anything else.
pub const EXIT_UNEXPECTED: u8 = 4;

/// Errors returned by the bridge pipeline.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Malformed or missing request fields, oversized payload, bad arguments.
    #[error("{message}")]
    Validation { message: String },

    /// A file the run depends on does not exist.
    #[error("{message}")]
    NotFound { path: PathBuf, message: String },

    /// The launched application failed to start or exited unsuccessfully.
    #[error("{message}")]
    Application {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

pub type BridgeResult<T> = std::result::Result<T, BridgeError>;

impl BridgeError {
    pub fn validation(message: impl Into<String>) -> Self {
        BridgeError::Validation {
            message: message.into(),
        }
    }

    pub fn not_found(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        BridgeError::NotFound {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn application(message: impl Into<String>) -> Self {
        BridgeError::Application {
            message: message.into(),
            source: None,
        }
    }

    pub fn application_with_source(message: impl Into<String>, source: std::io::Error) -> Self {
        BridgeError::Application {
            message: message.into(),
            source: Some(source),
        }
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            BridgeError::Validation { .. } => EXIT_INVALID_INPUT,
            BridgeError::NotFound { .. } => EXIT_NOT_FOUND,
            BridgeError::Application { .. } => EXIT_APPLICATION_ERROR,
            BridgeError::Unexpected(_) => EXIT_UNEXPECTED,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, BridgeError::Validation { .. })
    }
}

/// Failure of a single configuration store lookup.
///
/// Never escapes resolution: the resolver logs it and skips the item.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read configuration store {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration store {path} is malformed: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("value for '{key}' is not usable: {reason}")]
    InvalidValue { key: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_follow_taxonomy() {
        assert_eq!(BridgeError::validation("bad").exit_code(), 1);
        assert_eq!(BridgeError::not_found("x.exe", "missing").exit_code(), 2);
        assert_eq!(BridgeError::application("boom").exit_code(), 3);
        assert_eq!(
            BridgeError::from(anyhow::anyhow!("weird")).exit_code(),
            4
        );
    }

    #[test]
    fn test_application_error_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = BridgeError::application_with_source("Failed to run", io);
        let source = std::error::Error::source(&err).expect("source should be set");
        assert!(source.to_string().contains("no such file"));
    }
}
