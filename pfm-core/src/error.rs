//! src/error.rs
//! ============================================================================
//! # `AppError`: Unified Error Type for the File Manager Core
//!
//! Every fallible operation in the crate returns `Result<T, AppError>`.
//! Navigation variants drive automatic recovery in the controller, copy
//! variants are collected per entry into a `CopyReport`, and nothing here is
//! ever fatal to the process.

use std::{io, path::PathBuf};
use thiserror::Error;

/// Unified error type for all file manager operations.
#[derive(Debug, Error)]
pub enum AppError {
    /// Standard IO error, auto-converted from `io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A directory could not be enumerated (removed, permission revoked).
    #[error("Cannot read directory {path:?}: {source}")]
    DirectoryUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Navigation target exists but is not a directory.
    #[error("Not a directory: {0:?}")]
    NotADirectory(PathBuf),

    /// Recursive copy enumeration aborted; no partial copy is attempted.
    #[error("Traversal failed at {path:?}: {reason}")]
    TraversalFailed { path: PathBuf, reason: String },

    /// Copy destination is missing or not a directory.
    #[error("Invalid copy destination: {0:?}")]
    InvalidDestination(PathBuf),

    /// Copy source or destination disappeared before execution.
    #[error("Copy source {source_path:?} or destination {destination:?} does not exist")]
    SourceOrDestinationMissing {
        source_path: PathBuf,
        destination: PathBuf,
    },

    /// A file with the same name already exists at the destination.
    #[error("Destination already exists: {0:?}")]
    DestinationConflict(PathBuf),

    /// No default-application mechanism exists for this OS.
    #[error("Opening files is not supported on platform '{0}'")]
    UnsupportedPlatform(String),

    /// TOML config parsing error.
    #[error("Config parse error: {0}")]
    Config(#[from] toml::de::Error),

    /// TOML config serialization error.
    #[error("Config write error: {0}")]
    ConfigWrite(#[from] toml::ser::Error),

    /// Config file I/O error with path.
    #[error("Failed to access config file {path:?}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Operation cancelled by user or system.
    #[error("Operation was cancelled")]
    Cancelled,

    /// Any other error, with description.
    #[error("Unexpected error: {0}")]
    Other(String),
}

impl AppError {
    #[must_use]
    /// Attach extra context to an error.
    pub fn with_context<S: Into<String>>(self, ctx: S) -> Self {
        Self::Other(format!("{}: {}", ctx.into(), self))
    }

    /// Create a directory-unreadable error
    pub fn directory_unreadable<P: Into<PathBuf>>(path: P, source: io::Error) -> Self {
        Self::DirectoryUnreadable {
            path: path.into(),
            source,
        }
    }

    /// Create a traversal failure error
    pub fn traversal_failed<P: Into<PathBuf>, S: Into<String>>(path: P, reason: S) -> Self {
        Self::TraversalFailed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a missing source/destination error
    pub fn source_or_destination_missing<P1, P2>(source_path: P1, destination: P2) -> Self
    where
        P1: Into<PathBuf>,
        P2: Into<PathBuf>,
    {
        Self::SourceOrDestinationMissing {
            source_path: source_path.into(),
            destination: destination.into(),
        }
    }

    /// Create a config file I/O error
    pub fn config_io<P: Into<PathBuf>>(path: P, source: io::Error) -> Self {
        Self::ConfigIo {
            path: path.into(),
            source,
        }
    }

    /// Errors after which the controller climbs to a readable ancestor
    /// instead of keeping the current location.
    #[must_use]
    pub const fn is_recoverable_navigation(&self) -> bool {
        matches!(self, Self::DirectoryUnreadable { .. } | Self::NotADirectory(_))
    }
}

fn clone_io(e: &io::Error) -> io::Error {
    io::Error::new(e.kind(), e.to_string())
}

// Manual Clone implementation to handle non-Clone fields
impl Clone for AppError {
    fn clone(&self) -> Self {
        match self {
            Self::Io(e) => Self::Io(clone_io(e)),
            Self::DirectoryUnreadable { path, source } => Self::DirectoryUnreadable {
                path: path.clone(),
                source: clone_io(source),
            },
            Self::NotADirectory(path) => Self::NotADirectory(path.clone()),
            Self::TraversalFailed { path, reason } => Self::TraversalFailed {
                path: path.clone(),
                reason: reason.clone(),
            },
            Self::InvalidDestination(path) => Self::InvalidDestination(path.clone()),
            Self::SourceOrDestinationMissing {
                source_path,
                destination,
            } => Self::SourceOrDestinationMissing {
                source_path: source_path.clone(),
                destination: destination.clone(),
            },
            Self::DestinationConflict(path) => Self::DestinationConflict(path.clone()),
            Self::UnsupportedPlatform(os) => Self::UnsupportedPlatform(os.clone()),
            Self::Config(e) => Self::Other(format!("Config error: {e}")),
            Self::ConfigWrite(e) => Self::Other(format!("Config write error: {e}")),
            Self::ConfigIo { path, source } => Self::ConfigIo {
                path: path.clone(),
                source: clone_io(source),
            },
            Self::Cancelled => Self::Cancelled,
            Self::Other(msg) => Self::Other(msg.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clone_preserves_variant_and_message() {
        let err = AppError::directory_unreadable(
            "/gone",
            io::Error::new(io::ErrorKind::NotFound, "vanished"),
        );
        let cloned = err.clone();

        assert!(matches!(cloned, AppError::DirectoryUnreadable { .. }));
        assert_eq!(err.to_string(), cloned.to_string());
    }

    #[test]
    fn test_recoverable_navigation_errors() {
        assert!(AppError::NotADirectory(PathBuf::from("/f")).is_recoverable_navigation());
        assert!(!AppError::Cancelled.is_recoverable_navigation());
        assert!(!AppError::UnsupportedPlatform("plan9".into()).is_recoverable_navigation());
    }
}
