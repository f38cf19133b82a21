//! Error types for the sitefs virtual filesystem layer.

use crate::types::VirtualPath;
use std::io;
use thiserror::Error;

/// Comprehensive error type for all sitefs operations.
#[derive(Debug, Error)]
pub enum SiteFsError {
    /// No mount or ancestor mount resolves the path, or resolution was
    /// ambiguous (directories and files claiming the same virtual path).
    #[error("path not found: {path}")]
    NotFound { path: VirtualPath },

    /// A hardening layer refused a symlinked entry.
    #[error("symlinks not allowed: {filename}")]
    SymlinkNotAllowed { filename: String },

    /// Write operations on read-oriented composite layers.
    #[error("unsupported operation: {operation}")]
    Unsupported { operation: &'static str },

    /// A mount declaration that violates the construction contract.
    /// This is a configuration error and fails the build.
    #[error("invalid mount from {from:?} to {to:?}: {reason}")]
    InvalidMount {
        from: String,
        to: String,
        reason: String,
    },

    /// A file was classified with no language at all. This is a
    /// configuration error and fails the build.
    #[error("no language could be determined for {filename:?}")]
    UnknownLanguage { filename: String },

    /// Invalid glob pattern.
    #[error("invalid glob pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// I/O error from the underlying storage, surfaced unchanged.
    #[error("I/O error")]
    Io {
        #[from]
        #[source]
        source: io::Error,
    },
}

impl SiteFsError {
    /// Creates a NotFound error for the given virtual path.
    pub fn not_found(path: &VirtualPath) -> Self {
        SiteFsError::NotFound { path: path.clone() }
    }

    /// Returns true if this error means "the entry does not exist".
    pub fn is_not_exist(&self) -> bool {
        match self {
            SiteFsError::NotFound { .. } => true,
            SiteFsError::Io { source } => source.kind() == io::ErrorKind::NotFound,
            _ => false,
        }
    }

    /// Returns true for conditions a walk treats as "entry absent"
    /// rather than a fatal failure: vanished files and disallowed symlinks.
    pub fn is_recoverable(&self) -> bool {
        self.is_not_exist() || matches!(self, SiteFsError::SymlinkNotAllowed { .. })
    }
}

/// Result type alias for sitefs operations.
pub type Result<T> = std::result::Result<T, SiteFsError>;

/// Shorthand for the Unsupported error used by the default write surface.
pub fn unsupported(operation: &'static str) -> SiteFsError {
    SiteFsError::Unsupported { operation }
}
