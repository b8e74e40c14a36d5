//! Error types for the rp-scanner crate.
//!
//! This module provides the [`ScanError`] type for errors that can occur
//! while walking a source tree.

use camino::Utf8PathBuf;

/// Errors that can occur during module discovery.
///
/// Every discovery error aborts the walk: a source tree that cannot be read
/// completely cannot produce a trustworthy inventory.
///
/// # Examples
///
/// ```
/// use rp_scanner::ScanError;
///
/// fn describe(err: &ScanError) -> String {
///     match err {
///         ScanError::ReadDir { path, .. } => format!("unreadable directory: {path}"),
///         ScanError::Metadata { path, .. } => format!("unreadable entry: {path}"),
///         ScanError::NonUtf8Path(p) => format!("invalid path: {}", p.display()),
///         ScanError::Task(e) => format!("walker task failed: {e}"),
///         ScanError::Pattern(e) => format!("bad built-in pattern: {e}"),
///         ScanError::Config(msg) => format!("config error: {msg}"),
///     }
/// }
///
/// let err = ScanError::config("root path does not exist: ./src");
/// assert!(describe(&err).contains("./src"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// Failed to list a directory.
    #[error("failed to read directory {path}: {source}")]
    ReadDir {
        /// The directory that could not be listed.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to stat a directory entry.
    #[error("failed to read metadata for {path}: {source}")]
    Metadata {
        /// The entry whose metadata could not be read.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A path is not valid UTF-8.
    ///
    /// This crate uses UTF-8 paths throughout; such a path cannot be matched
    /// against patterns or mirrored into an output tree.
    #[error("path is not valid UTF-8: {}", _0.display())]
    NonUtf8Path(std::path::PathBuf),

    /// A sub-walk task panicked or was cancelled.
    #[error("directory walk task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// A built-in file name pattern failed to compile.
    #[error("failed to compile file name pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// Invalid discovery root.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ScanError {
    /// Creates a new [`ScanError::ReadDir`] error.
    #[inline]
    pub fn read_dir(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Self::ReadDir {
            path: path.into(),
            source,
        }
    }

    /// Creates a new [`ScanError::Metadata`] error.
    #[inline]
    pub fn metadata(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Self::Metadata {
            path: path.into(),
            source,
        }
    }

    /// Creates a new [`ScanError::Config`] error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Returns `true` if discovery could continue past this error.
    ///
    /// Always `false`: a partial inventory is never used.
    #[inline]
    #[must_use]
    #[allow(clippy::unused_self)] // Kept as a method to match the other error types
    pub const fn is_recoverable(&self) -> bool {
        false
    }

    /// Returns `true` if this error aborts the run.
    #[inline]
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !self.is_recoverable()
    }

    /// Returns the file path associated with this error, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Utf8PathBuf> {
        match self {
            Self::ReadDir { path, .. } | Self::Metadata { path, .. } => Some(path),
            Self::NonUtf8Path(_) | Self::Task(_) | Self::Pattern(_) | Self::Config(_) => None,
        }
    }
}
