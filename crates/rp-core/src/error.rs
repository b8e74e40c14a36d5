//! Error types for the rp-core crate.
//!
//! This module provides the [`ConfigError`] type for configuration-related errors
//! that can occur while loading and resolving build settings.

use camino::Utf8PathBuf;

/// Errors that can occur during configuration loading and resolution.
///
/// Every variant is fatal for a `process()` run: a configuration that fails
/// its structural assumptions cannot produce a trustworthy build.
///
/// # Examples
///
/// ```
/// use rp_core::ConfigError;
///
/// let error = ConfigError::InvalidOption {
///     option: "iife.out".to_owned(),
///     reason: "must differ from src".to_owned(),
/// };
/// assert!(error.to_string().contains("iife.out"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The provided path is invalid or malformed.
    #[error("invalid path '{path}': {reason}")]
    InvalidPath {
        /// The invalid path.
        path: Utf8PathBuf,
        /// Explanation of why the path is invalid.
        reason: String,
    },

    /// A configuration option has an invalid value.
    #[error("invalid configuration option '{option}': {reason}")]
    InvalidOption {
        /// The name of the invalid option.
        option: String,
        /// Explanation of why the option is invalid.
        reason: String,
    },

    /// An I/O error occurred while reading configuration.
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration document has values of the wrong shape.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ConfigError {
    /// Returns `true` if this error aborts the run. Always `true`.
    #[inline]
    #[must_use]
    #[allow(clippy::unused_self)] // Kept as a method to match the other error types
    pub const fn is_fatal(&self) -> bool {
        true
    }

    /// Creates a new [`ConfigError::InvalidOption`] error.
    #[inline]
    pub fn invalid_option(option: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidOption {
            option: option.into(),
            reason: reason.into(),
        }
    }
}
