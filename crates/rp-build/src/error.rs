//! Error types for the rp-build crate.
//!
//! - [`CompileError`]: one file failed to compile or emit declarations
//! - [`BuildError`]: a format pass or the whole run failed

use camino::Utf8PathBuf;
use rp_core::ConfigError;
use rp_scanner::ScanError;

/// A per-file failure reported by a compile or declaration collaborator.
///
/// Always recoverable: the failure is logged and counted, and the rest of the
/// batch continues.
///
/// # Examples
///
/// ```
/// use rp_build::CompileError;
///
/// let err = CompileError::message("unexpected token");
/// assert!(err.is_recoverable());
/// assert_eq!(err.to_string(), "unexpected token");
/// ```
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    /// The toolchain program could not be started.
    #[error("failed to start '{program}': {source}")]
    Spawn {
        /// The program that was invoked.
        program: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The toolchain exited unsuccessfully.
    #[error("'{program}' exited with {status}: {stderr}")]
    Failed {
        /// The program that was invoked.
        program: String,
        /// Exit status description.
        status: String,
        /// Trimmed standard error output.
        stderr: String,
    },

    /// Preparing or writing an output failed.
    #[error("failed to write {path}: {source}")]
    Io {
        /// The path being written.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A collaborator-specific failure.
    #[error("{0}")]
    Message(String),
}

impl CompileError {
    /// Creates a new [`CompileError::Io`] error.
    #[inline]
    pub fn io(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a new [`CompileError::Message`] error.
    #[inline]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }

    /// Returns `true`: per-file failures never abort a batch.
    #[inline]
    #[must_use]
    #[allow(clippy::unused_self)] // Kept as a method to match the other error types
    pub const fn is_recoverable(&self) -> bool {
        true
    }
}

/// Errors that fail a format pass or a whole `process()` run.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// Configuration could not be loaded or resolved.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A source tree could not be discovered.
    #[error(transparent)]
    Scan(#[from] ScanError),

    /// An output directory could not be created.
    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        /// The directory being created.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A file could not be copied into the output tree.
    #[error("failed to copy {from} to {to}: {source}")]
    Copy {
        /// The source file.
        from: Utf8PathBuf,
        /// The destination file.
        to: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl BuildError {
    /// Creates a new [`BuildError::CreateDir`] error.
    #[inline]
    pub fn create_dir(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Self::CreateDir {
            path: path.into(),
            source,
        }
    }

    /// Creates a new [`BuildError::Copy`] error.
    #[inline]
    pub fn copy(
        from: impl Into<Utf8PathBuf>,
        to: impl Into<Utf8PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::Copy {
            from: from.into(),
            to: to.into(),
            source,
        }
    }

    /// Returns `true` if only the current format pass fails; later formats
    /// still run.
    #[inline]
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::CreateDir { .. } | Self::Copy { .. })
    }

    /// Returns `true` if the whole run stops.
    #[inline]
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !self.is_recoverable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_compile_error_failed_display() {
        let err = CompileError::Failed {
            program: "npx".to_owned(),
            status: "exit status: 1".to_owned(),
            stderr: "SyntaxError".to_owned(),
        };
        assert!(err.is_recoverable());
        assert!(err.to_string().contains("SyntaxError"));
    }

    #[test]
    fn test_compile_error_io() {
        let err = CompileError::io("build/a.js", io::Error::other("disk full"));
        assert!(err.to_string().contains("build/a.js"));
    }

    #[test]
    fn test_copy_error_fails_format_only() {
        let err = BuildError::copy(
            "src/logo.png",
            "build/logo.png",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.is_recoverable());
        assert!(!err.is_fatal());
        assert!(err.to_string().contains("src/logo.png"));
    }

    #[test]
    fn test_scan_error_is_fatal() {
        let err = BuildError::from(ScanError::config("root path does not exist: ./src"));
        assert!(err.is_fatal());
        assert!(err.to_string().contains("./src"));
    }

    #[test]
    fn test_config_error_is_fatal() {
        let err = BuildError::from(ConfigError::invalid_option("es.out", "same as src"));
        assert!(err.is_fatal());
    }
}
