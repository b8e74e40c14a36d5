//! Collaborator contracts for compiling modules and emitting declarations.
//!
//! The orchestrator never transforms code itself. It hands each build file to
//! a [`ModuleCompiler`] and each batch of TypeScript inputs to a
//! [`DeclarationEmitter`]; both are traits so the toolchain can be swapped
//! for a subprocess ([`CommandCompiler`](crate::CommandCompiler)) or an
//! in-memory recorder in tests.

use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use parking_lot::Mutex;
use rp_core::{BuildFormat, Environment, FormatConfig, FxHashMap, Sourcemap};

use crate::error::CompileError;
use crate::variant::BuildTask;

// ============================================================================
// Requests
// ============================================================================

/// Which imports a compiled module leaves external.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Externals {
    /// Every import stays external (library formats).
    All,
    /// Only the listed imports stay external; the rest are bundled.
    Only(Vec<String>),
}

impl Externals {
    /// Returns the external policy for a format.
    ///
    /// Library formats keep one output per module, so every import stays
    /// external. Distributable formats bundle everything except the
    /// configured `externals`.
    #[must_use]
    pub fn for_format(config: &FormatConfig) -> Self {
        if config.format.is_distributable() {
            Self::Only(config.externals.clone())
        } else {
            Self::All
        }
    }

    /// Returns `true` if the import specifier stays external.
    #[must_use]
    pub fn is_external(&self, specifier: &str) -> bool {
        match self {
            Self::All => true,
            Self::Only(list) => list.iter().any(|external| external == specifier),
        }
    }
}

/// Everything a compiler needs to build one module for one variant.
///
/// The environment is an explicit field; compilers must not read it from
/// process-wide state, since variants compile concurrently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileRequest {
    /// Absolute source file.
    pub input: Utf8PathBuf,
    /// Absolute destination file.
    pub output: Utf8PathBuf,
    /// Output format.
    pub format: BuildFormat,
    /// Whether to emit interop helpers.
    pub interop: bool,
    /// Source map mode.
    pub sourcemap: Sourcemap,
    /// Module name (the global name for distributable formats).
    pub module_name: String,
    /// External import policy.
    pub externals: Externals,
    /// Global names for external imports.
    pub globals: FxHashMap<String, String>,
    /// Build environment.
    pub environment: Option<Environment>,
    /// Whether to minify.
    pub minify: bool,
}

impl CompileRequest {
    /// Builds the request for a task.
    #[must_use]
    pub fn new(task: &BuildTask<'_>, config: &FormatConfig) -> Self {
        Self {
            input: task.module.absolute_location.clone(),
            output: task.output_path.clone(),
            format: task.format,
            interop: config.interop,
            sourcemap: config.sourcemap,
            module_name: task.module.module_name.clone(),
            externals: Externals::for_format(config),
            globals: config.globals.clone(),
            environment: task.environment,
            minify: task.minify,
        }
    }
}

/// One TypeScript input and the declaration file it produces.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeclarationRequest {
    /// Absolute source file.
    pub input: Utf8PathBuf,
    /// Absolute `.d.ts` destination.
    pub output: Utf8PathBuf,
}

/// A declaration that could not be emitted.
#[derive(Debug)]
pub struct DeclarationFailure {
    /// The source file.
    pub input: Utf8PathBuf,
    /// What went wrong.
    pub error: CompileError,
}

// ============================================================================
// Declaration sink
// ============================================================================

/// Write-sink handed to a [`DeclarationEmitter`].
///
/// Writes go straight to disk, creating parent directories as needed. The
/// sink remembers what it wrote so the orchestrator can count outputs.
#[derive(Debug, Default)]
pub struct DeclarationSink {
    written: Mutex<Vec<Utf8PathBuf>>,
}

impl DeclarationSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes `contents` to `output`.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::Io`] if the directory or file cannot be written.
    pub async fn write(&self, output: &Utf8Path, contents: &str) -> Result<(), CompileError> {
        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| CompileError::io(parent, e))?;
        }
        tokio::fs::write(output, contents)
            .await
            .map_err(|e| CompileError::io(output, e))?;
        self.written.lock().push(output.to_owned());
        Ok(())
    }

    /// Returns the number of files written.
    #[must_use]
    pub fn written_count(&self) -> usize {
        self.written.lock().len()
    }

    /// Returns the written paths, in write order.
    #[must_use]
    pub fn written(&self) -> Vec<Utf8PathBuf> {
        self.written.lock().clone()
    }
}

// ============================================================================
// Traits
// ============================================================================

/// Compiles one module into one output file.
///
/// Implementations must be safe to call concurrently for different requests.
#[async_trait]
pub trait ModuleCompiler: Send + Sync {
    /// Compiles `request.input` into `request.output`, plus a source map when
    /// requested.
    ///
    /// # Errors
    ///
    /// Returns a [`CompileError`] for this file only; the caller logs it and
    /// moves on.
    async fn compile(&self, request: &CompileRequest) -> Result<(), CompileError>;
}

/// Emits type declarations for a batch of inputs.
#[async_trait]
pub trait DeclarationEmitter: Send + Sync {
    /// Emits one declaration per request through `sink`.
    ///
    /// A failing input is reported in the returned list; later inputs are
    /// still attempted.
    async fn emit_batch(
        &self,
        requests: &[DeclarationRequest],
        sink: &DeclarationSink,
    ) -> Vec<DeclarationFailure>;
}
