//! The build orchestrator.
//!
//! [`BuildOrchestrator::process`] walks the requested formats one at a time.
//! Each format pass discovers its source root, filters the inventory and then
//! runs, concurrently:
//!
//! ```text
//! format pass
//!     ├── copy assets and declarations (once)
//!     └── per variant
//!             ├── compile every build file
//!             └── emit declarations (memoized per pass)
//! ```
//!
//! Per-file failures are logged and counted. A copy failure fails the format
//! pass; discovery and configuration failures stop the run.

use std::num::NonZeroUsize;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use futures_util::future::{join_all, try_join_all};
use parking_lot::Mutex;
use rp_core::{
    BuildFormat, Config, DECLARATION_SUFFIX, FormatConfig, FxHashSet, Module, ModuleFiles,
    fx_hash_set,
};
use rp_scanner::filter_modules;
use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use crate::compiler::{
    CompileRequest, DeclarationEmitter, DeclarationRequest, DeclarationSink, ModuleCompiler,
};
use crate::error::{BuildError, CompileError};
use crate::stats::{BuildStats, StatsSnapshot};
use crate::variant::{BuildTask, Variant};

/// Extensions of build files that get type declarations.
const DECLARATION_SOURCE_EXTENSIONS: [&str; 4] = [".ts", ".tsx", ".mts", ".cts"];

/// Orchestrator tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorOptions {
    /// Log each written file at `info` instead of `debug`.
    pub output_logs: bool,
    /// Maximum compiles, copies and declaration batches in flight at once.
    pub max_parallel_jobs: usize,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            output_logs: false,
            max_parallel_jobs: std::thread::available_parallelism().map_or(4, NonZeroUsize::get),
        }
    }
}

/// Outcome of one format pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatReport {
    /// The format.
    pub format: BuildFormat,
    /// Number of variants built.
    pub variants: usize,
    /// Output files compiled.
    pub built: u64,
    /// Files whose compilation failed.
    pub compile_failures: u64,
    /// Files copied verbatim.
    pub copied: u64,
    /// Declaration files written.
    pub declarations: u64,
    /// Files whose declaration emission failed.
    pub declaration_failures: u64,
    /// Why the pass failed, if it did.
    pub error: Option<String>,
}

impl FormatReport {
    /// Returns `true` if the pass failed as a whole.
    #[inline]
    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}

/// Result of a [`BuildOrchestrator::process`] run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildSummary {
    /// One report per processed format, in processing order.
    pub formats: Vec<FormatReport>,
    /// Run-wide counters.
    pub stats: StatsSnapshot,
}

impl BuildSummary {
    /// Returns `true` if any format pass failed.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.formats.iter().any(FormatReport::is_failed)
    }

    /// Returns the report for a format, if it was processed.
    #[must_use]
    pub fn format(&self, format: BuildFormat) -> Option<&FormatReport> {
        self.formats.iter().find(|report| report.format == format)
    }
}

/// State shared by everything dispatched during one run.
struct RunContext<'a> {
    stats: &'a BuildStats,
    limit: &'a Semaphore,
}

/// Drives discovery, filtering and dispatch for every requested format.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
///
/// use camino::Utf8Path;
/// use rp_build::{BuildOrchestrator, CommandCompiler, ToolchainSettings};
/// use rp_core::{ConfigDefaults, ConfigResolver, UserConfig};
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let config = ConfigResolver::resolve(
///     Utf8Path::new("/proj"),
///     &ConfigDefaults::default(),
///     &UserConfig::default(),
/// )?;
///
/// let compiler = Arc::new(CommandCompiler::new(ToolchainSettings::default()));
/// let summary = BuildOrchestrator::new(compiler).process(&config).await?;
/// println!("{} files compiled", summary.stats.compiled);
/// # Ok(())
/// # }
/// ```
pub struct BuildOrchestrator {
    compiler: Arc<dyn ModuleCompiler>,
    emitter: Option<Arc<dyn DeclarationEmitter>>,
    options: OrchestratorOptions,
}

impl std::fmt::Debug for BuildOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildOrchestrator")
            .field("has_emitter", &self.emitter.is_some())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl BuildOrchestrator {
    /// Creates an orchestrator without a declaration emitter.
    #[must_use]
    pub fn new(compiler: Arc<dyn ModuleCompiler>) -> Self {
        Self {
            compiler,
            emitter: None,
            options: OrchestratorOptions::default(),
        }
    }

    /// Sets the declaration emitter.
    #[must_use]
    pub fn with_declaration_emitter(mut self, emitter: Arc<dyn DeclarationEmitter>) -> Self {
        self.emitter = Some(emitter);
        self
    }

    /// Replaces the options.
    #[must_use]
    pub fn with_options(mut self, options: OrchestratorOptions) -> Self {
        self.options = options;
        self
    }

    /// Returns the options.
    #[must_use]
    pub fn options(&self) -> &OrchestratorOptions {
        &self.options
    }

    /// Builds every requested format, one format at a time.
    ///
    /// # Errors
    ///
    /// Returns a fatal [`BuildError`] if a source tree cannot be discovered.
    /// Per-file failures and failed format passes are reported in the
    /// [`BuildSummary`] instead.
    pub async fn process(&self, config: &Config) -> Result<BuildSummary, BuildError> {
        let stats = BuildStats::new();
        let limit = Semaphore::new(self.options.max_parallel_jobs.max(1));
        let cx = RunContext {
            stats: &stats,
            limit: &limit,
        };

        let mut formats = Vec::with_capacity(config.requested.len());
        for format_config in config.requested_formats() {
            formats.push(self.run_format(format_config, &cx).await?);
        }

        let stats = stats.snapshot();
        info!(
            formats = formats.len(),
            compiled = stats.compiled,
            copied = stats.copied,
            declarations = stats.declarations,
            file_failures = stats.file_failures(),
            formats_failed = stats.formats_failed,
            "Build finished"
        );

        Ok(BuildSummary { formats, stats })
    }

    async fn run_format(
        &self,
        config: &FormatConfig,
        cx: &RunContext<'_>,
    ) -> Result<FormatReport, BuildError> {
        let format = config.format;
        info!(format = %format, src = %config.src, out = %config.out, "Generating {format} builds");

        let modules = rp_scanner::discover(config).await?;
        let files = filter_modules(&modules, config);
        let variants = Variant::enumerate(config);
        debug!(
            format = %format,
            build_files = files.build_files.len(),
            copy_files = files.copy_files.len(),
            variants = variants.len(),
            "Filtered modules"
        );

        let memo = Mutex::new(fx_hash_set());
        let before = cx.stats.snapshot();

        let copies = self.copy_all(config, &files.copy_files, cx);
        let builds = join_all(
            variants
                .iter()
                .map(|variant| self.build_variant(config, &files, variant, &memo, cx)),
        );
        let (copied, _) = tokio::join!(copies, builds);

        let error = match copied {
            Ok(()) => {
                cx.stats.increment_formats_completed();
                None
            }
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                error!(format = %format, error = %err, "Format failed");
                cx.stats.increment_formats_failed();
                Some(err.to_string())
            }
        };

        let after = cx.stats.snapshot();
        Ok(FormatReport {
            format,
            variants: variants.len(),
            built: after.compiled - before.compiled,
            compile_failures: after.compile_failures - before.compile_failures,
            copied: after.copied - before.copied,
            declarations: after.declarations - before.declarations,
            declaration_failures: after.declaration_failures - before.declaration_failures,
            error,
        })
    }

    async fn build_variant(
        &self,
        config: &FormatConfig,
        files: &ModuleFiles,
        variant: &Variant,
        memo: &Mutex<FxHashSet<Utf8PathBuf>>,
        cx: &RunContext<'_>,
    ) {
        info!(
            format = %config.format,
            variant = %variant,
            files = files.build_files.len(),
            "Building variant"
        );

        let compiles = join_all(
            files
                .build_files
                .iter()
                .map(|module| self.compile_one(BuildTask::new(module, config, variant), config, cx)),
        );
        let declarations = self.emit_declarations(config, &files.build_files, memo, cx);
        tokio::join!(compiles, declarations);
    }

    async fn compile_one(&self, task: BuildTask<'_>, config: &FormatConfig, cx: &RunContext<'_>) {
        let _permit = cx.limit.acquire().await.ok();
        let request = CompileRequest::new(&task, config);

        let result = match prepare_parent(&request.output).await {
            Ok(()) => self.compiler.compile(&request).await,
            Err(err) => Err(err),
        };

        match result {
            Ok(()) => {
                cx.stats.increment_compiled();
                self.log_written(&task.module.relative_path(), &request.output);
            }
            Err(err) => {
                cx.stats.increment_compile_failures();
                error!(
                    format = %task.format,
                    input = %task.module.relative_path(),
                    error = %err,
                    "Compile failed"
                );
            }
        }
    }

    async fn copy_all(
        &self,
        config: &FormatConfig,
        modules: &[Module],
        cx: &RunContext<'_>,
    ) -> Result<(), BuildError> {
        try_join_all(modules.iter().map(|module| self.copy_one(config, module, cx))).await?;
        Ok(())
    }

    async fn copy_one(
        &self,
        config: &FormatConfig,
        module: &Module,
        cx: &RunContext<'_>,
    ) -> Result<(), BuildError> {
        let _permit = cx.limit.acquire().await.ok();

        let dir = config.output_dir(&module.location_relative_to_src);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| BuildError::create_dir(dir.clone(), e))?;

        let destination = dir.join(&module.file_name);
        tokio::fs::copy(&module.absolute_location, &destination)
            .await
            .map_err(|e| BuildError::copy(module.absolute_location.clone(), destination.clone(), e))?;

        cx.stats.increment_copied();
        self.log_written(&module.relative_path(), &destination);
        Ok(())
    }

    async fn emit_declarations(
        &self,
        config: &FormatConfig,
        build_files: &[Module],
        memo: &Mutex<FxHashSet<Utf8PathBuf>>,
        cx: &RunContext<'_>,
    ) {
        let Some(emitter) = &self.emitter else {
            return;
        };
        if !config.declarations {
            return;
        }

        let requests: Vec<_> = build_files
            .iter()
            .filter(|module| needs_declaration(module))
            .filter_map(|module| {
                let output = config
                    .output_dir(&module.location_relative_to_src)
                    .join(format!("{}{DECLARATION_SUFFIX}", module.base_name));
                memo.lock().insert(output.clone()).then(|| DeclarationRequest {
                    input: module.absolute_location.clone(),
                    output,
                })
            })
            .collect();
        if requests.is_empty() {
            return;
        }

        let sink = DeclarationSink::new();
        let failures = {
            // One batch occupies one job slot.
            let _permit = cx.limit.acquire().await.ok();
            emitter.emit_batch(&requests, &sink).await
        };

        let written = sink.written();
        for request in requests.iter().filter(|r| written.contains(&r.output)) {
            self.log_written(&request.input, &request.output);
        }
        for failure in &failures {
            error!(
                format = %config.format,
                input = %failure.input,
                error = %failure.error,
                "Declaration emission failed"
            );
        }
        if sink.written_count() + failures.len() < requests.len() {
            warn!(
                format = %config.format,
                requested = requests.len(),
                written = sink.written_count(),
                "Declaration emitter skipped inputs"
            );
        }

        cx.stats.add_declarations(sink.written_count() as u64);
        cx.stats.add_declaration_failures(failures.len() as u64);
    }

    fn log_written(&self, input: &Utf8Path, output: &Utf8Path) {
        if self.options.output_logs {
            info!("{input} ... {output}");
        } else {
            debug!(input = %input, output = %output, "Written");
        }
    }
}

fn needs_declaration(module: &Module) -> bool {
    module.is_build_file() && DECLARATION_SOURCE_EXTENSIONS.contains(&module.extension.as_str())
}

async fn prepare_parent(output: &Utf8Path) -> Result<(), CompileError> {
    match output.parent() {
        Some(parent) => tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| CompileError::io(parent, e)),
        None => Ok(()),
    }
}
