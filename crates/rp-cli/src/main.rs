//! CLI entry point for rollpack.
//!
//! This binary resolves the project configuration and drives the build
//! orchestrator with a subprocess-backed toolchain.
//!
//! # Usage
//!
//! ```bash
//! rollpack [OPTIONS] <COMMAND>
//!
//! # Build every requested format
//! rollpack build --path ./my-lib
//!
//! # Build only the browser bundle, logging each output
//! rollpack build --format umd --output-logs
//!
//! # Show the resolved configuration
//! rollpack config
//!
//! # Show what discovery finds for one format
//! rollpack discover --format es
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

use std::io::Write;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{WrapErr, eyre};
use rp_build::{
    BuildOrchestrator, BuildSummary, CommandCompiler, CommandDeclarationEmitter,
    DeclarationEmitter, OrchestratorOptions, ToolchainSettings,
};
use rp_core::loader::{CONFIG_FILE_NAME, load_config_value};
use rp_core::{BuildFormat, Config, ConfigDefaults, ConfigResolver, FileKind, UserConfig, paths};
use rp_scanner::{DiscoverySummary, discover, filter_modules};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// CLI ARGUMENT TYPES
// =============================================================================

/// Multi-format build orchestrator for JavaScript and TypeScript libraries.
///
/// Discovers modules under each format's source directory and builds them
/// into per-format output trees.
#[derive(Parser)]
#[command(name = "rollpack", version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Command to execute.
    #[command(subcommand)]
    command: Commands,

    /// Project root directory.
    ///
    /// Defaults to the current directory.
    #[arg(short, long, global = true, env = "ROLLPACK_PATH")]
    path: Option<Utf8PathBuf>,

    /// Configuration file.
    ///
    /// Defaults to `.buildrc.json` in the project root.
    #[arg(short, long, global = true, env = "ROLLPACK_CONFIG")]
    config: Option<Utf8PathBuf>,

    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Build the requested formats.
    Build {
        /// Formats to build (overrides the configuration).
        #[arg(short, long, value_enum)]
        format: Vec<FormatArg>,

        /// Log every written file.
        #[arg(long)]
        output_logs: bool,

        /// Maximum compiles, copies and declaration batches in flight.
        #[arg(short, long)]
        jobs: Option<usize>,
    },

    /// Print the resolved configuration as JSON.
    Config,

    /// Print the classified module inventory for one format.
    Discover {
        /// Format whose source root and filters are used.
        #[arg(short, long, value_enum, default_value_t = FormatArg::Cjs)]
        format: FormatArg,
    },
}

/// Output format argument.
#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    /// CommonJS modules.
    Cjs,
    /// ECMAScript modules.
    Es,
    /// Immediately-invoked function expression bundles.
    Iife,
    /// Universal module definition bundles.
    Umd,
}

impl From<FormatArg> for BuildFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Cjs => Self::Cjs,
            FormatArg::Es => Self::Es,
            FormatArg::Iife => Self::Iife,
            FormatArg::Umd => Self::Umd,
        }
    }
}

/// Everything loaded from disk before a command runs.
struct Project {
    config: Config,
    toolchain: ToolchainSettings,
}

// =============================================================================
// INITIALIZATION FUNCTIONS
// =============================================================================

/// Initializes the tracing subscriber for logging.
///
/// Respects the `RUST_LOG` environment variable if set. Otherwise, uses
/// `debug` level if `--verbose` is set, or `info` level by default.
fn init_tracing(verbose: bool, no_color: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if verbose { "debug" } else { "info" };
        EnvFilter::new(level)
    });

    // Check if colors should be disabled (flag or NO_COLOR env var)
    let use_ansi = !no_color && std::env::var("NO_COLOR").is_err();

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_ansi(use_ansi))
        .with(filter)
        .init();
}

/// Resolves the project root to an absolute directory.
fn project_root(cli: &Cli) -> color_eyre::Result<Utf8PathBuf> {
    let cwd = std::env::current_dir().wrap_err("Failed to read the current directory")?;
    let cwd = Utf8PathBuf::from_path_buf(cwd)
        .map_err(|path| eyre!("Current directory is not UTF-8: {}", path.display()))?;

    let root = match &cli.path {
        Some(path) => paths::absolutize(&cwd, path),
        None => cwd,
    };

    if !root.is_dir() {
        return Err(eyre!("Project root is not a directory: {root}"));
    }
    Ok(root)
}

/// Loads the configuration file and resolves it against the built-in defaults.
fn load_project(cli: &Cli) -> color_eyre::Result<Project> {
    let root = project_root(cli)?;
    let config_path = match &cli.config {
        Some(path) => paths::absolutize(&root, path),
        None => root.join(CONFIG_FILE_NAME),
    };

    let document = load_config_value(&config_path);
    let toolchain = ToolchainSettings::from_config_value(&document)
        .wrap_err_with(|| format!("Invalid toolchain settings in {config_path}"))?;
    let user = UserConfig::from_value(document)
        .wrap_err_with(|| format!("Invalid configuration in {config_path}"))?;

    let config = ConfigResolver::resolve(&root, &ConfigDefaults::default(), &user)?;
    Ok(Project { config, toolchain })
}

// =============================================================================
// COMMAND IMPLEMENTATIONS
// =============================================================================

/// Runs the build and prints the summary.
///
/// Returns `false` if any format pass failed.
async fn run_build(
    mut project: Project,
    formats: &[FormatArg],
    output_logs: bool,
    jobs: Option<usize>,
) -> color_eyre::Result<bool> {
    if !formats.is_empty() {
        let mut requested = Vec::with_capacity(formats.len());
        for format in formats.iter().copied().map(BuildFormat::from) {
            if !requested.contains(&format) {
                requested.push(format);
            }
        }
        project.config.requested = requested;
        project.config.validate_outputs()?;
    }

    let root = project.config.entry_path.clone();
    let toolchain = &project.toolchain;
    let mut options = OrchestratorOptions {
        output_logs,
        ..OrchestratorOptions::default()
    };
    if let Some(limit) = jobs.or(toolchain.max_parallel_jobs) {
        options.max_parallel_jobs = limit;
    }

    let compiler = CommandCompiler::new(toolchain.clone()).with_working_dir(&root);
    let mut orchestrator = BuildOrchestrator::new(Arc::new(compiler)).with_options(options);
    if let Some(emitter) = CommandDeclarationEmitter::from_settings(toolchain) {
        let emitter: Arc<dyn DeclarationEmitter> = Arc::new(emitter.with_working_dir(&root));
        orchestrator = orchestrator.with_declaration_emitter(emitter);
    }

    info!(root = %root, formats = project.config.requested.len(), "Starting build");
    let summary = orchestrator.process(&project.config).await?;
    print_build_summary(&summary)?;

    Ok(!summary.has_failures())
}

/// Prints the resolved configuration.
fn run_config(project: &Project) -> color_eyre::Result<()> {
    let json = serde_json::to_string_pretty(&project.config)
        .map_err(|e| eyre!("Failed to serialize configuration: {}", e))?;

    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    writeln!(handle, "{json}")?;
    Ok(())
}

/// Discovers and filters one format's source tree and prints the result.
async fn run_discover(project: &Project, format: BuildFormat) -> color_eyre::Result<()> {
    let config = project
        .config
        .format(format)
        .ok_or_else(|| eyre!("Format {format} is not configured"))?;

    info!(format = %format, src = %config.src, "Discovering modules");
    let modules = discover(config).await?;
    let summary = DiscoverySummary::from_modules(&modules);
    let files = filter_modules(&modules, config);

    let stdout = std::io::stdout();
    let mut handle = stdout.lock();

    writeln!(handle)?;
    writeln!(handle, "Modules in {}", config.src)?;
    writeln!(handle, "==========={}", "=".repeat(config.src.as_str().len()))?;
    writeln!(handle)?;
    writeln!(handle, "Total modules:      {}", summary.total)?;
    writeln!(handle, "  Build files:      {}", summary.build_files)?;
    writeln!(handle, "  Assets:           {}", summary.asset_files)?;
    writeln!(handle, "  Declarations:     {}", summary.declaration_files)?;
    match &summary.entry {
        Some(entry) => writeln!(handle, "Entry:              {entry}")?,
        None => writeln!(handle, "Entry:              (not found)")?,
    }

    writeln!(handle)?;
    writeln!(handle, "Selected for {format}:")?;
    for module in &files.build_files {
        writeln!(handle, "  build  {}", module.relative_path())?;
    }
    for module in &files.copy_files {
        let label = match module.kind {
            FileKind::TypeDeclaration => "types",
            FileKind::Asset | FileKind::Build => "copy ",
        };
        writeln!(handle, "  {label}  {}", module.relative_path())?;
    }

    Ok(())
}

// =============================================================================
// OUTPUT HELPERS
// =============================================================================

/// Prints the per-format results of a build.
fn print_build_summary(summary: &BuildSummary) -> color_eyre::Result<()> {
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();

    writeln!(handle)?;
    writeln!(handle, "Build Summary")?;
    writeln!(handle, "=============")?;
    for report in &summary.formats {
        writeln!(handle)?;
        writeln!(handle, "{} ({} variants)", report.format, report.variants)?;
        writeln!(handle, "  Compiled:      {}", report.built)?;
        writeln!(handle, "  Copied:        {}", report.copied)?;
        writeln!(handle, "  Declarations:  {}", report.declarations)?;
        let failures = report.compile_failures + report.declaration_failures;
        if failures > 0 {
            writeln!(handle, "  Failed files:  {failures}")?;
        }
        if let Some(error) = &report.error {
            writeln!(handle, "  FAILED:        {error}")?;
        }
    }

    let stats = &summary.stats;
    writeln!(handle)?;
    writeln!(handle, "Success rate: {:.1}%", stats.success_rate())?;
    Ok(())
}

fn display_root(path: Option<&Utf8Path>) -> &str {
    path.map_or(".", Utf8Path::as_str)
}

// =============================================================================
// MAIN ENTRY POINT
// =============================================================================

/// Application entry point.
#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    // 1. Install color-eyre FIRST (before any potential panics)
    color_eyre::install()?;

    // 2. Parse CLI arguments
    let cli = Cli::parse();

    // 3. Initialize tracing (handles --no-color for log output)
    init_tracing(cli.verbose, cli.no_color);

    // 4. Load configuration
    let project = load_project(&cli)
        .wrap_err_with(|| format!("Failed to load project at {}", display_root(cli.path.as_deref())))?;

    // 5. Route to appropriate command
    match &cli.command {
        Commands::Build {
            format,
            output_logs,
            jobs,
        } => {
            if run_build(project, format, *output_logs, *jobs).await? {
                Ok(())
            } else {
                Err(eyre!("One or more formats failed to build"))
            }
        }
        Commands::Config => run_config(&project),
        Commands::Discover { format } => run_discover(&project, (*format).into()).await,
    }
}
