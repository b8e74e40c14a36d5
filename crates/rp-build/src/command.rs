//! Subprocess-backed collaborators.
//!
//! [`CommandCompiler`] and [`CommandDeclarationEmitter`] run an external
//! toolchain with an argument template. Templates use `{placeholder}` tokens:
//!
//! | Placeholder | Value |
//! |---|---|
//! | `{input}` | absolute source file |
//! | `{output}` | absolute destination file |
//! | `{format}` | `cjs`, `es`, `iife` or `umd` |
//! | `{name}` | module name |
//! | `{env}` | `development` or `production` |
//! | `{sourcemap}` | `true` or `inline` |
//!
//! An argument whose placeholder has no value (no environment, source maps
//! disabled) is dropped, so flags are best written as `--flag={value}`.

use std::process::Output;

use async_trait::async_trait;
use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::debug;

use crate::compiler::{
    CompileRequest, DeclarationEmitter, DeclarationFailure, DeclarationRequest, DeclarationSink,
    Externals, ModuleCompiler,
};
use crate::error::CompileError;

/// Toolchain settings, read from the `toolchain` key of the configuration file.
///
/// # Examples
///
/// ```
/// use rp_build::ToolchainSettings;
///
/// let settings: ToolchainSettings = serde_json::from_value(serde_json::json!({
///     "program": "node",
///     "args": ["scripts/compile.js", "{input}", "{output}"],
///     "maxParallelJobs": 2
/// }))
/// .unwrap();
///
/// assert_eq!(settings.program, "node");
/// assert_eq!(settings.max_parallel_jobs, Some(2));
/// assert!(settings.declaration_program.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ToolchainSettings {
    /// Compiler program.
    pub program: String,
    /// Compiler argument template.
    pub args: Vec<String>,
    /// Appended when minifying.
    pub minify_args: Vec<String>,
    /// Appended when interop helpers are enabled.
    pub interop_args: Vec<String>,
    /// Appended once when every import is external.
    ///
    /// Defaults to `rollup-plugin-node-externals`, which has to be installed
    /// in the project. An empty list leaves bare imports to rollup's own
    /// unresolved-import handling.
    pub all_externals_args: Vec<String>,
    /// Appended once per external, with `{external}` set.
    pub external_args: Vec<String>,
    /// Appended once per global, with `{name}` (import) and `{global}` set.
    pub global_args: Vec<String>,
    /// Declaration program; declarations are skipped when unset.
    pub declaration_program: Option<String>,
    /// Declaration argument template; the program prints the declaration.
    pub declaration_args: Vec<String>,
    /// Concurrency limit for compiles, copies and declaration batches.
    pub max_parallel_jobs: Option<usize>,
}

impl Default for ToolchainSettings {
    fn default() -> Self {
        let strings = |args: &[&str]| args.iter().map(|&arg| arg.to_owned()).collect();
        Self {
            program: "npx".to_owned(),
            args: strings(&[
                "rollup",
                "{input}",
                "--file={output}",
                "--format={format}",
                "--name={name}",
                "--sourcemap={sourcemap}",
                "--environment=NODE_ENV:{env}",
            ]),
            minify_args: strings(&["--plugin=terser"]),
            interop_args: strings(&["--interop=auto"]),
            all_externals_args: strings(&["--plugin=node-externals"]),
            external_args: strings(&["--external={external}"]),
            global_args: strings(&["--globals={name}:{global}"]),
            declaration_program: None,
            declaration_args: Vec::new(),
            max_parallel_jobs: None,
        }
    }
}

impl ToolchainSettings {
    /// Reads the `toolchain` key of a configuration document.
    ///
    /// A missing key yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns a [`serde_json::Error`] if the key has the wrong shape.
    pub fn from_config_value(document: &serde_json::Value) -> Result<Self, serde_json::Error> {
        match document.get("toolchain") {
            Some(value) => Self::deserialize(value),
            None => Ok(Self::default()),
        }
    }
}

/// Values available to an argument template.
#[derive(Debug, Default)]
struct Placeholders<'a> {
    input: Option<&'a str>,
    output: Option<&'a str>,
    format: Option<&'a str>,
    name: Option<&'a str>,
    env: Option<&'a str>,
    sourcemap: Option<&'a str>,
    external: Option<&'a str>,
    global: Option<&'a str>,
}

impl<'a> Placeholders<'a> {
    fn for_request(request: &'a CompileRequest) -> Self {
        Self {
            input: Some(request.input.as_str()),
            output: Some(request.output.as_str()),
            format: Some(request.format.as_str()),
            name: Some(request.module_name.as_str()),
            env: request.environment.map(|env| env.as_str()),
            sourcemap: request.sourcemap.as_arg(),
            ..Self::default()
        }
    }

    /// Returns `Some(value)` for a known key (with `None` when unset), and
    /// `None` for unknown keys.
    fn lookup(&self, key: &str) -> Option<Option<&'a str>> {
        match key {
            "input" => Some(self.input),
            "output" => Some(self.output),
            "format" => Some(self.format),
            "name" => Some(self.name),
            "env" => Some(self.env),
            "sourcemap" => Some(self.sourcemap),
            "external" => Some(self.external),
            "global" => Some(self.global),
            _ => None,
        }
    }
}

/// Renders one argument. Returns `None` when a placeholder has no value.
///
/// Unknown `{tokens}` are kept literally.
fn render(template: &str, values: &Placeholders<'_>) -> Option<String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            return Some(out);
        };

        let key = &after[..end];
        match values.lookup(key) {
            Some(Some(value)) => out.push_str(value),
            Some(None) => return None,
            None => {
                out.push('{');
                out.push_str(key);
                out.push('}');
            }
        }
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    Some(out)
}

fn render_all(templates: &[String], values: &Placeholders<'_>) -> Vec<String> {
    templates
        .iter()
        .filter_map(|template| render(template, values))
        .collect()
}

fn failed(program: &str, output: &Output) -> CompileError {
    CompileError::Failed {
        program: program.to_owned(),
        status: output.status.to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
    }
}

// ============================================================================
// Compiler
// ============================================================================

/// Compiles modules by running an external toolchain once per file.
#[derive(Debug, Clone)]
pub struct CommandCompiler {
    settings: ToolchainSettings,
    working_dir: Option<Utf8PathBuf>,
}

impl CommandCompiler {
    /// Creates a compiler from toolchain settings.
    #[must_use]
    pub fn new(settings: ToolchainSettings) -> Self {
        Self {
            settings,
            working_dir: None,
        }
    }

    /// Runs the toolchain from `dir` (normally the project root).
    #[must_use]
    pub fn with_working_dir(mut self, dir: impl Into<Utf8PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Renders the full argument list for a request.
    #[must_use]
    pub fn arguments(&self, request: &CompileRequest) -> Vec<String> {
        let settings = &self.settings;
        let values = Placeholders::for_request(request);

        let mut args = render_all(&settings.args, &values);
        if request.minify {
            args.extend(render_all(&settings.minify_args, &values));
        }
        if request.interop {
            args.extend(render_all(&settings.interop_args, &values));
        }

        match &request.externals {
            Externals::All => args.extend(render_all(&settings.all_externals_args, &values)),
            Externals::Only(list) => {
                for external in list {
                    let values = Placeholders {
                        external: Some(external.as_str()),
                        ..Placeholders::for_request(request)
                    };
                    args.extend(render_all(&settings.external_args, &values));
                }
            }
        }

        let mut globals: Vec<_> = request.globals.iter().collect();
        globals.sort();
        for (import, global) in globals {
            let values = Placeholders {
                name: Some(import.as_str()),
                global: Some(global.as_str()),
                ..Placeholders::for_request(request)
            };
            args.extend(render_all(&settings.global_args, &values));
        }

        args
    }
}

#[async_trait]
impl ModuleCompiler for CommandCompiler {
    async fn compile(&self, request: &CompileRequest) -> Result<(), CompileError> {
        let program = &self.settings.program;
        let mut command = Command::new(program);
        command.args(self.arguments(request)).kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }
        if let Some(env) = request.environment {
            command.env("NODE_ENV", env.as_str());
        }

        debug!(program = %program, input = %request.input, output = %request.output, "Running compiler");
        let output = command.output().await.map_err(|source| CompileError::Spawn {
            program: program.clone(),
            source,
        })?;

        if output.status.success() {
            Ok(())
        } else {
            Err(failed(program, &output))
        }
    }
}

// ============================================================================
// Declaration emitter
// ============================================================================

/// Emits declarations by running a program per input and capturing stdout.
#[derive(Debug, Clone)]
pub struct CommandDeclarationEmitter {
    program: String,
    args: Vec<String>,
    working_dir: Option<Utf8PathBuf>,
}

impl CommandDeclarationEmitter {
    /// Creates an emitter, or `None` when no declaration program is configured.
    #[must_use]
    pub fn from_settings(settings: &ToolchainSettings) -> Option<Self> {
        settings.declaration_program.as_ref().map(|program| Self {
            program: program.clone(),
            args: settings.declaration_args.clone(),
            working_dir: None,
        })
    }

    /// Runs the program from `dir`.
    #[must_use]
    pub fn with_working_dir(mut self, dir: impl Into<Utf8PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    async fn emit_one(
        &self,
        request: &DeclarationRequest,
        sink: &DeclarationSink,
    ) -> Result<(), CompileError> {
        let values = Placeholders {
            input: Some(request.input.as_str()),
            output: Some(request.output.as_str()),
            ..Placeholders::default()
        };

        let mut command = Command::new(&self.program);
        command.args(render_all(&self.args, &values)).kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }

        let output = command.output().await.map_err(|source| CompileError::Spawn {
            program: self.program.clone(),
            source,
        })?;
        if !output.status.success() {
            return Err(failed(&self.program, &output));
        }

        sink.write(&request.output, &String::from_utf8_lossy(&output.stdout))
            .await
    }
}

#[async_trait]
impl DeclarationEmitter for CommandDeclarationEmitter {
    async fn emit_batch(
        &self,
        requests: &[DeclarationRequest],
        sink: &DeclarationSink,
    ) -> Vec<DeclarationFailure> {
        let mut failures = Vec::new();
        for request in requests {
            if let Err(error) = self.emit_one(request, sink).await {
                failures.push(DeclarationFailure {
                    input: request.input.clone(),
                    error,
                });
            }
        }
        failures
    }
}
