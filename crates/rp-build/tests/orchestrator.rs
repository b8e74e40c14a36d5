//! End-to-end tests for `BuildOrchestrator::process` with recording
//! collaborators.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use parking_lot::Mutex;
use rp_build::{
    BuildOrchestrator, CompileError, CompileRequest, DeclarationEmitter, DeclarationFailure,
    DeclarationRequest, DeclarationSink, Externals, ModuleCompiler, OrchestratorOptions,
};
use rp_core::{BuildFormat, Config, ConfigDefaults, ConfigResolver, Environment, UserConfig};
use tempfile::TempDir;

// ============================================================================
// Recording collaborators
// ============================================================================

/// Records every request and writes a small marker file per output.
#[derive(Debug, Default)]
struct RecordingCompiler {
    requests: Mutex<Vec<CompileRequest>>,
    fail_on: Vec<&'static str>,
}

impl RecordingCompiler {
    fn failing_on(names: &[&'static str]) -> Self {
        Self {
            fail_on: names.to_vec(),
            ..Self::default()
        }
    }

    fn requests(&self) -> Vec<CompileRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl ModuleCompiler for RecordingCompiler {
    async fn compile(&self, request: &CompileRequest) -> Result<(), CompileError> {
        self.requests.lock().push(request.clone());

        if self.fail_on.iter().any(|name| request.input.as_str().ends_with(name)) {
            return Err(CompileError::message("Unexpected token"));
        }

        let env = request.environment.map_or("none", Environment::as_str);
        let marker = if request.minify { "minified" } else { "plain" };
        let contents = format!("// {} {env} {marker}\n", request.format);
        std::fs::write(&request.output, contents).map_err(|e| CompileError::io(&request.output, e))
    }
}

/// Records every batch and writes a stub declaration per request.
#[derive(Debug, Default)]
struct RecordingEmitter {
    batches: Mutex<Vec<Vec<DeclarationRequest>>>,
    fail_on: Option<&'static str>,
}

impl RecordingEmitter {
    fn requested(&self) -> usize {
        self.batches.lock().iter().map(Vec::len).sum()
    }
}

#[async_trait]
impl DeclarationEmitter for RecordingEmitter {
    async fn emit_batch(
        &self,
        requests: &[DeclarationRequest],
        sink: &DeclarationSink,
    ) -> Vec<DeclarationFailure> {
        self.batches.lock().push(requests.to_vec());

        let mut failures = Vec::new();
        for request in requests {
            let result = match self.fail_on {
                Some(name) if request.input.as_str().ends_with(name) => {
                    Err(CompileError::message("cannot infer type"))
                }
                _ => sink.write(&request.output, "export {};\n").await,
            };
            if let Err(error) = result {
                failures.push(DeclarationFailure {
                    input: request.input.clone(),
                    error,
                });
            }
        }
        failures
    }
}

/// Tracks how many compiles and declaration batches run at once.
#[derive(Debug, Default)]
struct InFlight {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl InFlight {
    async fn occupy(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(5)).await;
        self.current.fetch_sub(1, Ordering::SeqCst);
    }

    fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
struct SlowCompiler(Arc<InFlight>);

#[async_trait]
impl ModuleCompiler for SlowCompiler {
    async fn compile(&self, request: &CompileRequest) -> Result<(), CompileError> {
        self.0.occupy().await;
        std::fs::write(&request.output, "").map_err(|e| CompileError::io(&request.output, e))
    }
}

#[derive(Debug)]
struct SlowEmitter(Arc<InFlight>);

#[async_trait]
impl DeclarationEmitter for SlowEmitter {
    async fn emit_batch(
        &self,
        requests: &[DeclarationRequest],
        sink: &DeclarationSink,
    ) -> Vec<DeclarationFailure> {
        self.0.occupy().await;
        let mut failures = Vec::new();
        for request in requests {
            if let Err(error) = sink.write(&request.output, "export {};\n").await {
                failures.push(DeclarationFailure {
                    input: request.input.clone(),
                    error,
                });
            }
        }
        failures
    }
}

// ============================================================================
// Fixtures
// ============================================================================

struct Project {
    _dir: TempDir,
    root: Utf8PathBuf,
}

impl Project {
    fn new(files: &[&str]) -> Self {
        let dir = TempDir::new().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        for file in files {
            let path = root.join(file);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(&path, format!("// {file}\n")).unwrap();
        }
        Self { _dir: dir, root }
    }

    fn config(&self, json: serde_json::Value) -> Config {
        let user = UserConfig::from_value(json).unwrap();
        ConfigResolver::resolve(&self.root, &ConfigDefaults::default(), &user).unwrap()
    }

    fn path(&self, relative: &str) -> Utf8PathBuf {
        self.root.join(relative)
    }

    fn exists(&self, relative: &str) -> bool {
        self.path(relative).is_file()
    }

    fn read(&self, relative: &str) -> String {
        std::fs::read_to_string(self.path(relative)).unwrap()
    }
}

fn orchestrator(compiler: &Arc<RecordingCompiler>) -> BuildOrchestrator {
    BuildOrchestrator::new(Arc::clone(compiler) as Arc<dyn ModuleCompiler>)
}

fn outputs(requests: &[CompileRequest], root: &Utf8Path) -> Vec<String> {
    let mut outputs: Vec<_> = requests
        .iter()
        .map(|r| r.output.strip_prefix(root).unwrap().to_string())
        .collect();
    outputs.sort();
    outputs
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_single_variant_writes_unsuffixed_outputs() {
    let project = Project::new(&["src/index.ts", "src/utils/helper.ts", "src/README.md"]);
    let config = project.config(serde_json::json!({ "formats": ["cjs"] }));
    let compiler = Arc::new(RecordingCompiler::default());

    let summary = orchestrator(&compiler).process(&config).await.unwrap();

    assert!(project.exists("build/cjs/index.js"));
    assert!(project.exists("build/cjs/utils/helper.js"));
    assert!(!project.exists("build/cjs/README.md"));
    assert_eq!(summary.stats.compiled, 2);
    assert_eq!(summary.stats.copied, 0);
    assert!(summary.stats.is_clean());

    let requests = compiler.requests();
    assert!(requests.iter().all(|r| r.format == BuildFormat::Cjs));
    assert!(requests.iter().all(|r| r.environment.is_none() && !r.minify));
    assert!(requests.iter().all(|r| r.externals == Externals::All));
}

#[tokio::test]
async fn test_minify_adds_distinct_min_output() {
    let project = Project::new(&["src/index.ts"]);
    let config = project.config(serde_json::json!({
        "formats": ["cjs"],
        "cjs": { "minify": true }
    }));
    let compiler = Arc::new(RecordingCompiler::default());

    let summary = orchestrator(&compiler).process(&config).await.unwrap();

    assert_eq!(summary.formats[0].variants, 2);
    assert_eq!(
        outputs(&compiler.requests(), &project.root),
        ["build/cjs/index.js", "build/cjs/index.min.js"]
    );
    assert_ne!(project.read("build/cjs/index.js"), project.read("build/cjs/index.min.js"));
}

#[tokio::test]
async fn test_distributable_format_builds_every_environment() {
    let project = Project::new(&["src/index.ts"]);
    let config = project.config(serde_json::json!({
        "formats": ["iife"],
        "iife": { "externals": ["react"] }
    }));
    let compiler = Arc::new(RecordingCompiler::default());
    let options = OrchestratorOptions {
        output_logs: true,
        max_parallel_jobs: 1,
    };

    let summary = orchestrator(&compiler)
        .with_options(options)
        .process(&config)
        .await
        .unwrap();

    assert_eq!(summary.stats.compiled, 4);
    assert_eq!(
        outputs(&compiler.requests(), &project.root),
        [
            "build/iife/index.development.js",
            "build/iife/index.development.min.js",
            "build/iife/index.production.js",
            "build/iife/index.production.min.js",
        ]
    );
    assert_eq!(
        project.read("build/iife/index.production.min.js"),
        "// iife production minified\n"
    );
    assert!(
        compiler
            .requests()
            .iter()
            .all(|r| r.externals == Externals::Only(vec!["react".to_owned()]))
    );
}

#[tokio::test]
async fn test_assets_and_declaration_files_are_copied_once() {
    let project = Project::new(&[
        "src/index.ts",
        "src/images/logo.png",
        "src/types/global.d.ts",
        "src/notes.txt",
    ]);
    let config = project.config(serde_json::json!({
        "formats": ["cjs"],
        "cjs": { "minify": true, "assets": ["**/*.png"] }
    }));
    let compiler = Arc::new(RecordingCompiler::default());

    let summary = orchestrator(&compiler).process(&config).await.unwrap();

    assert!(project.exists("build/cjs/images/logo.png"));
    assert!(project.exists("build/cjs/types/global.d.ts"));
    assert!(!project.exists("build/cjs/notes.txt"));
    assert_eq!(project.read("build/cjs/images/logo.png"), "// src/images/logo.png\n");
    assert_eq!(summary.stats.copied, 2);
    assert_eq!(summary.formats[0].copied, 2);
}

#[tokio::test]
async fn test_exclude_patterns_are_honored() {
    let project = Project::new(&["src/a.ts", "src/internal/b.ts", "src/internal/c.ts"]);
    let config = project.config(serde_json::json!({
        "formats": ["es"],
        "es": { "exclude": ["internal/**"] }
    }));
    let compiler = Arc::new(RecordingCompiler::default());

    orchestrator(&compiler).process(&config).await.unwrap();

    assert_eq!(outputs(&compiler.requests(), &project.root), ["build/es/a.js"]);
    assert!(!project.path("build/es/internal").exists());
}

#[tokio::test]
async fn test_formats_write_to_separate_trees() {
    let project = Project::new(&["src/index.ts"]);
    let config = project.config(serde_json::json!({ "formats": ["cjs", "es"] }));
    let compiler = Arc::new(RecordingCompiler::default());

    let summary = orchestrator(&compiler).process(&config).await.unwrap();

    let formats: Vec<_> = summary.formats.iter().map(|r| r.format).collect();
    assert_eq!(formats, [BuildFormat::Cjs, BuildFormat::Es]);
    assert_eq!(project.read("build/cjs/index.js"), "// cjs none plain\n");
    assert_eq!(project.read("build/es/index.js"), "// es none plain\n");
    assert_eq!(summary.format(BuildFormat::Cjs).unwrap().built, 1);
    assert_eq!(summary.format(BuildFormat::Es).unwrap().built, 1);
}

#[tokio::test]
async fn test_compile_failure_does_not_abort_batch() {
    let project = Project::new(&["src/index.ts", "src/broken.ts", "src/other.ts"]);
    let config = project.config(serde_json::json!({ "formats": ["cjs"] }));
    let compiler = Arc::new(RecordingCompiler::failing_on(&["broken.ts"]));

    let summary = orchestrator(&compiler).process(&config).await.unwrap();

    assert_eq!(compiler.requests().len(), 3);
    assert_eq!(summary.stats.compiled, 2);
    assert_eq!(summary.stats.compile_failures, 1);
    assert!(!summary.has_failures());
    assert!(!summary.stats.is_clean());
    assert!(project.exists("build/cjs/index.js"));
    assert!(project.exists("build/cjs/other.js"));
    assert!(!project.exists("build/cjs/broken.js"));
}

#[tokio::test]
async fn test_declarations_are_memoized_per_format() {
    let project = Project::new(&["src/index.ts", "src/utils/helper.ts", "src/legacy.js"]);
    let config = project.config(serde_json::json!({
        "formats": ["cjs", "es"],
        "defaults": { "minify": true }
    }));
    let compiler = Arc::new(RecordingCompiler::default());
    let emitter = Arc::new(RecordingEmitter::default());

    let summary = orchestrator(&compiler)
        .with_declaration_emitter(Arc::clone(&emitter) as Arc<dyn DeclarationEmitter>)
        .process(&config)
        .await
        .unwrap();

    // Two variants per format, but each declaration is claimed once per format.
    assert_eq!(emitter.requested(), 4);
    assert_eq!(summary.stats.declarations, 4);
    assert!(project.exists("build/cjs/index.d.ts"));
    assert!(project.exists("build/cjs/utils/helper.d.ts"));
    assert!(project.exists("build/es/index.d.ts"));
    assert!(!project.exists("build/cjs/legacy.d.ts"));
}

#[tokio::test]
async fn test_declarations_respect_format_flag() {
    let project = Project::new(&["src/index.ts"]);
    let config = project.config(serde_json::json!({
        "formats": ["cjs", "umd"],
        "cjs": { "declarations": false }
    }));
    let compiler = Arc::new(RecordingCompiler::default());
    let emitter = Arc::new(RecordingEmitter::default());

    let summary = orchestrator(&compiler)
        .with_declaration_emitter(Arc::clone(&emitter) as Arc<dyn DeclarationEmitter>)
        .process(&config)
        .await
        .unwrap();

    assert_eq!(emitter.requested(), 0);
    assert_eq!(summary.stats.declarations, 0);
}

#[tokio::test]
async fn test_declaration_failure_is_counted() {
    let project = Project::new(&["src/index.ts", "src/helper.ts"]);
    let config = project.config(serde_json::json!({ "formats": ["es"] }));
    let compiler = Arc::new(RecordingCompiler::default());
    let emitter = Arc::new(RecordingEmitter {
        fail_on: Some("helper.ts"),
        ..RecordingEmitter::default()
    });

    let summary = orchestrator(&compiler)
        .with_declaration_emitter(Arc::clone(&emitter) as Arc<dyn DeclarationEmitter>)
        .process(&config)
        .await
        .unwrap();

    let report = summary.format(BuildFormat::Es).unwrap();
    assert_eq!(report.declarations, 1);
    assert_eq!(report.declaration_failures, 1);
    assert!(!report.is_failed());
    assert!(project.exists("build/es/index.d.ts"));
}

#[tokio::test]
async fn test_copy_failure_fails_format_but_later_formats_run() {
    let project = Project::new(&["src/index.ts", "src/logo.png", "build/cjs"]);
    let config = project.config(serde_json::json!({
        "formats": ["cjs", "es"],
        "defaults": { "assets": ["*.png"] }
    }));
    let compiler = Arc::new(RecordingCompiler::default());

    let summary = orchestrator(&compiler).process(&config).await.unwrap();

    let cjs = summary.format(BuildFormat::Cjs).unwrap();
    assert!(cjs.is_failed());
    let es = summary.format(BuildFormat::Es).unwrap();
    assert!(!es.is_failed());
    assert_eq!(es.copied, 1);
    assert!(project.exists("build/es/logo.png"));
    assert!(project.exists("build/es/index.js"));
    assert!(summary.has_failures());
    assert_eq!(summary.stats.formats_failed, 1);
    assert_eq!(summary.stats.formats_completed, 1);
}

#[tokio::test]
async fn test_missing_source_root_is_fatal() {
    let project = Project::new(&["lib/index.ts"]);
    let config = project.config(serde_json::json!({ "formats": ["cjs"] }));
    let compiler = Arc::new(RecordingCompiler::default());

    let err = orchestrator(&compiler).process(&config).await.unwrap_err();

    assert!(err.is_fatal());
    assert!(compiler.requests().is_empty());
}

#[tokio::test]
async fn test_entry_module_gets_configured_name() {
    let project = Project::new(&["src/index.ts", "src/helper.ts"]);
    let config = project.config(serde_json::json!({
        "formats": ["umd"],
        "moduleName": "myLibrary"
    }));
    let compiler = Arc::new(RecordingCompiler::default());

    orchestrator(&compiler).process(&config).await.unwrap();

    let requests = compiler.requests();
    let entry = requests
        .iter()
        .find(|r| r.input.as_str().ends_with("index.ts"))
        .unwrap();
    assert_eq!(entry.module_name, "myLibrary");
    assert!(
        requests
            .iter()
            .filter(|r| r.input.as_str().ends_with("helper.ts"))
            .all(|r| r.module_name != "myLibrary")
    );
}

#[tokio::test]
async fn test_rerun_overwrites_outputs() {
    let project = Project::new(&["src/index.ts", "src/logo.png"]);
    let config = project.config(serde_json::json!({
        "formats": ["cjs"],
        "cjs": { "assets": ["**"] }
    }));
    let compiler = Arc::new(RecordingCompiler::default());
    let orchestrator = orchestrator(&compiler);

    let first = orchestrator.process(&config).await.unwrap();
    let second = orchestrator.process(&config).await.unwrap();

    assert_eq!(first.stats, second.stats);
    assert_eq!(project.read("build/cjs/index.js"), "// cjs none plain\n");
}

#[tokio::test]
async fn test_job_limit_covers_declaration_batches() {
    let project = Project::new(&["src/index.ts", "src/a.ts", "src/b.ts"]);
    let config = project.config(serde_json::json!({ "formats": ["cjs"] }));
    let in_flight = Arc::new(InFlight::default());
    let options = OrchestratorOptions {
        output_logs: false,
        max_parallel_jobs: 1,
    };

    let summary = BuildOrchestrator::new(Arc::new(SlowCompiler(Arc::clone(&in_flight))))
        .with_declaration_emitter(Arc::new(SlowEmitter(Arc::clone(&in_flight))))
        .with_options(options)
        .process(&config)
        .await
        .unwrap();

    assert_eq!(summary.stats.compiled, 3);
    assert_eq!(summary.stats.declarations, 3);
    assert_eq!(in_flight.peak(), 1);
}
