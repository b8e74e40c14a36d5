//! Concurrent directory traversal.
//!
//! This module provides [`ModuleWalker`], which walks a source root and
//! produces one [`Module`] per file.
//!
//! # Features
//!
//! - One task per subdirectory, joined before the parent returns
//! - Prunes dependency and version-control directories
//! - Drops test, spec and story files before classification
//! - Follows symbolic links, visiting each real directory once
//! - Converts paths to UTF-8 [`Utf8PathBuf`]
//!
//! # Examples
//!
//! ```no_run
//! use rp_scanner::{DiscoveryRules, ModuleWalker};
//! use camino::Utf8Path;
//!
//! # async fn run() -> Result<(), rp_scanner::ScanError> {
//! let rules = DiscoveryRules::new([".ts"], Utf8Path::new("/proj/src/index"), "demo");
//! let walker = ModuleWalker::new(Utf8Path::new("/proj/src"), rules);
//! let modules = walker.discover().await?;
//!
//! for module in &modules {
//!     println!("{} ({})", module.relative_path(), module.kind.label());
//! }
//! # Ok(())
//! # }
//! ```

use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use camino::{Utf8Path, Utf8PathBuf};
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use parking_lot::Mutex;
use regex::{Regex, RegexBuilder};
use rp_core::types::split_file_name;
use rp_core::{FileKind, FormatConfig, FxHashSet, Module, ModuleId, naming};
use tokio::task::JoinSet;
use tracing::{debug, info, trace, warn};

use crate::error::ScanError;

/// Directories that are never descended into.
pub const PRUNED_DIRECTORIES: &[&str] = &[
    "node_modules",
    "bower_components",
    "jspm_packages",
    ".git",
    ".svn",
    ".hg",
];

/// File name suffixes of test, spec and story files.
const TEST_FILE_PATTERN: &str = r"\.(spec|test|stories|tests|specs|cy|snap)(\.[\w-]+)*$";

/// Global cache for the compiled test-file pattern.
static TEST_FILE_REGEX: OnceLock<Regex> = OnceLock::new();

/// Returns the compiled test-file pattern.
///
/// The pattern is compiled once and cached for all subsequent calls.
///
/// # Errors
///
/// Returns [`ScanError::Pattern`] if the pattern fails to compile.
pub fn test_file_regex() -> Result<&'static Regex, ScanError> {
    if let Some(regex) = TEST_FILE_REGEX.get() {
        return Ok(regex);
    }

    let regex = RegexBuilder::new(TEST_FILE_PATTERN)
        .case_insensitive(true)
        .build()?;

    Ok(TEST_FILE_REGEX.get_or_init(|| regex))
}

/// The parts of a format configuration discovery depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryRules {
    /// Recognized source extensions, with the leading dot.
    pub extensions: Vec<String>,
    /// Absolute entry file path, with or without extension.
    pub entry_file: Utf8PathBuf,
    /// Module name given to the entry file.
    pub entry_module_name: String,
}

impl DiscoveryRules {
    /// Creates discovery rules.
    #[must_use]
    pub fn new<I, S>(extensions: I, entry_file: &Utf8Path, entry_module_name: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            extensions: extensions.into_iter().map(Into::into).collect(),
            entry_file: entry_file.to_owned(),
            entry_module_name: entry_module_name.to_owned(),
        }
    }

    /// Extracts discovery rules from a resolved format configuration.
    #[must_use]
    pub fn from_format(config: &FormatConfig) -> Self {
        Self {
            extensions: config.extensions.to_vec(),
            entry_file: config.entry_file.clone(),
            entry_module_name: config.module_name.clone(),
        }
    }
}

/// A walker that discovers modules under a source root.
///
/// # Design
///
/// Each directory visit lists its entries, classifies files in place and
/// spawns one task per child directory onto a [`JoinSet`]. A visit only
/// resolves once every child task has finished, so the root visit resolves
/// after the whole tree has been read. The first failure aborts the walk and
/// drops the remaining tasks.
///
/// Sibling directories finish in no particular order; the final inventory is
/// sorted by relative path and numbered from 1.
#[derive(Debug)]
pub struct ModuleWalker {
    /// The source root.
    root: Utf8PathBuf,
    /// Classification and entry rules.
    rules: DiscoveryRules,
    /// Additional directory names to prune.
    skip_dirs: Vec<String>,
    /// Whether to follow symbolic links.
    follow_links: bool,
}

impl ModuleWalker {
    /// Creates a walker for `root`.
    ///
    /// The root is validated when [`discover`](Self::discover) runs.
    #[must_use]
    pub fn new(root: &Utf8Path, rules: DiscoveryRules) -> Self {
        Self {
            root: root.to_owned(),
            rules,
            skip_dirs: Vec::new(),
            follow_links: true,
        }
    }

    /// Adds directory names to prune, in addition to [`PRUNED_DIRECTORIES`].
    #[must_use]
    pub fn with_skip_dirs(mut self, dirs: &[&str]) -> Self {
        self.skip_dirs.extend(dirs.iter().map(ToString::to_string));
        self
    }

    /// Configures whether to follow symbolic links.
    ///
    /// Symbolic links are followed by default.
    #[must_use]
    pub const fn with_follow_links(mut self, follow: bool) -> Self {
        self.follow_links = follow;
        self
    }

    async fn validate_root(&self) -> Result<(), ScanError> {
        let root = &self.root;
        match tokio::fs::metadata(root).await {
            Ok(metadata) if metadata.is_dir() => Ok(()),
            Ok(_) => Err(ScanError::config(format!(
                "root path is not a directory: {root}"
            ))),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(ScanError::config(format!(
                "root path does not exist: {root}"
            ))),
            Err(e) => Err(ScanError::metadata(root.clone(), e)),
        }
    }

    /// Returns the root directory being walked.
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Walks the tree and returns every discovered module.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Config`] if the root doesn't exist or isn't a
    /// directory. Any unreadable directory or entry, non-UTF-8 path, or failed
    /// sub-walk aborts the whole walk.
    pub async fn discover(&self) -> Result<Vec<Module>, ScanError> {
        self.validate_root().await?;

        let context = Arc::new(WalkContext {
            root: self.root.clone(),
            rules: self.rules.clone(),
            skip_dirs: self.skip_dirs.clone(),
            follow_links: self.follow_links,
            test_files: test_file_regex()?,
            visited: Mutex::new(FxHashSet::default()),
        });

        if self.follow_links {
            context.first_visit(&self.root).await?;
        }

        let mut modules = walk_dir(context, self.root.clone()).await?;
        modules.sort_by_cached_key(Module::relative_path);
        for (id, module) in (1_u64..).zip(modules.iter_mut()) {
            module.id = ModuleId::new(id);
        }

        info!(root = %self.root, modules = modules.len(), "Discovery complete");
        Ok(modules)
    }
}

/// Discovers the modules under a format's source root.
///
/// # Errors
///
/// See [`ModuleWalker::discover`].
pub async fn discover(config: &FormatConfig) -> Result<Vec<Module>, ScanError> {
    ModuleWalker::new(&config.src, DiscoveryRules::from_format(config))
        .discover()
        .await
}

/// State shared by every task of one walk.
struct WalkContext {
    root: Utf8PathBuf,
    rules: DiscoveryRules,
    skip_dirs: Vec<String>,
    follow_links: bool,
    test_files: &'static Regex,
    /// Canonical directories already visited, guarding against link cycles.
    visited: Mutex<FxHashSet<PathBuf>>,
}

/// Returns `true` if a directory name should be pruned.
fn is_pruned(name: &str, skip_dirs: &[String]) -> bool {
    PRUNED_DIRECTORIES.contains(&name) || skip_dirs.iter().any(|d| d == name)
}

impl WalkContext {
    /// Records a directory; returns `false` if its real path was seen before.
    async fn first_visit(&self, dir: &Utf8Path) -> Result<bool, ScanError> {
        let canonical = tokio::fs::canonicalize(dir)
            .await
            .map_err(|e| ScanError::metadata(dir, e))?;
        Ok(self.visited.lock().insert(canonical))
    }

    fn module_for(&self, dir: &Utf8Path, path: Utf8PathBuf, file_name: &str) -> Module {
        let (base_name, extension) = split_file_name(file_name);
        let kind = FileKind::classify(extension, &self.rules.extensions);

        let is_entry = path == self.rules.entry_file
            || (kind == FileKind::Build && dir.join(base_name) == self.rules.entry_file);

        let module_name = if is_entry {
            self.rules.entry_module_name.clone()
        } else {
            naming::camel_case(base_name)
        };

        let location_relative_to_src = dir
            .strip_prefix(&self.root)
            .map(Utf8Path::to_path_buf)
            .unwrap_or_default();

        Module {
            id: ModuleId::default(),
            location_relative_to_src,
            absolute_location: path,
            base_name: base_name.to_owned(),
            file_name: file_name.to_owned(),
            extension: extension.to_owned(),
            module_name,
            kind,
            is_entry,
        }
    }
}

/// Visits one directory and, through spawned tasks, everything below it.
fn walk_dir(
    context: Arc<WalkContext>,
    dir: Utf8PathBuf,
) -> BoxFuture<'static, Result<Vec<Module>, ScanError>> {
    async move {
        let mut entries = tokio::fs::read_dir(&dir)
            .await
            .map_err(|e| ScanError::read_dir(dir.clone(), e))?;

        let mut subdirs = JoinSet::new();
        let mut modules = Vec::new();

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| ScanError::read_dir(dir.clone(), e))?
        {
            let path = Utf8PathBuf::from_path_buf(entry.path()).map_err(ScanError::NonUtf8Path)?;
            let Some(name) = path.file_name().map(str::to_owned) else {
                continue;
            };

            let file_type = entry
                .file_type()
                .await
                .map_err(|e| ScanError::metadata(path.clone(), e))?;

            let (is_dir, is_file) = if file_type.is_symlink() {
                if !context.follow_links {
                    trace!(path = %path, "Skipping symbolic link");
                    continue;
                }
                match tokio::fs::metadata(&path).await {
                    Ok(metadata) => (metadata.is_dir(), metadata.is_file()),
                    Err(e) if e.kind() == ErrorKind::NotFound => {
                        warn!(path = %path, "Skipping broken symbolic link");
                        continue;
                    }
                    Err(e) => return Err(ScanError::metadata(path, e)),
                }
            } else {
                (file_type.is_dir(), file_type.is_file())
            };

            if is_dir {
                if is_pruned(&name, &context.skip_dirs) {
                    trace!(path = %path, "Pruned directory");
                    continue;
                }
                if context.follow_links && !context.first_visit(&path).await? {
                    debug!(path = %path, "Directory already visited through a link");
                    continue;
                }
                subdirs.spawn(walk_dir(Arc::clone(&context), path));
            } else if is_file {
                if context.test_files.is_match(&name) {
                    trace!(path = %path, "Skipping test file");
                    continue;
                }
                modules.push(context.module_for(&dir, path, &name));
            }
        }

        while let Some(result) = subdirs.join_next().await {
            modules.extend(result??);
        }

        Ok(modules)
    }
    .boxed()
}
