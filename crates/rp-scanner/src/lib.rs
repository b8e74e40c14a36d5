//! Module discovery and filtering for rollpack.
//!
//! This crate turns a source directory into a typed inventory of modules and
//! selects, per output format, which of them are built and which are copied.
//!
//! # Overview
//!
//! - [`ModuleWalker`]: concurrent directory traversal with a barrier join
//! - [`filter_modules`]: include, exclude and asset selection for one format
//! - [`DiscoverySummary`]: per-kind counts for logs and the CLI
//!
//! # Example
//!
//! ```no_run
//! use rp_core::{BuildFormat, ConfigDefaults, ConfigResolver, UserConfig};
//! use rp_scanner::{DiscoverySummary, discover, filter_modules};
//! use camino::Utf8Path;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigResolver::resolve(
//!     Utf8Path::new("/proj"),
//!     &ConfigDefaults::default(),
//!     &UserConfig::default(),
//! )?;
//! let cjs = config.format(BuildFormat::Cjs).ok_or("cjs missing")?;
//!
//! let modules = discover(cjs).await?;
//! let summary = DiscoverySummary::from_modules(&modules);
//! println!("{} modules, {} build files", summary.total, summary.build_files);
//!
//! let files = filter_modules(&modules, cjs);
//! println!("{} to build, {} to copy", files.build_files.len(), files.copy_files.len());
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! ```text
//! discover(FormatConfig)
//!     │
//!     └── ModuleWalker
//!             │
//!             ├── walk_dir(root) ── JoinSet ──┬── walk_dir(child a)
//!             │                               └── walk_dir(child b) ── ...
//!             │
//!             └── sort by relative path, number from 1
//!
//! filter_modules(modules, FormatConfig) -> ModuleFiles
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

mod error;
mod filter;
mod walker;

pub use error::ScanError;
pub use filter::filter_modules;
pub use walker::{DiscoveryRules, ModuleWalker, PRUNED_DIRECTORIES, discover, test_file_regex};

use camino::Utf8PathBuf;
use rp_core::{FileKind, Module};
use serde::Serialize;

/// Counts of discovered modules by kind.
///
/// # Examples
///
/// ```
/// use rp_scanner::DiscoverySummary;
///
/// let summary = DiscoverySummary::from_modules(&[]);
/// assert_eq!(summary.total, 0);
/// assert!(summary.entry.is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoverySummary {
    /// All discovered modules.
    pub total: usize,
    /// Build files.
    pub build_files: usize,
    /// Asset files.
    pub asset_files: usize,
    /// Type declaration files.
    pub declaration_files: usize,
    /// Relative path of the entry file, if it was found.
    pub entry: Option<Utf8PathBuf>,
}

impl DiscoverySummary {
    /// Summarizes an inventory.
    #[must_use]
    pub fn from_modules(modules: &[Module]) -> Self {
        let mut summary = Self {
            total: modules.len(),
            ..Self::default()
        };

        for module in modules {
            match module.kind {
                FileKind::Build => summary.build_files += 1,
                FileKind::Asset => summary.asset_files += 1,
                FileKind::TypeDeclaration => summary.declaration_files += 1,
            }
            if module.is_entry && summary.entry.is_none() {
                summary.entry = Some(module.relative_path());
            }
        }

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8Path;
    use rp_core::{BuildFormat, ConfigDefaults, ConfigResolver, UserConfig};
    use std::fs;
    use tempfile::TempDir;

    fn project(files: &[&str]) -> (TempDir, Utf8PathBuf) {
        let dir = TempDir::new().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        for file in files {
            let path = root.join(file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, "x").unwrap();
        }
        (dir, root)
    }

    fn resolve(root: &Utf8Path, json: serde_json::Value) -> rp_core::Config {
        let user = UserConfig::from_value(json).unwrap();
        ConfigResolver::resolve(root, &ConfigDefaults::default(), &user).unwrap()
    }

    #[tokio::test]
    async fn test_discover_then_filter_scenario() {
        let (_dir, root) = project(&["src/index.ts", "src/utils/helper.ts", "src/logo.png"]);
        let config = resolve(
            &root,
            serde_json::json!({ "defaults": { "extensions": [".ts"], "assets": ["**"] } }),
        );
        let cjs = config.format(BuildFormat::Cjs).unwrap();

        let modules = discover(cjs).await.unwrap();
        let summary = DiscoverySummary::from_modules(&modules);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.build_files, 2);
        assert_eq!(summary.asset_files, 1);
        assert_eq!(summary.entry, Some(Utf8PathBuf::from("index.ts")));

        let files = filter_modules(&modules, cjs);
        assert_eq!(files.build_files.len(), 2);
        assert_eq!(files.copy_files.len(), 1);
        assert_eq!(files.copy_files[0].file_name, "logo.png");
    }

    #[tokio::test]
    async fn test_discover_uses_format_source_root() {
        let (_dir, root) = project(&["src/index.ts", "browser/main.ts"]);
        let config = resolve(
            &root,
            serde_json::json!({ "iife": { "src": "./browser", "entryFile": "main.ts" } }),
        );

        let iife = config.format(BuildFormat::Iife).unwrap();
        let modules = discover(iife).await.unwrap();
        assert_eq!(modules.len(), 1);
        assert!(modules[0].is_entry);
        assert_eq!(modules[0].module_name, config.module_name);
    }

    #[tokio::test]
    async fn test_discover_missing_source_root_fails() {
        let (_dir, root) = project(&[]);
        let config = resolve(&root, serde_json::json!({}));

        let err = discover(config.format(BuildFormat::Es).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, ScanError::Config(_)));
    }
}
