//! Per-format module selection.

use rp_core::pattern::any_match;
use rp_core::{FileKind, FormatConfig, Module, ModuleFiles};
use tracing::trace;

/// Splits discovered modules into the files a format builds and copies.
///
/// - A module matching any `exclude` matcher is dropped.
/// - With a non-empty `include` list, a module must match one of them.
/// - Build files are built.
/// - Declaration files are copied.
/// - Asset files are copied only when an `assets` matcher also matches.
///
/// Matchers are tested against the module's path relative to the source root.
/// Input order is preserved.
#[must_use]
pub fn filter_modules(modules: &[Module], config: &FormatConfig) -> ModuleFiles {
    let mut files = ModuleFiles::default();

    for module in modules {
        let path = module.match_path();

        if any_match(&config.exclude, &path) {
            trace!(path = %path, format = %config.format, "Excluded");
            continue;
        }
        if !config.include.is_empty() && !any_match(&config.include, &path) {
            trace!(path = %path, format = %config.format, "Not included");
            continue;
        }

        match module.kind {
            FileKind::Build => files.build_files.push(module.clone()),
            FileKind::TypeDeclaration => files.copy_files.push(module.clone()),
            FileKind::Asset if any_match(&config.assets, &path) => {
                files.copy_files.push(module.clone());
            }
            FileKind::Asset => {}
        }
    }

    files
}
