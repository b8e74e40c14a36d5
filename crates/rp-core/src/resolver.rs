//! Configuration resolution.
//!
//! [`ConfigResolver`] takes built-in [`ConfigDefaults`] and a [`UserConfig`]
//! and produces a [`Config`] in which every format is fully populated:
//!
//! 1. The user's `defaults` block is applied to the shared settings (replace,
//!    with key-wise merge for `globals` and `suffixes`).
//! 2. Each format's own settings (built-in per-format defaults, then the
//!    user's block) inherit any unset field from the merged shared settings.
//!    Pattern lists concatenate shared patterns with the format's own.
//! 3. Paths are made absolute and pattern lists are compiled into matchers.

use camino::Utf8Path;
use smallvec::SmallVec;

use crate::config::{
    BuildFormat, Config, ConfigDefaults, FormatConfig, FormatOverrides, SharedSettings,
    UserConfig,
};
use crate::error::ConfigError;
use crate::loader;
use crate::naming::{self, UNKNOWN_MODULE_NAME};
use crate::paths;
use crate::pattern::{Pattern, compile_all};

/// Resolves layered configuration into a [`Config`].
///
/// The resolver is stateless; `defaults` is only ever borrowed, so one
/// [`ConfigDefaults`] value can serve many resolutions.
///
/// # Examples
///
/// ```
/// use camino::Utf8Path;
/// use rp_core::{BuildFormat, ConfigDefaults, ConfigResolver, UserConfig};
///
/// let defaults = ConfigDefaults::default();
/// let user = UserConfig::default();
/// let config = ConfigResolver::resolve(Utf8Path::new("/proj"), &defaults, &user).unwrap();
///
/// assert_eq!(config.requested, vec![BuildFormat::Cjs, BuildFormat::Es]);
/// let cjs = config.format(BuildFormat::Cjs).unwrap();
/// assert_eq!(cjs.src, "/proj/src");
/// assert_eq!(cjs.out, "/proj/build/cjs");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfigResolver;

impl ConfigResolver {
    /// Resolves `user` over `defaults` for the project rooted at `entry_path`.
    ///
    /// When no module name is configured it is derived from the closest
    /// package manifest, falling back to `"Unknown"`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPath`] if `entry_path` is not absolute, and
    /// [`ConfigError::InvalidOption`] if a requested format's output directory
    /// is its source directory.
    pub fn resolve(
        entry_path: &Utf8Path,
        defaults: &ConfigDefaults,
        user: &UserConfig,
    ) -> Result<Config, ConfigError> {
        if !entry_path.is_absolute() {
            return Err(ConfigError::InvalidPath {
                path: entry_path.to_owned(),
                reason: "project root must be absolute".to_owned(),
            });
        }
        let entry_path = paths::normalize(entry_path);

        let shared = defaults.shared.merged(&user.defaults);
        let module_name = user
            .module_name
            .clone()
            .or_else(|| shared.module_name.clone())
            .unwrap_or_else(|| Self::manifest_module_name(&entry_path));

        let formats = BuildFormat::ALL
            .into_iter()
            .map(|format| {
                let own = user.format(format).merged_over(defaults.format(format));
                Self::resolve_format(format, &entry_path, &module_name, &shared, &own)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let requested = match &user.formats {
            Some(list) => {
                let mut requested = Vec::with_capacity(list.len());
                for format in list {
                    if !requested.contains(format) {
                        requested.push(*format);
                    }
                }
                requested
            }
            None => formats
                .iter()
                .filter(|config| config.enabled)
                .map(|config| config.format)
                .collect(),
        };

        tracing::debug!(
            root = %entry_path,
            module_name = %module_name,
            requested = ?requested,
            "Resolved configuration"
        );

        let config = Config {
            entry_path,
            module_name,
            requested,
            formats,
        };
        config.validate_outputs()?;
        Ok(config)
    }

    fn resolve_format(
        format: BuildFormat,
        entry_path: &Utf8Path,
        module_name: &str,
        shared: &SharedSettings,
        own: &FormatOverrides,
    ) -> Result<FormatConfig, ConfigError> {
        let src = paths::absolutize(entry_path, own.src.as_deref().unwrap_or(&shared.src));
        let out = paths::absolutize(entry_path, own.out.as_deref().unwrap_or(&shared.out));

        let entry_file =
            paths::absolutize(&src, own.entry_file.as_deref().unwrap_or(&shared.entry_file));

        let mut globals = shared.globals.clone();
        if let Some(extra) = &own.globals {
            globals.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
        }

        let suffixes = own
            .suffixes
            .as_ref()
            .map_or_else(|| shared.suffixes.clone(), |s| shared.suffixes.merged(s));

        Ok(FormatConfig {
            format,
            enabled: own.enabled.unwrap_or(shared.enabled),
            src,
            out,
            entry_file,
            module_name: own
                .module_name
                .clone()
                .unwrap_or_else(|| module_name.to_owned()),
            extensions: own
                .extensions
                .as_ref()
                .unwrap_or(&shared.extensions)
                .iter()
                .cloned()
                .collect(),
            include: compile_all(concat(&shared.include, own.include.as_deref())),
            exclude: compile_all(concat(&shared.exclude, own.exclude.as_deref())),
            assets: compile_all(concat(&shared.assets, own.assets.as_deref())),
            interop: own.interop.unwrap_or(shared.interop),
            sourcemap: own.sourcemap.unwrap_or(shared.sourcemap),
            minify: own.minify.unwrap_or(shared.minify),
            declarations: own.declarations.unwrap_or(shared.declarations),
            globals,
            externals: own
                .externals
                .clone()
                .unwrap_or_else(|| shared.externals.clone()),
            envs: own
                .envs
                .as_ref()
                .unwrap_or(&shared.envs)
                .iter()
                .copied()
                .collect::<SmallVec<_>>(),
            suffixes,
        })
    }

    /// Derives the project module name from the closest package manifest.
    fn manifest_module_name(entry_path: &Utf8Path) -> String {
        let manifest = loader::read_package_manifest(entry_path);
        manifest
            .get("name")
            .and_then(serde_json::Value::as_str)
            .and_then(naming::module_name_from_package)
            .unwrap_or_else(|| {
                tracing::debug!(root = %entry_path, "No package name found, using fallback module name");
                UNKNOWN_MODULE_NAME.to_owned()
            })
    }
}

fn concat<'a>(
    shared: &'a [Pattern],
    own: Option<&'a [Pattern]>,
) -> impl Iterator<Item = &'a Pattern> {
    shared.iter().chain(own.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Environment, Sourcemap, SuffixOverrides, SuffixRule};
    use camino::Utf8PathBuf;
    use std::fs;
    use tempfile::TempDir;

    fn project() -> (TempDir, Utf8PathBuf) {
        let dir = TempDir::new().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        (dir, root)
    }

    fn user_config(json: serde_json::Value) -> UserConfig {
        UserConfig::from_value(json).unwrap()
    }

    #[test]
    fn test_resolve_is_deterministic() {
        let (_dir, root) = project();
        let defaults = ConfigDefaults::default();
        let user = user_config(serde_json::json!({
            "defaults": { "exclude": ["**/*.test.ts"], "globals": { "react": "React" } },
            "umd": { "enabled": true, "assets": ["*.png"] }
        }));

        let first = ConfigResolver::resolve(&root, &defaults, &user).unwrap();
        let second = ConfigResolver::resolve(&root, &defaults, &user).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_resolve_does_not_mutate_defaults() {
        let (_dir, root) = project();
        let defaults = ConfigDefaults::default();
        let snapshot = defaults.clone();
        let user = user_config(serde_json::json!({
            "defaults": { "extensions": [".ts"], "minify": true },
            "iife": { "envs": ["production"], "suffixes": { "minified": false } }
        }));

        let _config = ConfigResolver::resolve(&root, &defaults, &user).unwrap();
        assert_eq!(defaults, snapshot);
    }

    #[test]
    fn test_every_format_fully_resolved() {
        let (_dir, root) = project();
        let config =
            ConfigResolver::resolve(&root, &ConfigDefaults::default(), &UserConfig::default())
                .unwrap();

        assert_eq!(config.formats.len(), 4);
        let iife = config.format(BuildFormat::Iife).unwrap();
        assert!(!iife.enabled);
        assert!(iife.minify);
        assert!(!iife.declarations);
        assert_eq!(iife.sourcemap, Sourcemap::Enabled);
        assert_eq!(
            iife.envs.as_slice(),
            &[Environment::Development, Environment::Production]
        );
        assert_eq!(iife.out, root.join("build/iife"));
        assert_eq!(iife.entry_file, root.join("src/index"));
        assert_eq!(iife.extensions.len(), 4);
    }

    #[test]
    fn test_pattern_lists_concatenate() {
        let (_dir, root) = project();
        let user = user_config(serde_json::json!({
            "defaults": { "exclude": ["**/*.test.ts"] },
            "es": { "exclude": ["legacy/**"] }
        }));
        let config = ConfigResolver::resolve(&root, &ConfigDefaults::default(), &user).unwrap();

        let es = config.format(BuildFormat::Es).unwrap();
        let sources: Vec<_> = es.exclude.iter().map(|m| m.source()).collect();
        assert_eq!(sources, vec!["**/*.test.ts", "legacy/**"]);

        let cjs = config.format(BuildFormat::Cjs).unwrap();
        assert_eq!(cjs.exclude.len(), 1);
    }

    #[test]
    fn test_scalars_replace_and_globals_merge() {
        let (_dir, root) = project();
        let user = user_config(serde_json::json!({
            "defaults": { "sourcemap": false, "globals": { "react": "React" } },
            "umd": { "sourcemap": "inline", "globals": { "vue": "Vue" } }
        }));
        let config = ConfigResolver::resolve(&root, &ConfigDefaults::default(), &user).unwrap();

        let umd = config.format(BuildFormat::Umd).unwrap();
        assert_eq!(umd.sourcemap, Sourcemap::Inline);
        assert_eq!(umd.globals.get("react").map(String::as_str), Some("React"));
        assert_eq!(umd.globals.get("vue").map(String::as_str), Some("Vue"));

        let cjs = config.format(BuildFormat::Cjs).unwrap();
        assert_eq!(cjs.sourcemap, Sourcemap::Disabled);
        assert!(cjs.globals.get("vue").is_none());
    }

    #[test]
    fn test_suffix_overrides_merge_key_wise() {
        let (_dir, root) = project();
        let user = UserConfig {
            iife: FormatOverrides {
                suffixes: Some(SuffixOverrides {
                    production: Some(SuffixRule::Omit),
                    ..SuffixOverrides::default()
                }),
                ..FormatOverrides::default()
            },
            ..UserConfig::default()
        };
        let config = ConfigResolver::resolve(&root, &ConfigDefaults::default(), &user).unwrap();

        let iife = config.format(BuildFormat::Iife).unwrap();
        assert_eq!(iife.suffixes.production, SuffixRule::Omit);
        assert_eq!(iife.suffixes.minified, SuffixRule::text("min"));
        assert_eq!(iife.suffixes.development, SuffixRule::text("development"));
    }

    #[test]
    fn test_requested_formats() {
        let (_dir, root) = project();
        let defaults = ConfigDefaults::default();

        let enabled = user_config(serde_json::json!({ "umd": { "enabled": true } }));
        let config = ConfigResolver::resolve(&root, &defaults, &enabled).unwrap();
        assert_eq!(
            config.requested,
            vec![BuildFormat::Cjs, BuildFormat::Es, BuildFormat::Umd]
        );

        let explicit = user_config(serde_json::json!({ "formats": ["iife", "cjs", "iife"] }));
        let config = ConfigResolver::resolve(&root, &defaults, &explicit).unwrap();
        assert_eq!(config.requested, vec![BuildFormat::Iife, BuildFormat::Cjs]);
        let names: Vec<_> = config.requested_formats().map(|f| f.format).collect();
        assert_eq!(names, config.requested);
    }

    #[test]
    fn test_module_name_from_manifest() {
        let (_dir, root) = project();
        fs::write(
            root.join("package.json"),
            r#"{ "name": "@teclone/rollup-all", "version": "1.0.0" }"#,
        )
        .unwrap();

        let config =
            ConfigResolver::resolve(&root, &ConfigDefaults::default(), &UserConfig::default())
                .unwrap();
        assert_eq!(config.module_name, "rollupAll");
        assert_eq!(
            config.format(BuildFormat::Umd).unwrap().module_name,
            "rollupAll"
        );
    }

    #[test]
    fn test_module_name_fallback() {
        let (_dir, root) = project();
        fs::write(root.join("package.json"), "not json").unwrap();

        let config =
            ConfigResolver::resolve(&root, &ConfigDefaults::default(), &UserConfig::default())
                .unwrap();
        assert_eq!(config.module_name, UNKNOWN_MODULE_NAME);
    }

    #[test]
    fn test_explicit_module_name_wins() {
        let (_dir, root) = project();
        let user = user_config(serde_json::json!({
            "defaults": { "moduleName": "Lib" },
            "iife": { "moduleName": "LibBrowser" }
        }));
        let config = ConfigResolver::resolve(&root, &ConfigDefaults::default(), &user).unwrap();
        assert_eq!(config.module_name, "Lib");
        assert_eq!(config.format(BuildFormat::Iife).unwrap().module_name, "LibBrowser");
        assert_eq!(config.format(BuildFormat::Es).unwrap().module_name, "Lib");

        let top_level = user_config(serde_json::json!({
            "moduleName": "Top",
            "defaults": { "moduleName": "Lib" }
        }));
        let config =
            ConfigResolver::resolve(&root, &ConfigDefaults::default(), &top_level).unwrap();
        assert_eq!(config.module_name, "Top");
    }

    #[test]
    fn test_out_equal_to_src_is_rejected() {
        let (_dir, root) = project();
        let user = user_config(serde_json::json!({ "es": { "out": "./src" } }));
        let error = ConfigResolver::resolve(&root, &ConfigDefaults::default(), &user).unwrap_err();
        assert!(matches!(error, ConfigError::InvalidOption { ref option, .. } if option == "es.out"));
    }

    #[test]
    fn test_out_equal_to_src_is_allowed_for_unrequested_format() {
        let (_dir, root) = project();
        let user = user_config(serde_json::json!({
            "formats": ["cjs"],
            "umd": { "enabled": false, "out": "./src" }
        }));
        let config = ConfigResolver::resolve(&root, &ConfigDefaults::default(), &user).unwrap();
        assert_eq!(config.requested, [BuildFormat::Cjs]);

        let umd = config.format(BuildFormat::Umd).unwrap();
        assert_eq!(umd.src, umd.out);
    }

    #[test]
    fn test_validate_outputs_checks_late_requests() {
        let (_dir, root) = project();
        let user = user_config(serde_json::json!({
            "formats": ["cjs"],
            "es": { "out": "./src" }
        }));
        let mut config = ConfigResolver::resolve(&root, &ConfigDefaults::default(), &user).unwrap();
        config.requested.push(BuildFormat::Es);
        let error = config.validate_outputs().unwrap_err();
        assert!(matches!(error, ConfigError::InvalidOption { ref option, .. } if option == "es.out"));
    }

    #[test]
    fn test_relative_entry_path_is_rejected() {
        let error = ConfigResolver::resolve(
            Utf8Path::new("relative/proj"),
            &ConfigDefaults::default(),
            &UserConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(error, ConfigError::InvalidPath { .. }));
    }
}
