//! Configuration structures for rollpack.
//!
//! Configuration comes in three layers:
//!
//! - [`ConfigDefaults`] - built-in shared settings plus partial per-format defaults
//! - [`UserConfig`] - what the user wrote; every field optional
//! - [`Config`] / [`FormatConfig`] - the resolved result, with nothing left unset
//!
//! [`ConfigResolver`](crate::ConfigResolver) turns the first two into the third.
//! The per-field merge strategy lives on [`SharedSettings::merged`] and
//! [`FormatOverrides::merged_over`], so it is visible in one place rather than
//! hidden inside a generic deep merge.

use std::fmt;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::error::ConfigError;
use crate::hash::FxHashMap;
use crate::pattern::{Matcher, Pattern};

/// Output module format.
///
/// `cjs` and `es` are library formats: one output file per source module,
/// every import left external. `iife` and `umd` are distributable formats
/// meant for browsers, usually built once per environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildFormat {
    /// CommonJS modules.
    Cjs,
    /// ECMAScript modules.
    Es,
    /// Immediately-invoked function expression bundles.
    Iife,
    /// Universal module definition bundles.
    Umd,
}

impl BuildFormat {
    /// All formats, in their default processing order.
    pub const ALL: [Self; 4] = [Self::Cjs, Self::Es, Self::Iife, Self::Umd];

    /// Returns the format name as used in configuration files.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cjs => "cjs",
            Self::Es => "es",
            Self::Iife => "iife",
            Self::Umd => "umd",
        }
    }

    /// Returns `true` for browser-oriented formats (`iife`, `umd`).
    #[inline]
    #[must_use]
    pub const fn is_distributable(self) -> bool {
        matches!(self, Self::Iife | Self::Umd)
    }
}

impl fmt::Display for BuildFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build environment a variant is compiled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Development build.
    Development,
    /// Production build.
    Production,
}

impl Environment {
    /// Returns the environment name (`development` or `production`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source map generation mode.
///
/// Written in configuration as `true`, `false`, or `"inline"`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "SourcemapRepr", into = "SourcemapRepr")]
pub enum Sourcemap {
    /// No source map.
    Disabled,
    /// A separate `.map` file next to the output.
    #[default]
    Enabled,
    /// The map is embedded in the output file.
    Inline,
}

impl Sourcemap {
    /// Returns the value passed to toolchains, or `None` when disabled.
    #[must_use]
    pub const fn as_arg(self) -> Option<&'static str> {
        match self {
            Self::Disabled => None,
            Self::Enabled => Some("true"),
            Self::Inline => Some("inline"),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum SourcemapRepr {
    Flag(bool),
    Mode(InlineTag),
}

#[derive(Clone, Copy, Serialize, Deserialize)]
enum InlineTag {
    #[serde(rename = "inline")]
    Inline,
}

impl From<SourcemapRepr> for Sourcemap {
    fn from(repr: SourcemapRepr) -> Self {
        match repr {
            SourcemapRepr::Flag(true) => Self::Enabled,
            SourcemapRepr::Flag(false) => Self::Disabled,
            SourcemapRepr::Mode(InlineTag::Inline) => Self::Inline,
        }
    }
}

impl From<Sourcemap> for SourcemapRepr {
    fn from(sourcemap: Sourcemap) -> Self {
        match sourcemap {
            Sourcemap::Enabled => Self::Flag(true),
            Sourcemap::Disabled => Self::Flag(false),
            Sourcemap::Inline => Self::Mode(InlineTag::Inline),
        }
    }
}

/// How one output-name suffix is rendered.
///
/// Written in configuration as a string, or `false` to omit the suffix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "SuffixRepr", into = "SuffixRepr")]
pub enum SuffixRule {
    /// The suffix is left out of the file name.
    Omit,
    /// The suffix text, without the separating dot.
    Text(String),
}

impl SuffixRule {
    /// Creates a text suffix rule.
    #[must_use]
    pub fn text(suffix: impl Into<String>) -> Self {
        Self::Text(suffix.into())
    }

    /// Returns the suffix text, or `None` when omitted or empty.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) if !text.is_empty() => Some(text),
            _ => None,
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum SuffixRepr {
    Text(String),
    Flag(bool),
}

impl TryFrom<SuffixRepr> for SuffixRule {
    type Error = &'static str;

    fn try_from(repr: SuffixRepr) -> Result<Self, Self::Error> {
        match repr {
            SuffixRepr::Text(text) => Ok(Self::Text(text)),
            SuffixRepr::Flag(false) => Ok(Self::Omit),
            SuffixRepr::Flag(true) => Err("expected a suffix string or `false`"),
        }
    }
}

impl From<SuffixRule> for SuffixRepr {
    fn from(rule: SuffixRule) -> Self {
        match rule {
            SuffixRule::Omit => Self::Flag(false),
            SuffixRule::Text(text) => Self::Text(text),
        }
    }
}

/// Resolved output-name suffix rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suffixes {
    /// Suffix for development variants of multi-environment formats.
    pub development: SuffixRule,
    /// Suffix for production variants of multi-environment formats.
    pub production: SuffixRule,
    /// Suffix for minified variants.
    pub minified: SuffixRule,
}

impl Suffixes {
    /// Returns the rule for an environment.
    #[must_use]
    pub const fn for_environment(&self, environment: Environment) -> &SuffixRule {
        match environment {
            Environment::Development => &self.development,
            Environment::Production => &self.production,
        }
    }

    /// Applies overrides key by key.
    #[must_use]
    pub fn merged(&self, overrides: &SuffixOverrides) -> Self {
        Self {
            development: overrides
                .development
                .clone()
                .unwrap_or_else(|| self.development.clone()),
            production: overrides
                .production
                .clone()
                .unwrap_or_else(|| self.production.clone()),
            minified: overrides
                .minified
                .clone()
                .unwrap_or_else(|| self.minified.clone()),
        }
    }
}

impl Default for Suffixes {
    fn default() -> Self {
        Self {
            development: SuffixRule::text("development"),
            production: SuffixRule::text("production"),
            minified: SuffixRule::text("min"),
        }
    }
}

/// Partial suffix rules, as written by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SuffixOverrides {
    /// Development suffix override.
    pub development: Option<SuffixRule>,
    /// Production suffix override.
    pub production: Option<SuffixRule>,
    /// Minified suffix override.
    pub minified: Option<SuffixRule>,
}

impl SuffixOverrides {
    /// Applies `self` over `base`, key by key.
    #[must_use]
    pub fn merged_over(&self, base: &Self) -> Self {
        Self {
            development: self.development.clone().or_else(|| base.development.clone()),
            production: self.production.clone().or_else(|| base.production.clone()),
            minified: self.minified.clone().or_else(|| base.minified.clone()),
        }
    }
}

/// Settings shared by every format, fully populated.
///
/// # Examples
///
/// ```
/// use rp_core::SharedSettings;
///
/// let shared = SharedSettings::default();
/// assert_eq!(shared.src, "./src");
/// assert_eq!(shared.extensions, vec![".js", ".ts", ".jsx", ".tsx"]);
/// assert!(!shared.minify);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedSettings {
    /// Whether formats are built unless they say otherwise.
    pub enabled: bool,
    /// Source directory, relative to the project root.
    pub src: Utf8PathBuf,
    /// Output directory, relative to the project root.
    pub out: Utf8PathBuf,
    /// Entry file, relative to the source directory, with or without extension.
    pub entry_file: Utf8PathBuf,
    /// Module name of the entry file. `None` means "derive from the manifest".
    pub module_name: Option<String>,
    /// Recognized source-file extensions, including the leading dot.
    pub extensions: Vec<String>,
    /// Patterns a module must match to be built or copied (empty: all).
    pub include: Vec<Pattern>,
    /// Patterns that drop a module.
    pub exclude: Vec<Pattern>,
    /// Patterns selecting asset files to copy.
    pub assets: Vec<Pattern>,
    /// Whether to emit interop helpers.
    pub interop: bool,
    /// Source map mode.
    pub sourcemap: Sourcemap,
    /// Whether to add minified variants.
    pub minify: bool,
    /// Whether to emit type declarations for TypeScript build files.
    pub declarations: bool,
    /// Global variable names for external imports in distributable builds.
    pub globals: FxHashMap<String, String>,
    /// Imports left external in distributable builds.
    pub externals: Vec<String>,
    /// Environments to build.
    pub envs: Vec<Environment>,
    /// Output-name suffix rules.
    pub suffixes: Suffixes,
}

impl Default for SharedSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            src: Utf8PathBuf::from("./src"),
            out: Utf8PathBuf::from("./build"),
            entry_file: Utf8PathBuf::from("./index"),
            module_name: None,
            extensions: [".js", ".ts", ".jsx", ".tsx"]
                .into_iter()
                .map(str::to_owned)
                .collect(),
            include: Vec::new(),
            exclude: Vec::new(),
            assets: Vec::new(),
            interop: true,
            sourcemap: Sourcemap::Enabled,
            minify: false,
            declarations: true,
            globals: FxHashMap::default(),
            externals: Vec::new(),
            envs: Vec::new(),
            suffixes: Suffixes::default(),
        }
    }
}

impl SharedSettings {
    /// Applies user overrides to the shared settings.
    ///
    /// Scalars and lists are replaced; `globals` and `suffixes` merge key by key.
    #[must_use]
    pub fn merged(&self, overrides: &FormatOverrides) -> Self {
        let mut globals = self.globals.clone();
        if let Some(extra) = &overrides.globals {
            globals.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
        }

        let suffixes = overrides
            .suffixes
            .as_ref()
            .map_or_else(|| self.suffixes.clone(), |s| self.suffixes.merged(s));

        Self {
            enabled: overrides.enabled.unwrap_or(self.enabled),
            src: pick(&overrides.src, &self.src),
            out: pick(&overrides.out, &self.out),
            entry_file: pick(&overrides.entry_file, &self.entry_file),
            module_name: overrides
                .module_name
                .clone()
                .or_else(|| self.module_name.clone()),
            extensions: pick(&overrides.extensions, &self.extensions),
            include: pick(&overrides.include, &self.include),
            exclude: pick(&overrides.exclude, &self.exclude),
            assets: pick(&overrides.assets, &self.assets),
            interop: overrides.interop.unwrap_or(self.interop),
            sourcemap: overrides.sourcemap.unwrap_or(self.sourcemap),
            minify: overrides.minify.unwrap_or(self.minify),
            declarations: overrides.declarations.unwrap_or(self.declarations),
            globals,
            externals: pick(&overrides.externals, &self.externals),
            envs: pick(&overrides.envs, &self.envs),
            suffixes,
        }
    }
}

/// Partial settings: the user's `defaults` block, a per-format block, or a
/// built-in per-format default.
///
/// Every field is optional; `None` means "inherit".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FormatOverrides {
    /// Whether the format is built.
    pub enabled: Option<bool>,
    /// Source directory override.
    pub src: Option<Utf8PathBuf>,
    /// Output directory override.
    pub out: Option<Utf8PathBuf>,
    /// Entry file override.
    pub entry_file: Option<Utf8PathBuf>,
    /// Module name override.
    pub module_name: Option<String>,
    /// Extension list override (replaces).
    pub extensions: Option<Vec<String>>,
    /// Include patterns (concatenated after the shared list).
    pub include: Option<Vec<Pattern>>,
    /// Exclude patterns (concatenated after the shared list).
    pub exclude: Option<Vec<Pattern>>,
    /// Asset patterns (concatenated after the shared list).
    pub assets: Option<Vec<Pattern>>,
    /// Interop override.
    pub interop: Option<bool>,
    /// Source map override.
    pub sourcemap: Option<Sourcemap>,
    /// Minify override.
    pub minify: Option<bool>,
    /// Declarations override.
    pub declarations: Option<bool>,
    /// Globals merged key by key.
    pub globals: Option<FxHashMap<String, String>>,
    /// Externals override (replaces).
    pub externals: Option<Vec<String>>,
    /// Environments override (replaces).
    pub envs: Option<Vec<Environment>>,
    /// Suffix rules merged key by key.
    pub suffixes: Option<SuffixOverrides>,
}

impl FormatOverrides {
    /// Applies `self` over `base`: any field set here wins, object-valued
    /// fields merge key by key.
    #[must_use]
    pub fn merged_over(&self, base: &Self) -> Self {
        let globals = match (&base.globals, &self.globals) {
            (Some(base_globals), Some(own)) => {
                let mut merged = base_globals.clone();
                merged.extend(own.iter().map(|(k, v)| (k.clone(), v.clone())));
                Some(merged)
            }
            (base_globals, own) => own.clone().or_else(|| base_globals.clone()),
        };

        let suffixes = match (&base.suffixes, &self.suffixes) {
            (Some(base_suffixes), Some(own)) => Some(own.merged_over(base_suffixes)),
            (base_suffixes, own) => own.clone().or_else(|| base_suffixes.clone()),
        };

        Self {
            enabled: self.enabled.or(base.enabled),
            src: self.src.clone().or_else(|| base.src.clone()),
            out: self.out.clone().or_else(|| base.out.clone()),
            entry_file: self.entry_file.clone().or_else(|| base.entry_file.clone()),
            module_name: self.module_name.clone().or_else(|| base.module_name.clone()),
            extensions: self.extensions.clone().or_else(|| base.extensions.clone()),
            include: self.include.clone().or_else(|| base.include.clone()),
            exclude: self.exclude.clone().or_else(|| base.exclude.clone()),
            assets: self.assets.clone().or_else(|| base.assets.clone()),
            interop: self.interop.or(base.interop),
            sourcemap: self.sourcemap.or(base.sourcemap),
            minify: self.minify.or(base.minify),
            declarations: self.declarations.or(base.declarations),
            globals,
            externals: self.externals.clone().or_else(|| base.externals.clone()),
            envs: self.envs.clone().or_else(|| base.envs.clone()),
            suffixes,
        }
    }
}

/// Built-in defaults: shared settings plus partial per-format defaults.
///
/// Reused across resolutions; the resolver only ever reads it.
///
/// # Examples
///
/// ```
/// use rp_core::{BuildFormat, ConfigDefaults};
///
/// let defaults = ConfigDefaults::default();
/// assert_eq!(defaults.format(BuildFormat::Iife).enabled, Some(false));
/// assert_eq!(defaults.format(BuildFormat::Cjs).out.as_deref().map(|p| p.as_str()), Some("./build/cjs"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigDefaults {
    /// Shared settings.
    pub shared: SharedSettings,
    /// CommonJS defaults.
    pub cjs: FormatOverrides,
    /// ES module defaults.
    pub es: FormatOverrides,
    /// IIFE defaults.
    pub iife: FormatOverrides,
    /// UMD defaults.
    pub umd: FormatOverrides,
}

impl ConfigDefaults {
    /// Returns the partial defaults for one format.
    #[must_use]
    pub const fn format(&self, format: BuildFormat) -> &FormatOverrides {
        match format {
            BuildFormat::Cjs => &self.cjs,
            BuildFormat::Es => &self.es,
            BuildFormat::Iife => &self.iife,
            BuildFormat::Umd => &self.umd,
        }
    }
}

impl Default for ConfigDefaults {
    fn default() -> Self {
        let library = |out: &str| FormatOverrides {
            out: Some(Utf8PathBuf::from(out)),
            ..FormatOverrides::default()
        };
        let distributable = |out: &str| FormatOverrides {
            enabled: Some(false),
            out: Some(Utf8PathBuf::from(out)),
            minify: Some(true),
            declarations: Some(false),
            envs: Some(vec![Environment::Development, Environment::Production]),
            ..FormatOverrides::default()
        };

        Self {
            shared: SharedSettings::default(),
            cjs: library("./build/cjs"),
            es: library("./build/es"),
            iife: distributable("./build/iife"),
            umd: distributable("./build/umd"),
        }
    }
}

/// The user's configuration document.
///
/// Deserialized from `.buildrc.json`. Unknown keys are ignored so the same
/// document can carry settings for other tools.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UserConfig {
    /// Formats to build, in order. `None` builds every enabled format.
    pub formats: Option<Vec<BuildFormat>>,
    /// Module name of the entry file, taking precedence over `defaults`.
    pub module_name: Option<String>,
    /// Overrides for the shared settings.
    pub defaults: FormatOverrides,
    /// CommonJS overrides.
    pub cjs: FormatOverrides,
    /// ES module overrides.
    pub es: FormatOverrides,
    /// IIFE overrides.
    pub iife: FormatOverrides,
    /// UMD overrides.
    pub umd: FormatOverrides,
}

impl UserConfig {
    /// Converts a parsed JSON document into a user configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when a value has the wrong shape, for
    /// example a pattern that is neither a string nor a `{ "regex": .. }` object.
    pub fn from_value(value: serde_json::Value) -> Result<Self, ConfigError> {
        Ok(serde_json::from_value(value)?)
    }

    /// Returns the user's overrides for one format.
    #[must_use]
    pub const fn format(&self, format: BuildFormat) -> &FormatOverrides {
        match format {
            BuildFormat::Cjs => &self.cjs,
            BuildFormat::Es => &self.es,
            BuildFormat::Iife => &self.iife,
            BuildFormat::Umd => &self.umd,
        }
    }

    /// Returns the user's overrides for one format, mutably.
    pub const fn format_mut(&mut self, format: BuildFormat) -> &mut FormatOverrides {
        match format {
            BuildFormat::Cjs => &mut self.cjs,
            BuildFormat::Es => &mut self.es,
            BuildFormat::Iife => &mut self.iife,
            BuildFormat::Umd => &mut self.umd,
        }
    }
}

/// Resolved settings for one output format.
///
/// No field is optional: anything the format did not set was inherited from
/// the shared settings during resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatConfig {
    /// The output format.
    pub format: BuildFormat,
    /// Whether the format is enabled.
    pub enabled: bool,
    /// Absolute source root.
    pub src: Utf8PathBuf,
    /// Absolute output root.
    pub out: Utf8PathBuf,
    /// Absolute entry file path, possibly without extension.
    pub entry_file: Utf8PathBuf,
    /// Module name given to the entry file.
    pub module_name: String,
    /// Recognized source-file extensions.
    pub extensions: SmallVec<[String; 4]>,
    /// Compiled include matchers.
    pub include: Vec<Matcher>,
    /// Compiled exclude matchers.
    pub exclude: Vec<Matcher>,
    /// Compiled asset matchers.
    pub assets: Vec<Matcher>,
    /// Whether to emit interop helpers.
    pub interop: bool,
    /// Source map mode.
    pub sourcemap: Sourcemap,
    /// Whether to add minified variants.
    pub minify: bool,
    /// Whether to emit type declarations.
    pub declarations: bool,
    /// Global names for external imports.
    pub globals: FxHashMap<String, String>,
    /// Imports left external in distributable builds.
    pub externals: Vec<String>,
    /// Environments to build.
    pub envs: SmallVec<[Environment; 2]>,
    /// Output-name suffix rules.
    pub suffixes: Suffixes,
}

impl FormatConfig {
    /// Returns `true` if the extension is a recognized source extension.
    #[inline]
    #[must_use]
    pub fn is_source_extension(&self, extension: &str) -> bool {
        self.extensions.iter().any(|ext| ext == extension)
    }

    /// Returns the directory that mirrors `relative_dir` under the output root.
    #[must_use]
    pub fn output_dir(&self, relative_dir: &Utf8Path) -> Utf8PathBuf {
        self.out.join(relative_dir)
    }
}

/// The fully resolved configuration for one `process()` run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Absolute project root.
    pub entry_path: Utf8PathBuf,
    /// Module name of the project.
    pub module_name: String,
    /// Formats to build, in processing order.
    pub requested: Vec<BuildFormat>,
    /// Resolved settings for every format, in [`BuildFormat::ALL`] order.
    pub formats: Vec<FormatConfig>,
}

impl Config {
    /// Returns the resolved settings for a format.
    #[must_use]
    pub fn format(&self, format: BuildFormat) -> Option<&FormatConfig> {
        self.formats.iter().find(|config| config.format == format)
    }

    /// Iterates the requested formats' settings in processing order.
    pub fn requested_formats(&self) -> impl Iterator<Item = &FormatConfig> {
        self.requested.iter().filter_map(|format| self.format(*format))
    }

    /// Checks that no requested format writes into its own source tree.
    ///
    /// Formats that are not requested are never built and are not checked.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidOption`] naming `{format}.out` for the
    /// first requested format whose `out` equals its `src`.
    pub fn validate_outputs(&self) -> Result<(), ConfigError> {
        match self.requested_formats().find(|config| config.src == config.out) {
            Some(config) => Err(ConfigError::invalid_option(
                format!("{}.out", config.format),
                format!("output directory '{}' is the source directory", config.out),
            )),
            None => Ok(()),
        }
    }
}

fn pick<T: Clone>(value: &Option<T>, fallback: &T) -> T {
    value.clone().unwrap_or_else(|| fallback.clone())
}
