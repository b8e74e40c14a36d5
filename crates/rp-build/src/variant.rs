//! Build variants and per-file tasks.
//!
//! A variant is one concrete pass over a format's build files, identified by
//! an optional environment and a minification flag. Each variant renders its
//! own output file names so variants of one format never collide.

use std::fmt;

use camino::Utf8PathBuf;
use rp_core::{BuildFormat, Environment, FormatConfig, Module};
use smallvec::SmallVec;
use tracing::warn;

/// Extension of compiled outputs.
pub const OUTPUT_EXTENSION: &str = "js";

/// One build pass of a format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variant {
    /// Environment, or `None` for formats without declared environments.
    pub environment: Option<Environment>,
    /// Whether outputs are minified.
    pub minify: bool,
    /// Name suffixes, in order, without dots.
    pub suffixes: SmallVec<[String; 2]>,
}

impl Variant {
    /// Enumerates the variants a format builds.
    ///
    /// Each environment (or a single "none" when `envs` is empty) yields an
    /// unminified variant, plus a minified one when `minify` is set. The
    /// environment suffix is only used with two or more environments.
    /// Repeated environments are built once. Variants that still render the
    /// same file name (for example `suffixes.minified: false` with `minify`
    /// set) are kept, and a warning is logged since they overwrite each other.
    ///
    /// # Examples
    ///
    /// ```
    /// use camino::Utf8Path;
    /// use rp_build::Variant;
    /// use rp_core::{BuildFormat, ConfigDefaults, ConfigResolver, UserConfig};
    ///
    /// let config = ConfigResolver::resolve(
    ///     Utf8Path::new("/proj"),
    ///     &ConfigDefaults::default(),
    ///     &UserConfig::default(),
    /// )
    /// .unwrap();
    ///
    /// let cjs = Variant::enumerate(config.format(BuildFormat::Cjs).unwrap());
    /// assert_eq!(cjs.len(), 1);
    /// assert_eq!(cjs[0].output_file_name("index"), "index.js");
    ///
    /// let iife = Variant::enumerate(config.format(BuildFormat::Iife).unwrap());
    /// let names: Vec<_> = iife.iter().map(|v| v.output_file_name("index")).collect();
    /// assert_eq!(
    ///     names,
    ///     [
    ///         "index.development.js",
    ///         "index.development.min.js",
    ///         "index.production.js",
    ///         "index.production.min.js",
    ///     ]
    /// );
    /// ```
    #[must_use]
    pub fn enumerate(config: &FormatConfig) -> Vec<Self> {
        let environments: SmallVec<[Option<Environment>; 2]> = if config.envs.is_empty() {
            SmallVec::from_elem(None, 1)
        } else {
            let mut unique: SmallVec<[Option<Environment>; 2]> = SmallVec::new();
            for env in config.envs.iter().copied().map(Some) {
                if !unique.contains(&env) {
                    unique.push(env);
                }
            }
            unique
        };
        let suffix_environments = environments.len() > 1;

        let mut variants: Vec<Self> = Vec::with_capacity(environments.len() * 2);
        for environment in environments {
            let env_suffix = environment
                .filter(|_| suffix_environments)
                .and_then(|env| config.suffixes.for_environment(env).as_text())
                .map(str::to_owned);

            let minify_flags: &[bool] = if config.minify { &[false, true] } else { &[false] };
            for &minify in minify_flags {
                let mut suffixes = SmallVec::new();
                suffixes.extend(env_suffix.clone());
                if minify {
                    suffixes.extend(config.suffixes.minified.as_text().map(str::to_owned));
                }
                let variant = Self {
                    environment,
                    minify,
                    suffixes,
                };
                if let Some(earlier) = variants.iter().find(|v| v.suffixes == variant.suffixes) {
                    warn!(
                        format = %config.format,
                        file_name = %variant.output_file_name("*"),
                        first = %earlier,
                        second = %variant,
                        "Variants share an output file name"
                    );
                }
                variants.push(variant);
            }
        }

        variants
    }

    /// Renders the output file name for a module base name.
    #[must_use]
    pub fn output_file_name(&self, base_name: &str) -> String {
        let mut name = String::from(base_name);
        for suffix in &self.suffixes {
            name.push('.');
            name.push_str(suffix);
        }
        name.push('.');
        name.push_str(OUTPUT_EXTENSION);
        name
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.environment {
            Some(env) => write!(f, "{env}")?,
            None => f.write_str("default")?,
        }
        if self.minify {
            f.write_str(", minified")?;
        }
        Ok(())
    }
}

/// One file compiled for one variant.
#[derive(Debug, Clone)]
pub struct BuildTask<'a> {
    /// The module being compiled.
    pub module: &'a Module,
    /// Output format.
    pub format: BuildFormat,
    /// Environment of the variant.
    pub environment: Option<Environment>,
    /// Whether the output is minified.
    pub minify: bool,
    /// Destination, mirroring the module's directory under the output root.
    pub output_path: Utf8PathBuf,
}

impl<'a> BuildTask<'a> {
    /// Creates the task that builds `module` for `variant`.
    #[must_use]
    pub fn new(module: &'a Module, config: &FormatConfig, variant: &Variant) -> Self {
        let output_path = config
            .output_dir(&module.location_relative_to_src)
            .join(variant.output_file_name(&module.base_name));

        Self {
            module,
            format: config.format,
            environment: variant.environment,
            minify: variant.minify,
            output_path,
        }
    }
}
