//! Core types, configuration resolution, and pattern matching for rollpack.
//!
//! This crate provides the foundational pieces used across the workspace:
//!
//! - [`Matcher`] - glob and literal path patterns compiled once, tested many times
//! - [`ConfigResolver`] - typed merge of shared defaults and per-format overrides
//! - [`Config`] / [`FormatConfig`] - fully resolved build settings
//! - Domain types ([`Module`], [`FileKind`], [`ModuleFiles`])
//! - Manifest and configuration file loading
//! - Type aliases for `FxHashMap`/`FxHashSet` (faster than std)

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod hash;
pub mod loader;
pub mod naming;
pub mod paths;
pub mod pattern;
pub mod resolver;
pub mod types;

pub use config::{
    BuildFormat, Config, ConfigDefaults, Environment, FormatConfig, FormatOverrides,
    SharedSettings, Sourcemap, SuffixOverrides, SuffixRule, Suffixes, UserConfig,
};
pub use error::ConfigError;
pub use hash::{FxHashMap, FxHashSet, fx_hash_map, fx_hash_set};
pub use pattern::{LiteralRegex, Matcher, Pattern};
pub use resolver::ConfigResolver;
pub use types::{DECLARATION_SUFFIX, FileKind, Module, ModuleFiles, ModuleId};
