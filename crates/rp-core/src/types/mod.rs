//! Domain types for rollpack.
//!
//! # Module Organization
//!
//! - [`module`] - discovered modules and their classification
//! - [`files`] - the per-format split into build and copy files
//!
//! All public types are re-exported here and at the crate root:
//!
//! ```
//! use rp_core::{FileKind, Module, ModuleFiles, ModuleId};
//! ```

mod files;
mod module;

pub use files::ModuleFiles;
pub use module::{DECLARATION_SUFFIX, FileKind, Module, ModuleId, split_file_name};
