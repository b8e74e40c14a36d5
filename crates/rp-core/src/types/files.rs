//! Filter results.

use serde::Serialize;

use super::module::Module;

/// The modules one format builds and copies.
///
/// Recomputed per format, since formats may filter differently.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleFiles {
    /// Build files to compile.
    pub build_files: Vec<Module>,
    /// Asset and declaration files to copy verbatim.
    pub copy_files: Vec<Module>,
}

impl ModuleFiles {
    /// Returns the total number of selected modules.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.build_files.len() + self.copy_files.len()
    }

    /// Returns `true` if nothing was selected.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.build_files.is_empty() && self.copy_files.is_empty()
    }
}
