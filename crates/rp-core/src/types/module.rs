//! Discovered module records.

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::paths;

/// File name suffix that marks a type declaration file.
pub const DECLARATION_SUFFIX: &str = ".d.ts";

/// An opaque identifier for a discovered module.
///
/// Unique within one discovery run only.
///
/// # Examples
///
/// ```
/// use rp_core::ModuleId;
///
/// let id = ModuleId::new(3);
/// assert_eq!(id.as_u64(), 3);
/// assert_eq!(id, ModuleId::from(3));
/// ```
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ModuleId(pub u64);

impl ModuleId {
    /// Creates a new module ID.
    #[inline]
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the inner value.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl From<u64> for ModuleId {
    #[inline]
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// How a discovered file takes part in a build.
///
/// # Examples
///
/// ```
/// use rp_core::FileKind;
///
/// let extensions = [".ts".to_owned(), ".js".to_owned()];
/// assert_eq!(FileKind::classify(".ts", &extensions), FileKind::Build);
/// assert_eq!(FileKind::classify(".d.ts", &extensions), FileKind::TypeDeclaration);
/// assert_eq!(FileKind::classify(".png", &extensions), FileKind::Asset);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FileKind {
    /// Compiled into one output file per variant.
    Build,
    /// Copied verbatim when it matches an asset pattern.
    Asset,
    /// A `.d.ts` file, copied verbatim and never compiled.
    TypeDeclaration,
}

impl FileKind {
    /// Classifies a file by its full extension (everything from the first dot).
    ///
    /// Declaration files win over the configured extension set, so a `.d.ts`
    /// file is never a build file.
    #[must_use]
    pub fn classify<S: AsRef<str>>(extension: &str, source_extensions: &[S]) -> Self {
        if extension.ends_with(DECLARATION_SUFFIX) {
            Self::TypeDeclaration
        } else if source_extensions.iter().any(|ext| ext.as_ref() == extension) {
            Self::Build
        } else {
            Self::Asset
        }
    }

    /// Returns `true` for files that are copied rather than compiled.
    #[inline]
    #[must_use]
    pub const fn is_copied(self) -> bool {
        matches!(self, Self::Asset | Self::TypeDeclaration)
    }

    /// Returns a short label for log output.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Build => "build",
            Self::Asset => "asset",
            Self::TypeDeclaration => "declaration",
        }
    }
}

/// One discovered file under a source root.
///
/// Created during a single discovery walk and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Module {
    /// Identifier, assigned in relative-path order after the walk.
    pub id: ModuleId,

    /// Directory of the file relative to the source root (empty for the root).
    pub location_relative_to_src: Utf8PathBuf,

    /// Absolute path of the file.
    pub absolute_location: Utf8PathBuf,

    /// File name up to its first dot. Empty for dotfiles.
    pub base_name: String,

    /// Full file name.
    pub file_name: String,

    /// File name from its first dot, including the dot.
    pub extension: String,

    /// Module name: the camel-cased base name, or the configured module name
    /// for the entry file.
    pub module_name: String,

    /// Classification.
    pub kind: FileKind,

    /// Whether this is the configured entry file.
    pub is_entry: bool,
}

impl Module {
    /// Returns the file path relative to the source root.
    #[must_use]
    pub fn relative_path(&self) -> Utf8PathBuf {
        self.location_relative_to_src.join(&self.file_name)
    }

    /// Returns the relative path with `/` separators, as tested by matchers.
    #[must_use]
    pub fn match_path(&self) -> String {
        paths::to_match_path(&self.relative_path())
    }

    /// Returns the absolute path without its extension.
    #[must_use]
    pub fn stem_location(&self) -> Utf8PathBuf {
        let dir = self.absolute_location.parent().unwrap_or(Utf8Path::new(""));
        dir.join(&self.base_name)
    }

    /// Returns `true` for build files.
    #[inline]
    #[must_use]
    pub fn is_build_file(&self) -> bool {
        self.kind == FileKind::Build
    }
}

/// Splits a file name on its first dot into base name and extension.
///
/// Dotfiles are extension-only.
///
/// # Examples
///
/// ```
/// use rp_core::types::split_file_name;
///
/// assert_eq!(split_file_name("index.ts"), ("index", ".ts"));
/// assert_eq!(split_file_name("types.d.ts"), ("types", ".d.ts"));
/// assert_eq!(split_file_name(".babelrc"), ("", ".babelrc"));
/// assert_eq!(split_file_name("LICENSE"), ("LICENSE", ""));
/// ```
#[must_use]
pub fn split_file_name(file_name: &str) -> (&str, &str) {
    if file_name.starts_with('.') {
        return ("", file_name);
    }
    match file_name.find('.') {
        Some(index) => file_name.split_at(index),
        None => (file_name, ""),
    }
}
