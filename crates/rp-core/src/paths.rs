//! Lexical path helpers.
//!
//! Configuration paths like `./src` or `../shared/index` are normalized without
//! touching the filesystem, so output directories that do not exist yet can
//! still be resolved.

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};

/// Normalizes a path lexically, removing `.` components and folding `..`.
///
/// A `..` that would climb above the root is dropped.
///
/// # Examples
///
/// ```
/// use camino::Utf8Path;
/// use rp_core::paths::normalize;
///
/// assert_eq!(normalize(Utf8Path::new("/proj/./src/../build")), "/proj/build");
/// ```
#[must_use]
pub fn normalize(path: &Utf8Path) -> Utf8PathBuf {
    let mut result = Utf8PathBuf::new();

    for component in path.components() {
        match component {
            Utf8Component::CurDir => {}
            Utf8Component::ParentDir => {
                let climbing = matches!(
                    result.components().next_back(),
                    None | Some(Utf8Component::ParentDir)
                );
                if climbing {
                    if !result.has_root() {
                        result.push("..");
                    }
                } else {
                    result.pop();
                }
            }
            other => result.push(other.as_str()),
        }
    }

    result
}

/// Resolves `path` against `base` and normalizes the result.
///
/// Absolute paths are only normalized.
#[must_use]
pub fn absolutize(base: &Utf8Path, path: &Utf8Path) -> Utf8PathBuf {
    if path.is_absolute() {
        normalize(path)
    } else {
        normalize(&base.join(path))
    }
}

/// Returns `path` with `/` separators, as used by pattern matching.
#[must_use]
pub fn to_match_path(path: &Utf8Path) -> String {
    path.as_str().replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_removes_cur_dir() {
        assert_eq!(normalize(Utf8Path::new("/a/./b/./c")), "/a/b/c");
    }

    #[test]
    fn test_normalize_folds_parent_dir() {
        assert_eq!(normalize(Utf8Path::new("/a/b/../c")), "/a/c");
        assert_eq!(normalize(Utf8Path::new("/../a")), "/a");
    }

    #[test]
    fn test_normalize_keeps_leading_parent_on_relative() {
        assert_eq!(normalize(Utf8Path::new("../a")), "../a");
        assert_eq!(normalize(Utf8Path::new("../../a")), "../../a");
    }

    #[test]
    fn test_absolutize() {
        let base = Utf8Path::new("/proj");
        assert_eq!(absolutize(base, Utf8Path::new("./src")), "/proj/src");
        assert_eq!(absolutize(base, Utf8Path::new("/abs/out")), "/abs/out");
        assert_eq!(absolutize(base, Utf8Path::new("build/../dist")), "/proj/dist");
    }

    #[test]
    fn test_to_match_path() {
        assert_eq!(to_match_path(Utf8Path::new("a/b.ts")), "a/b.ts");
    }
}
