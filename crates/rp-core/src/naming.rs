//! Module-name derivation.
//!
//! Module names are the identifiers a distributable bundle exposes (for
//! example the global created by an `iife` build). They are derived from file
//! base names and from the package manifest's `name` field.

/// Fallback module name used when no manifest name is available.
pub const UNKNOWN_MODULE_NAME: &str = "Unknown";

/// Converts text to camel-like casing.
///
/// The text is split on `-`, `_`, `.` and whitespace. The first token is kept
/// as-is and every following token has its first character upper-cased.
///
/// # Examples
///
/// ```
/// use rp_core::naming::camel_case;
///
/// assert_eq!(camel_case("rollup-all"), "rollupAll");
/// assert_eq!(camel_case("date_time.utils"), "dateTimeUtils");
/// assert_eq!(camel_case("index"), "index");
/// ```
#[must_use]
pub fn camel_case(text: &str) -> String {
    let mut result = String::with_capacity(text.len());

    for (index, token) in text
        .split(|c: char| c == '-' || c == '_' || c == '.' || c.is_whitespace())
        .enumerate()
    {
        if index == 0 {
            result.push_str(token);
            continue;
        }

        let mut chars = token.chars();
        if let Some(first) = chars.next() {
            result.extend(first.to_uppercase());
            result.push_str(chars.as_str());
        }
    }

    result
}

/// Strips an npm scope prefix (`@scope/`) from a package name.
///
/// Everything up to and including the first `/` is removed.
///
/// # Examples
///
/// ```
/// use rp_core::naming::strip_scope;
///
/// assert_eq!(strip_scope("@teclone/rollup-all"), "rollup-all");
/// assert_eq!(strip_scope("plain"), "plain");
/// ```
#[must_use]
pub fn strip_scope(name: &str) -> &str {
    name.split_once('/').map_or(name, |(_, rest)| rest)
}

/// Derives a module name from a package manifest name.
///
/// Returns `None` when the name is empty after stripping the scope.
#[must_use]
pub fn module_name_from_package(name: &str) -> Option<String> {
    let unscoped = strip_scope(name.trim());
    if unscoped.is_empty() {
        return None;
    }
    Some(camel_case(unscoped))
}
