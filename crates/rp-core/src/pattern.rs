//! Path patterns for include, exclude, and asset selection.
//!
//! Users write patterns either as glob-like strings or as literal regular
//! expression objects. Both are turned into a [`Matcher`] once, during
//! configuration resolution, and never re-parsed at match time.
//!
//! # Glob Syntax
//!
//! | Token  | Meaning                                   |
//! |--------|-------------------------------------------|
//! | `*`    | any characters within one path segment    |
//! | `**`   | any characters, across segments           |
//! | `**/`  | zero or more whole segments               |
//! | `?`    | one character other than `/`              |
//! | `{a,b}`| either alternative                        |
//!
//! Every other character matches itself. Globs are anchored at both ends and
//! matched case-insensitively. The pattern `*` on its own matches every path.
//!
//! # Examples
//!
//! ```
//! use rp_core::{Matcher, Pattern};
//!
//! let matcher = Matcher::compile(&Pattern::glob("**/*.test.ts"));
//! assert!(matcher.test("a.test.ts"));
//! assert!(matcher.test("utils/deep/b.TEST.ts"));
//! assert!(!matcher.test("a.ts"));
//! ```

use std::fmt;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A pattern as written in the configuration file.
///
/// Deserializes from either a JSON string (a glob) or an object of the form
/// `{ "regex": "<expression>" }` (a literal pattern).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Pattern {
    /// A glob-like string pattern.
    Glob(String),
    /// A pre-compiled regular expression, used as-is.
    Literal {
        /// The compiled expression.
        regex: LiteralRegex,
    },
}

impl Pattern {
    /// Creates a glob pattern.
    #[must_use]
    pub fn glob(pattern: impl Into<String>) -> Self {
        Self::Glob(pattern.into())
    }

    /// Creates a literal pattern from an already compiled expression.
    #[must_use]
    pub fn literal(regex: Regex) -> Self {
        Self::Literal {
            regex: LiteralRegex(regex),
        }
    }
}

impl From<&str> for Pattern {
    fn from(pattern: &str) -> Self {
        Self::glob(pattern)
    }
}

/// A regular expression compiled while the configuration is deserialized.
///
/// An invalid expression is rejected at that point, so a [`Pattern::Literal`]
/// always holds a usable expression.
#[derive(Clone)]
pub struct LiteralRegex(pub Regex);

impl LiteralRegex {
    /// Returns the expression source.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for LiteralRegex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/", self.0.as_str())
    }
}

impl PartialEq for LiteralRegex {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for LiteralRegex {}

impl Serialize for LiteralRegex {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for LiteralRegex {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let source = String::deserialize(deserializer)?;
        Regex::new(&source)
            .map(Self)
            .map_err(serde::de::Error::custom)
    }
}

/// A compiled predicate over `/`-separated relative paths.
///
/// # Examples
///
/// ```
/// use rp_core::Matcher;
///
/// let any = Matcher::glob("*");
/// assert!(any.test("deeply/nested/file.png"));
///
/// let top_level = Matcher::glob("src/*.ts");
/// assert!(top_level.test("src/index.ts"));
/// assert!(!top_level.test("src/utils/helper.ts"));
/// ```
#[derive(Debug, Clone)]
pub enum Matcher {
    /// Matches every path (the `*` pattern).
    Any,
    /// A translated glob.
    Glob {
        /// The glob as written.
        pattern: String,
        /// The anchored, case-insensitive translation.
        regex: Regex,
    },
    /// A literal pattern supplied as a regular expression.
    Literal(Regex),
    /// Fallback for globs whose translation could not be compiled.
    ///
    /// Matches only a path equal to the pattern text, ignoring case.
    Exact(String),
}

impl Matcher {
    /// Compiles a configured pattern. Never fails.
    #[must_use]
    pub fn compile(pattern: &Pattern) -> Self {
        match pattern {
            Pattern::Glob(glob) => Self::glob(glob),
            Pattern::Literal { regex } => Self::Literal(regex.0.clone()),
        }
    }

    /// Compiles a glob string. Never fails.
    #[must_use]
    pub fn glob(pattern: &str) -> Self {
        if pattern == "*" {
            return Self::Any;
        }

        let Some(translated) = glob_to_regex(pattern) else {
            return Self::Exact(pattern.to_lowercase());
        };

        match RegexBuilder::new(&translated).case_insensitive(true).build() {
            Ok(regex) => Self::Glob {
                pattern: pattern.to_owned(),
                regex,
            },
            Err(error) => {
                tracing::warn!(pattern, %error, "Pattern could not be compiled, matching it literally");
                Self::Exact(pattern.to_lowercase())
            }
        }
    }

    /// Returns `true` if the relative path satisfies this matcher.
    #[must_use]
    pub fn test(&self, path: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Glob { regex, .. } | Self::Literal(regex) => regex.is_match(path),
            Self::Exact(expected) => path.to_lowercase() == *expected,
        }
    }

    /// Returns the pattern text this matcher was built from.
    #[must_use]
    pub fn source(&self) -> &str {
        match self {
            Self::Any => "*",
            Self::Glob { pattern, .. } => pattern,
            Self::Literal(regex) => regex.as_str(),
            Self::Exact(pattern) => pattern,
        }
    }
}

impl PartialEq for Matcher {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Any, Self::Any) => true,
            (Self::Glob { pattern: a, .. }, Self::Glob { pattern: b, .. })
            | (Self::Exact(a), Self::Exact(b)) => a == b,
            (Self::Literal(a), Self::Literal(b)) => a.as_str() == b.as_str(),
            _ => false,
        }
    }
}

impl Eq for Matcher {}

impl Serialize for Matcher {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Literal(regex) => {
                Pattern::literal(regex.clone()).serialize(serializer)
            }
            _ => serializer.serialize_str(self.source()),
        }
    }
}

/// Compiles every pattern in a list, preserving order.
#[must_use]
pub fn compile_all<'a>(patterns: impl IntoIterator<Item = &'a Pattern>) -> Vec<Matcher> {
    patterns.into_iter().map(Matcher::compile).collect()
}

/// Returns `true` if any matcher in the list accepts the path.
#[inline]
#[must_use]
pub fn any_match(matchers: &[Matcher], path: &str) -> bool {
    matchers.iter().any(|matcher| matcher.test(path))
}

/// Translates a glob into an anchored regular expression.
///
/// Returns `None` for structurally broken globs (an unbalanced `{`).
fn glob_to_regex(pattern: &str) -> Option<String> {
    let pattern = pattern.strip_prefix("./").unwrap_or(pattern);
    let chars: Vec<char> = pattern.chars().collect();

    let mut out = String::with_capacity(pattern.len() * 2 + 2);
    out.push('^');

    let mut in_group = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '*' => {
                let start = i;
                while chars.get(i + 1) == Some(&'*') {
                    i += 1;
                }
                let is_globstar = i > start;
                let at_segment_start = start == 0 || chars[start - 1] == '/';

                if is_globstar && at_segment_start && chars.get(i + 1) == Some(&'/') {
                    out.push_str("(?:[^/]*/)*");
                    i += 1;
                } else if is_globstar {
                    out.push_str(".*");
                } else {
                    out.push_str("[^/]*");
                }
            }
            '?' => out.push_str("[^/]"),
            '{' if !in_group => {
                in_group = true;
                out.push_str("(?:");
            }
            '}' if in_group => {
                in_group = false;
                out.push(')');
            }
            ',' if in_group => out.push('|'),
            _ => {
                let mut buf = [0_u8; 4];
                out.push_str(&regex::escape(c.encode_utf8(&mut buf)));
            }
        }
        i += 1;
    }

    if in_group {
        return None;
    }

    out.push('$');
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_star_alone_matches_everything() {
        let matcher = Matcher::glob("*");
        assert_eq!(matcher, Matcher::Any);
        for path in ["a", "a.ts", "a/b/c.png", "/leading", ".hidden"] {
            assert!(matcher.test(path), "{path} should match");
        }
    }

    #[test]
    fn test_single_star_stays_in_segment() {
        let matcher = Matcher::glob("src/*");
        assert!(matcher.test("src/index.ts"));
        assert!(!matcher.test("src/utils/helper.ts"));
    }

    #[test]
    fn test_double_star_crosses_segments() {
        let matcher = Matcher::glob("**");
        assert!(matcher.test("logo.png"));
        assert!(matcher.test("assets/img/logo.png"));

        let matcher = Matcher::glob("assets/**");
        assert!(matcher.test("assets/img/logo.png"));
        assert!(!matcher.test("other/logo.png"));
    }

    #[test]
    fn test_globstar_slash_matches_zero_segments() {
        let matcher = Matcher::glob("**/*.test.ts");
        assert!(matcher.test("a.test.ts"));
        assert!(matcher.test("x/y/a.test.ts"));
        assert!(!matcher.test("a.ts"));

        let matcher = Matcher::glob("src/**/index.ts");
        assert!(matcher.test("src/index.ts"));
        assert!(matcher.test("src/a/b/index.ts"));
    }

    #[test]
    fn test_dot_is_literal() {
        let matcher = Matcher::glob("*.ts");
        assert!(matcher.test("index.ts"));
        assert!(!matcher.test("indexxts"));
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        let matcher = Matcher::glob("Assets/*.PNG");
        assert!(matcher.test("assets/logo.png"));
    }

    #[test]
    fn test_question_mark_and_braces() {
        let matcher = Matcher::glob("file?.{png,jpg}");
        assert!(matcher.test("file1.png"));
        assert!(matcher.test("fileA.jpg"));
        assert!(!matcher.test("file10.png"));
        assert!(!matcher.test("file1.gif"));
    }

    #[test]
    fn test_leading_dot_slash_is_ignored() {
        let matcher = Matcher::glob("./styles/*.css");
        assert!(matcher.test("styles/main.css"));
    }

    #[test]
    fn test_regex_metacharacters_are_escaped() {
        let matcher = Matcher::glob("a+b(c)[d].txt");
        assert!(matcher.test("a+b(c)[d].txt"));
        assert!(!matcher.test("aab(c)d.txt"));
    }

    #[test]
    fn test_unbalanced_brace_falls_back_to_exact() {
        let matcher = Matcher::glob("{oops");
        assert_eq!(matcher, Matcher::Exact("{oops".to_owned()));
        assert!(matcher.test("{OOPS"));
        assert!(!matcher.test("oops"));
    }

    #[test]
    fn test_literal_pattern_is_used_unchanged() {
        let regex = Regex::new(r"^src/.*\.ts$").unwrap();
        let matcher = Matcher::compile(&Pattern::literal(regex));
        assert!(matcher.test("src/a/b.ts"));
        // Literal patterns keep their own flags.
        assert!(!matcher.test("SRC/a.ts"));
        assert_eq!(matcher.source(), r"^src/.*\.ts$");
    }

    #[test]
    fn test_pattern_deserializes_from_string_and_object() {
        let patterns: Vec<Pattern> =
            serde_json::from_str(r#"["**/*.png", {"regex": "\\.svg$"}]"#).unwrap();
        assert_eq!(patterns[0], Pattern::glob("**/*.png"));
        assert!(matches!(patterns[1], Pattern::Literal { .. }));
    }

    #[test]
    fn test_pattern_rejects_non_string_values() {
        assert!(serde_json::from_str::<Pattern>("5").is_err());
        assert!(serde_json::from_str::<Pattern>(r#"{"regex": "("}"#).is_err());
    }

    #[test]
    fn test_matcher_serializes_to_source() {
        let json = serde_json::to_string(&Matcher::glob("src/*")).unwrap();
        assert_eq!(json, r#""src/*""#);
    }

    #[test]
    fn test_any_match() {
        let matchers = compile_all(&[Pattern::glob("*.png"), Pattern::glob("*.svg")]);
        assert!(any_match(&matchers, "logo.svg"));
        assert!(!any_match(&matchers, "logo.gif"));
        assert!(!any_match(&[], "logo.gif"));
    }
}
