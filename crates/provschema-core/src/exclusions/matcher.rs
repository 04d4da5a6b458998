use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// How an exclusion's path pattern is interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternType {
    Exact,
    /// `*` matches within one segment, `**` across segments and `?` one
    /// character other than `/`.
    #[default]
    Wildcard,
    Regex,
}

impl PatternType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatternType::Exact => "exact",
            PatternType::Wildcard => "wildcard",
            PatternType::Regex => "regex",
        }
    }
}

impl fmt::Display for PatternType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Matches API paths against one configured pattern.
pub trait PathMatcher: fmt::Debug + Send + Sync {
    fn matches(&self, path: &str) -> bool;

    /// The pattern as configured.
    fn pattern(&self) -> &str;

    fn pattern_type(&self) -> PatternType;
}

#[derive(Debug, Clone)]
pub struct ExactMatcher {
    pattern: String,
}

impl ExactMatcher {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
        }
    }
}

impl PathMatcher for ExactMatcher {
    fn matches(&self, path: &str) -> bool {
        self.pattern == path
    }

    fn pattern(&self) -> &str {
        &self.pattern
    }

    fn pattern_type(&self) -> PatternType {
        PatternType::Exact
    }
}

#[derive(Debug, Clone)]
pub struct WildcardMatcher {
    pattern: String,
    regex: Regex,
}

impl WildcardMatcher {
    pub fn new(pattern: impl Into<String>) -> Result<Self, regex::Error> {
        let pattern = pattern.into();
        let regex = Regex::new(&wildcard_to_regex(&pattern))?;
        Ok(Self { pattern, regex })
    }
}

impl PathMatcher for WildcardMatcher {
    fn matches(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    fn pattern(&self) -> &str {
        &self.pattern
    }

    fn pattern_type(&self) -> PatternType {
        PatternType::Wildcard
    }
}

/// A user-supplied regular expression, used unanchored.
#[derive(Debug, Clone)]
pub struct RegexMatcher {
    regex: Regex,
}

impl RegexMatcher {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            regex: Regex::new(pattern)?,
        })
    }
}

impl PathMatcher for RegexMatcher {
    fn matches(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    fn pattern(&self) -> &str {
        self.regex.as_str()
    }

    fn pattern_type(&self) -> PatternType {
        PatternType::Regex
    }
}

/// Build the matcher for `pattern` interpreted as `pattern_type`.
pub fn path_matcher(
    pattern: &str,
    pattern_type: PatternType,
) -> Result<Box<dyn PathMatcher>, regex::Error> {
    Ok(match pattern_type {
        PatternType::Exact => Box::new(ExactMatcher::new(pattern)),
        PatternType::Wildcard => Box::new(WildcardMatcher::new(pattern)?),
        PatternType::Regex => Box::new(RegexMatcher::new(pattern)?),
    })
}

/// Translate a wildcard pattern into an anchored regular expression.
fn wildcard_to_regex(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 8);
    out.push('^');
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' if chars.peek() == Some(&'*') => {
                chars.next();
                out.push_str(".*");
            }
            '*' => out.push_str("[^/]*"),
            '?' => out.push_str("[^/]"),
            other => out.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
        }
    }
    out.push('$');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_translation() {
        assert_eq!(wildcard_to_regex("/debug/*"), "^/debug/[^/]*$");
        assert_eq!(wildcard_to_regex("/internal/**"), "^/internal/.*$");
        assert_eq!(wildcard_to_regex("/v?/items.json"), r"^/v[^/]/items\.json$");
    }

    #[test]
    fn single_star_stays_in_segment() {
        let m = WildcardMatcher::new("/debug/*").unwrap();
        assert!(m.matches("/debug/metrics"));
        assert!(!m.matches("/debug/metrics/cpu"));
        assert!(!m.matches("/debugger/metrics"));
    }

    #[test]
    fn double_star_crosses_segments() {
        let m = WildcardMatcher::new("/internal/**").unwrap();
        assert!(m.matches("/internal/a/b"));
        assert!(m.matches("/internal/"));
        assert!(!m.matches("/public/internal/a"));
    }

    #[test]
    fn braces_are_literal() {
        let m = WildcardMatcher::new("/users/{id}").unwrap();
        assert!(m.matches("/users/{id}"));
        assert!(!m.matches("/users/42"));
    }

    #[test]
    fn regex_is_used_as_is() {
        let m = RegexMatcher::new(r"^/v\d+/admin").unwrap();
        assert!(m.matches("/v2/admin/users"));
        assert!(!m.matches("/admin"));
        assert_eq!(m.pattern(), r"^/v\d+/admin");
        assert_eq!(m.pattern_type(), PatternType::Regex);
    }

    #[test]
    fn exact_requires_equality() {
        let m = ExactMatcher::new("/health");
        assert!(m.matches("/health"));
        assert!(!m.matches("/health/live"));
    }

    #[test]
    fn invalid_regex_is_rejected() {
        assert!(path_matcher("/broken/(", PatternType::Regex).is_err());
    }
}
