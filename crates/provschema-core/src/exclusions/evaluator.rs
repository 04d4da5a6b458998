use serde::{Deserialize, Serialize};

use super::matcher::{ExactMatcher, PathMatcher, PatternType, path_matcher};
use crate::error::ExclusionError;

const HTTP_METHODS: [&str; 9] = [
    "GET", "POST", "PUT", "PATCH", "DELETE", "HEAD", "OPTIONS", "CONNECT", "TRACE",
];

/// One configured exclusion rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exclusion {
    /// Absent means every method.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(rename = "pathPattern", default)]
    pub path_pattern: String,
    #[serde(rename = "patternType", default)]
    pub pattern_type: PatternType,
}

#[derive(Debug)]
struct EndpointMatcher {
    /// Uppercased; `None` matches every method.
    method: Option<String>,
    path: Box<dyn PathMatcher>,
}

impl EndpointMatcher {
    fn matches(&self, method: &str, path: &str) -> bool {
        if let Some(expected) = &self.method {
            if !expected.eq_ignore_ascii_case(method) {
                return false;
            }
        }
        self.path.matches(path)
    }

    fn describe(&self) -> String {
        format!(
            "{} {} ({})",
            self.method.as_deref().unwrap_or("*"),
            self.path.pattern(),
            self.path.pattern_type()
        )
    }
}

/// Decides whether an operation is skipped during extraction.
#[derive(Debug, Default)]
pub struct ExclusionEvaluator {
    matchers: Vec<EndpointMatcher>,
}

impl ExclusionEvaluator {
    /// Compile `exclusions` plus `legacy_paths`, which are exact paths
    /// excluded for every method. Empty legacy entries are ignored.
    pub fn new(exclusions: &[Exclusion], legacy_paths: &[String]) -> Result<Self, ExclusionError> {
        let mut matchers = Vec::with_capacity(exclusions.len() + legacy_paths.len());

        for path in legacy_paths.iter().filter(|p| !p.is_empty()) {
            matchers.push(EndpointMatcher {
                method: None,
                path: Box::new(ExactMatcher::new(path.as_str())),
            });
        }

        for (index, exclusion) in exclusions.iter().enumerate() {
            if exclusion.path_pattern.is_empty() {
                return Err(ExclusionError::EmptyPattern { index });
            }
            let method = match exclusion.method.as_deref().filter(|m| !m.is_empty()) {
                Some(method) => {
                    let upper = method.to_uppercase();
                    if !HTTP_METHODS.contains(&upper.as_str()) {
                        return Err(ExclusionError::InvalidMethod {
                            index,
                            method: method.to_string(),
                        });
                    }
                    Some(upper)
                }
                None => None,
            };
            let path = path_matcher(&exclusion.path_pattern, exclusion.pattern_type).map_err(
                |source| ExclusionError::InvalidPattern {
                    index,
                    pattern: exclusion.path_pattern.clone(),
                    source,
                },
            )?;
            matchers.push(EndpointMatcher { method, path });
        }

        Ok(Self { matchers })
    }

    pub fn should_exclude(&self, method: &str, path: &str) -> bool {
        self.matchers.iter().any(|m| m.matches(method, path))
    }

    /// Descriptions of every rule matching the operation, as
    /// `METHOD pattern (type)` with `*` for rules covering all methods.
    pub fn matching_exclusions(&self, method: &str, path: &str) -> Vec<String> {
        self.matchers
            .iter()
            .filter(|m| m.matches(method, path))
            .map(EndpointMatcher::describe)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.matchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }
}
