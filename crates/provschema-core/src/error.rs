use thiserror::Error;

use crate::ir::EnumValueSpec;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported OpenAPI version: {0}")]
    UnsupportedVersion(String),
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("circular reference detected: {0}")]
    CircularRef(String),

    #[error("invalid reference format: {0}")]
    InvalidRefFormat(String),

    #[error("reference target not found: {0}")]
    RefTargetNotFound(String),
}

/// Raised while building an exclusion evaluator from configuration.
#[derive(Debug, Error)]
pub enum ExclusionError {
    #[error("invalid exclusion at index {index}: pathPattern is required")]
    EmptyPattern { index: usize },

    #[error("invalid exclusion at index {index}: invalid HTTP method: {method}")]
    InvalidMethod { index: usize, method: String },

    #[error("invalid exclusion at index {index}: failed to compile pattern {pattern}: {source}")]
    InvalidPattern {
        index: usize,
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Two enums resolved to the same token with different members, even after
/// the resource-name prefix was applied.
#[derive(Debug, Clone, PartialEq, Error)]
#[error(
    "duplicate enum with different values {token:?}: [{}] vs. [{}]",
    member_names(.new_values),
    member_names(.existing_values)
)]
pub struct DuplicateEnumError {
    pub token: String,
    pub new_values: Vec<EnumValueSpec>,
    pub existing_values: Vec<EnumValueSpec>,
}

fn member_names(values: &[EnumValueSpec]) -> String {
    values
        .iter()
        .map(|v| v.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Everything that can abort an extraction pass.
///
/// All variants are fatal for the pass except [`ExtractError::DuplicateEnum`],
/// which callers may choose to downgrade (see `DuplicateEnumPolicy`).
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("resolve error: {0}")]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    DuplicateEnum(#[from] DuplicateEnumError),

    #[error("operationId is missing for path {method} {path}")]
    MissingOperationId { method: String, path: String },

    #[error("path {path} has no schema definition for status code 200")]
    MissingResponseSchema { path: String },

    #[error("path {path} has no request body schema for {method} method")]
    MissingRequestSchema { method: String, path: String },

    #[error(
        "mapping for {key} already exists and has a value {existing} but a new mapping with value {new} was requested"
    )]
    NameOverrideConflict {
        key: String,
        existing: String,
        new: String,
    },

    #[error("auto-name prop already exists for resource {token} (existing: {existing}, new: {new})")]
    AutoNameConflict {
        token: String,
        existing: String,
        new: String,
    },

    #[error("{slot} operation for {token} is already mapped to {existing}, cannot also map {new}")]
    AmbiguousOperation {
        token: String,
        slot: &'static str,
        existing: String,
        new: String,
    },

    #[error("{name} not found in api schemas for discriminated type in path {path}")]
    DiscriminatorTargetNotFound { name: String, path: String },

    #[error("type {token} is already registered with a different shape")]
    TypeConflict { token: String },

    #[error("failed to generate property types for {name}: {detail}")]
    UnsupportedSchema { name: String, detail: String },
}

impl ExtractError {
    /// Returns the duplicate-enum payload if this is that error kind.
    pub fn as_duplicate_enum(&self) -> Option<&DuplicateEnumError> {
        match self {
            ExtractError::DuplicateEnum(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_duplicate_enum(&self) -> bool {
        self.as_duplicate_enum().is_some()
    }
}
