use std::fs;
use std::path::Path;

use heck::ToKebabCase;
use serde::Deserialize;

use crate::error::ExclusionError;
use crate::exclusions::{Exclusion, ExclusionEvaluator};
use crate::transform::ExtractOptions;
use crate::transform::naming::DEFAULT_ALLOWED_PLURAL_RESOURCES;

/// Project configuration loaded from `.provschema.yaml`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProvschemaConfig {
    pub input: Option<String>,
    pub output: Option<String>,
    pub metadata_output: Option<String>,
    /// Defaults to the kebab-cased document title.
    pub package_name: Option<String>,
    pub use_parent_resource_as_module: bool,
    pub operation_ids_have_namespace: bool,
    pub namespace_separator: String,
    /// Added to the built-in list of names that stay plural.
    pub allowed_plural_resources: Vec<String>,
    pub normalize_path_params: bool,
    pub on_duplicate_enum: DuplicateEnumPolicy,
    /// Exact paths excluded for every method.
    pub excluded_paths: Vec<String>,
    pub exclusions: Vec<Exclusion>,
}

impl Default for ProvschemaConfig {
    fn default() -> Self {
        Self {
            input: None,
            output: None,
            metadata_output: None,
            package_name: None,
            use_parent_resource_as_module: false,
            operation_ids_have_namespace: false,
            namespace_separator: "_".to_string(),
            allowed_plural_resources: Vec::new(),
            normalize_path_params: true,
            on_duplicate_enum: DuplicateEnumPolicy::Fail,
            excluded_paths: Vec::new(),
            exclusions: Vec::new(),
        }
    }
}

/// What to do when two different enums end up with the same token.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicateEnumPolicy {
    /// Abort the pass.
    #[default]
    Fail,
    /// Log it and type the property with the enum's base type.
    Warn,
}

impl ProvschemaConfig {
    /// Build extraction options, using `document_title` to derive the
    /// package name when none is configured.
    pub fn extract_options(&self, document_title: &str) -> Result<ExtractOptions, ExclusionError> {
        let package_name = self
            .package_name
            .clone()
            .unwrap_or_else(|| document_title.to_kebab_case());

        let mut allowed_plurals = self.allowed_plural_resources.clone();
        allowed_plurals.extend(DEFAULT_ALLOWED_PLURAL_RESOURCES.iter().map(|s| s.to_string()));

        Ok(ExtractOptions {
            package_name,
            use_parent_as_module: self.use_parent_resource_as_module,
            namespace_separator: self
                .operation_ids_have_namespace
                .then(|| self.namespace_separator.clone()),
            allowed_plurals,
            normalize_path_params: self.normalize_path_params,
            duplicate_enum_policy: self.on_duplicate_enum,
            exclusions: ExclusionEvaluator::new(&self.exclusions, &self.excluded_paths)?,
        })
    }
}

/// Default config file name.
pub const CONFIG_FILE_NAME: &str = ".provschema.yaml";

/// Load config from a YAML file. Returns `None` if the file doesn't exist.
pub fn load_config(path: &Path) -> Result<Option<ProvschemaConfig>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)
        .map_err(|e| format!("failed to read config {}: {}", path.display(), e))?;
    let config: ProvschemaConfig = serde_yaml_ng::from_str(&content)
        .map_err(|e| format!("failed to parse config {}: {}", path.display(), e))?;
    Ok(Some(config))
}

/// Generate the default config file content.
pub fn default_config_content() -> &'static str {
    r#"# provschema configuration
input: openapi.yaml
output: schema.json
metadata_output: metadata.json
# package_name: provider          # defaults to the kebab-cased info.title

use_parent_resource_as_module: false
operation_ids_have_namespace: false  # e.g. Widgets_create
namespace_separator: "_"
allowed_plural_resources: []         # extra names that stay plural
normalize_path_params: true          # /users/{id}/keys/{key_id} -> /users/{usersId}/keys/{id}
on_duplicate_enum: fail              # fail | warn

excluded_paths: []                   # exact paths, all methods
exclusions: []
  # - method: GET                    # omit for all methods
  #   pathPattern: /debug/*
  #   patternType: wildcard          # exact | wildcard | regex
"#
}
