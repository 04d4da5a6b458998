use serde::{Deserialize, Serialize};

use super::reference::RefOr;
use super::schema::SchemaOrRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Query,
    Header,
    Path,
    Cookie,
}

/// An operation or path-level parameter. Path parameters become required
/// string inputs of functions and resources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,

    #[serde(rename = "in")]
    pub location: ParameterLocation,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub required: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<SchemaOrRef>,
}

impl Parameter {
    pub fn is_path(&self) -> bool {
        self.location == ParameterLocation::Path
    }
}

pub type ParameterOrRef = RefOr<Parameter>;
