use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::reference::RefOr;
use super::schema::SchemaOrRef;

/// The only content type bodies are read from.
pub const JSON_MIME_TYPE: &str = "application/json";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MediaType {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<SchemaOrRef>,
}

/// The `application/json` entry of a content map.
pub fn json_content(content: &IndexMap<String, MediaType>) -> Option<&MediaType> {
    content.get(JSON_MIME_TYPE)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub content: IndexMap<String, MediaType>,
}

impl RequestBody {
    pub fn json_schema(&self) -> Option<&SchemaOrRef> {
        json_content(&self.content).and_then(|m| m.schema.as_ref())
    }
}

/// A response for one status code. Only bodies matter for inference, so
/// headers and links are not modelled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    #[serde(default)]
    pub description: String,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub content: IndexMap<String, MediaType>,
}

pub type RequestBodyOrRef = RefOr<RequestBody>;
pub type ResponseOrRef = RefOr<Response>;
