use serde::{Deserialize, Serialize};

/// Either an inline object or a `$ref` to a component of the same kind.
///
/// Schemas have their own [`SchemaOrRef`](super::schema::SchemaOrRef)
/// because they are boxed and named during inference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RefOr<T> {
    Ref {
        #[serde(rename = "$ref")]
        ref_path: String,
    },
    Item(T),
}

impl<T> RefOr<T> {
    pub fn as_item(&self) -> Option<&T> {
        match self {
            RefOr::Item(item) => Some(item),
            RefOr::Ref { .. } => None,
        }
    }
}
