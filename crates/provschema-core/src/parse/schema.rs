use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Extension flag marking a property as sensitive.
pub const SECRET_EXTENSION: &str = "x-provider-secret";

/// A JSON Schema type keyword value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
    Null,
}

/// The `type` field can be a single type or an array of types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TypeSet {
    Single(SchemaType),
    Multiple(Vec<SchemaType>),
}

impl TypeSet {
    /// The first non-null type.
    pub fn primary(&self) -> Option<SchemaType> {
        match self {
            TypeSet::Single(SchemaType::Null) => None,
            TypeSet::Single(t) => Some(*t),
            TypeSet::Multiple(types) => types.iter().copied().find(|t| *t != SchemaType::Null),
        }
    }

    pub fn contains(&self, t: SchemaType) -> bool {
        match self {
            TypeSet::Single(s) => *s == t,
            TypeSet::Multiple(types) => types.contains(&t),
        }
    }
}

/// A reference or inline schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SchemaOrRef {
    Ref {
        #[serde(rename = "$ref")]
        ref_path: String,
    },
    Schema(Box<Schema>),
}

/// Discriminator for polymorphic schemas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discriminator {
    #[serde(rename = "propertyName")]
    pub property_name: String,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub mapping: IndexMap<String, String>,
}

/// The subset of a JSON Schema object that drives type inference.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Schema {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<TypeSet>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(rename = "default", skip_serializing_if = "Option::is_none")]
    pub default_value: Option<serde_json::Value>,

    // Object properties
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub properties: IndexMap<String, SchemaOrRef>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,

    #[serde(
        rename = "additionalProperties",
        skip_serializing_if = "Option::is_none"
    )]
    pub additional_properties: Option<AdditionalProperties>,

    // Array items
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<SchemaOrRef>>,

    // Composition
    #[serde(rename = "allOf", default, skip_serializing_if = "Vec::is_empty")]
    pub all_of: Vec<SchemaOrRef>,

    #[serde(rename = "oneOf", default, skip_serializing_if = "Vec::is_empty")]
    pub one_of: Vec<SchemaOrRef>,

    #[serde(rename = "anyOf", default, skip_serializing_if = "Vec::is_empty")]
    pub any_of: Vec<SchemaOrRef>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub discriminator: Option<Discriminator>,

    // Enum values
    #[serde(rename = "enum", default, skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<serde_json::Value>,

    // Read/Write only
    #[serde(rename = "readOnly", default)]
    pub read_only: bool,
    #[serde(rename = "writeOnly", default)]
    pub write_only: bool,

    /// Every other keyword, including `x-` extensions.
    #[serde(flatten)]
    pub extensions: IndexMap<String, serde_json::Value>,
}

impl Schema {
    /// The first non-null declared type.
    pub fn primary_type(&self) -> Option<SchemaType> {
        self.schema_type.as_ref().and_then(TypeSet::primary)
    }

    pub fn is_type(&self, t: SchemaType) -> bool {
        self.schema_type.as_ref().is_some_and(|ts| ts.contains(t))
    }

    /// Whether the schema carries the secret extension set to `true`.
    pub fn is_secret(&self) -> bool {
        self.extensions
            .get(SECRET_EXTENSION)
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false)
    }

    /// The default value, unless the schema is an array.
    pub fn scalar_default(&self) -> Option<&serde_json::Value> {
        if self.is_type(SchemaType::Array) {
            return None;
        }
        self.default_value.as_ref()
    }
}

/// `additionalProperties` can be a boolean or a schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AdditionalProperties {
    Bool(bool),
    Schema(Box<SchemaOrRef>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_secret_extension() {
        let yaml = r#"
type: string
description: API token
x-provider-secret: true
"#;
        let schema: Schema = serde_yaml_ng::from_str(yaml).unwrap();
        assert!(schema.is_secret());
        assert_eq!(schema.primary_type(), Some(SchemaType::String));
    }

    #[test]
    fn nullable_type_list_uses_first_non_null() {
        let schema: Schema = serde_yaml_ng::from_str("type: [\"null\", integer]").unwrap();
        assert_eq!(schema.primary_type(), Some(SchemaType::Integer));
        assert!(schema.is_type(SchemaType::Null));
    }

    #[test]
    fn ref_takes_precedence_over_inline() {
        let s: SchemaOrRef =
            serde_yaml_ng::from_str("$ref: '#/components/schemas/Widget'").unwrap();
        assert_eq!(
            s,
            SchemaOrRef::Ref {
                ref_path: "#/components/schemas/Widget".into()
            }
        );
    }

    #[test]
    fn array_default_is_dropped() {
        let schema: Schema = serde_yaml_ng::from_str("type: array\ndefault: []").unwrap();
        assert!(schema.scalar_default().is_none());
    }
}
