use std::collections::BTreeMap;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// Reference target used for open objects with no declared shape.
pub const ANY_TYPE_REF: &str = "pulumi.json#/Any";

const TYPES_REF_PREFIX: &str = "#/types/";

/// Build the `#/types/<token>` reference string for a registered type.
pub fn type_ref(token: &str) -> String {
    format!("{TYPES_REF_PREFIX}{token}")
}

/// Scalar types a property can carry directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveType {
    String,
    Integer,
    Number,
    Boolean,
}

impl PrimitiveType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrimitiveType::String => "string",
            PrimitiveType::Integer => "integer",
            PrimitiveType::Number => "number",
            PrimitiveType::Boolean => "boolean",
        }
    }
}

/// Discriminator carried by a union type-spec. Mapping values are
/// `#/types/<token>` references.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscriminatorSpec {
    pub property_name: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub mapping: BTreeMap<String, String>,
}

/// The type of a property, array item, map value or function return.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeSpec {
    Primitive(PrimitiveType),
    /// An object with no declared shape.
    Any,
    Array(Box<TypeSpec>),
    /// An object whose values all share one type.
    Map(Box<TypeSpec>),
    /// A registered named type, by token.
    Ref(String),
    Union {
        variants: Vec<TypeSpec>,
        discriminator: Option<DiscriminatorSpec>,
    },
}

impl TypeSpec {
    pub fn string() -> Self {
        TypeSpec::Primitive(PrimitiveType::String)
    }

    /// The token of a named type reference.
    pub fn token(&self) -> Option<&str> {
        match self {
            TypeSpec::Ref(token) => Some(token),
            _ => None,
        }
    }
}

impl Serialize for TypeSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        match self {
            TypeSpec::Primitive(p) => map.serialize_entry("type", p)?,
            TypeSpec::Any => map.serialize_entry("$ref", ANY_TYPE_REF)?,
            TypeSpec::Array(items) => {
                map.serialize_entry("type", "array")?;
                map.serialize_entry("items", items)?;
            }
            TypeSpec::Map(values) => {
                map.serialize_entry("type", "object")?;
                map.serialize_entry("additionalProperties", values)?;
            }
            TypeSpec::Ref(token) => map.serialize_entry("$ref", &type_ref(token))?,
            TypeSpec::Union {
                variants,
                discriminator,
            } => {
                map.serialize_entry("oneOf", variants)?;
                if let Some(d) = discriminator {
                    map.serialize_entry("discriminator", d)?;
                }
            }
        }
        map.end()
    }
}

/// A named property of an object, resource or function input.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertySpec {
    #[serde(flatten)]
    pub type_spec: TypeSpec,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,

    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub secret: bool,
}

impl PropertySpec {
    pub fn new(type_spec: TypeSpec) -> Self {
        Self {
            type_spec,
            description: None,
            default: None,
            secret: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ObjectTypeSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, PropertySpec>,

    /// Sorted, and only ever names keys of `properties`.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
}

/// One member of an enum type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnumValueSpec {
    pub name: String,
    pub value: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnumTypeSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(rename = "type")]
    pub base_type: PrimitiveType,

    #[serde(rename = "enum")]
    pub values: Vec<EnumValueSpec>,
}

impl EnumTypeSpec {
    /// Whether both enums generate exactly the same member names.
    pub fn same_members(&self, other: &EnumTypeSpec) -> bool {
        self.values.len() == other.values.len()
            && other
                .values
                .iter()
                .all(|o| self.values.iter().any(|v| v.name == o.name))
    }
}

/// A type registered under a token in the schema's type table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ComplexTypeSpec {
    Object(ObjectTypeSpec),
    Enum(EnumTypeSpec),
}

impl ComplexTypeSpec {
    pub fn as_object(&self) -> Option<&ObjectTypeSpec> {
        match self {
            ComplexTypeSpec::Object(o) => Some(o),
            ComplexTypeSpec::Enum(_) => None,
        }
    }

    pub fn as_enum(&self) -> Option<&EnumTypeSpec> {
        match self {
            ComplexTypeSpec::Enum(e) => Some(e),
            ComplexTypeSpec::Object(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialize_primitive_and_ref() {
        let s = serde_json::to_string(&TypeSpec::string()).unwrap();
        insta::assert_snapshot!(s, @r#"{"type":"string"}"#);

        let s = serde_json::to_string(&TypeSpec::Ref("pkg:widgets:Widget".into())).unwrap();
        insta::assert_snapshot!(s, @r##"{"$ref":"#/types/pkg:widgets:Widget"}"##);
    }

    #[test]
    fn serialize_array_of_any() {
        let s = serde_json::to_string(&TypeSpec::Array(Box::new(TypeSpec::Any))).unwrap();
        insta::assert_snapshot!(s, @r#"{"type":"array","items":{"$ref":"pulumi.json#/Any"}}"#);
    }

    #[test]
    fn serialize_property_flattens_type() {
        let mut prop = PropertySpec::new(TypeSpec::Map(Box::new(TypeSpec::Primitive(
            PrimitiveType::Integer,
        ))));
        prop.description = Some("Counts".into());
        prop.secret = true;
        let v = serde_json::to_value(&prop).unwrap();
        assert_eq!(v["type"], "object");
        assert_eq!(v["additionalProperties"]["type"], "integer");
        assert_eq!(v["description"], "Counts");
        assert_eq!(v["secret"], true);
        assert!(v.get("default").is_none());
    }

    #[test]
    fn serialize_union_with_discriminator() {
        let union = TypeSpec::Union {
            variants: vec![
                TypeSpec::Ref("pkg:m:Cat".into()),
                TypeSpec::Ref("pkg:m:Dog".into()),
            ],
            discriminator: Some(DiscriminatorSpec {
                property_name: "petType".into(),
                mapping: BTreeMap::from([("cat".to_string(), type_ref("pkg:m:Cat"))]),
            }),
        };
        let v = serde_json::to_value(&union).unwrap();
        assert_eq!(v["oneOf"].as_array().map(Vec::len), Some(2));
        assert_eq!(v["discriminator"]["propertyName"], "petType");
        assert_eq!(v["discriminator"]["mapping"]["cat"], "#/types/pkg:m:Cat");
    }

    #[test]
    fn enum_member_comparison_ignores_order() {
        let a = EnumTypeSpec {
            description: None,
            base_type: PrimitiveType::String,
            values: vec![
                EnumValueSpec {
                    name: "A".into(),
                    value: "a".into(),
                },
                EnumValueSpec {
                    name: "B".into(),
                    value: "b".into(),
                },
            ],
        };
        let mut b = a.clone();
        b.values.reverse();
        assert!(a.same_members(&b));

        b.values.pop();
        assert!(!a.same_members(&b));
    }
}
