use std::collections::BTreeMap;

use serde::Serialize;

use super::types::{ComplexTypeSpec, ObjectTypeSpec, PropertySpec, TypeSpec};

/// A manageable entity with settable inputs and observable outputs.
///
/// `properties` is always a superset of `input_properties` apart from path
/// parameters, and neither ever holds `id`.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub properties: BTreeMap<String, PropertySpec>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,

    pub input_properties: BTreeMap<String, PropertySpec>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub required_inputs: Vec<String>,
}

/// What a function returns: a type (usually a ref) or an inline object.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ReturnTypeSpec {
    TypeSpec(TypeSpec),
    ObjectTypeSpec(ObjectTypeSpec),
}

/// A read-only query backed by a GET endpoint.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub inputs: Option<ObjectTypeSpec>,

    /// `None` when the endpoint has no response body.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_type: Option<ReturnTypeSpec>,
}

/// The provider schema produced by one extraction pass.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ProviderSchema {
    pub name: String,
    pub resources: BTreeMap<String, ResourceSpec>,
    pub types: BTreeMap<String, ComplexTypeSpec>,
    pub functions: BTreeMap<String, FunctionSpec>,
}

impl ProviderSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}
