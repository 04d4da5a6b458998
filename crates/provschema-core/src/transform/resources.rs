use std::collections::BTreeSet;

use log::warn;

use crate::error::ExtractError;
use crate::ir::{ComplexTypeSpec, CrudSlot, ObjectTypeSpec, PropertySpec, ResourceSpec, TypeSpec};
use crate::parse::operation::{Operation, PathItem};
use crate::parse::ref_resolve::SchemaNode;
use crate::parse::schema::Schema;

use super::naming::{to_pascal_case, to_sdk_name};
use super::session::{ExtractionSession, PropertyMap, Scope};
use super::type_resolver::{is_object_like, map_value_schema, property_spec};

/// The property name that is never a body-derived resource property.
const ID_PROPERTY: &str = "id";

/// The required property that is auto-named instead of required as input.
const AUTO_NAME_PROPERTY: &str = "name";

/// Request and response bodies a resource is built from.
#[derive(Debug, Clone, Copy)]
pub struct ResourceBodies<'s> {
    pub request: &'s Schema,
    pub response: Option<&'s Schema>,
    /// Drop the requiredness of merged allOf members.
    pub strip_all_of_required: bool,
}

impl ExtractionSession<'_> {
    /// Build the resource `<package>:<module>:<resource_name>` from its
    /// request and response bodies and seat `api_path` as its create path.
    /// Returns the resource token.
    pub fn gather_resource_properties(
        &mut self,
        module: &str,
        resource_name: &str,
        bodies: ResourceBodies<'_>,
        api_path: &str,
    ) -> Result<String, ExtractError> {
        let scope = Scope {
            module,
            resource_name,
        };
        let token = self.token(module, resource_name);
        let lookup = self.lookup;
        let request = bodies.request;

        let mut inputs = PropertyMap::new();
        let mut outputs = PropertyMap::new();
        let mut required_inputs = BTreeSet::new();
        let mut required_outputs = BTreeSet::new();

        for (prop_name, prop) in &request.properties {
            let node = lookup.schema(prop)?;
            let spec = self.resource_property_spec(&scope, prop_name, node)?;
            let sdk_name = to_sdk_name(prop_name);
            self.record_override(prop_name, &sdk_name)?;
            if sdk_name == ID_PROPERTY {
                continue;
            }
            if !node.schema.read_only {
                inputs.insert(sdk_name.clone(), spec.clone());
            }
            outputs.insert(sdk_name, spec);
        }

        if let Some(response) = bodies.response {
            if !response.all_of.is_empty() {
                let (merged, _) =
                    self.gen_properties_from_all_of(&scope, resource_name, &response.all_of)?;
                outputs.extend(merged.into_iter().filter(|(name, _)| name != ID_PROPERTY));
            }
            for (prop_name, prop) in &response.properties {
                let node = lookup.schema(prop)?;
                let spec = self.resource_property_spec(&scope, prop_name, node)?;
                let sdk_name = to_sdk_name(prop_name);
                self.record_override(prop_name, &sdk_name)?;
                if sdk_name != ID_PROPERTY {
                    outputs.insert(sdk_name, spec);
                }
            }
        }

        for name in &request.required {
            let Some(prop) = request.properties.get(name) else {
                warn!("schema not found for required property {name} (type: {resource_name})");
                continue;
            };
            if lookup.schema(prop)?.schema.read_only {
                continue;
            }
            if name == AUTO_NAME_PROPERTY {
                self.set_auto_name(&token, AUTO_NAME_PROPERTY)?;
                continue;
            }
            let sdk_name = to_sdk_name(name);
            if sdk_name != ID_PROPERTY {
                required_inputs.insert(sdk_name);
            }
        }

        // Read-only fields can be required, so this is not derived from the
        // required inputs.
        let response_required = bodies.response.map(|r| r.required.as_slice()).unwrap_or_default();
        for name in request.required.iter().chain(response_required) {
            let sdk_name = to_sdk_name(name);
            self.record_override(name, &sdk_name)?;
            if sdk_name != ID_PROPERTY {
                required_outputs.insert(sdk_name);
            }
        }

        if !request.all_of.is_empty() {
            let parent_name = to_pascal_case(resource_name);
            for member in &request.all_of {
                let node = lookup.schema(member)?;
                if !is_object_like(node.schema) {
                    continue;
                }
                let (type_spec, newly_added) =
                    self.property_type_spec(&scope, &parent_name, node)?;
                let Some(member_token) = type_spec.token() else {
                    continue;
                };
                if let Some(object) = self
                    .schema
                    .types
                    .get(member_token)
                    .and_then(ComplexTypeSpec::as_object)
                {
                    for (name, spec) in &object.properties {
                        if name == ID_PROPERTY {
                            continue;
                        }
                        inputs.insert(name.clone(), spec.clone());
                        outputs.entry(name.clone()).or_insert_with(|| spec.clone());
                    }
                    if !bodies.strip_all_of_required {
                        required_inputs.extend(
                            object
                                .required
                                .iter()
                                .filter(|r| r.as_str() != ID_PROPERTY)
                                .cloned(),
                        );
                    }
                }
                if newly_added {
                    self.remove_type(member_token);
                }
            }
        }

        self.seat(&token, CrudSlot::Create, api_path)?;
        self.schema.resources.insert(
            token.clone(),
            ResourceSpec {
                description: request.description.clone(),
                required: required_outputs
                    .into_iter()
                    .filter(|name| outputs.contains_key(name))
                    .collect(),
                properties: outputs,
                input_properties: inputs,
                required_inputs: required_inputs.into_iter().collect(),
            },
        );
        Ok(token)
    }

    fn resource_property_spec(
        &mut self,
        scope: &Scope<'_>,
        prop_name: &str,
        node: SchemaNode<'_>,
    ) -> Result<PropertySpec, ExtractError> {
        let type_spec = match map_value_schema(node.schema) {
            Some(values) => {
                let values = self.lookup.schema(values)?;
                let (value_spec, _) = self.property_type_spec(scope, prop_name, values)?;
                TypeSpec::Map(Box::new(value_spec))
            }
            None => {
                self.property_type_spec(scope, &to_pascal_case(prop_name), node)?
                    .0
            }
        };
        Ok(property_spec(type_spec, node.schema))
    }

    /// Path parameters of the path item and the operation, as required
    /// string inputs keyed by SDK name.
    pub fn path_parameters(
        &mut self,
        item: &PathItem,
        op: &Operation,
    ) -> Result<ObjectTypeSpec, ExtractError> {
        let lookup = self.lookup;
        let mut inputs = ObjectTypeSpec::default();
        for param in item.parameters.iter().chain(&op.parameters) {
            let param = lookup.parameter(param)?;
            if !param.is_path() {
                continue;
            }
            let sdk_name = to_sdk_name(&param.name);
            self.record_path_param_override(&param.name, &sdk_name)?;

            let mut spec = PropertySpec::new(TypeSpec::string());
            spec.description = param.description.clone();
            inputs.properties.insert(sdk_name, spec);
        }
        inputs.required = inputs.properties.keys().cloned().collect();
        Ok(inputs)
    }

    /// Add path parameters to a resource's inputs as required strings.
    pub fn add_path_parameters(&mut self, token: &str, params: &ObjectTypeSpec) {
        let Some(resource) = self.schema.resources.get_mut(token) else {
            return;
        };
        resource.input_properties.extend(
            params
                .properties
                .iter()
                .map(|(name, spec)| (name.clone(), spec.clone())),
        );
        let mut required: BTreeSet<String> = resource.required_inputs.drain(..).collect();
        required.extend(params.required.iter().cloned());
        resource.required_inputs = required.into_iter().collect();
    }
}
