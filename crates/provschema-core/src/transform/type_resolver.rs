use std::collections::{BTreeMap, BTreeSet};

use log::{debug, warn};

use crate::config::DuplicateEnumPolicy;
use crate::error::ExtractError;
use crate::ir::{
    ComplexTypeSpec, DiscriminatorSpec, ObjectTypeSpec, PrimitiveType, PropertySpec, TypeSpec,
    type_ref,
};
use crate::parse::ref_resolve::{SchemaNode, component_schema_name};
use crate::parse::schema::{AdditionalProperties, Discriminator, Schema, SchemaOrRef, SchemaType};

use super::naming::{to_pascal_case, to_sdk_name};
use super::session::{ExtractionSession, PropertyMap, Scope};

impl ExtractionSession<'_> {
    /// Resolve a schema to a type-spec, registering any named types it needs.
    ///
    /// The flag is `true` only when this call registered the returned token,
    /// which lets allOf merging drop types that exist solely for the merge.
    pub fn property_type_spec(
        &mut self,
        scope: &Scope<'_>,
        parent_name: &str,
        node: SchemaNode<'_>,
    ) -> Result<(TypeSpec, bool), ExtractError> {
        let schema = node.schema;

        if let Some(ref_name) = node.ref_name {
            if !schema.is_type(SchemaType::Array) && schema.enum_values.is_empty() {
                return self.referenced_type_spec(scope, parent_name, ref_name, schema);
            }
        }

        if !schema.properties.is_empty() {
            let type_name = format!("{parent_name}Properties");
            let object = self.object_type(scope, &type_name, schema)?;
            return self.register_generated(scope, &type_name, object);
        }

        if !schema.one_of.is_empty() {
            return self.union_type_spec(scope, parent_name, schema);
        }

        if !schema.all_of.is_empty() {
            let (properties, required) =
                self.gen_properties_from_all_of(scope, parent_name, &schema.all_of)?;
            let merged = ComplexTypeSpec::Object(ObjectTypeSpec {
                description: schema.description.clone(),
                properties,
                required: required.into_iter().collect(),
            });
            return self.register_generated(scope, &to_pascal_case(parent_name), merged);
        }

        if !schema.enum_values.is_empty() {
            match self.gen_enum_type(scope, parent_name, schema) {
                Ok(Some(resolved)) => return Ok(resolved),
                Ok(None) => {}
                Err(ExtractError::DuplicateEnum(err))
                    if self.options.duplicate_enum_policy == DuplicateEnumPolicy::Warn =>
                {
                    warn!("{err}; typing {parent_name} with the enum's base type");
                }
                Err(err) => return Err(err),
            }
        }

        self.scalar_type_spec(scope, parent_name, schema)
    }

    fn referenced_type_spec(
        &mut self,
        scope: &Scope<'_>,
        parent_name: &str,
        ref_name: &str,
        schema: &Schema,
    ) -> Result<(TypeSpec, bool), ExtractError> {
        let type_name = to_pascal_case(ref_name);

        let has_members = !schema.properties.is_empty() || !schema.all_of.is_empty();
        if !has_members && !schema.one_of.is_empty() {
            return self.union_type_spec(scope, &type_name, schema);
        }
        // Reusable schemas that are really just scalars or maps are inlined.
        let value_map = matches!(
            schema.additional_properties,
            Some(AdditionalProperties::Schema(_))
        );
        if !has_members && (!schema.is_type(SchemaType::Object) || value_map) {
            return self.scalar_type_spec(scope, parent_name, schema);
        }

        let token = self.token(scope.module, &type_name);
        if self.is_visited(&token) {
            return Ok((TypeSpec::Ref(token), false));
        }

        // Mark first: self-referencing schemas must stop here.
        self.mark_visited(&token);
        let object = self.object_type(scope, &type_name, schema)?;
        match self.schema.types.get(&token) {
            None => {
                self.register_type(token.clone(), object);
                Ok((TypeSpec::Ref(token), true))
            }
            Some(existing) if *existing == object => Ok((TypeSpec::Ref(token), false)),
            Some(_) => Err(ExtractError::TypeConflict { token }),
        }
    }

    /// Register a type generated for an inline schema.
    ///
    /// Identical content already under the name is reused. Different content
    /// moves the new type to the resource-qualified name, and a conflict there
    /// is an error. The flag is `true` only when this call inserted the type.
    fn register_generated(
        &mut self,
        scope: &Scope<'_>,
        type_name: &str,
        spec: ComplexTypeSpec,
    ) -> Result<(TypeSpec, bool), ExtractError> {
        let qualified = format!("{}{type_name}", scope.resource_name);
        for candidate in [type_name, qualified.as_str()] {
            let token = self.token(scope.module, candidate);
            match self.schema.types.get(&token) {
                None => {
                    self.register_type(token.clone(), spec);
                    return Ok((TypeSpec::Ref(token), true));
                }
                Some(existing) if *existing == spec => return Ok((TypeSpec::Ref(token), false)),
                Some(_) => debug!("{token} is taken by a different type"),
            }
        }
        Err(ExtractError::TypeConflict {
            token: self.token(scope.module, &qualified),
        })
    }

    fn object_type(
        &mut self,
        scope: &Scope<'_>,
        type_name: &str,
        schema: &Schema,
    ) -> Result<ComplexTypeSpec, ExtractError> {
        let (properties, required) = self.gen_properties(scope, type_name, schema)?;
        Ok(ComplexTypeSpec::Object(ObjectTypeSpec {
            description: schema.description.clone(),
            properties,
            required: required.into_iter().collect(),
        }))
    }

    fn union_type_spec(
        &mut self,
        scope: &Scope<'_>,
        parent_name: &str,
        schema: &Schema,
    ) -> Result<(TypeSpec, bool), ExtractError> {
        let variants = self.resolve_all(scope, parent_name, &schema.one_of)?;
        let discriminator = schema
            .discriminator
            .as_ref()
            .map(|d| union_discriminator(d, &variants));
        Ok((
            TypeSpec::Union {
                variants,
                discriminator,
            },
            false,
        ))
    }

    fn resolve_all(
        &mut self,
        scope: &Scope<'_>,
        parent_name: &str,
        members: &[SchemaOrRef],
    ) -> Result<Vec<TypeSpec>, ExtractError> {
        let lookup = self.lookup;
        let mut resolved = Vec::with_capacity(members.len());
        for member in members {
            let node = lookup.schema(member)?;
            let (type_spec, _) = self.property_type_spec(scope, parent_name, node)?;
            resolved.push(type_spec);
        }
        Ok(resolved)
    }

    fn scalar_type_spec(
        &mut self,
        scope: &Scope<'_>,
        parent_name: &str,
        schema: &Schema,
    ) -> Result<(TypeSpec, bool), ExtractError> {
        let lookup = self.lookup;

        if schema.any_of.len() > 1 {
            let variants = self.resolve_all(scope, parent_name, &schema.any_of)?;
            return Ok((
                TypeSpec::Union {
                    variants,
                    discriminator: None,
                },
                false,
            ));
        }

        let Some(value_type) = schema.primary_type() else {
            if let [only] = schema.any_of.as_slice() {
                let node = lookup.schema(only)?;
                return self.property_type_spec(scope, parent_name, node);
            }
            return Err(unsupported(parent_name, schema));
        };

        let type_spec = match value_type {
            SchemaType::Integer => TypeSpec::Primitive(PrimitiveType::Integer),
            SchemaType::String => TypeSpec::Primitive(PrimitiveType::String),
            SchemaType::Boolean => TypeSpec::Primitive(PrimitiveType::Boolean),
            SchemaType::Number => TypeSpec::Primitive(PrimitiveType::Number),
            SchemaType::Object => match &schema.additional_properties {
                Some(AdditionalProperties::Schema(values)) => {
                    let node = lookup.schema(values)?;
                    let (value_spec, _) = self.property_type_spec(scope, parent_name, node)?;
                    TypeSpec::Map(Box::new(value_spec))
                }
                _ => TypeSpec::Any,
            },
            SchemaType::Array => {
                let item = match &schema.items {
                    Some(items) => {
                        let node = lookup.schema(items)?;
                        let item_name = format!("{parent_name}Item");
                        self.property_type_spec(scope, &item_name, node)?.0
                    }
                    None => TypeSpec::Any,
                };
                TypeSpec::Array(Box::new(item))
            }
            SchemaType::Null => return Err(unsupported(parent_name, schema)),
        };
        Ok((type_spec, false))
    }

    /// Build the property map and required set of an object schema.
    ///
    /// Property types are named `<parent><Property>`. An `allOf` on the
    /// schema is merged on top of its own properties.
    pub fn gen_properties(
        &mut self,
        scope: &Scope<'_>,
        parent_name: &str,
        schema: &Schema,
    ) -> Result<(PropertyMap, BTreeSet<String>), ExtractError> {
        let lookup = self.lookup;
        let mut properties = PropertyMap::new();

        let mut names: Vec<&String> = schema.properties.keys().collect();
        names.sort();
        for name in names {
            let node = lookup.schema(&schema.properties[name])?;
            let sdk_name = to_sdk_name(name);
            self.record_override(name, &sdk_name)?;

            let type_spec = match map_value_schema(node.schema) {
                Some(values) => {
                    let (value_spec, _) =
                        self.property_type_spec(scope, &sdk_name, lookup.schema(values)?)?;
                    TypeSpec::Map(Box::new(value_spec))
                }
                None => {
                    let type_name = format!("{parent_name}{}", to_pascal_case(name));
                    self.property_type_spec(scope, &type_name, node)?.0
                }
            };
            properties.insert(sdk_name, property_spec(type_spec, node.schema));
        }

        let mut required = BTreeSet::new();
        if !schema.all_of.is_empty() {
            let (merged, merged_required) =
                self.gen_properties_from_all_of(scope, parent_name, &schema.all_of)?;
            properties.extend(merged);
            required.extend(merged_required);
        }

        for name in &schema.required {
            let sdk_name = to_sdk_name(name);
            if !properties.contains_key(&sdk_name) {
                warn!("schema not found for required property {name} (type: {parent_name})");
                continue;
            }
            self.record_override(name, &sdk_name)?;
            required.insert(sdk_name);
        }

        Ok((properties, required))
    }

    /// Flatten allOf members into one property map and required set.
    ///
    /// Later members win on name collisions. Members registered only for this
    /// merge are removed from the type table again.
    pub fn gen_properties_from_all_of(
        &mut self,
        scope: &Scope<'_>,
        parent_name: &str,
        members: &[SchemaOrRef],
    ) -> Result<(PropertyMap, BTreeSet<String>), ExtractError> {
        let lookup = self.lookup;
        let mut properties = PropertyMap::new();
        let mut required = BTreeSet::new();

        for member in members {
            let node = lookup.schema(member)?;
            if node.ref_name.is_none() && !is_object_like(node.schema) {
                warn!("{parent_name} uses allOf but one of its members is not an object; skipping it");
                continue;
            }

            let (type_spec, newly_added) = self.property_type_spec(scope, parent_name, node)?;
            let Some(token) = type_spec.token() else {
                continue;
            };
            if let Some(object) = self.schema.types.get(token).and_then(ComplexTypeSpec::as_object) {
                properties.extend(object.properties.clone());
                required.extend(object.required.iter().cloned());
            }
            if newly_added {
                self.remove_type(token);
            }
        }

        Ok((properties, required))
    }
}

/// Whether an inline schema can contribute properties to a merge.
pub(super) fn is_object_like(schema: &Schema) -> bool {
    schema.is_type(SchemaType::Object) || !schema.properties.is_empty() || !schema.all_of.is_empty()
}

/// `additionalProperties: true` alongside a single property schema describes
/// a map whose values have that schema.
pub(super) fn map_value_schema(schema: &Schema) -> Option<&SchemaOrRef> {
    match schema.additional_properties {
        Some(AdditionalProperties::Bool(true)) => schema.properties.values().next(),
        _ => None,
    }
}

pub(super) fn property_spec(type_spec: TypeSpec, schema: &Schema) -> PropertySpec {
    PropertySpec {
        type_spec,
        description: schema.description.clone(),
        default: schema.scalar_default().cloned(),
        secret: schema.is_secret(),
    }
}

fn union_discriminator(discriminator: &Discriminator, variants: &[TypeSpec]) -> DiscriminatorSpec {
    let mut mapping = BTreeMap::new();
    for (value, target) in &discriminator.mapping {
        let type_name = to_pascal_case(component_schema_name(target));
        let tokens = variants.iter().filter_map(TypeSpec::token);
        let exact = tokens
            .clone()
            .find(|token| token.rsplit(':').next() == Some(type_name.as_str()));
        if let Some(token) = exact.or_else(|| tokens.clone().find(|t| t.contains(&type_name))) {
            mapping.insert(value.clone(), type_ref(token));
        }
    }
    DiscriminatorSpec {
        property_name: to_sdk_name(&discriminator.property_name),
        mapping,
    }
}

fn unsupported(name: &str, schema: &Schema) -> ExtractError {
    ExtractError::UnsupportedSchema {
        name: name.to_string(),
        detail: serde_json::to_string(schema).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;
    use crate::parse::ref_resolve::RefLookup;
    use crate::transform::extract::ExtractOptions;

    const DOC: &str = r##"
openapi: 3.0.3
info:
  title: Types
  version: "1"
paths: {}
components:
  schemas:
    Identifier:
      type: string
      description: An opaque id
    Node:
      type: object
      properties:
        name:
          type: string
        children:
          type: array
          items:
            $ref: '#/components/schemas/Node'
    Labels:
      type: object
      additionalProperties:
        type: string
    Base:
      type: object
      required: [kind]
      properties:
        kind:
          type: string
    Extra:
      type: object
      properties:
        size:
          type: integer
          default: 3
    Combined:
      allOf:
        - $ref: '#/components/schemas/Base'
        - $ref: '#/components/schemas/Extra'
    Cat:
      type: object
      properties:
        meow:
          type: boolean
    Dog:
      type: object
      properties:
        bark:
          type: boolean
    Pet:
      oneOf:
        - $ref: '#/components/schemas/Cat'
        - $ref: '#/components/schemas/Dog'
      discriminator:
        propertyName: pet_type
        mapping:
          cat: '#/components/schemas/Cat'
          dog: '#/components/schemas/Dog'
"##;

    fn resolve(
        session: &mut ExtractionSession<'_>,
        parent: &str,
        schema: &SchemaOrRef,
    ) -> (TypeSpec, bool) {
        let scope = Scope {
            module: "m",
            resource_name: "Res",
        };
        let node = RefLookup::new(session.spec).schema(schema).unwrap();
        session.property_type_spec(&scope, parent, node).unwrap()
    }

    fn reference(name: &str) -> SchemaOrRef {
        SchemaOrRef::Ref {
            ref_path: format!("#/components/schemas/{name}"),
        }
    }

    fn inline(yaml: &str) -> SchemaOrRef {
        serde_yaml_ng::from_str(yaml).unwrap()
    }

    #[test]
    fn scalar_component_is_inlined() {
        let spec = parse::from_yaml(DOC).unwrap();
        let options = ExtractOptions::new("pkg");
        let mut session = ExtractionSession::new(&spec, &options);
        let (ts, newly) = resolve(&mut session, "Id", &reference("Identifier"));
        assert_eq!(ts, TypeSpec::string());
        assert!(!newly);
        assert!(session.schema.types.is_empty());
    }

    #[test]
    fn self_reference_terminates() {
        let spec = parse::from_yaml(DOC).unwrap();
        let options = ExtractOptions::new("pkg");
        let mut session = ExtractionSession::new(&spec, &options);
        let (ts, newly) = resolve(&mut session, "Root", &reference("Node"));
        assert_eq!(ts, TypeSpec::Ref("pkg:m:Node".into()));
        assert!(newly);

        let node = session.schema.types["pkg:m:Node"].as_object().unwrap();
        assert_eq!(
            node.properties["children"].type_spec,
            TypeSpec::Array(Box::new(TypeSpec::Ref("pkg:m:Node".into())))
        );

        // A second reference reuses the registration.
        let (_, newly) = resolve(&mut session, "Other", &reference("Node"));
        assert!(!newly);
    }

    #[test]
    fn inline_object_gets_properties_suffix() {
        let spec = parse::from_yaml(DOC).unwrap();
        let options = ExtractOptions::new("pkg");
        let mut session = ExtractionSession::new(&spec, &options);
        let schema = inline("type: object\nproperties:\n  max_size:\n    type: integer\n");
        let (ts, newly) = resolve(&mut session, "WidgetLimits", &schema);
        assert_eq!(ts, TypeSpec::Ref("pkg:m:WidgetLimitsProperties".into()));
        assert!(newly);
        let object = session.schema.types["pkg:m:WidgetLimitsProperties"]
            .as_object()
            .unwrap();
        assert!(object.properties.contains_key("maxSize"));
        assert_eq!(session.metadata.sdk_to_api_name_map["maxSize"], "max_size");
    }

    #[test]
    fn same_named_inline_objects_are_qualified_by_resource() {
        let spec = parse::from_yaml(DOC).unwrap();
        let options = ExtractOptions::new("pkg");
        let mut session = ExtractionSession::new(&spec, &options);
        fn resolve_in(
            session: &mut ExtractionSession<'_>,
            resource: &str,
            yaml: &str,
        ) -> (TypeSpec, bool) {
            let scope = Scope {
                module: "m",
                resource_name: resource,
            };
            let schema: Schema = serde_yaml_ng::from_str(yaml).unwrap();
            session
                .property_type_spec(&scope, "Config", SchemaNode::inline(&schema))
                .unwrap()
        }
        let cpu = "type: object\nproperties:\n  cpu:\n    type: integer\n";
        let size = "type: object\nproperties:\n  size_gb:\n    type: integer\n";

        let server = resolve_in(&mut session, "Server", cpu);
        assert_eq!(server, (TypeSpec::Ref("pkg:m:ConfigProperties".into()), true));

        let volume = resolve_in(&mut session, "Volume", size);
        assert_eq!(
            volume,
            (TypeSpec::Ref("pkg:m:VolumeConfigProperties".into()), true)
        );

        // Identical content is shared without claiming the registration.
        let pool = resolve_in(&mut session, "Pool", cpu);
        assert_eq!(pool, (TypeSpec::Ref("pkg:m:ConfigProperties".into()), false));

        let server_config = session.schema.types["pkg:m:ConfigProperties"]
            .as_object()
            .unwrap();
        assert!(server_config.properties.contains_key("cpu"));

        let other = "type: object\nproperties:\n  disk:\n    type: string\n";
        let scope = Scope {
            module: "m",
            resource_name: "Volume",
        };
        let schema: Schema = serde_yaml_ng::from_str(other).unwrap();
        let err = session
            .property_type_spec(&scope, "Config", SchemaNode::inline(&schema))
            .unwrap_err();
        assert!(matches!(
            err,
            ExtractError::TypeConflict { ref token } if token == "pkg:m:VolumeConfigProperties"
        ));
    }

    #[test]
    fn object_with_value_schema_is_map() {
        let spec = parse::from_yaml(DOC).unwrap();
        let options = ExtractOptions::new("pkg");
        let mut session = ExtractionSession::new(&spec, &options);
        let (ts, _) = resolve(&mut session, "Tags", &reference("Labels"));
        assert_eq!(ts, TypeSpec::Map(Box::new(TypeSpec::string())));
        assert!(session.schema.types.is_empty());

        let (ts, _) = resolve(
            &mut session,
            "Tags",
            &inline("type: object\nadditionalProperties:\n  type: integer\n"),
        );
        assert_eq!(
            ts,
            TypeSpec::Map(Box::new(TypeSpec::Primitive(PrimitiveType::Integer)))
        );

        let (ts, _) = resolve(&mut session, "Blob", &inline("type: object"));
        assert_eq!(ts, TypeSpec::Any);
    }

    #[test]
    fn all_of_flattens_and_cleans_up() {
        let spec = parse::from_yaml(DOC).unwrap();
        let options = ExtractOptions::new("pkg");
        let mut session = ExtractionSession::new(&spec, &options);
        let (ts, newly) = resolve(&mut session, "Combined", &reference("Combined"));
        assert_eq!(ts, TypeSpec::Ref("pkg:m:Combined".into()));
        assert!(newly);

        let combined = session.schema.types["pkg:m:Combined"].as_object().unwrap();
        assert_eq!(
            combined.properties.keys().collect::<Vec<_>>(),
            ["kind", "size"]
        );
        assert_eq!(combined.required, ["kind"]);
        assert_eq!(combined.properties["size"].default, Some(3.into()));
        assert!(!session.schema.types.contains_key("pkg:m:Base"));
        assert!(!session.schema.types.contains_key("pkg:m:Extra"));
    }

    #[test]
    fn all_of_keeps_previously_registered_members() {
        let spec = parse::from_yaml(DOC).unwrap();
        let options = ExtractOptions::new("pkg");
        let mut session = ExtractionSession::new(&spec, &options);
        resolve(&mut session, "Base", &reference("Base"));
        resolve(&mut session, "Combined", &reference("Combined"));
        assert!(session.schema.types.contains_key("pkg:m:Base"));
        assert!(!session.schema.types.contains_key("pkg:m:Extra"));
    }

    #[test]
    fn discriminated_union_maps_to_branch_refs() {
        let spec = parse::from_yaml(DOC).unwrap();
        let options = ExtractOptions::new("pkg");
        let mut session = ExtractionSession::new(&spec, &options);
        let (ts, newly) = resolve(&mut session, "Pet", &reference("Pet"));
        assert!(!newly);
        let TypeSpec::Union {
            variants,
            discriminator: Some(discriminator),
        } = ts
        else {
            panic!("expected a discriminated union, got {ts:?}");
        };
        assert_eq!(variants.len(), 2);
        assert_eq!(discriminator.property_name, "petType");
        assert_eq!(discriminator.mapping["cat"], "#/types/pkg:m:Cat");
        assert_eq!(discriminator.mapping["dog"], "#/types/pkg:m:Dog");
    }

    #[test]
    fn any_of_single_and_multiple() {
        let spec = parse::from_yaml(DOC).unwrap();
        let options = ExtractOptions::new("pkg");
        let mut session = ExtractionSession::new(&spec, &options);
        let (ts, _) = resolve(&mut session, "V", &inline("anyOf:\n  - type: number\n"));
        assert_eq!(ts, TypeSpec::Primitive(PrimitiveType::Number));

        let (ts, _) = resolve(
            &mut session,
            "V",
            &inline("anyOf:\n  - type: number\n  - type: string\n"),
        );
        assert!(matches!(ts, TypeSpec::Union { discriminator: None, ref variants } if variants.len() == 2));
    }

    #[test]
    fn array_items_use_item_suffix() {
        let spec = parse::from_yaml(DOC).unwrap();
        let options = ExtractOptions::new("pkg");
        let mut session = ExtractionSession::new(&spec, &options);
        let schema = inline(
            "type: array\nitems:\n  type: object\n  properties:\n    port:\n      type: integer\n",
        );
        let (ts, _) = resolve(&mut session, "Rules", &schema);
        assert_eq!(
            ts,
            TypeSpec::Array(Box::new(TypeSpec::Ref("pkg:m:RulesItemProperties".into())))
        );
    }

    #[test]
    fn untyped_schema_is_unsupported() {
        let spec = parse::from_yaml(DOC).unwrap();
        let options = ExtractOptions::new("pkg");
        let mut session = ExtractionSession::new(&spec, &options);
        let scope = Scope {
            module: "m",
            resource_name: "Res",
        };
        let schema = Schema {
            description: Some("mystery".into()),
            ..Schema::default()
        };
        let err = session
            .property_type_spec(&scope, "Mystery", SchemaNode::inline(&schema))
            .unwrap_err();
        assert!(matches!(err, ExtractError::UnsupportedSchema { ref name, .. } if name == "Mystery"));
    }
}
