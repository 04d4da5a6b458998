use std::collections::HashSet;

use indexmap::IndexMap;

use super::body::{RequestBody, RequestBodyOrRef, Response, ResponseOrRef};
use super::parameter::{Parameter, ParameterOrRef};
use super::reference::RefOr;
use super::schema::{Schema, SchemaOrRef};
use super::spec::{Components, OpenApiSpec};
use crate::error::ResolveError;

const COMPONENTS_PREFIX: &str = "#/components/";
const SCHEMAS_REF_PREFIX: &str = "#/components/schemas/";

/// A schema together with the component name it was reached through.
///
/// Inference names types after the component, so `$ref`s are resolved
/// lazily and the name is kept alongside the target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SchemaNode<'a> {
    pub ref_name: Option<&'a str>,
    pub schema: &'a Schema,
}

impl<'a> SchemaNode<'a> {
    pub fn inline(schema: &'a Schema) -> Self {
        Self {
            ref_name: None,
            schema,
        }
    }
}

/// Resolves `$ref` pointers against a document's `components`.
#[derive(Debug, Clone, Copy)]
pub struct RefLookup<'a> {
    components: Option<&'a Components>,
}

impl<'a> RefLookup<'a> {
    pub fn new(spec: &'a OpenApiSpec) -> Self {
        Self {
            components: spec.components.as_ref(),
        }
    }

    /// Resolve a schema or reference, following transitive component refs.
    pub fn schema<'s>(&self, schema_or_ref: &'s SchemaOrRef) -> Result<SchemaNode<'s>, ResolveError>
    where
        'a: 's,
    {
        match schema_or_ref {
            SchemaOrRef::Schema(schema) => Ok(SchemaNode::inline(schema)),
            SchemaOrRef::Ref { ref_path } => {
                let name = parse_ref_name(ref_path, "schemas")?;
                let schema = self.follow_schema(name)?;
                Ok(SchemaNode {
                    ref_name: Some(name),
                    schema,
                })
            }
        }
    }

    /// Look up a component schema by name or by `#/components/schemas/...`
    /// reference, as found in discriminator mappings.
    pub fn schema_by_name<'n>(&self, reference: &'n str) -> Result<SchemaNode<'n>, ResolveError>
    where
        'a: 'n,
    {
        let name = component_schema_name(reference);
        let schema = self.follow_schema(name)?;
        Ok(SchemaNode {
            ref_name: Some(name),
            schema,
        })
    }

    fn follow_schema(&self, name: &str) -> Result<&'a Schema, ResolveError> {
        let mut seen = HashSet::new();
        let mut current = name;
        loop {
            if !seen.insert(current) {
                return Err(ResolveError::CircularRef(format!(
                    "{SCHEMAS_REF_PREFIX}{current}"
                )));
            }
            let entry = self
                .components
                .and_then(|c| c.schemas.get(current))
                .ok_or_else(|| {
                    ResolveError::RefTargetNotFound(format!("{SCHEMAS_REF_PREFIX}{current}"))
                })?;
            match entry {
                SchemaOrRef::Schema(schema) => return Ok(&**schema),
                SchemaOrRef::Ref { ref_path } => current = parse_ref_name(ref_path, "schemas")?,
            }
        }
    }

    pub fn parameter<'s>(&self, param: &'s ParameterOrRef) -> Result<&'s Parameter, ResolveError>
    where
        'a: 's,
    {
        self.component(param, "parameters", |c| &c.parameters)
    }

    pub fn request_body<'s>(
        &self,
        body: &'s RequestBodyOrRef,
    ) -> Result<&'s RequestBody, ResolveError>
    where
        'a: 's,
    {
        self.component(body, "requestBodies", |c| &c.request_bodies)
    }

    pub fn response<'s>(&self, resp: &'s ResponseOrRef) -> Result<&'s Response, ResolveError>
    where
        'a: 's,
    {
        self.component(resp, "responses", |c| &c.responses)
    }

    /// One level of indirection only: a component that is itself a `$ref`
    /// counts as missing.
    fn component<'s, T>(
        &self,
        entry: &'s RefOr<T>,
        section: &str,
        table: impl FnOnce(&'a Components) -> &'a IndexMap<String, RefOr<T>>,
    ) -> Result<&'s T, ResolveError>
    where
        'a: 's,
        T: 'a,
    {
        match entry {
            RefOr::Item(item) => Ok(item),
            RefOr::Ref { ref_path } => {
                let name = parse_ref_name(ref_path, section)?;
                self.components
                    .and_then(|c| table(c).get(name))
                    .and_then(RefOr::as_item)
                    .ok_or_else(|| ResolveError::RefTargetNotFound(ref_path.clone()))
            }
        }
    }
}

/// Strip `#/components/schemas/` from a reference; bare names pass through.
pub fn component_schema_name(reference: &str) -> &str {
    reference
        .strip_prefix(SCHEMAS_REF_PREFIX)
        .unwrap_or(reference)
}

/// Parse a `$ref` path like `#/components/schemas/Foo` and extract the name.
fn parse_ref_name<'a>(ref_path: &'a str, expected_section: &str) -> Result<&'a str, ResolveError> {
    let stripped = ref_path
        .strip_prefix(COMPONENTS_PREFIX)
        .ok_or_else(|| ResolveError::InvalidRefFormat(ref_path.to_string()))?;
    let (section, name) = stripped
        .split_once('/')
        .ok_or_else(|| ResolveError::InvalidRefFormat(ref_path.to_string()))?;
    if section != expected_section {
        return Err(ResolveError::InvalidRefFormat(format!(
            "expected section '{}', got '{}' in {}",
            expected_section, section, ref_path
        )));
    }
    Ok(name)
}
