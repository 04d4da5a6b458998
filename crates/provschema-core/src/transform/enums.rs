use std::collections::HashSet;

use log::warn;
use serde_json::Value;

use crate::error::{DuplicateEnumError, ExtractError};
use crate::ir::{ComplexTypeSpec, EnumTypeSpec, EnumValueSpec, PrimitiveType, TypeSpec};
use crate::parse::schema::{Schema, SchemaType};

use super::naming::to_pascal_case;
use super::session::{ExtractionSession, Scope};

impl ExtractionSession<'_> {
    /// Register (or reuse) the enum type for `schema` under `enum_name`.
    ///
    /// Returns `None` when the schema has no base type, or a base type enums
    /// are not generated for, so the caller can type it as a plain scalar.
    ///
    /// When the token is already taken:
    /// - by an object, the enum is retried as `<name>Enum`;
    /// - by an enum with the same members, that enum is reused;
    /// - by a different enum, the name is retried prefixed with the resource
    ///   name, and if it already was, a [`DuplicateEnumError`] is returned.
    pub fn gen_enum_type(
        &mut self,
        scope: &Scope<'_>,
        enum_name: &str,
        schema: &Schema,
    ) -> Result<Option<(TypeSpec, bool)>, ExtractError> {
        let Some(base) = schema.primary_type() else {
            return Ok(None);
        };

        let type_name = to_pascal_case(enum_name);
        let (base_type, values) = match base {
            SchemaType::String => (
                PrimitiveType::String,
                string_enum_values(&type_name, &schema.enum_values),
            ),
            SchemaType::Integer => (
                PrimitiveType::Integer,
                integer_enum_values(&schema.enum_values),
            ),
            other => {
                warn!("cannot handle enum values of type {other:?} for {enum_name}");
                return Ok(None);
            }
        };
        let candidate = EnumTypeSpec {
            description: schema.description.clone(),
            base_type,
            values,
        };

        let token = self.token(scope.module, &type_name);
        match self.schema.types.get(&token) {
            None => {
                self.register_type(token.clone(), ComplexTypeSpec::Enum(candidate));
                Ok(Some((TypeSpec::Ref(token), true)))
            }
            Some(ComplexTypeSpec::Object(_)) => {
                self.gen_enum_type(scope, &format!("{enum_name}Enum"), schema)
            }
            Some(ComplexTypeSpec::Enum(existing)) => {
                if existing.same_members(&candidate) {
                    return Ok(Some((TypeSpec::Ref(token), false)));
                }
                if !type_name.starts_with(scope.resource_name) {
                    let qualified = format!("{}{enum_name}", scope.resource_name);
                    return self.gen_enum_type(scope, &qualified, schema);
                }
                Err(DuplicateEnumError {
                    token,
                    new_values: candidate.values,
                    existing_values: existing.values.clone(),
                }
                .into())
            }
        }
    }
}

/// PascalCased members, deduplicated by generated name. A member named like
/// the enum itself gets a `_` suffix.
fn string_enum_values(enum_name: &str, raw: &[Value]) -> Vec<EnumValueSpec> {
    let mut seen = HashSet::new();
    let mut values = Vec::with_capacity(raw.len());
    for value in raw {
        let literal = match value {
            Value::String(s) => s.clone(),
            Value::Null => continue,
            other => other.to_string(),
        };
        let name = to_pascal_case(&literal);
        if !seen.insert(name.clone()) {
            continue;
        }
        let name = if name == enum_name {
            format!("{name}_")
        } else {
            name
        };
        values.push(EnumValueSpec {
            name,
            value: value.clone(),
        });
    }
    values
}

fn integer_enum_values(raw: &[Value]) -> Vec<EnumValueSpec> {
    raw.iter()
        .filter(|v| !v.is_null())
        .map(|value| EnumValueSpec {
            name: value.to_string(),
            value: value.clone(),
        })
        .collect()
}
