use std::collections::BTreeMap;

use crate::error::ExtractError;
use crate::ir::{FunctionSpec, ObjectTypeSpec, PropertySpec, ReturnTypeSpec, TypeSpec};
use crate::parse::operation::{Operation, PathItem};
use crate::parse::ref_resolve::SchemaNode;

use super::naming::to_pascal_case;
use super::session::{ExtractionSession, Scope};

/// Property holding the result of a list function whose item type has no
/// name of its own.
const LIST_ITEMS_PROPERTY: &str = "items";

impl ExtractionSession<'_> {
    /// A `get<Title>` function for a GET endpoint returning one object.
    /// Without a response schema the function has no return type.
    pub fn gen_get_function(
        &mut self,
        scope: &Scope<'_>,
        item: &PathItem,
        op: &Operation,
        func_name: &str,
        returns: Option<SchemaNode<'_>>,
    ) -> Result<FunctionSpec, ExtractError> {
        let inputs = self.path_parameters(item, op)?;
        let return_type = match returns {
            Some(node) => {
                let (type_spec, _) =
                    self.property_type_spec(scope, &to_pascal_case(func_name), node)?;
                Some(ReturnTypeSpec::TypeSpec(type_spec))
            }
            None => None,
        };
        Ok(FunctionSpec {
            description: describe(item, op),
            inputs: Some(inputs),
            return_type,
        })
    }

    /// A `list<Title>` function for a GET endpoint returning a collection.
    ///
    /// A named result type is returned directly; anything else is wrapped in
    /// an object with a single required `items` property. A result type named
    /// like the function itself (as allOf responses are) is renamed with an
    /// `Items` suffix.
    pub fn gen_list_function(
        &mut self,
        scope: &Scope<'_>,
        item: &PathItem,
        op: &Operation,
        func_name: &str,
        returns: SchemaNode<'_>,
    ) -> Result<FunctionSpec, ExtractError> {
        let inputs = self.path_parameters(item, op)?;
        let (mut output, _) =
            self.property_type_spec(scope, &to_pascal_case(func_name), returns)?;

        let rename = output.token().and_then(|token| {
            let (prefix, type_name) = token.rsplit_once(':')?;
            type_name
                .eq_ignore_ascii_case(func_name)
                .then(|| (token.to_string(), format!("{prefix}:{type_name}Items")))
        });
        if let Some((from, to)) = rename {
            self.move_type(&from, &to);
            output = TypeSpec::Ref(to);
        }

        let return_type = match output {
            TypeSpec::Ref(_) => ReturnTypeSpec::TypeSpec(output),
            other => ReturnTypeSpec::ObjectTypeSpec(ObjectTypeSpec {
                description: None,
                properties: BTreeMap::from([(
                    LIST_ITEMS_PROPERTY.to_string(),
                    PropertySpec::new(other),
                )]),
                required: vec![LIST_ITEMS_PROPERTY.to_string()],
            }),
        };
        Ok(FunctionSpec {
            description: describe(item, op),
            inputs: Some(inputs),
            return_type: Some(return_type),
        })
    }
}

fn describe(item: &PathItem, op: &Operation) -> Option<String> {
    op.description
        .clone()
        .or_else(|| item.description.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::ComplexTypeSpec;
    use crate::parse;
    use crate::parse::ref_resolve::RefLookup;
    use crate::parse::schema::SchemaOrRef;
    use crate::transform::extract::ExtractOptions;

    const DOC: &str = r#"
openapi: 3.0.3
info:
  title: Functions
  version: "1"
paths:
  /widgets/{id}:
    description: Widget by id
    get:
      operationId: getWidget
      parameters:
        - name: id
          in: path
          required: true
        - name: verbose
          in: query
      responses: {}
components:
  schemas:
    Widget:
      type: object
      properties:
        name:
          type: string
    Page:
      allOf:
        - $ref: '#/components/schemas/Widget'
"#;

    fn scope() -> Scope<'static> {
        Scope {
            module: "widgets",
            resource_name: "Widget",
        }
    }

    fn reference(name: &str) -> SchemaOrRef {
        SchemaOrRef::Ref {
            ref_path: format!("#/components/schemas/{name}"),
        }
    }

    #[test]
    fn get_function_without_body_has_no_return_type() {
        let spec = parse::from_yaml(DOC).unwrap();
        let options = ExtractOptions::new("pkg");
        let mut session = ExtractionSession::new(&spec, &options);
        let item = &spec.paths["/widgets/{id}"];
        let op = item.get.as_ref().unwrap();

        let function = session
            .gen_get_function(&scope(), item, op, "getWidget", None)
            .unwrap();
        assert!(function.return_type.is_none());
        assert_eq!(function.description.as_deref(), Some("Widget by id"));
        let inputs = function.inputs.unwrap();
        assert_eq!(inputs.properties.keys().collect::<Vec<_>>(), ["id"]);
        assert_eq!(inputs.required, ["id"]);
    }

    #[test]
    fn list_of_refs_is_wrapped_in_items() {
        let spec = parse::from_yaml(DOC).unwrap();
        let options = ExtractOptions::new("pkg");
        let mut session = ExtractionSession::new(&spec, &options);
        let item = &spec.paths["/widgets/{id}"];
        let op = item.get.as_ref().unwrap();
        let schema: SchemaOrRef = serde_yaml_ng::from_str(
            "type: array\nitems:\n  $ref: '#/components/schemas/Widget'\n",
        )
        .unwrap();
        let node = RefLookup::new(&spec).schema(&schema).unwrap();

        let function = session
            .gen_list_function(&scope(), item, op, "listWidgets", node)
            .unwrap();
        let Some(ReturnTypeSpec::ObjectTypeSpec(object)) = function.return_type else {
            panic!("expected a wrapper object");
        };
        assert_eq!(object.required, ["items"]);
        assert_eq!(
            object.properties["items"].type_spec,
            TypeSpec::Array(Box::new(TypeSpec::Ref("pkg:widgets:Widget".into())))
        );
    }

    #[test]
    fn list_result_named_like_function_is_renamed() {
        let spec = parse::from_yaml(DOC).unwrap();
        let options = ExtractOptions::new("pkg");
        let mut session = ExtractionSession::new(&spec, &options);
        let item = &spec.paths["/widgets/{id}"];
        let op = item.get.as_ref().unwrap();
        let schema: SchemaOrRef =
            serde_yaml_ng::from_str("allOf:\n  - $ref: '#/components/schemas/Widget'\n").unwrap();
        let node = RefLookup::new(&spec).schema(&schema).unwrap();

        let function = session
            .gen_list_function(&scope(), item, op, "listWidgets", node)
            .unwrap();
        assert_eq!(
            function.return_type,
            Some(ReturnTypeSpec::TypeSpec(TypeSpec::Ref(
                "pkg:widgets:ListWidgetsItems".into()
            )))
        );
        assert!(!session.schema.types.contains_key("pkg:widgets:ListWidgets"));
        assert!(matches!(
            session.schema.types.get("pkg:widgets:ListWidgetsItems"),
            Some(ComplexTypeSpec::Object(o)) if o.properties.contains_key("name")
        ));
    }

    #[test]
    fn named_list_result_is_returned_directly() {
        let spec = parse::from_yaml(DOC).unwrap();
        let options = ExtractOptions::new("pkg");
        let mut session = ExtractionSession::new(&spec, &options);
        let item = &spec.paths["/widgets/{id}"];
        let op = item.get.as_ref().unwrap();
        let page = reference("Page");
        let node = RefLookup::new(&spec).schema(&page).unwrap();

        let function = session
            .gen_list_function(&scope(), item, op, "listWidgets", node)
            .unwrap();
        assert_eq!(
            function.return_type,
            Some(ReturnTypeSpec::TypeSpec(TypeSpec::Ref(
                "pkg:widgets:Page".into()
            )))
        );
    }
}
