use std::collections::BTreeSet;

use log::{debug, info};
use serde::Serialize;

use crate::config::DuplicateEnumPolicy;
use crate::error::{ExtractError, ResolveError};
use crate::exclusions::ExclusionEvaluator;
use crate::ir::{CrudSlot, FunctionSpec, ProviderMetadata, ProviderSchema};
use crate::parse::body::{MediaType, json_content};
use crate::parse::operation::{HttpMethod, Operation, PathItem};
use crate::parse::ref_resolve::{RefLookup, SchemaNode, component_schema_name};
use crate::parse::schema::{Schema, SchemaOrRef, SchemaType};
use crate::parse::spec::OpenApiSpec;

use super::naming::{
    DEFAULT_ALLOWED_PLURAL_RESOURCES, get_module_from_path,
    get_resource_title_from_operation_id, get_resource_title_from_request_schema,
    get_singular_name_for_resource, is_list_operation, is_path_param_segment,
    module_to_pascal_case, to_pascal_case,
};
use super::path_normalizer::ensure_id_hierarchy;
use super::resources::ResourceBodies;
use super::session::{ExtractionSession, Scope};

/// Status codes searched, in order, for the response of a create operation.
const CREATE_RESPONSE_STATUSES: [&str; 3] = ["200", "201", "202"];

/// Knobs for one extraction pass.
#[derive(Debug)]
pub struct ExtractOptions {
    /// First segment of every token.
    pub package_name: String,
    /// Derive modules from the parent resource instead of the first path
    /// segment.
    pub use_parent_as_module: bool,
    /// Set when operation ids are namespaced (`Widgets_create`); only the
    /// last segment is used for titles.
    pub namespace_separator: Option<String>,
    /// Resource names that stay plural.
    pub allowed_plurals: Vec<String>,
    pub normalize_path_params: bool,
    pub duplicate_enum_policy: DuplicateEnumPolicy,
    pub exclusions: ExclusionEvaluator,
}

impl ExtractOptions {
    pub fn new(package_name: impl Into<String>) -> Self {
        Self {
            package_name: package_name.into(),
            use_parent_as_module: false,
            namespace_separator: None,
            allowed_plurals: DEFAULT_ALLOWED_PLURAL_RESOURCES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            normalize_path_params: true,
            duplicate_enum_policy: DuplicateEnumPolicy::default(),
            exclusions: ExclusionEvaluator::default(),
        }
    }
}

/// The result of a successful pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Extraction {
    pub schema: ProviderSchema,
    pub metadata: ProviderMetadata,
}

/// Infer resources, functions and types from every path of `spec`.
///
/// Paths are visited in sorted order, so the result does not depend on
/// how the document orders them. Either the whole document is processed or
/// the first fatal error is returned; no partial schema is exposed.
pub fn extract(spec: &OpenApiSpec, options: &ExtractOptions) -> Result<Extraction, ExtractError> {
    let mut session = ExtractionSession::new(spec, options);
    let mut paths: Vec<_> = spec.paths.iter().collect();
    paths.sort_unstable_by(|(a, _), (b, _)| a.cmp(b));
    for (path, item) in paths {
        session.extract_path(path, item)?;
    }
    Ok(session.finish())
}

/// The path being processed. `api_path` is the normalized path seated in
/// the CRUD map; `original_path` is the document's key.
struct PathContext<'p> {
    api_path: &'p str,
    original_path: &'p str,
    module: &'p str,
    item: &'p PathItem,
}

impl ExtractionSession<'_> {
    fn extract_path(&mut self, original_path: &str, item: &PathItem) -> Result<(), ExtractError> {
        let mut item = item.clone();
        let exclusions = &self.options.exclusions;
        for method in HttpMethod::ALL {
            if item.operation(method).is_none()
                || !exclusions.should_exclude(method.as_str(), original_path)
            {
                continue;
            }
            debug!(
                "excluding {method} {original_path} (matched {})",
                exclusions
                    .matching_exclusions(method.as_str(), original_path)
                    .join(", ")
            );
            item.remove_operation(method);
        }
        if !item.has_operations() {
            debug!("skipping {original_path}: no operations left");
            return Ok(());
        }

        let api_path = if self.options.normalize_path_params {
            let lookup = self.lookup;
            ensure_id_hierarchy(original_path, &mut item, &lookup)?
        } else {
            original_path.to_string()
        };
        let module = get_module_from_path(&api_path, self.options.use_parent_as_module);
        if !self.metadata.module_namespaces.contains_key(&module) {
            self.metadata
                .module_namespaces
                .insert(module.clone(), module_to_pascal_case(&module));
        }
        debug!("processing path {original_path} as {api_path} in module {module}");

        let ctx = PathContext {
            api_path: &api_path,
            original_path,
            module: &module,
            item: &item,
        };
        if let Some(op) = &item.get {
            self.extract_get(&ctx, op)?;
        }
        if let Some(op) = &item.patch {
            self.extract_branches(&ctx, HttpMethod::Patch, op, CrudSlot::Update)?;
        }
        if let Some(op) = &item.put {
            self.extract_branches(&ctx, HttpMethod::Put, op, CrudSlot::Put)?;
        }
        if let Some(op) = &item.delete {
            if op.request_body.is_some() {
                self.extract_branches(&ctx, HttpMethod::Delete, op, CrudSlot::Delete)?;
            } else {
                let operation_id = require_operation_id(HttpMethod::Delete, ctx.api_path, op)?;
                let title = self.singular_title(operation_id, HttpMethod::Delete);
                let token = self.token(ctx.module, &title);
                self.seat(&token, CrudSlot::Delete, ctx.api_path)?;
            }
        }
        self.extract_create(&ctx)
    }

    /// A GET is a read of a single resource plus a `get` function, or a
    /// `list` function for collections.
    fn extract_get(&mut self, ctx: &PathContext<'_>, op: &Operation) -> Result<(), ExtractError> {
        let operation_id = require_operation_id(HttpMethod::Get, ctx.api_path, op)?;
        let lookup = self.lookup;

        let returns = match json_response(lookup, op, "200")? {
            Some(media) => {
                let schema = media.schema.as_ref().ok_or_else(|| {
                    ExtractError::MissingResponseSchema {
                        path: ctx.api_path.to_string(),
                    }
                })?;
                Some(lookup.schema(schema)?)
            }
            None => None,
        };

        // Ad-hoc actions without a body only get a function.
        let Some(node) = returns else {
            let title = self.singular_title(operation_id, HttpMethod::Get);
            let func_name = format!("get{title}");
            let scope = Scope {
                module: ctx.module,
                resource_name: &title,
            };
            let function = self.gen_get_function(&scope, ctx.item, op, &func_name, None)?;
            return self.add_read_function(ctx, &func_name, function);
        };

        if node.schema.is_type(SchemaType::Array) || is_list_operation(operation_id) {
            let title = self.operation_title(operation_id, HttpMethod::Get);
            let func_name = format!("list{title}");
            let resource_name = get_singular_name_for_resource(&title, self.allowed_plurals());
            let scope = Scope {
                module: ctx.module,
                resource_name: &resource_name,
            };
            let function = self.gen_list_function(&scope, ctx.item, op, &func_name, node)?;
            return self.add_read_function(ctx, &func_name, function);
        }

        let discriminator = node
            .schema
            .discriminator
            .as_ref()
            .filter(|d| !d.mapping.is_empty());
        let Some(discriminator) = discriminator else {
            let title = self.singular_title(operation_id, HttpMethod::Get);
            let token = self.token(ctx.module, &title);
            self.seat(&token, CrudSlot::Read, ctx.api_path)?;

            let func_name = format!("get{title}");
            let scope = Scope {
                module: ctx.module,
                resource_name: &title,
            };
            let function = self.gen_get_function(&scope, ctx.item, op, &func_name, Some(node))?;
            return self.add_read_function(ctx, &func_name, function);
        };

        for target in discriminator.mapping.values() {
            let branch = discriminator_target(lookup, target, ctx.api_path)?;
            let title = get_resource_title_from_request_schema(
                component_schema_name(target),
                branch.schema,
            );
            let token = self.token(ctx.module, &title);
            self.seat(&token, CrudSlot::Read, ctx.api_path)?;

            let func_name = format!("get{title}");
            let scope = Scope {
                module: ctx.module,
                resource_name: &title,
            };
            let function =
                self.gen_get_function(&scope, ctx.item, op, &func_name, Some(branch))?;
            self.add_read_function(ctx, &func_name, function)?;
        }
        Ok(())
    }

    fn add_read_function(
        &mut self,
        ctx: &PathContext<'_>,
        func_name: &str,
        function: FunctionSpec,
    ) -> Result<(), ExtractError> {
        let token = self.token(ctx.module, func_name);
        self.seat(&token, CrudSlot::Read, ctx.api_path)?;
        self.schema.functions.insert(token, function);
        Ok(())
    }

    /// Seat a PATCH, PUT or DELETE-with-body. Polymorphic request bodies seat
    /// every referenced branch schema; anything else seats the resource named
    /// by the operation id.
    fn extract_branches(
        &mut self,
        ctx: &PathContext<'_>,
        method: HttpMethod,
        op: &Operation,
        slot: CrudSlot,
    ) -> Result<(), ExtractError> {
        let operation_id = require_operation_id(method, ctx.api_path, op)?;
        let lookup = self.lookup;
        let request = request_schema(lookup, op)?
            .ok_or_else(|| missing_request_schema(method, ctx.api_path))?;

        let branches = branch_schema_names(request.schema);
        if branches.is_empty() {
            let title = self.singular_title(operation_id, method);
            let token = self.token(ctx.module, &title);
            return self.seat(&token, slot, ctx.api_path);
        }

        for name in branches {
            let branch = discriminator_target(lookup, name, ctx.api_path)?;
            let title = get_resource_title_from_request_schema(name, branch.schema);
            let token = self.token(ctx.module, &title);
            self.seat(&token, slot, ctx.api_path)?;
        }
        Ok(())
    }

    /// Build resources from a POST, or from a PUT that also creates.
    fn extract_create(&mut self, ctx: &PathContext<'_>) -> Result<(), ExtractError> {
        let (method, op) = match (&ctx.item.post, &ctx.item.put) {
            (Some(op), _) => (HttpMethod::Post, op),
            (None, Some(op)) if self.put_creates(ctx) => (HttpMethod::Put, op),
            _ => return Ok(()),
        };
        let operation_id = require_operation_id(method, ctx.api_path, op)?;
        let lookup = self.lookup;
        let request = request_schema(lookup, op)?
            .ok_or_else(|| missing_request_schema(method, ctx.api_path))?;
        let response = create_response_schema(lookup, op)?;
        debug!("{method} {} creates a resource", ctx.api_path);

        let title = self.singular_title(operation_id, method);
        let params = self.path_parameters(ctx.item, op)?;
        let tokens = self.create_resources(ctx, &title, request.schema, response)?;
        for token in &tokens {
            self.add_path_parameters(token, &params);
        }
        Ok(())
    }

    /// A PUT creates when the path does not address a single item and the
    /// enclosing collection has no POST that survives exclusion.
    fn put_creates(&self, ctx: &PathContext<'_>) -> bool {
        let Some((parent, last)) = ctx.original_path.rsplit_once('/') else {
            return false;
        };
        if is_path_param_segment(last) {
            return false;
        }
        let exclusions = &self.options.exclusions;
        !self.spec.paths.get(parent).is_some_and(|item| {
            item.post.is_some() && !exclusions.should_exclude(HttpMethod::Post.as_str(), parent)
        })
    }

    fn create_resources(
        &mut self,
        ctx: &PathContext<'_>,
        title: &str,
        request: &Schema,
        response: Option<SchemaNode<'_>>,
    ) -> Result<Vec<String>, ExtractError> {
        let lookup = self.lookup;
        let response_schema = response.map(|node| node.schema);

        let discriminator = request.discriminator.as_ref().filter(|d| !d.mapping.is_empty());
        if let Some(discriminator) = discriminator {
            let response_mapping = response_schema
                .and_then(|r| r.discriminator.as_ref())
                .map(|d| &d.mapping);
            let mut tokens = Vec::with_capacity(discriminator.mapping.len());
            for (value, target) in &discriminator.mapping {
                let branch = discriminator_target(lookup, target, ctx.api_path)?;
                let branch_response = match response_mapping.and_then(|m| m.get(value)) {
                    Some(response_target) => {
                        Some(discriminator_target(lookup, response_target, ctx.api_path)?.schema)
                    }
                    None => response_schema,
                };
                let bodies = ResourceBodies {
                    request: branch.schema,
                    response: branch_response,
                    strip_all_of_required: false,
                };
                tokens.push(self.gather_resource_properties(
                    ctx.module,
                    &to_pascal_case(value),
                    bodies,
                    ctx.api_path,
                )?);
            }
            return Ok(tokens);
        }

        if !request.one_of.is_empty() {
            info!(
                "request body of {} uses oneOf without a discriminator; merging its members as optional properties",
                ctx.api_path
            );
            let mut merged = request.clone();
            let members = std::mem::take(&mut merged.one_of);
            merged.all_of.extend(members);
            let bodies = ResourceBodies {
                request: &merged,
                response: response_schema,
                strip_all_of_required: true,
            };
            let token = self.gather_resource_properties(ctx.module, title, bodies, ctx.api_path)?;
            return Ok(vec![token]);
        }

        let bodies = ResourceBodies {
            request,
            response: response_schema,
            strip_all_of_required: false,
        };
        let token = self.gather_resource_properties(ctx.module, title, bodies, ctx.api_path)?;
        Ok(vec![token])
    }

    fn operation_title(&self, operation_id: &str, method: HttpMethod) -> String {
        get_resource_title_from_operation_id(operation_id, method, self.namespace_separator())
    }

    fn singular_title(&self, operation_id: &str, method: HttpMethod) -> String {
        let title = self.operation_title(operation_id, method);
        get_singular_name_for_resource(&title, self.allowed_plurals())
    }
}

fn require_operation_id<'o>(
    method: HttpMethod,
    path: &str,
    op: &'o Operation,
) -> Result<&'o str, ExtractError> {
    op.operation_id
        .as_deref()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ExtractError::MissingOperationId {
            method: method.to_string(),
            path: path.to_string(),
        })
}

fn missing_request_schema(method: HttpMethod, path: &str) -> ExtractError {
    ExtractError::MissingRequestSchema {
        method: method.as_str().to_lowercase(),
        path: path.to_string(),
    }
}

/// The JSON request body schema of an operation, if it has one.
fn request_schema<'s>(
    lookup: RefLookup<'s>,
    op: &'s Operation,
) -> Result<Option<SchemaNode<'s>>, ResolveError> {
    let Some(body) = &op.request_body else {
        return Ok(None);
    };
    match lookup.request_body(body)?.json_schema() {
        Some(schema) => lookup.schema(schema).map(Some),
        None => Ok(None),
    }
}

/// The JSON media type of the `status` response, if both exist.
fn json_response<'s>(
    lookup: RefLookup<'s>,
    op: &'s Operation,
    status: &str,
) -> Result<Option<&'s MediaType>, ResolveError> {
    let Some(response) = op.responses.get(status) else {
        return Ok(None);
    };
    Ok(json_content(&lookup.response(response)?.content))
}

/// The schema of the first create response present; a present response
/// without a JSON schema means there is none.
fn create_response_schema<'s>(
    lookup: RefLookup<'s>,
    op: &'s Operation,
) -> Result<Option<SchemaNode<'s>>, ResolveError> {
    for status in CREATE_RESPONSE_STATUSES {
        if !op.responses.contains_key(status) {
            continue;
        }
        return match json_response(lookup, op, status)?.and_then(|m| m.schema.as_ref()) {
            Some(schema) => lookup.schema(schema).map(Some),
            None => Ok(None),
        };
    }
    Ok(None)
}

/// Component names referenced by a polymorphic schema's discriminator
/// mapping, `oneOf` and `anyOf`. Inline branches have no name and are
/// skipped.
fn branch_schema_names(schema: &Schema) -> BTreeSet<&str> {
    let mut names = BTreeSet::new();
    if let Some(discriminator) = &schema.discriminator {
        names.extend(
            discriminator
                .mapping
                .values()
                .map(|target| component_schema_name(target)),
        );
    }
    for member in schema.one_of.iter().chain(&schema.any_of) {
        if let SchemaOrRef::Ref { ref_path } = member {
            names.insert(component_schema_name(ref_path));
        }
    }
    names
}

fn discriminator_target<'s>(
    lookup: RefLookup<'s>,
    target: &'s str,
    path: &str,
) -> Result<SchemaNode<'s>, ExtractError> {
    lookup.schema_by_name(target).map_err(|err| match err {
        ResolveError::RefTargetNotFound(_) => ExtractError::DiscriminatorTargetNotFound {
            name: component_schema_name(target).to_string(),
            path: path.to_string(),
        },
        other => other.into(),
    })
}
