use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashSet};

use crate::error::ExtractError;
use crate::ir::{ComplexTypeSpec, CrudSlot, PropertySpec, ProviderMetadata, ProviderSchema};
use crate::parse::ref_resolve::RefLookup;
use crate::parse::spec::OpenApiSpec;

use super::extract::{ExtractOptions, Extraction};
use super::naming::add_name_override;

pub type PropertyMap = BTreeMap<String, PropertySpec>;

/// Where a schema is being resolved: the module its type tokens live in and
/// the resource (or function) that owns it.
#[derive(Debug, Clone, Copy)]
pub struct Scope<'s> {
    pub module: &'s str,
    pub resource_name: &'s str,
}

/// All mutable state of one extraction pass.
///
/// The type table, the visited set and the name maps are shared by every
/// path, so types registered while handling one path are reused by later
/// ones. A new session is created for each call to [`super::extract`].
pub struct ExtractionSession<'a> {
    pub(super) spec: &'a OpenApiSpec,
    pub(super) options: &'a ExtractOptions,
    pub(super) lookup: RefLookup<'a>,
    pub(super) schema: ProviderSchema,
    pub(super) metadata: ProviderMetadata,
    visited: HashSet<String>,
}

impl<'a> ExtractionSession<'a> {
    pub fn new(spec: &'a OpenApiSpec, options: &'a ExtractOptions) -> Self {
        Self {
            spec,
            options,
            lookup: RefLookup::new(spec),
            schema: ProviderSchema::new(options.package_name.clone()),
            metadata: ProviderMetadata::default(),
            visited: HashSet::new(),
        }
    }

    pub fn finish(self) -> Extraction {
        Extraction {
            schema: self.schema,
            metadata: self.metadata,
        }
    }

    /// `<package>:<module>:<name>`
    pub fn token(&self, module: &str, name: &str) -> String {
        format!("{}:{}:{}", self.options.package_name, module, name)
    }

    pub fn is_visited(&self, token: &str) -> bool {
        self.visited.contains(token)
    }

    pub fn mark_visited(&mut self, token: &str) {
        self.visited.insert(token.to_string());
    }

    /// Register `spec` under `token` unless the token is already taken.
    /// Returns whether it was inserted; registered content is never replaced.
    pub fn register_type(&mut self, token: String, spec: ComplexTypeSpec) -> bool {
        match self.schema.types.entry(token) {
            Entry::Vacant(slot) => {
                slot.insert(spec);
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    /// Drop a registered type and forget that it was visited, so a later
    /// reference registers it again.
    pub fn remove_type(&mut self, token: &str) {
        self.visited.remove(token);
        self.schema.types.remove(token);
    }

    /// Re-register a type under a new token.
    pub fn move_type(&mut self, from: &str, to: &str) {
        self.visited.remove(from);
        if let Some(spec) = self.schema.types.remove(from) {
            self.schema.types.insert(to.to_string(), spec);
        }
    }

    pub fn seat(&mut self, token: &str, slot: CrudSlot, path: &str) -> Result<(), ExtractError> {
        self.metadata
            .crud_map
            .entry(token.to_string())
            .or_default()
            .seat(slot, path)
            .map_err(|existing| ExtractError::AmbiguousOperation {
                token: token.to_string(),
                slot: slot.as_str(),
                existing,
                new: path.to_string(),
            })
    }

    pub fn set_auto_name(&mut self, token: &str, property: &str) -> Result<(), ExtractError> {
        if let Some(existing) = self.metadata.auto_name_map.get(token) {
            if existing != property {
                return Err(ExtractError::AutoNameConflict {
                    token: token.to_string(),
                    existing: existing.clone(),
                    new: property.to_string(),
                });
            }
            return Ok(());
        }
        self.metadata
            .auto_name_map
            .insert(token.to_string(), property.to_string());
        Ok(())
    }

    /// Record a wire/SDK name pair in both directions when they differ.
    pub fn record_override(&mut self, wire_name: &str, sdk_name: &str) -> Result<(), ExtractError> {
        if wire_name == sdk_name {
            return Ok(());
        }
        add_name_override(sdk_name, wire_name, &mut self.metadata.sdk_to_api_name_map)?;
        add_name_override(wire_name, sdk_name, &mut self.metadata.api_to_sdk_name_map)
    }

    /// Like [`Self::record_override`], additionally noting the path
    /// parameter rename.
    pub fn record_path_param_override(
        &mut self,
        wire_name: &str,
        sdk_name: &str,
    ) -> Result<(), ExtractError> {
        if wire_name == sdk_name {
            return Ok(());
        }
        self.record_override(wire_name, sdk_name)?;
        add_name_override(wire_name, sdk_name, &mut self.metadata.path_param_name_map)
    }

    pub(super) fn allowed_plurals(&self) -> &[String] {
        &self.options.allowed_plurals
    }

    pub(super) fn namespace_separator(&self) -> Option<&str> {
        self.options.namespace_separator.as_deref()
    }
}
