use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// A CRUD slot of a resource's operation map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrudSlot {
    Create,
    Read,
    Update,
    Delete,
    Put,
}

impl CrudSlot {
    pub fn as_str(&self) -> &'static str {
        match self {
            CrudSlot::Create => "create",
            CrudSlot::Read => "read",
            CrudSlot::Update => "update",
            CrudSlot::Delete => "delete",
            CrudSlot::Put => "put",
        }
    }
}

impl fmt::Display for CrudSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The API paths serving each CRUD verb for one resource token.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct CrudOperations {
    /// POST, or a PUT that also creates.
    #[serde(rename = "c", skip_serializing_if = "Option::is_none")]
    pub create: Option<String>,
    /// GET
    #[serde(rename = "r", skip_serializing_if = "Option::is_none")]
    pub read: Option<String>,
    /// PATCH
    #[serde(rename = "u", skip_serializing_if = "Option::is_none")]
    pub update: Option<String>,
    /// DELETE
    #[serde(rename = "d", skip_serializing_if = "Option::is_none")]
    pub delete: Option<String>,
    /// PUT
    #[serde(rename = "p", skip_serializing_if = "Option::is_none")]
    pub put: Option<String>,
}

impl CrudOperations {
    pub fn get(&self, slot: CrudSlot) -> Option<&str> {
        self.slot(slot).as_deref()
    }

    /// Seat `path` in `slot`. Returns the conflicting path if the slot
    /// already holds a different one; the same path is a no-op.
    pub fn seat(&mut self, slot: CrudSlot, path: &str) -> Result<(), String> {
        let entry = self.slot_mut(slot);
        if let Some(existing) = entry.as_deref() {
            if existing != path {
                return Err(existing.to_string());
            }
            return Ok(());
        }
        *entry = Some(path.to_string());
        Ok(())
    }

    fn slot(&self, slot: CrudSlot) -> &Option<String> {
        match slot {
            CrudSlot::Create => &self.create,
            CrudSlot::Read => &self.read,
            CrudSlot::Update => &self.update,
            CrudSlot::Delete => &self.delete,
            CrudSlot::Put => &self.put,
        }
    }

    fn slot_mut(&mut self, slot: CrudSlot) -> &mut Option<String> {
        match slot {
            CrudSlot::Create => &mut self.create,
            CrudSlot::Read => &mut self.read,
            CrudSlot::Update => &mut self.update,
            CrudSlot::Delete => &mut self.delete,
            CrudSlot::Put => &mut self.put,
        }
    }
}

/// Lookup tables a runtime provider needs alongside the schema.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderMetadata {
    pub crud_map: BTreeMap<String, CrudOperations>,
    pub auto_name_map: BTreeMap<String, String>,
    /// SDK property name to wire name, for names that differ.
    pub sdk_to_api_name_map: BTreeMap<String, String>,
    pub api_to_sdk_name_map: BTreeMap<String, String>,
    /// Original path parameter name to SDK name.
    pub path_param_name_map: BTreeMap<String, String>,
    /// Module to the PascalCase namespace name SDKs should use for it.
    pub module_namespaces: BTreeMap<String, String>,
}
