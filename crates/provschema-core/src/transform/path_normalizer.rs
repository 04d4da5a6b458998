use std::collections::HashMap;

use crate::error::ResolveError;
use crate::parse::operation::{HttpMethod, PathItem};
use crate::parse::parameter::ParameterOrRef;
use crate::parse::reference::RefOr;
use crate::parse::ref_resolve::RefLookup;

/// Rewrite path parameter names so that a parent resource's id is never
/// called `id` and the final id parameter always is.
///
/// - `/users/{id}/keys/{key_id}` → `/users/{usersId}/keys/{id}`
/// - `/ssh_keys/{id}/rotate` → `/ssh_keys/{ssh_keys_id}/rotate`
///
/// Matching path parameters on the path item and on every operation are
/// renamed too. Referenced parameters are inlined before renaming so shared
/// components are left untouched.
pub fn ensure_id_hierarchy(
    path: &str,
    item: &mut PathItem,
    lookup: &RefLookup<'_>,
) -> Result<String, ResolveError> {
    let mut segments: Vec<String> = path.split('/').map(str::to_string).collect();
    let last = segments.len() - 1;
    let mut renames: HashMap<String, String> = HashMap::new();

    for i in 0..segments.len() {
        let Some(name) = param_name(&segments[i]) else {
            continue;
        };

        let renamed = if i != last && name == "id" {
            let parent = segments[..i]
                .last()
                .map(|p| p.trim_matches(|c| c == '{' || c == '}'))
                .unwrap_or_default();
            if parent.contains('_') {
                format!("{parent}_id")
            } else {
                format!("{parent}Id")
            }
        } else if i == last && name != "id" && name.to_lowercase().contains("id") {
            "id".to_string()
        } else {
            continue;
        };

        renames.insert(name.to_string(), renamed.clone());
        segments[i] = format!("{{{renamed}}}");
    }

    if renames.is_empty() {
        return Ok(path.to_string());
    }

    rename_path_params(&mut item.parameters, &renames, lookup)?;
    for method in HttpMethod::ALL {
        if let Some(op) = item.operation_mut(method) {
            rename_path_params(&mut op.parameters, &renames, lookup)?;
        }
    }

    Ok(segments.join("/"))
}

fn param_name(segment: &str) -> Option<&str> {
    segment.strip_prefix('{')?.strip_suffix('}')
}

fn rename_path_params(
    params: &mut [ParameterOrRef],
    renames: &HashMap<String, String>,
    lookup: &RefLookup<'_>,
) -> Result<(), ResolveError> {
    for entry in params.iter_mut() {
        let param = lookup.parameter(entry)?;
        if !param.is_path() {
            continue;
        }
        let Some(renamed) = renames.get(&param.name) else {
            continue;
        };
        let mut inlined = param.clone();
        inlined.name = renamed.clone();
        *entry = RefOr::Item(inlined);
    }
    Ok(())
}
