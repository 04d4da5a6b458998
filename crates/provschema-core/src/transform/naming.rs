use std::collections::BTreeMap;
use std::sync::LazyLock;

use log::info;
use regex::Regex;

use crate::error::ExtractError;
use crate::parse::operation::HttpMethod;
use crate::parse::schema::Schema;

/// Resource names that end like a plural but must not be singularized.
pub const DEFAULT_ALLOWED_PLURAL_RESOURCES: &[&str] =
    &["Status", "Address", "Access", "Alias", "Dns", "Series"];

static LEADING_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]+_*[a-zA-Z]").expect("valid regex"));

static VERSION_SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^v[0-9]+[a-z0-9]*$").expect("valid regex"));

/// Convert a wire property or parameter name to the lowerCamelCase name used
/// in the schema. Names that would start with a number get a `_` prefix.
///
/// - `string_prop` → `stringProp`
/// - `ID` → `id`
/// - `1_var` → `_1Var`
pub fn to_sdk_name(raw: &str) -> String {
    let camel = camel_init_case(raw, false);
    let mut chars = camel.chars();
    let mut name = match chars.next() {
        Some(first) if first.is_ascii_uppercase() => {
            let mut s = first.to_ascii_lowercase().to_string();
            s.push_str(chars.as_str());
            s
        }
        _ => camel,
    };
    if starts_with_number(&name) {
        name.insert(0, '_');
    }
    name
}

/// Convert a string to PascalCase with the same tokenizer as [`to_sdk_name`].
pub fn to_pascal_case(raw: &str) -> String {
    camel_init_case(raw, true)
}

/// Whether the name begins with digits followed (optionally after
/// underscores) by a letter, which is not a valid identifier start.
pub fn starts_with_number(s: &str) -> bool {
    LEADING_NUMBER.is_match(s)
}

/// `widgets/v2` → `WidgetsV2`
pub fn module_to_pascal_case(module: &str) -> String {
    module.split('/').map(to_pascal_case).collect()
}

fn camel_init_case(raw: &str, init_case: bool) -> String {
    let lowered;
    let mut s = raw;
    if s == s.to_uppercase() {
        lowered = s.to_lowercase();
        s = &lowered;
    }

    let mut out = String::with_capacity(s.len());
    let mut cap_next = init_case;
    for c in s.trim_matches(' ').chars() {
        match c {
            'A'..='Z' | '0'..='9' => out.push(c),
            'a'..='z' if cap_next => out.push(c.to_ascii_uppercase()),
            'a'..='z' => out.push(c),
            _ => {}
        }
        cap_next = matches!(c, '_' | ' ' | '-' | '.');
    }
    out
}

/// Strip one trailing `s` unless the name ends with an allowed plural.
pub fn get_singular_name_for_resource<S: AsRef<str>>(name: &str, allowed_plurals: &[S]) -> String {
    if allowed_plurals
        .iter()
        .any(|plural| name.ends_with(plural.as_ref()))
    {
        return name.to_string();
    }
    name.strip_suffix('s').unwrap_or(name).to_string()
}

fn verb_keywords(method: HttpMethod) -> &'static [&'static str] {
    match method {
        HttpMethod::Get => &["get", "list", "show"],
        HttpMethod::Post => &["add", "create", "post", "put", "set"],
        HttpMethod::Put => &["add", "create", "put", "set", "update", "replace"],
        HttpMethod::Patch => &["patch", "update"],
        HttpMethod::Delete => &["delete", "destroy", "remove"],
    }
}

/// Derive a PascalCase resource title from an operation id by removing the
/// verbs associated with `method`.
///
/// With `namespace_separator` set, only the last separated segment is used.
/// Otherwise a `snake_case` id is first merged into camelCase.
///
/// - `createPosture` (POST) → `Posture`
/// - `setTheTableSetting` (PUT) → `TheTableSetting`
/// - `setupKeys` (PUT) → `SetupKeys`
pub fn get_resource_title_from_operation_id(
    operation_id: &str,
    method: HttpMethod,
    namespace_separator: Option<&str>,
) -> String {
    let unqualified = match namespace_separator {
        Some(sep) if !sep.is_empty() => operation_id.rsplit(sep).next().unwrap_or(operation_id),
        _ => operation_id,
    };
    let merged = merge_snake_case(unqualified);

    let keywords = verb_keywords(method);
    let kept: Vec<&str> = split_words(&merged)
        .into_iter()
        .filter(|w| !keywords.iter().any(|k| w.eq_ignore_ascii_case(k)))
        .collect();

    let title = to_pascal_case(&kept.join("_"));
    info!("converted operation ID {operation_id} to resource title {title}");
    title
}

/// `get_vms_restart` → `getVmsRestart`
fn merge_snake_case(s: &str) -> String {
    let mut parts = s.split('_');
    let mut merged = parts.next().unwrap_or_default().to_string();
    for part in parts {
        merged.push_str(&to_pascal_case(part));
    }
    merged
}

/// Split an identifier into words at separators and case boundaries,
/// keeping each word's original text.
fn split_words(s: &str) -> Vec<&str> {
    let bytes = s.as_bytes();
    let mut words = Vec::new();
    let mut start = 0;
    for i in 0..bytes.len() {
        let c = bytes[i];
        if matches!(c, b'_' | b' ' | b'-' | b'.') {
            if start < i {
                words.push(&s[start..i]);
            }
            start = i + 1;
            continue;
        }
        if i > start && c.is_ascii_uppercase() {
            let prev = bytes[i - 1];
            let next_is_lower = bytes.get(i + 1).is_some_and(u8::is_ascii_lowercase);
            if prev.is_ascii_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_ascii_uppercase() && next_is_lower)
            {
                words.push(&s[start..i]);
                start = i;
            }
        }
    }
    if start < s.len() {
        words.push(&s[start..]);
    }
    words
}

/// A schema's own `title` if it has one, otherwise its component name.
pub fn get_resource_title_from_request_schema(schema_name: &str, schema: &Schema) -> String {
    match schema.title.as_deref() {
        Some(title) if !title.is_empty() => to_pascal_case(title),
        _ => to_pascal_case(schema_name),
    }
}

pub fn is_path_param_segment(segment: &str) -> bool {
    segment.starts_with('{') || segment.ends_with('}')
}

/// The module a path belongs to.
///
/// By default this is the first path segment, or `<resource>/<version>` when
/// the first segment is a version like `v2`. With `use_parent_as_module`,
/// the last segment of the parent path is used instead.
pub fn get_module_from_path(path: &str, use_parent_as_module: bool) -> String {
    if use_parent_as_module {
        let parent = get_parent_path(path);
        let last = parent.rsplit('/').next().unwrap_or_default();
        return last.to_lowercase();
    }

    let mut parts = path.trim_start_matches('/').split('/');
    let first = parts.next().unwrap_or_default();
    if !VERSION_SEGMENT.is_match(first) {
        return first.to_lowercase();
    }
    match parts.next() {
        Some(resource) => format!("{}/{}", resource.to_lowercase(), first),
        None => first.to_string(),
    }
}

/// Drop a trailing path parameter segment: `/widgets/{id}` → `/widgets`.
pub fn get_parent_path(path: &str) -> String {
    let parts: Vec<&str> = path.trim_start_matches('/').split('/').collect();
    match parts.split_last() {
        Some((last, rest)) if is_path_param_segment(last) => format!("/{}", rest.join("/")),
        _ => path.to_string(),
    }
}

/// Heuristic: operation ids mentioning "list" return collections.
pub fn is_list_operation(operation_id: &str) -> bool {
    operation_id.to_lowercase().contains("list")
}

/// Record `key → value`, failing if `key` is already mapped elsewhere.
pub fn add_name_override(
    key: &str,
    value: &str,
    overrides: &mut BTreeMap<String, String>,
) -> Result<(), ExtractError> {
    if let Some(existing) = overrides.get(key) {
        if existing != value {
            return Err(ExtractError::NameOverrideConflict {
                key: key.to_string(),
                existing: existing.clone(),
                new: value.to_string(),
            });
        }
        return Ok(());
    }
    overrides.insert(key.to_string(), value.to_string());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sdk_name_snake_and_dotted() {
        assert_eq!(to_sdk_name("string_prop"), "stringProp");
        assert_eq!(to_sdk_name("string.prop"), "stringProp");
        assert_eq!(to_sdk_name("kebab-name"), "kebabName");
    }

    #[test]
    fn test_sdk_name_upper() {
        assert_eq!(to_sdk_name("ID"), "id");
        assert_eq!(to_sdk_name("UPPER_SNAKE"), "upperSnake");
        assert_eq!(to_sdk_name("Name"), "name");
    }

    #[test]
    fn test_sdk_name_leading_number() {
        assert_eq!(to_sdk_name("1_var"), "_1Var");
        assert_eq!(to_sdk_name("2fa"), "_2fa");
        assert_eq!(to_sdk_name("123"), "123");
    }

    #[test]
    fn test_naming_is_idempotent() {
        for raw in [
            "string_prop",
            "some-thing",
            "ID",
            "1_var",
            "already camel",
            "XMLHttpRequest",
            "__weird..name__",
            "v2",
        ] {
            let sdk = to_sdk_name(raw);
            assert_eq!(to_sdk_name(&sdk), sdk, "to_sdk_name not idempotent for {raw}");
            let pascal = to_pascal_case(raw);
            assert_eq!(
                to_pascal_case(&pascal),
                pascal,
                "to_pascal_case not idempotent for {raw}"
            );
        }
    }

    #[test]
    fn test_pascal_case() {
        assert_eq!(to_pascal_case("some-thing"), "SomeThing");
        assert_eq!(to_pascal_case("snake_case_name"), "SnakeCaseName");
        assert_eq!(to_pascal_case("CONSTANT"), "Constant");
        assert_eq!(to_pascal_case("widget"), "Widget");
        assert_eq!(to_pascal_case("  padded "), "Padded");
    }

    #[test]
    fn test_starts_with_number() {
        assert!(starts_with_number("1_var"));
        assert!(starts_with_number("1var"));
        assert!(!starts_with_number("var"));
        assert!(!starts_with_number("var1a"));
    }

    #[test]
    fn test_module_to_pascal_case() {
        assert_eq!(module_to_pascal_case("widgets/v2"), "WidgetsV2");
        assert_eq!(module_to_pascal_case("dns"), "Dns");
    }

    #[test]
    fn test_singular_name() {
        let allowed = DEFAULT_ALLOWED_PLURAL_RESOURCES;
        assert_eq!(get_singular_name_for_resource("Widgets", allowed), "Widget");
        assert_eq!(get_singular_name_for_resource("Widget", allowed), "Widget");
        assert_eq!(get_singular_name_for_resource("Status", allowed), "Status");
        assert_eq!(
            get_singular_name_for_resource("IpAddress", allowed),
            "IpAddress"
        );
        let custom = vec!["Settings".to_string()];
        assert_eq!(
            get_singular_name_for_resource("TableSettings", &custom),
            "TableSettings"
        );
    }

    #[test]
    fn test_title_put() {
        let t = |id| get_resource_title_from_operation_id(id, HttpMethod::Put, None);
        assert_eq!(t("setupKeys"), "SetupKeys");
        assert_eq!(t("tableSetting"), "TableSetting");
        assert_eq!(t("setTheTableSetting"), "TheTableSetting");
        assert_eq!(t("replaceWidget"), "Widget");
    }

    #[test]
    fn test_title_post() {
        let t = |id| get_resource_title_from_operation_id(id, HttpMethod::Post, None);
        assert_eq!(t("createPosture"), "Posture");
        assert_eq!(t("postureRules"), "PostureRules");
        assert_eq!(t("create_floating_ip"), "FloatingIp");
    }

    #[test]
    fn test_title_get_and_delete() {
        assert_eq!(
            get_resource_title_from_operation_id("listWidgets", HttpMethod::Get, None),
            "Widgets"
        );
        assert_eq!(
            get_resource_title_from_operation_id("getVmsRestart", HttpMethod::Get, None),
            "VmsRestart"
        );
        assert_eq!(
            get_resource_title_from_operation_id("machines_show", HttpMethod::Get, None),
            "Machines"
        );
        assert_eq!(
            get_resource_title_from_operation_id("showcaseItems", HttpMethod::Get, None),
            "ShowcaseItems"
        );
        assert_eq!(
            get_resource_title_from_operation_id("destroyVMSnapshot", HttpMethod::Delete, None),
            "VMSnapshot"
        );
    }

    #[test]
    fn test_title_namespaced() {
        assert_eq!(
            get_resource_title_from_operation_id("Widgets_create", HttpMethod::Post, Some("_")),
            ""
        );
        assert_eq!(
            get_resource_title_from_operation_id(
                "Store.createOrder",
                HttpMethod::Post,
                Some(".")
            ),
            "Order"
        );
    }

    #[test]
    fn test_title_from_request_schema() {
        let titled = Schema {
            title: Some("droplet create".into()),
            ..Schema::default()
        };
        assert_eq!(
            get_resource_title_from_request_schema("droplet_single_create", &titled),
            "DropletCreate"
        );
        assert_eq!(
            get_resource_title_from_request_schema("droplet_single_create", &Schema::default()),
            "DropletSingleCreate"
        );
    }

    #[test]
    fn test_module_from_path() {
        assert_eq!(get_module_from_path("/widgets", false), "widgets");
        assert_eq!(get_module_from_path("/Widgets/{id}", false), "widgets");
        assert_eq!(get_module_from_path("/v2/droplets/{id}", false), "droplets/v2");
        assert_eq!(get_module_from_path("/v1beta/things", false), "things/v1beta");
        assert_eq!(get_module_from_path("/v2", false), "v2");
    }

    #[test]
    fn test_module_from_parent_path() {
        assert_eq!(
            get_module_from_path("/root/v1/subResource/{id}", true),
            "subresource"
        );
        assert_eq!(
            get_module_from_path("/root/v1/subResource/{id}/second", true),
            "second"
        );
    }

    #[test]
    fn test_parent_path() {
        assert_eq!(get_parent_path("/widgets/{id}"), "/widgets");
        assert_eq!(get_parent_path("/widgets"), "/widgets");
        assert_eq!(get_parent_path("/a/{aId}/b/{id}"), "/a/{aId}/b");
    }

    #[test]
    fn test_is_list_operation() {
        assert!(is_list_operation("listWidgets"));
        assert!(is_list_operation("Widgets_List"));
        assert!(!is_list_operation("getWidget"));
    }

    #[test]
    fn test_add_name_override() {
        let mut map = BTreeMap::new();
        add_name_override("stringProp", "string_prop", &mut map).unwrap();
        add_name_override("stringProp", "string_prop", &mut map).unwrap();
        let err = add_name_override("stringProp", "string.prop", &mut map).unwrap_err();
        assert!(matches!(err, ExtractError::NameOverrideConflict { .. }));
    }
}
