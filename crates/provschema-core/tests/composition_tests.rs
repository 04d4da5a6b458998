use provschema_core::ir::{CrudSlot, ReturnTypeSpec, TypeSpec};
use provschema_core::{ExtractOptions, Extraction, extract, parse};

const COMPOSITION: &str = include_str!("fixtures/composition.yaml");

fn extraction() -> Extraction {
    let spec = parse::from_yaml(COMPOSITION).expect("should parse composition.yaml");
    extract(&spec, &ExtractOptions::new("pkg")).expect("should extract")
}

fn names<V>(map: &std::collections::BTreeMap<String, V>) -> Vec<&str> {
    map.keys().map(String::as_str).collect()
}

#[test]
fn all_of_members_are_flattened() {
    let out = extraction();
    let project = &out.schema.resources["pkg:projects:Project"];

    assert_eq!(
        names(&project.input_properties),
        vec!["description", "name", "public"]
    );
    assert_eq!(
        names(&project.properties),
        vec!["description", "name", "ownerId", "public"]
    );
    assert_eq!(project.required_inputs, vec!["name"]);
    assert!(project.required.is_empty());
    assert_eq!(
        project.input_properties["public"].default,
        Some(serde_json::json!(false))
    );

    for merged in [
        "pkg:projects:ProjectBase",
        "pkg:projects:ProjectSettings",
        "pkg:projects:ProjectProperties",
    ] {
        assert!(
            !out.schema.types.contains_key(merged),
            "{merged} should not survive the merge"
        );
    }
}

#[test]
fn one_of_without_discriminator_merges_variants() {
    let out = extraction();
    let payment = &out.schema.resources["pkg:payments:Payment"];

    assert_eq!(
        names(&payment.input_properties),
        vec!["amount", "cardNumber", "iban"]
    );
    assert_eq!(names(&payment.properties), names(&payment.input_properties));
    assert!(payment.required_inputs.is_empty());
    assert!(payment.required.is_empty());
    assert!(payment.input_properties["cardNumber"].secret);
    assert_eq!(
        out.metadata.crud_map["pkg:payments:Payment"].get(CrudSlot::Create),
        Some("/payments")
    );
}

#[test]
fn discriminated_request_creates_one_resource_per_value() {
    let out = extraction();

    let dog = &out.schema.resources["pkg:pets:Dog"];
    assert_eq!(names(&dog.input_properties), vec!["breed", "kind", "name"]);
    assert_eq!(
        names(&dog.properties),
        vec!["breed", "goodBoy", "kind", "name"]
    );
    assert_eq!(dog.required_inputs, vec!["breed"]);
    assert_eq!(dog.required, vec!["breed", "name"]);
    assert_eq!(out.metadata.auto_name_map["pkg:pets:Dog"], "name");

    let cat = &out.schema.resources["pkg:pets:Cat"];
    assert_eq!(names(&cat.input_properties), vec!["kind", "lives"]);
    assert_eq!(cat.required_inputs, vec!["lives"]);
    assert_eq!(cat.required, vec!["lives"]);
    assert!(!out.metadata.auto_name_map.contains_key("pkg:pets:Cat"));

    let dog_crud = &out.metadata.crud_map["pkg:pets:Dog"];
    assert_eq!(dog_crud.get(CrudSlot::Create), Some("/pets"));
    assert_eq!(dog_crud.get(CrudSlot::Read), Some("/pets/{id}"));
    assert_eq!(
        out.metadata.crud_map["pkg:pets:Cat"].get(CrudSlot::Create),
        Some("/pets")
    );
}

#[test]
fn discriminated_get_reads_each_branch() {
    let out = extraction();

    let get_dog = &out.schema.functions["pkg:pets:getDog"];
    let inputs = get_dog.inputs.as_ref().unwrap();
    assert_eq!(names(&inputs.properties), vec!["id"]);
    assert_eq!(
        get_dog.return_type,
        Some(ReturnTypeSpec::TypeSpec(TypeSpec::Ref("pkg:pets:Dog".into())))
    );
    assert_eq!(names(&out.schema.types), vec!["pkg:pets:Dog"]);
}
