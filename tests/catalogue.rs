use std::collections::BTreeSet;

use github_provider::GitHubProvider;

#[test]
fn every_resource_state_matches_its_schema() {
    let provider = GitHubProvider::new();
    for type_name in provider.resource_types() {
        let resource = provider.resource(type_name).unwrap();
        let schema: BTreeSet<String> = resource.schema().attributes.keys().cloned().collect();
        let state: BTreeSet<String> = resource.state_attributes().into_iter().collect();
        assert_eq!(schema, state, "{type_name}: schema and state attributes differ");
    }
}

#[test]
fn every_data_source_state_matches_its_schema() {
    let provider = GitHubProvider::new();
    for type_name in provider.data_source_types() {
        let data_source = provider.data_source(type_name).unwrap();
        let schema: BTreeSet<String> = data_source.schema().attributes.keys().cloned().collect();
        let state: BTreeSet<String> = data_source.state_attributes().into_iter().collect();
        assert_eq!(schema, state, "{type_name}: schema and state attributes differ");
    }
}

#[test]
fn type_names_are_prefixed_and_unique() {
    let provider = GitHubProvider::new();
    let resources: Vec<&str> = provider.resource_types().collect();
    let data_sources: Vec<&str> = provider.data_source_types().collect();

    assert_eq!(resources.len(), 23);
    assert_eq!(data_sources.len(), 19);
    for name in resources.iter().chain(data_sources.iter()) {
        assert!(name.starts_with("github_"), "{name}");
    }
    assert_eq!(resources.iter().collect::<BTreeSet<_>>().len(), resources.len());
}

#[test]
fn schema_serializes_every_type() {
    let provider = GitHubProvider::new();
    let schema = serde_json::to_value(provider.get_schema()).unwrap();

    assert!(schema["provider"]["attributes"]["token"]["sensitive"].as_bool().unwrap());
    assert_eq!(schema["resources"].as_object().unwrap().len(), 23);
    assert_eq!(schema["data_sources"].as_object().unwrap().len(), 19);
    assert_eq!(
        schema["resources"]["github_actions_secret"]["attributes"]["plaintext_value"]["sensitive"],
        true
    );
}

#[test]
fn unknown_types_are_diagnosed() {
    let provider = GitHubProvider::new();
    let diags = provider.validate_resource_config("github_nope", &serde_json::json!({}));
    assert!(diags.has_error());

    let diags = provider.validate_data_source_config("github_nope", &serde_json::json!({}));
    assert!(diags.has_error());
}
