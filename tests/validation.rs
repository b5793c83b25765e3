use github_provider::{GitHubProvider, diag::Diagnostics};
use serde_json::{Value, json};

fn validate(type_name: &str, config: Value) -> Diagnostics {
    GitHubProvider::new().validate_resource_config(type_name, &config)
}

fn attributes_in_error(diags: &Diagnostics) -> Vec<String> {
    diags.iter().filter_map(|d| d.attribute.clone()).collect()
}

#[test]
fn repository_config_is_accepted() {
    let diags = validate(
        "github_repository",
        json!({
            "name": "widgets",
            "description": "Widget factory",
            "visibility": "private",
            "topics": ["rust", "infra"]
        }),
    );
    assert!(!diags.has_error(), "{diags:?}");
}

#[test]
fn repository_name_and_visibility_are_checked() {
    let diags = validate("github_repository", json!({"name": "no spaces allowed", "visibility": "hidden"}));
    let attrs = attributes_in_error(&diags);
    assert!(attrs.contains(&"name".to_string()), "{diags:?}");
    assert!(attrs.contains(&"visibility".to_string()), "{diags:?}");
}

#[test]
fn computed_attributes_cannot_be_configured() {
    let diags = validate("github_repository", json!({"name": "widgets", "full_name": "acme/widgets"}));
    assert_eq!(attributes_in_error(&diags), vec!["full_name".to_string()]);
}

#[test]
fn missing_required_attribute_is_reported() {
    let diags = validate("github_branch", json!({"branch": "feature"}));
    assert!(attributes_in_error(&diags).contains(&"repository".to_string()));
}

#[test]
fn secret_values_conflict() {
    let diags = validate(
        "github_actions_secret",
        json!({
            "repository": "widgets",
            "secret_name": "DEPLOY_KEY",
            "plaintext_value": "hunter2",
            "encrypted_value": "aHVudGVyMg=="
        }),
    );
    assert!(diags.has_error());
}

#[test]
fn secret_names_cannot_use_reserved_prefix() {
    let diags = validate(
        "github_actions_secret",
        json!({"repository": "widgets", "secret_name": "GITHUB_TOKEN", "plaintext_value": "x"}),
    );
    assert_eq!(attributes_in_error(&diags), vec!["secret_name".to_string()]);

    let diags = validate(
        "github_actions_secret",
        json!({"repository": "widgets", "secret_name": "1PASSWORD", "plaintext_value": "x"}),
    );
    assert!(diags.has_error());
}

#[test]
fn team_privacy_is_restricted() {
    let diags = validate("github_team", json!({"name": "platform", "privacy": "public"}));
    assert_eq!(attributes_in_error(&diags), vec!["privacy".to_string()]);
}

#[test]
fn environment_limits_reviewers_and_policy_flags() {
    let diags = validate(
        "github_repository_environment",
        json!({
            "repository": "widgets",
            "environment": "production",
            "reviewer_users": [1, 2, 3, 4],
            "reviewer_teams": [5, 6, 7],
            "protected_branches": true,
            "custom_branch_policies": true
        }),
    );
    let attrs = attributes_in_error(&diags);
    assert!(attrs.contains(&"reviewer_users".to_string()), "{diags:?}");
    assert!(attrs.contains(&"protected_branches".to_string()), "{diags:?}");

    let diags = validate(
        "github_repository_environment",
        json!({"repository": "widgets", "environment": "staging", "wait_timer": 50000}),
    );
    assert_eq!(attributes_in_error(&diags), vec!["wait_timer".to_string()]);
}

#[test]
fn label_color_must_be_hex() {
    let diags = validate("github_issue_label", json!({"repository": "widgets", "name": "bug", "color": "red"}));
    assert_eq!(attributes_in_error(&diags), vec!["color".to_string()]);

    let diags = validate("github_issue_label", json!({"repository": "widgets", "name": "bug", "color": "d73a4a"}));
    assert!(!diags.has_error(), "{diags:?}");
}

#[test]
fn data_source_config_is_validated() {
    let provider = GitHubProvider::new();
    let diags = provider.validate_data_source_config("github_repository", &json!({"full_name": "acme/widgets"}));
    assert!(!diags.has_error(), "{diags:?}");

    let diags = provider.validate_data_source_config("github_branch", &json!({"repository": "widgets"}));
    assert!(diags.has_error());
}
