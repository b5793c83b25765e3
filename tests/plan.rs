use github_provider::{
    GitHubProvider,
    op::ProviderOp,
    provider::{PlanAction, PlanResponse},
};
use serde_json::{Value, json};

fn plan(type_name: &str, prior: Option<Value>, proposed: Option<Value>) -> PlanResponse {
    let response = GitHubProvider::new().plan_resource_change(type_name, prior, proposed);
    assert!(!response.diagnostics.has_error(), "{:?}", response.diagnostics);
    response.result.unwrap()
}

fn repository_state() -> Value {
    json!({
        "name": "widgets",
        "description": "Widget factory",
        "visibility": "private",
        "has_issues": true,
        "has_projects": false,
        "has_wiki": false,
        "has_discussions": false,
        "is_template": false,
        "allow_merge_commit": true,
        "allow_squash_merge": true,
        "allow_rebase_merge": true,
        "allow_auto_merge": false,
        "delete_branch_on_merge": false,
        "archived": false,
        "archive_on_destroy": false,
        "topics": ["infra", "rust"],
        "full_name": "acme/widgets",
        "html_url": "https://github.com/acme/widgets",
        "node_id": "R_1",
        "repo_id": 42,
        "default_branch": "main",
        "etag": "W/\"abc\""
    })
}

#[test]
fn create_fills_defaults() {
    let response = plan("github_repository", None, Some(json!({"name": "widgets", "topics": ["rust", "infra", "rust"]})));

    assert_eq!(response.action, PlanAction::Create);
    assert_eq!(ProviderOp::from_str(&response.planned_private).unwrap(), ProviderOp::Create);
    let planned = response.planned_state.unwrap();
    assert_eq!(planned["has_issues"], true);
    assert_eq!(planned["allow_auto_merge"], false);
    assert_eq!(planned["topics"], json!(["infra", "rust"]));
}

#[test]
fn unchanged_config_is_a_no_op() {
    let proposed = json!({
        "name": "widgets",
        "description": "Widget factory",
        "visibility": "private",
        "topics": ["rust", "infra"]
    });
    let response = plan("github_repository", Some(repository_state()), Some(proposed));

    assert_eq!(response.action, PlanAction::NoOp);
    let planned = response.planned_state.unwrap();
    assert_eq!(planned["repo_id"], 42);
    assert_eq!(planned["etag"], "W/\"abc\"");
}

#[test]
fn in_place_update_lists_changed_attributes() {
    let proposed = json!({
        "name": "widgets",
        "description": "Gadget factory",
        "visibility": "private",
        "topics": ["infra", "rust"]
    });
    let response = plan("github_repository", Some(repository_state()), Some(proposed));

    assert_eq!(response.action, PlanAction::Update);
    assert!(response.requires_replace.is_empty());
    assert_eq!(
        ProviderOp::from_str(&response.planned_private).unwrap(),
        ProviderOp::Update {
            changed: vec!["description".to_string()]
        }
    );
    assert!(response.message.unwrap().contains("Gadget factory"));
}

#[test]
fn identity_change_forces_replacement() {
    let prior = json!({
        "repository": "widgets",
        "branch": "feature",
        "source_branch": "main",
        "source_sha": "abc123",
        "etag": "W/\"1\"",
        "ref": "refs/heads/feature",
        "sha": "abc123"
    });
    let proposed = json!({"repository": "widgets", "branch": "feature-2"});
    let response = plan("github_branch", Some(prior), Some(proposed));

    assert_eq!(response.action, PlanAction::Replace);
    assert_eq!(response.requires_replace, vec!["branch".to_string()]);
}

#[test]
fn removal_plans_delete() {
    let response = plan("github_repository", Some(repository_state()), None);
    assert_eq!(response.action, PlanAction::Delete);
    assert!(response.planned_state.is_none());
    assert_eq!(ProviderOp::from_str(&response.planned_private).unwrap(), ProviderOp::Delete);
}

#[test]
fn sensitive_values_are_masked_in_the_message() {
    let prior = json!({
        "repository": "widgets",
        "secret_name": "DEPLOY_KEY",
        "plaintext_value": "old-secret",
        "created_at": "2024-01-01T00:00:00Z",
        "updated_at": "2024-01-01T00:00:00Z"
    });
    let proposed = json!({
        "repository": "widgets",
        "secret_name": "DEPLOY_KEY",
        "plaintext_value": "new-secret"
    });
    let response = plan("github_actions_secret", Some(prior), Some(proposed));

    assert_eq!(response.action, PlanAction::Replace);
    let message = response.message.unwrap();
    assert!(!message.contains("old-secret"));
    assert!(!message.contains("new-secret"));
}

#[test]
fn label_color_case_is_not_a_change() {
    let prior = json!({
        "repository": "widgets",
        "name": "bug",
        "color": "D73A4A",
        "url": "https://api.github.com/repos/acme/widgets/labels/bug",
        "etag": "W/\"2\""
    });
    let proposed = json!({"repository": "widgets", "name": "bug", "color": "#d73a4a"});
    let response = plan("github_issue_label", Some(prior), Some(proposed));

    assert_eq!(response.action, PlanAction::NoOp);
}

#[test]
fn invalid_proposal_is_a_diagnostic() {
    let response = GitHubProvider::new().plan_resource_change(
        "github_team",
        None,
        Some(json!({"name": "platform", "privacy": "public"})),
    );
    assert!(response.result.is_none());
    assert!(response.diagnostics.has_error());
}
