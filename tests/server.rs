use github_provider::{
    GitHubProvider,
    resource::ProviderData,
    server::{HANDSHAKE, ProviderResponse, serve},
};
use octocrab::Octocrab;
use serde_json::{Value, json};

/// A provider pointed at an address nothing listens on, for calls that must fail before any request.
async fn offline_provider(is_organization: bool) -> GitHubProvider {
    let client = Octocrab::builder()
        .base_uri("http://127.0.0.1:9")
        .unwrap()
        .personal_token("test-token".to_string())
        .build()
        .unwrap();
    let provider = GitHubProvider::new();
    provider
        .configure_with(ProviderData {
            client,
            owner: "acme".to_string(),
            is_organization,
        })
        .await;
    provider
}

async fn exchange(provider: &GitHubProvider, requests: &[Value]) -> Vec<ProviderResponse> {
    let mut input = String::new();
    for request in requests {
        input.push_str(&request.to_string());
        input.push('\n');
    }
    let mut output = Vec::new();
    serve(provider, input.as_bytes(), &mut output).await.unwrap();

    let text = String::from_utf8(output).unwrap();
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some(HANDSHAKE));
    lines.map(|line| serde_json::from_str(line).unwrap()).collect()
}

#[tokio::test]
async fn serves_schema_and_validation() {
    let provider = GitHubProvider::new();
    let responses = exchange(
        &provider,
        &[
            json!({"method": "get_schema"}),
            json!({"method": "validate_resource_config", "type_name": "github_team", "config": {"name": "platform"}}),
            json!({"method": "validate_resource_config", "type_name": "github_team", "config": {}}),
        ],
    )
    .await;

    assert_eq!(responses.len(), 3);
    let schema = responses[0].result.as_ref().unwrap();
    assert!(schema["resources"]["github_repository"]["attributes"]["name"]["required"].as_bool().unwrap());
    assert!(responses[1].diagnostics.is_empty());
    assert!(responses[2].diagnostics.has_error());
}

#[tokio::test]
async fn stop_ends_the_session() {
    let provider = GitHubProvider::new();
    let responses = exchange(
        &provider,
        &[json!({"method": "stop"}), json!({"method": "get_schema"})],
    )
    .await;
    assert!(responses.is_empty());
}

#[tokio::test]
async fn plan_over_the_wire() {
    let provider = GitHubProvider::new();
    let responses = exchange(
        &provider,
        &[json!({
            "method": "plan_resource_change",
            "type_name": "github_issue_label",
            "prior_state": null,
            "proposed_new_state": {"repository": "widgets", "name": "bug", "color": "d73a4a"}
        })],
    )
    .await;

    let plan = responses[0].result.as_ref().unwrap();
    assert_eq!(plan["action"], "create");
    assert_eq!(plan["planned_state"]["color"], "d73a4a");
}

#[tokio::test]
async fn lifecycle_calls_require_configuration() {
    let provider = GitHubProvider::new();
    let response = provider.read_resource("github_team", json!({"name": "platform"})).await;
    assert!(response.result.is_none());
    assert!(response.diagnostics.iter().any(|d| d.detail.contains("not configured")));
}

#[tokio::test]
async fn malformed_import_ids_fail_before_any_request() {
    let provider = offline_provider(true).await;
    let cases = [
        ("github_repository", "acme/widgets"),
        ("github_branch", "widgets"),
        ("github_release", "widgets:v1.0"),
        ("github_repository_deployment_branch_policy", "widgets:production"),
        ("github_organization_custom_role", "admins"),
        ("github_actions_organization_secret", "widgets:DEPLOY_KEY"),
    ];

    for (type_name, id) in cases {
        let response = provider.import_resource_state(type_name, id).await;
        assert!(response.result.is_none(), "{type_name} {id}");
        let detail = &response.diagnostics.iter().next().unwrap().detail;
        assert!(detail.contains("Invalid import ID"), "{type_name} {id}: {detail}");
    }
}

#[tokio::test]
async fn org_only_resources_reject_user_owners() {
    let provider = offline_provider(false).await;
    let response = provider
        .apply_resource_change(
            "github_team",
            None,
            Some(json!({"name": "platform", "privacy": "closed"})),
            None,
        )
        .await;
    assert!(response.result.is_none());
    assert!(
        response
            .diagnostics
            .iter()
            .any(|d| d.detail.contains("requires an organization owner"))
    );
}
