//! Live tests against github.com. They need GITHUB_TOKEN and GITHUB_OWNER and
//! create real repositories, so they only run with `--ignored`.

use github_provider::{GitHubProvider, provider::PlanAction};
use serde_json::{Value, json};
use uuid::Uuid;

async fn configured() -> GitHubProvider {
    let provider = GitHubProvider::new();
    let diags = provider.configure(Value::Null).await;
    assert!(diags.is_empty(), "{diags:?}");
    provider
}

async fn apply(provider: &GitHubProvider, type_name: &str, prior: Option<Value>, proposed: Option<Value>) -> Option<Value> {
    let plan = provider.plan_resource_change(type_name, prior.clone(), proposed);
    assert!(!plan.diagnostics.has_error(), "{:?}", plan.diagnostics);
    let plan = plan.result.unwrap();

    let applied = provider
        .apply_resource_change(type_name, prior, plan.planned_state, Some(plan.planned_private))
        .await;
    assert!(!applied.diagnostics.has_error(), "{:?}", applied.diagnostics);
    applied.result
}

#[tokio::test]
#[ignore]
async fn repository_lifecycle() {
    let provider = configured().await;
    let name = format!("provider-test-{}", Uuid::new_v4());

    let config = json!({"name": name, "description": "created by tests", "visibility": "private", "auto_init": true});
    let state = apply(&provider, "github_repository", None, Some(config.clone())).await.unwrap();
    assert_eq!(state["name"], name.as_str());
    assert!(state["repo_id"].as_u64().is_some());

    let refreshed = provider.read_resource("github_repository", state.clone()).await.result.unwrap();
    let plan = provider
        .plan_resource_change("github_repository", Some(refreshed.clone()), Some(config))
        .result
        .unwrap();
    assert_eq!(plan.action, PlanAction::NoOp);

    let label = apply(
        &provider,
        "github_issue_label",
        None,
        Some(json!({"repository": name, "name": "triage", "color": "FBCA04"})),
    )
    .await
    .unwrap();
    let imported = provider
        .import_resource_state("github_issue_label", &format!("{name}:triage"))
        .await
        .result
        .unwrap();
    assert_eq!(imported["color"], label["color"]);

    apply(&provider, "github_repository", Some(refreshed), None).await;
    let gone = provider.import_resource_state("github_repository", &name).await;
    assert!(gone.result.is_none());
}

#[tokio::test]
#[ignore]
async fn branch_from_default_branch() {
    let provider = configured().await;
    let name = format!("provider-test-{}", Uuid::new_v4());

    let repo = apply(
        &provider,
        "github_repository",
        None,
        Some(json!({"name": name, "visibility": "private", "auto_init": true})),
    )
    .await
    .unwrap();

    let branch = apply(
        &provider,
        "github_branch",
        None,
        Some(json!({"repository": name, "branch": "feature", "source_branch": repo["default_branch"]})),
    )
    .await
    .unwrap();
    assert_eq!(branch["ref"], "refs/heads/feature");

    let data = provider
        .read_data_source("github_branch", json!({"repository": name, "branch": "feature"}))
        .await
        .result
        .unwrap();
    assert_eq!(data["sha"], branch["sha"]);

    apply(&provider, "github_repository", Some(repo), None).await;
}
