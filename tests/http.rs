//! Lifecycle calls against a local mock of the GitHub API.

use github_provider::{
    GitHubProvider,
    provider::{PlanAction, PlanResponse},
    resource::ProviderData,
};
use octocrab::Octocrab;
use serde_json::{Value, json};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{header, method, path, query_param},
};

async fn provider_for(server: &MockServer) -> GitHubProvider {
    let client = Octocrab::builder()
        .base_uri(server.uri())
        .unwrap()
        .personal_token("test-token".to_string())
        .build()
        .unwrap();
    let provider = GitHubProvider::new();
    provider
        .configure_with(ProviderData {
            client,
            owner: "acme".to_string(),
            is_organization: true,
        })
        .await;
    provider
}

fn repository_json(default_branch: &str) -> Value {
    json!({
        "id": 42, "node_id": "R_kgDOwidgets",
        "name": "widgets", "full_name": "acme/widgets",
        "description": "", "homepage": null, "private": false, "visibility": "public",
        "has_issues": true, "has_projects": false, "has_wiki": false, "has_discussions": false,
        "is_template": false, "allow_merge_commit": true, "allow_squash_merge": true,
        "allow_rebase_merge": true, "allow_auto_merge": false, "delete_branch_on_merge": false,
        "archived": false, "default_branch": default_branch, "topics": [],
        "html_url": "https://github.com/acme/widgets",
        "ssh_url": "git@github.com:acme/widgets.git",
        "clone_url": "https://github.com/acme/widgets.git",
        "git_url": "git://github.com/acme/widgets.git"
    })
}

fn not_found() -> ResponseTemplate {
    ResponseTemplate::new(404).set_body_json(json!({
        "message": "Not Found",
        "documentation_url": "https://docs.github.com/rest"
    }))
}

async fn import(provider: &GitHubProvider, type_name: &str, id: &str) -> Value {
    let response = provider.import_resource_state(type_name, id).await;
    assert!(!response.diagnostics.has_error(), "{:?}", response.diagnostics);
    response.result.unwrap()
}

fn plan(provider: &GitHubProvider, type_name: &str, prior: Value, config: Value) -> PlanResponse {
    let response = provider.plan_resource_change(type_name, Some(prior), Some(config));
    assert!(!response.diagnostics.has_error(), "{:?}", response.diagnostics);
    response.result.unwrap()
}

#[tokio::test]
async fn imported_repository_plans_no_changes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/widgets"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(repository_json("main"))
                .insert_header("ETag", "W/\"abc\""),
        )
        .mount(&server)
        .await;

    let provider = provider_for(&server).await;
    let state = import(&provider, "github_repository", "widgets").await;
    assert_eq!(state["etag"], "W/\"abc\"");
    assert_eq!(state["auto_init"], false);

    let response = plan(&provider, "github_repository", state, json!({"name": "widgets"}));
    assert_eq!(response.action, PlanAction::NoOp, "{:?}", response.message);
}

#[tokio::test]
async fn not_modified_read_keeps_state() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/widgets"))
        .and(header("if-none-match", "W/\"abc\""))
        .respond_with(ResponseTemplate::new(304))
        .expect(1)
        .mount(&server)
        .await;

    let provider = provider_for(&server).await;
    let state = json!({
        "name": "widgets",
        "description": "kept as is",
        "visibility": "private",
        "repo_id": 42,
        "etag": "W/\"abc\""
    });
    let response = provider.read_resource("github_repository", state).await;
    assert!(!response.diagnostics.has_error(), "{:?}", response.diagnostics);

    let refreshed = response.result.unwrap();
    assert_eq!(refreshed["description"], "kept as is");
    assert_eq!(refreshed["visibility"], "private");
    assert_eq!(refreshed["etag"], "W/\"abc\"");
}

#[tokio::test]
async fn missing_object_is_dropped_from_state() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/widgets"))
        .respond_with(not_found())
        .mount(&server)
        .await;

    let provider = provider_for(&server).await;
    let response = provider
        .read_resource("github_repository", json!({"name": "widgets", "etag": "W/\"old\""}))
        .await;
    assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
    assert!(response.result.is_none());
}

#[tokio::test]
async fn wrapped_listing_follows_pages() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/widgets/actions/secrets"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_count": 3,
            "secrets": [
                {"name": "A", "created_at": "2024-01-01T00:00:00Z", "updated_at": "2024-01-01T00:00:00Z"},
                {"name": "B", "created_at": "2024-01-02T00:00:00Z", "updated_at": "2024-01-02T00:00:00Z"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/widgets/actions/secrets"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_count": 3,
            "secrets": [
                {"name": "C", "created_at": "2024-01-03T00:00:00Z", "updated_at": "2024-01-03T00:00:00Z"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = provider_for(&server).await;
    let response = provider
        .read_data_source("github_actions_secrets", json!({"name": "widgets"}))
        .await;
    assert!(!response.diagnostics.has_error(), "{:?}", response.diagnostics);

    let result = response.result.unwrap();
    let names: Vec<&str> = result["secrets"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["A", "B", "C"]);
    assert_eq!(result["id"], "acme/widgets");
}

#[tokio::test]
async fn search_stops_at_the_result_cap() {
    let server = MockServer::start().await;
    let page = |offset: u64| {
        let items: Vec<Value> = (offset..offset + 100)
            .map(|i| {
                let mut repo = repository_json("main");
                repo["id"] = json!(i);
                repo["name"] = json!(format!("repo-{i}"));
                repo["full_name"] = json!(format!("acme/repo-{i}"));
                repo
            })
            .collect();
        json!({"total_count": 500, "items": items})
    };
    for (number, offset) in [("1", 0), ("2", 100)] {
        Mock::given(method("GET"))
            .and(path("/search/repositories"))
            .and(query_param("page", number))
            .respond_with(ResponseTemplate::new(200).set_body_json(page(offset)))
            .expect(1)
            .mount(&server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/search/repositories"))
        .and(query_param("page", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(200)))
        .expect(0)
        .mount(&server)
        .await;

    let provider = provider_for(&server).await;
    let response = provider
        .read_data_source(
            "github_repositories",
            json!({"query": "org:acme", "results_per_page": 150, "include_repo_id": true}),
        )
        .await;
    assert!(!response.diagnostics.has_error(), "{:?}", response.diagnostics);

    let result = response.result.unwrap();
    assert_eq!(result["full_names"].as_array().unwrap().len(), 150);
    assert_eq!(result["repo_ids"][149], 149);
}

#[tokio::test]
async fn imported_runner_group_plans_no_changes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/orgs/acme/actions/runner-groups/2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 2, "name": "builders", "visibility": "all",
            "default": false, "inherited": false,
            "allows_public_repositories": false, "restricted_to_workflows": false,
            "selected_workflows": [],
            "runners_url": "https://api.github.com/orgs/acme/actions/runner-groups/2/runners"
        })))
        .mount(&server)
        .await;

    let provider = provider_for(&server).await;
    let state = import(&provider, "github_actions_runner_group", "2").await;
    assert_eq!(state["allows_public_repositories"], false);

    let response = plan(
        &provider,
        "github_actions_runner_group",
        state,
        json!({"name": "builders", "visibility": "all"}),
    );
    assert_eq!(response.action, PlanAction::NoOp, "{:?}", response.message);
}

#[tokio::test]
async fn imported_branch_protection_keeps_review_count() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/widgets/branches/main/protection"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "enforce_admins": {"enabled": false},
            "required_pull_request_reviews": {
                "required_approving_review_count": 2,
                "dismiss_stale_reviews": false
            }
        })))
        .mount(&server)
        .await;

    let provider = provider_for(&server).await;
    let state = import(&provider, "github_branch_protection", "widgets:main").await;
    assert_eq!(state["required_approving_review_count"], 2);

    let response = plan(
        &provider,
        "github_branch_protection",
        state,
        json!({"repository": "widgets", "branch": "main", "required_approving_review_count": 2}),
    );
    assert_eq!(response.action, PlanAction::NoOp, "{:?}", response.message);
}

#[tokio::test]
async fn imported_default_branch_plans_no_changes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/widgets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(repository_json("main")))
        .mount(&server)
        .await;

    let provider = provider_for(&server).await;
    let state = import(&provider, "github_branch_default", "widgets").await;
    assert_eq!(state["branch"], "main");

    let response = plan(
        &provider,
        "github_branch_default",
        state,
        json!({"repository": "widgets", "branch": "main"}),
    );
    assert_eq!(response.action, PlanAction::NoOp, "{:?}", response.message);
}

#[tokio::test]
async fn default_branch_switch_patches_then_rereads() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/repos/acme/widgets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(repository_json("develop")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/widgets"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(repository_json("develop"))
                .insert_header("ETag", "W/\"new\""),
        )
        .mount(&server)
        .await;

    let provider = provider_for(&server).await;
    let prior = json!({"repository": "widgets", "branch": "main", "rename": false, "etag": "W/\"old\""});
    let planned = plan(
        &provider,
        "github_branch_default",
        prior.clone(),
        json!({"repository": "widgets", "branch": "develop"}),
    );
    assert_eq!(planned.action, PlanAction::Update);

    let response = provider
        .apply_resource_change(
            "github_branch_default",
            Some(prior),
            planned.planned_state,
            Some(planned.planned_private),
        )
        .await;
    assert!(!response.diagnostics.has_error(), "{:?}", response.diagnostics);

    let state = response.result.unwrap();
    assert_eq!(state["branch"], "develop");
    assert_eq!(state["etag"], "W/\"new\"");
}

#[tokio::test]
async fn org_secret_without_repositories_keeps_ids_unset() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/orgs/acme/actions/secrets/DEPLOY_KEY"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "DEPLOY_KEY",
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z",
            "visibility": "selected",
            "selected_repositories_url": "https://api.github.com/orgs/acme/actions/secrets/DEPLOY_KEY/repositories"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/orgs/acme/actions/secrets/DEPLOY_KEY/repositories"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"total_count": 0, "repositories": []})))
        .expect(1)
        .mount(&server)
        .await;

    let provider = provider_for(&server).await;
    let state = json!({
        "secret_name": "DEPLOY_KEY",
        "plaintext_value": "hunter2",
        "visibility": "selected",
        "updated_at": "2024-01-01T00:00:00Z"
    });
    let response = provider
        .read_resource("github_actions_organization_secret", state)
        .await;
    assert!(!response.diagnostics.has_error(), "{:?}", response.diagnostics);

    let refreshed = response.result.unwrap();
    assert!(refreshed["selected_repository_ids"].is_null());
    assert_eq!(refreshed["plaintext_value"], "hunter2");
}

#[tokio::test]
async fn imports_with_flag_defaults_plan_no_changes() {
    let server = MockServer::start().await;
    let routes = [
        (
            "/repos/acme/widgets/collaborators/octocat/permission",
            json!({
                "permission": "write",
                "role_name": "write",
                "user": {"login": "octocat", "id": 1, "role_name": "write"}
            }),
        ),
        (
            "/repos/acme/widgets/environments/production",
            json!({
                "id": 161088068, "node_id": "MDExOkVudmlyb25tZW50MTYxMDg4MDY4",
                "name": "production", "can_admins_bypass": true,
                "protection_rules": [], "deployment_branch_policy": null
            }),
        ),
        (
            "/orgs/acme/memberships/octocat",
            json!({"state": "active", "role": "member"}),
        ),
        (
            "/repos/acme/widgets/releases/7",
            json!({
                "id": 7, "node_id": "RE_kwDOwidgets", "tag_name": "v1.0.0",
                "target_commitish": "main", "name": "v1.0.0", "body": "",
                "draft": false, "prerelease": false,
                "url": "https://api.github.com/repos/acme/widgets/releases/7",
                "html_url": "https://github.com/acme/widgets/releases/tag/v1.0.0",
                "upload_url": "https://uploads.github.com/repos/acme/widgets/releases/7/assets{?name,label}",
                "assets_url": "https://api.github.com/repos/acme/widgets/releases/7/assets",
                "tarball_url": null, "zipball_url": null,
                "created_at": "2024-01-01T00:00:00Z", "published_at": "2024-01-01T00:00:00Z"
            }),
        ),
    ];
    for (route, body) in routes {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;
    }

    let provider = provider_for(&server).await;
    let cases = [
        (
            "github_repository_collaborator",
            "widgets:octocat",
            json!({"repository": "widgets", "username": "octocat"}),
        ),
        (
            "github_repository_environment",
            "widgets:production",
            json!({"repository": "widgets", "environment": "production"}),
        ),
        (
            "github_membership",
            "acme:octocat",
            json!({"username": "octocat"}),
        ),
        (
            "github_release",
            "widgets:7",
            json!({
                "repository": "widgets", "tag_name": "v1.0.0", "name": "v1.0.0",
                "draft": false, "prerelease": false
            }),
        ),
    ];
    for (type_name, id, config) in cases {
        let state = import(&provider, type_name, id).await;
        let response = plan(&provider, type_name, state, config);
        assert_eq!(response.action, PlanAction::NoOp, "{type_name}: {:?}", response.message);
    }
}
