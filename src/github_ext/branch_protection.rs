use anyhow::bail;
use async_trait::async_trait;
use octocrab::{Octocrab, Result};
use serde::{Deserialize, Serialize};

use super::{RestExt, enc};

// GitHub API response structures for branch protection
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GitHubBranchProtection {
    pub required_status_checks: Option<GitHubRequiredStatusChecks>,
    pub enforce_admins: Option<GitHubBooleanSetting>,
    pub required_pull_request_reviews: Option<GitHubPullRequestReviewEnforcement>,
    pub restrictions: Option<GitHubBranchRestrictions>,
    pub required_linear_history: Option<GitHubBooleanSetting>,
    pub allow_force_pushes: Option<GitHubBooleanSetting>,
    pub allow_deletions: Option<GitHubBooleanSetting>,
    pub block_creations: Option<GitHubBooleanSetting>,
    pub required_conversation_resolution: Option<GitHubBooleanSetting>,
    pub lock_branch: Option<GitHubBooleanSetting>,
    pub allow_fork_syncing: Option<GitHubBooleanSetting>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GitHubRequiredStatusChecks {
    pub strict: bool,
    #[serde(default)]
    pub contexts: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GitHubPullRequestReviewEnforcement {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_approving_review_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dismiss_stale_reviews: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub require_code_owner_reviews: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub require_last_push_approval: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GitHubBranchRestrictions {
    #[serde(default)]
    pub users: Vec<GitHubLogin>,
    #[serde(default)]
    pub teams: Vec<GitHubSlug>,
    #[serde(default)]
    pub apps: Vec<GitHubSlug>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubLogin {
    pub login: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubSlug {
    pub slug: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GitHubBooleanSetting {
    pub enabled: bool,
}

/// The PUT body. The four nullable sections must always be present.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UpdateBranchProtectionRequest {
    pub required_status_checks: Option<GitHubRequiredStatusChecks>,
    pub enforce_admins: bool,
    pub required_pull_request_reviews: Option<GitHubPullRequestReviewEnforcement>,
    pub restrictions: Option<RestrictionsRequest>,
    pub required_linear_history: bool,
    pub allow_force_pushes: bool,
    pub allow_deletions: bool,
    pub block_creations: bool,
    pub required_conversation_resolution: bool,
    pub lock_branch: bool,
    pub allow_fork_syncing: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RestrictionsRequest {
    pub users: Vec<String>,
    pub teams: Vec<String>,
    pub apps: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchProtectionRule {
    pub pattern: String,
}

const BRANCH_PROTECTION_RULES_QUERY: &str = r#"
query($owner: String!, $name: String!, $cursor: String) {
  repository(owner: $owner, name: $name) {
    branchProtectionRules(first: 100, after: $cursor) {
      nodes { pattern }
      pageInfo { hasNextPage endCursor }
    }
  }
}
"#;

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct RulesData {
    repository: Option<RulesRepository>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RulesRepository {
    branch_protection_rules: RulesConnection,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RulesConnection {
    nodes: Vec<BranchProtectionRule>,
    page_info: PageInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    has_next_page: bool,
    end_cursor: Option<String>,
}

#[async_trait]
pub trait BranchProtectionExt {
    async fn get_branch_protection(&self, owner: &str, repo: &str, branch: &str) -> Result<GitHubBranchProtection>;
    async fn update_branch_protection(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
        protection_data: &UpdateBranchProtectionRequest,
    ) -> Result<GitHubBranchProtection>;
    async fn delete_branch_protection(&self, owner: &str, repo: &str, branch: &str) -> Result<()>;
    async fn list_branch_protection_rules(&self, owner: &str, repo: &str) -> anyhow::Result<Vec<BranchProtectionRule>>;
}

#[async_trait]
impl BranchProtectionExt for Octocrab {
    async fn get_branch_protection(&self, owner: &str, repo: &str, branch: &str) -> Result<GitHubBranchProtection> {
        let route = format!("/repos/{}/{}/branches/{}/protection", owner, repo, enc(branch));
        self.get(route, None::<&()>).await
    }

    async fn update_branch_protection(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
        protection_data: &UpdateBranchProtectionRequest,
    ) -> Result<GitHubBranchProtection> {
        let route = format!("/repos/{}/{}/branches/{}/protection", owner, repo, enc(branch));
        self.put(route, Some(protection_data)).await
    }

    async fn delete_branch_protection(&self, owner: &str, repo: &str, branch: &str) -> Result<()> {
        let route = format!("/repos/{}/{}/branches/{}/protection", owner, repo, enc(branch));
        self.delete_no_content(route).await
    }

    async fn list_branch_protection_rules(&self, owner: &str, repo: &str) -> anyhow::Result<Vec<BranchProtectionRule>> {
        let mut rules = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let response: GraphQlResponse<RulesData> = self
                .graphql(&serde_json::json!({
                    "query": BRANCH_PROTECTION_RULES_QUERY,
                    "variables": { "owner": owner, "name": repo, "cursor": cursor },
                }))
                .await?;

            if let Some(error) = response.errors.first() {
                bail!("GraphQL query for branch protection rules on {}/{} failed: {}", owner, repo, error.message);
            }

            let Some(repository) = response.data.and_then(|d| d.repository) else {
                bail!("Repository {}/{} not found", owner, repo);
            };

            let connection = repository.branch_protection_rules;
            rules.extend(connection.nodes);

            match connection.page_info {
                PageInfo {
                    has_next_page: true,
                    end_cursor: Some(next),
                } => cursor = Some(next),
                _ => break,
            }
        }

        Ok(rules)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_protection_response() {
        let protection: GitHubBranchProtection = serde_json::from_str(
            r#"{
                "url": "https://api.github.com/repos/o/r/branches/main/protection",
                "required_status_checks": {"strict": true, "contexts": ["ci/test"], "checks": []},
                "enforce_admins": {"enabled": true, "url": "x"},
                "required_pull_request_reviews": {"dismiss_stale_reviews": true, "required_approving_review_count": 2},
                "restrictions": {"users": [{"login": "octocat"}], "teams": [{"slug": "core", "name": "Core"}], "apps": []},
                "allow_force_pushes": {"enabled": false}
            }"#,
        )
        .unwrap();

        assert!(protection.enforce_admins.unwrap().enabled);
        let reviews = protection.required_pull_request_reviews.unwrap();
        assert_eq!(reviews.required_approving_review_count, Some(2));
        assert_eq!(reviews.require_code_owner_reviews, None);
        assert_eq!(protection.restrictions.unwrap().teams[0].slug, "core");
        assert!(protection.lock_branch.is_none());
    }

    #[test]
    fn request_keeps_nullable_sections() {
        let body = serde_json::to_value(UpdateBranchProtectionRequest::default()).unwrap();
        assert!(body.get("required_status_checks").unwrap().is_null());
        assert!(body.get("restrictions").unwrap().is_null());
        assert_eq!(body["enforce_admins"], false);
    }

    #[test]
    fn decodes_rules_page() {
        let response: GraphQlResponse<RulesData> = serde_json::from_str(
            r#"{"data":{"repository":{"branchProtectionRules":{
                "nodes":[{"pattern":"main"},{"pattern":"release/*"}],
                "pageInfo":{"hasNextPage":false,"endCursor":null}}}}}"#,
        )
        .unwrap();
        let connection = response.data.unwrap().repository.unwrap().branch_protection_rules;
        assert_eq!(connection.nodes.len(), 2);
        assert!(!connection.page_info.has_next_page);
    }
}
