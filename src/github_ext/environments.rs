use async_trait::async_trait;
use octocrab::{Octocrab, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Conditional, RestExt, enc};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GitHubDeploymentBranchPolicySetting {
    pub protected_branches: bool,
    pub custom_branch_policies: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GitHubEnvironment {
    pub id: u64,
    pub node_id: String,
    pub name: String,
    #[serde(default)]
    pub can_admins_bypass: Option<bool>,
    /// Heterogeneous list tagged by `type`, kept raw and picked apart by the accessors below.
    #[serde(default)]
    pub protection_rules: Vec<Value>,
    #[serde(default)]
    pub deployment_branch_policy: Option<GitHubDeploymentBranchPolicySetting>,
}

impl GitHubEnvironment {
    fn rule(&self, kind: &str) -> Option<&Value> {
        self.protection_rules
            .iter()
            .find(|r| r.get("type").and_then(Value::as_str) == Some(kind))
    }

    pub fn wait_timer(&self) -> Option<i64> {
        self.rule("wait_timer").and_then(|r| r.get("wait_timer")).and_then(Value::as_i64)
    }

    pub fn prevent_self_review(&self) -> Option<bool> {
        self.rule("required_reviewers")
            .and_then(|r| r.get("prevent_self_review"))
            .and_then(Value::as_bool)
    }

    /// Reviewer ids of the given type (`User` or `Team`).
    pub fn reviewer_ids(&self, reviewer_type: &str) -> Vec<i64> {
        let Some(reviewers) = self
            .rule("required_reviewers")
            .and_then(|r| r.get("reviewers"))
            .and_then(Value::as_array)
        else {
            return Vec::new();
        };
        reviewers
            .iter()
            .filter(|r| r.get("type").and_then(Value::as_str) == Some(reviewer_type))
            .filter_map(|r| r.get("reviewer").and_then(|r| r.get("id")).and_then(Value::as_i64))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnvironmentReviewer {
    #[serde(rename = "type")]
    pub reviewer_type: &'static str,
    pub id: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EnvironmentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wait_timer: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prevent_self_review: Option<bool>,
    pub reviewers: Vec<EnvironmentReviewer>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub can_admins_bypass: Option<bool>,
    /// Sent as null to allow deployments from any branch.
    pub deployment_branch_policy: Option<GitHubDeploymentBranchPolicySetting>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GitHubDeploymentBranchPolicy {
    pub id: u64,
    #[serde(default)]
    pub node_id: Option<String>,
    pub name: String,
    #[serde(default, rename = "type")]
    pub policy_type: Option<String>,
}

#[derive(Debug, Serialize)]
struct BranchPolicyRequest<'a> {
    name: &'a str,
}

fn environment_route(owner: &str, repo: &str, environment: &str) -> String {
    format!("/repos/{}/{}/environments/{}", owner, repo, enc(environment))
}

#[async_trait]
pub trait EnvironmentExt {
    async fn put_environment(
        &self,
        owner: &str,
        repo: &str,
        environment: &str,
        request: &EnvironmentRequest,
    ) -> Result<GitHubEnvironment>;
    async fn get_environment(&self, owner: &str, repo: &str, environment: &str) -> Result<GitHubEnvironment>;
    async fn delete_environment(&self, owner: &str, repo: &str, environment: &str) -> Result<()>;
    async fn list_environments(&self, owner: &str, repo: &str) -> anyhow::Result<Vec<GitHubEnvironment>>;

    async fn create_branch_policy(
        &self,
        owner: &str,
        repo: &str,
        environment: &str,
        name: &str,
    ) -> Result<GitHubDeploymentBranchPolicy>;
    async fn get_branch_policy(
        &self,
        owner: &str,
        repo: &str,
        environment: &str,
        id: u64,
        etag: Option<&str>,
    ) -> anyhow::Result<Conditional<GitHubDeploymentBranchPolicy>>;
    async fn update_branch_policy(
        &self,
        owner: &str,
        repo: &str,
        environment: &str,
        id: u64,
        name: &str,
    ) -> Result<GitHubDeploymentBranchPolicy>;
    async fn delete_branch_policy(&self, owner: &str, repo: &str, environment: &str, id: u64) -> Result<()>;
    async fn list_branch_policies(
        &self,
        owner: &str,
        repo: &str,
        environment: &str,
    ) -> anyhow::Result<Vec<GitHubDeploymentBranchPolicy>>;
}

#[async_trait]
impl EnvironmentExt for Octocrab {
    async fn put_environment(
        &self,
        owner: &str,
        repo: &str,
        environment: &str,
        request: &EnvironmentRequest,
    ) -> Result<GitHubEnvironment> {
        self.put(environment_route(owner, repo, environment), Some(request)).await
    }

    async fn get_environment(&self, owner: &str, repo: &str, environment: &str) -> Result<GitHubEnvironment> {
        self.get(environment_route(owner, repo, environment), None::<&()>).await
    }

    async fn delete_environment(&self, owner: &str, repo: &str, environment: &str) -> Result<()> {
        self.delete_no_content(environment_route(owner, repo, environment)).await
    }

    async fn list_environments(&self, owner: &str, repo: &str) -> anyhow::Result<Vec<GitHubEnvironment>> {
        let route = format!("/repos/{}/{}/environments", owner, repo);
        self.list_all_wrapped(route, "environments").await
    }

    async fn create_branch_policy(
        &self,
        owner: &str,
        repo: &str,
        environment: &str,
        name: &str,
    ) -> Result<GitHubDeploymentBranchPolicy> {
        let route = format!("{}/deployment-branch-policies", environment_route(owner, repo, environment));
        self.post(route, Some(&BranchPolicyRequest { name })).await
    }

    async fn get_branch_policy(
        &self,
        owner: &str,
        repo: &str,
        environment: &str,
        id: u64,
        etag: Option<&str>,
    ) -> anyhow::Result<Conditional<GitHubDeploymentBranchPolicy>> {
        let route = format!("{}/deployment-branch-policies/{}", environment_route(owner, repo, environment), id);
        self.get_conditional(route, etag).await
    }

    async fn update_branch_policy(
        &self,
        owner: &str,
        repo: &str,
        environment: &str,
        id: u64,
        name: &str,
    ) -> Result<GitHubDeploymentBranchPolicy> {
        let route = format!("{}/deployment-branch-policies/{}", environment_route(owner, repo, environment), id);
        self.put(route, Some(&BranchPolicyRequest { name })).await
    }

    async fn delete_branch_policy(&self, owner: &str, repo: &str, environment: &str, id: u64) -> Result<()> {
        let route = format!("{}/deployment-branch-policies/{}", environment_route(owner, repo, environment), id);
        self.delete_no_content(route).await
    }

    async fn list_branch_policies(
        &self,
        owner: &str,
        repo: &str,
        environment: &str,
    ) -> anyhow::Result<Vec<GitHubDeploymentBranchPolicy>> {
        let route = format!("{}/deployment-branch-policies", environment_route(owner, repo, environment));
        self.list_all_wrapped(route, "branch_policies").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protection_rules_are_picked_apart() {
        let env: GitHubEnvironment = serde_json::from_str(
            r#"{
                "id": 161088068, "node_id": "MDExOkVudmlyb25tZW50", "name": "staging",
                "can_admins_bypass": true,
                "protection_rules": [
                    {"id": 3736, "type": "wait_timer", "wait_timer": 30},
                    {"id": 3755, "type": "required_reviewers", "prevent_self_review": false,
                     "reviewers": [
                        {"type": "User", "reviewer": {"login": "octocat", "id": 1}},
                        {"type": "Team", "reviewer": {"slug": "justice-league", "id": 1}}
                     ]},
                    {"id": 3756, "type": "branch_policy"}
                ],
                "deployment_branch_policy": {"protected_branches": false, "custom_branch_policies": true}
            }"#,
        )
        .unwrap();

        assert_eq!(env.wait_timer(), Some(30));
        assert_eq!(env.prevent_self_review(), Some(false));
        assert_eq!(env.reviewer_ids("User"), vec![1]);
        assert_eq!(env.reviewer_ids("Team"), vec![1]);
        assert!(env.deployment_branch_policy.unwrap().custom_branch_policies);
    }

    #[test]
    fn request_sends_null_branch_policy() {
        let body = serde_json::to_value(EnvironmentRequest {
            reviewers: vec![EnvironmentReviewer {
                reviewer_type: "Team",
                id: 7,
            }],
            ..Default::default()
        })
        .unwrap();
        assert!(body["deployment_branch_policy"].is_null());
        assert_eq!(body["reviewers"][0]["type"], "Team");
        assert!(body.get("wait_timer").is_none());
    }
}
