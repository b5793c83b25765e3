use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    addr::{RepoChildAddr, ResourceAddress},
    diag::Diagnostics,
    error::NotFoundExt,
    github_ext::environments::{
        EnvironmentExt, EnvironmentRequest, EnvironmentReviewer, GitHubDeploymentBranchPolicySetting,
        GitHubEnvironment,
    },
    resource::{ProviderData, Resource},
    resources::{normalize_opt_set, not_found, observed_bool, observed_set},
    schema::{Attribute, Kind, Schema, Validator},
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentModel {
    pub repository: String,
    pub environment: String,
    pub wait_timer: Option<i64>,
    pub can_admins_bypass: Option<bool>,
    pub prevent_self_review: Option<bool>,
    pub reviewer_users: Option<Vec<i64>>,
    pub reviewer_teams: Option<Vec<i64>>,
    pub protected_branches: Option<bool>,
    pub custom_branch_policies: Option<bool>,
}

impl EnvironmentModel {
    fn branch_policy(&self) -> Option<GitHubDeploymentBranchPolicySetting> {
        if self.protected_branches.is_none() && self.custom_branch_policies.is_none() {
            return None;
        }
        Some(GitHubDeploymentBranchPolicySetting {
            protected_branches: self.protected_branches.unwrap_or(false),
            custom_branch_policies: self.custom_branch_policies.unwrap_or(false),
        })
    }

    fn to_request(&self) -> EnvironmentRequest {
        let users = self.reviewer_users.iter().flatten().map(|&id| EnvironmentReviewer {
            reviewer_type: "User",
            id,
        });
        let teams = self.reviewer_teams.iter().flatten().map(|&id| EnvironmentReviewer {
            reviewer_type: "Team",
            id,
        });
        EnvironmentRequest {
            wait_timer: self.wait_timer,
            prevent_self_review: self.prevent_self_review,
            reviewers: users.chain(teams).collect(),
            can_admins_bypass: self.can_admins_bypass,
            deployment_branch_policy: self.branch_policy(),
        }
    }

    fn apply_remote(mut self, env: GitHubEnvironment) -> Self {
        self.environment = env.name.clone();
        self.wait_timer = match (self.wait_timer, env.wait_timer()) {
            (None, Some(0) | None) => None,
            (_, remote) => Some(remote.unwrap_or(0)),
        };
        if let Some(bypass) = env.can_admins_bypass {
            self.can_admins_bypass = Some(bypass);
        }
        self.prevent_self_review = observed_bool(self.prevent_self_review, env.prevent_self_review().unwrap_or(false));
        self.reviewer_users = observed_set(&self.reviewer_users, env.reviewer_ids("User"));
        self.reviewer_teams = observed_set(&self.reviewer_teams, env.reviewer_ids("Team"));

        match env.deployment_branch_policy {
            Some(policy) => {
                self.protected_branches = Some(policy.protected_branches);
                self.custom_branch_policies = Some(policy.custom_branch_policies);
            }
            None if self.branch_policy().is_some() => {
                self.protected_branches = Some(false);
                self.custom_branch_policies = Some(false);
            }
            None => {}
        }
        self
    }
}

pub struct EnvironmentResource;

impl EnvironmentResource {
    async fn put(&self, data: &ProviderData, plan: EnvironmentModel) -> anyhow::Result<EnvironmentModel> {
        let env = data
            .client
            .put_environment(&data.owner, &plan.repository, &plan.environment, &plan.to_request())
            .await
            .with_context(|| {
                format!(
                    "Failed to write environment {} of {}/{}",
                    plan.environment, data.owner, plan.repository
                )
            })?;
        tracing::info!("Wrote environment {} of {}/{}", env.name, data.owner, plan.repository);
        Ok(plan.apply_remote(env))
    }
}

#[async_trait]
impl Resource for EnvironmentResource {
    type Model = EnvironmentModel;

    const TYPE_NAME: &'static str = "github_repository_environment";

    fn schema(&self) -> Schema {
        Schema::new("A deployment environment of a repository.")
            .attr("repository", Attribute::required_string().requires_replace())
            .attr("environment", Attribute::required_string().requires_replace())
            .attr(
                "wait_timer",
                Attribute::optional(Kind::Int)
                    .validate(Validator::IntBetween(0, 43200))
                    .describe("Minutes to wait before a deployment proceeds."),
            )
            .attr("can_admins_bypass", Attribute::optional_bool().default(true))
            .attr("prevent_self_review", Attribute::optional_bool())
            .attr("reviewer_users", Attribute::optional(Kind::set_of(Kind::Int)))
            .attr("reviewer_teams", Attribute::optional(Kind::set_of(Kind::Int)))
            .attr("protected_branches", Attribute::optional_bool())
            .attr("custom_branch_policies", Attribute::optional_bool())
    }

    fn validate(&self, model: &EnvironmentModel, diags: &mut Diagnostics) {
        if let Some(policy) = model.branch_policy() {
            if policy.protected_branches == policy.custom_branch_policies {
                diags.attribute_error(
                    "protected_branches",
                    "Invalid attribute combination",
                    "Exactly one of protected_branches and custom_branch_policies must be true",
                );
            }
        }
        let reviewers = model.reviewer_users.iter().chain(model.reviewer_teams.iter()).flatten().count();
        if reviewers > 6 {
            diags.attribute_error(
                "reviewer_users",
                "Too many reviewers",
                format!("An environment can have at most 6 required reviewers, got {reviewers}"),
            );
        }
    }

    fn modify_plan(&self, _prior: Option<&EnvironmentModel>, planned: &mut EnvironmentModel) {
        normalize_opt_set(&mut planned.reviewer_users);
        normalize_opt_set(&mut planned.reviewer_teams);
    }

    async fn create(&self, data: &ProviderData, plan: EnvironmentModel) -> anyhow::Result<EnvironmentModel> {
        self.put(data, plan).await
    }

    async fn read(&self, data: &ProviderData, state: EnvironmentModel) -> anyhow::Result<Option<EnvironmentModel>> {
        let env = data
            .client
            .get_environment(&data.owner, &state.repository, &state.environment)
            .await
            .or_not_found()
            .with_context(|| {
                format!(
                    "Failed to read environment {} of {}/{}",
                    state.environment, data.owner, state.repository
                )
            })?;
        Ok(env.map(|env| state.apply_remote(env)))
    }

    async fn update(
        &self,
        data: &ProviderData,
        _prior: EnvironmentModel,
        plan: EnvironmentModel,
    ) -> anyhow::Result<EnvironmentModel> {
        self.put(data, plan).await
    }

    async fn delete(&self, data: &ProviderData, state: EnvironmentModel) -> anyhow::Result<()> {
        data.client
            .delete_environment(&data.owner, &state.repository, &state.environment)
            .await
            .with_context(|| {
                format!(
                    "Failed to delete environment {} of {}/{}",
                    state.environment, data.owner, state.repository
                )
            })?;
        Ok(())
    }

    async fn import(&self, data: &ProviderData, id: &str) -> anyhow::Result<EnvironmentModel> {
        let addr = RepoChildAddr::from_id(id)?;
        let state = EnvironmentModel {
            repository: addr.repo,
            environment: addr.child,
            can_admins_bypass: Some(true),
            ..Default::default()
        };
        self.read(data, state).await?.ok_or_else(|| not_found(Self::TYPE_NAME, id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fixture() -> GitHubEnvironment {
        serde_json::from_value(json!({
            "id": 161088068,
            "node_id": "MDExOkVudmlyb25tZW50MTYxMDg4MDY4",
            "name": "staging",
            "can_admins_bypass": true,
            "protection_rules": [
                {"id": 3736, "type": "wait_timer", "wait_timer": 30},
                {"id": 3755, "type": "required_reviewers", "prevent_self_review": false, "reviewers": [
                    {"type": "User", "reviewer": {"id": 1, "login": "octocat"}},
                    {"type": "Team", "reviewer": {"id": 9, "slug": "justice-league"}}
                ]},
                {"id": 3756, "type": "branch_policy"}
            ],
            "deployment_branch_policy": {"protected_branches": false, "custom_branch_policies": true}
        }))
        .unwrap()
    }

    #[test]
    fn request_splits_reviewers_by_type() {
        let model = EnvironmentModel {
            reviewer_users: Some(vec![1, 2]),
            reviewer_teams: Some(vec![9]),
            ..Default::default()
        };
        let body = serde_json::to_value(model.to_request()).unwrap();
        assert_eq!(
            body["reviewers"],
            json!([{"type": "User", "id": 1}, {"type": "User", "id": 2}, {"type": "Team", "id": 9}])
        );
        assert_eq!(body["deployment_branch_policy"], serde_json::Value::Null);
    }

    #[test]
    fn maps_protection_rules() {
        let state = EnvironmentModel::default().apply_remote(fixture());
        assert_eq!(state.wait_timer, Some(30));
        assert_eq!(state.reviewer_users, Some(vec![1]));
        assert_eq!(state.reviewer_teams, Some(vec![9]));
        assert_eq!(state.prevent_self_review, None);
        assert_eq!(state.custom_branch_policies, Some(true));
    }

    #[test]
    fn branch_policy_flags_must_differ() {
        let mut diags = Diagnostics::new();
        let model = EnvironmentModel {
            protected_branches: Some(true),
            custom_branch_policies: Some(true),
            ..Default::default()
        };
        EnvironmentResource.validate(&model, &mut diags);
        assert!(diags.has_error());

        let mut diags = Diagnostics::new();
        let model = EnvironmentModel {
            protected_branches: Some(true),
            ..Default::default()
        };
        EnvironmentResource.validate(&model, &mut diags);
        assert!(!diags.has_error());
    }
}
