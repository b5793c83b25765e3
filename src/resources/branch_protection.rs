use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    addr::RepoChildAddr,
    error::NotFoundExt,
    github_ext::branch_protection::{
        BranchProtectionExt, GitHubBooleanSetting, GitHubBranchProtection, GitHubPullRequestReviewEnforcement,
        GitHubRequiredStatusChecks, RestrictionsRequest, UpdateBranchProtectionRequest,
    },
    resource::{ProviderData, Resource},
    resources::{normalize_opt_set, not_found, observed_bool, observed_set},
    schema::{Attribute, Kind, Schema, Validator},
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BranchProtectionModel {
    pub repository: String,
    pub branch: String,
    pub enforce_admins: Option<bool>,
    pub required_status_checks_strict: Option<bool>,
    pub required_status_checks_contexts: Option<Vec<String>>,
    pub required_approving_review_count: Option<u32>,
    pub dismiss_stale_reviews: Option<bool>,
    pub require_code_owner_reviews: Option<bool>,
    pub require_last_push_approval: Option<bool>,
    pub required_linear_history: Option<bool>,
    pub allow_force_pushes: Option<bool>,
    pub allow_deletions: Option<bool>,
    pub block_creations: Option<bool>,
    pub required_conversation_resolution: Option<bool>,
    pub lock_branch: Option<bool>,
    pub allow_fork_syncing: Option<bool>,
    pub restrict_pushes_users: Option<Vec<String>>,
    pub restrict_pushes_teams: Option<Vec<String>>,
    pub restrict_pushes_apps: Option<Vec<String>>,
}

fn enabled(setting: &Option<GitHubBooleanSetting>) -> bool {
    setting.as_ref().is_some_and(|s| s.enabled)
}

impl BranchProtectionModel {
    fn to_request(&self) -> UpdateBranchProtectionRequest {
        let required_status_checks = (self.required_status_checks_strict.is_some()
            || self.required_status_checks_contexts.is_some())
        .then(|| GitHubRequiredStatusChecks {
            strict: self.required_status_checks_strict.unwrap_or(false),
            contexts: self.required_status_checks_contexts.clone().unwrap_or_default(),
        });

        let reviews = GitHubPullRequestReviewEnforcement {
            required_approving_review_count: self.required_approving_review_count,
            dismiss_stale_reviews: self.dismiss_stale_reviews,
            require_code_owner_reviews: self.require_code_owner_reviews,
            require_last_push_approval: self.require_last_push_approval,
        };
        let required_pull_request_reviews = (reviews != GitHubPullRequestReviewEnforcement::default()).then_some(reviews);

        let restrictions = (self.restrict_pushes_users.is_some()
            || self.restrict_pushes_teams.is_some()
            || self.restrict_pushes_apps.is_some())
        .then(|| RestrictionsRequest {
            users: self.restrict_pushes_users.clone().unwrap_or_default(),
            teams: self.restrict_pushes_teams.clone().unwrap_or_default(),
            apps: self.restrict_pushes_apps.clone().unwrap_or_default(),
        });

        UpdateBranchProtectionRequest {
            required_status_checks,
            enforce_admins: self.enforce_admins.unwrap_or(false),
            required_pull_request_reviews,
            restrictions,
            required_linear_history: self.required_linear_history.unwrap_or(false),
            allow_force_pushes: self.allow_force_pushes.unwrap_or(false),
            allow_deletions: self.allow_deletions.unwrap_or(false),
            block_creations: self.block_creations.unwrap_or(false),
            required_conversation_resolution: self.required_conversation_resolution.unwrap_or(false),
            lock_branch: self.lock_branch.unwrap_or(false),
            allow_fork_syncing: self.allow_fork_syncing.unwrap_or(false),
        }
    }

    fn apply_remote(mut self, remote: GitHubBranchProtection) -> Self {
        self.enforce_admins = Some(enabled(&remote.enforce_admins));

        match remote.required_status_checks {
            Some(checks) => {
                self.required_status_checks_strict = observed_bool(self.required_status_checks_strict, checks.strict);
                let configured = self.required_status_checks_contexts.is_some();
                self.required_status_checks_contexts =
                    (configured || !checks.contexts.is_empty()).then_some(checks.contexts);
            }
            None => {
                self.required_status_checks_strict = observed_bool(self.required_status_checks_strict, false);
                self.required_status_checks_contexts = self.required_status_checks_contexts.as_ref().map(|_| Vec::new());
            }
        }

        let reviews = remote.required_pull_request_reviews.unwrap_or_default();
        let count = reviews.required_approving_review_count.unwrap_or(0);
        self.required_approving_review_count =
            (count != 0 || self.required_approving_review_count.is_some()).then_some(count);
        self.dismiss_stale_reviews = observed_bool(self.dismiss_stale_reviews, reviews.dismiss_stale_reviews.unwrap_or(false));
        self.require_code_owner_reviews = observed_bool(
            self.require_code_owner_reviews,
            reviews.require_code_owner_reviews.unwrap_or(false),
        );
        self.require_last_push_approval = observed_bool(
            self.require_last_push_approval,
            reviews.require_last_push_approval.unwrap_or(false),
        );

        self.required_linear_history = observed_bool(self.required_linear_history, enabled(&remote.required_linear_history));
        self.allow_force_pushes = observed_bool(self.allow_force_pushes, enabled(&remote.allow_force_pushes));
        self.allow_deletions = observed_bool(self.allow_deletions, enabled(&remote.allow_deletions));
        self.block_creations = observed_bool(self.block_creations, enabled(&remote.block_creations));
        self.required_conversation_resolution = observed_bool(
            self.required_conversation_resolution,
            enabled(&remote.required_conversation_resolution),
        );
        self.lock_branch = observed_bool(self.lock_branch, enabled(&remote.lock_branch));
        self.allow_fork_syncing = observed_bool(self.allow_fork_syncing, enabled(&remote.allow_fork_syncing));

        let restrictions = remote.restrictions.unwrap_or_default();
        self.restrict_pushes_users = observed_set(
            &self.restrict_pushes_users,
            restrictions.users.into_iter().map(|u| u.login).collect(),
        );
        self.restrict_pushes_teams = observed_set(
            &self.restrict_pushes_teams,
            restrictions.teams.into_iter().map(|t| t.slug).collect(),
        );
        self.restrict_pushes_apps = observed_set(
            &self.restrict_pushes_apps,
            restrictions.apps.into_iter().map(|a| a.slug).collect(),
        );
        self
    }
}

pub struct BranchProtectionResource;

impl BranchProtectionResource {
    async fn put(&self, data: &ProviderData, plan: BranchProtectionModel) -> anyhow::Result<BranchProtectionModel> {
        let owner = &data.owner;
        let remote = data
            .client
            .update_branch_protection(owner, &plan.repository, &plan.branch, &plan.to_request())
            .await
            .with_context(|| format!("Failed to protect branch {} on {owner}/{}", plan.branch, plan.repository))?;
        tracing::info!("Set branch protection on {owner}/{}:{}", plan.repository, plan.branch);
        Ok(plan.apply_remote(remote))
    }
}

#[async_trait]
impl Resource for BranchProtectionResource {
    type Model = BranchProtectionModel;

    const TYPE_NAME: &'static str = "github_branch_protection";

    fn schema(&self) -> Schema {
        let users_teams_apps = Kind::set_of(Kind::String);

        Schema::new("Classic branch protection for a single branch.")
            .attr("repository", Attribute::required_string().requires_replace())
            .attr("branch", Attribute::required_string().requires_replace())
            .attr("enforce_admins", Attribute::optional_bool().default(false))
            .attr("required_status_checks_strict", Attribute::optional_bool())
            .attr(
                "required_status_checks_contexts",
                Attribute::optional(Kind::list_of(Kind::String)),
            )
            .attr(
                "required_approving_review_count",
                Attribute::optional(Kind::Int).validate(Validator::IntBetween(0, 6)),
            )
            .attr("dismiss_stale_reviews", Attribute::optional_bool())
            .attr("require_code_owner_reviews", Attribute::optional_bool())
            .attr("require_last_push_approval", Attribute::optional_bool())
            .attr("required_linear_history", Attribute::optional_bool())
            .attr("allow_force_pushes", Attribute::optional_bool())
            .attr("allow_deletions", Attribute::optional_bool())
            .attr("block_creations", Attribute::optional_bool())
            .attr("required_conversation_resolution", Attribute::optional_bool())
            .attr("lock_branch", Attribute::optional_bool())
            .attr("allow_fork_syncing", Attribute::optional_bool())
            .attr("restrict_pushes_users", Attribute::optional(users_teams_apps.clone()))
            .attr("restrict_pushes_teams", Attribute::optional(users_teams_apps.clone()))
            .attr("restrict_pushes_apps", Attribute::optional(users_teams_apps))
    }

    fn modify_plan(&self, _prior: Option<&BranchProtectionModel>, planned: &mut BranchProtectionModel) {
        normalize_opt_set(&mut planned.restrict_pushes_users);
        normalize_opt_set(&mut planned.restrict_pushes_teams);
        normalize_opt_set(&mut planned.restrict_pushes_apps);
    }

    async fn create(&self, data: &ProviderData, plan: BranchProtectionModel) -> anyhow::Result<BranchProtectionModel> {
        self.put(data, plan).await
    }

    async fn read(
        &self,
        data: &ProviderData,
        state: BranchProtectionModel,
    ) -> anyhow::Result<Option<BranchProtectionModel>> {
        let remote = data
            .client
            .get_branch_protection(&data.owner, &state.repository, &state.branch)
            .await
            .or_not_found()
            .with_context(|| {
                format!(
                    "Failed to read branch protection on {}/{}:{}",
                    data.owner, state.repository, state.branch
                )
            })?;
        Ok(remote.map(|remote| state.apply_remote(remote)))
    }

    async fn update(
        &self,
        data: &ProviderData,
        _prior: BranchProtectionModel,
        plan: BranchProtectionModel,
    ) -> anyhow::Result<BranchProtectionModel> {
        self.put(data, plan).await
    }

    async fn delete(&self, data: &ProviderData, state: BranchProtectionModel) -> anyhow::Result<()> {
        data.client
            .delete_branch_protection(&data.owner, &state.repository, &state.branch)
            .await
            .with_context(|| {
                format!(
                    "Failed to remove branch protection on {}/{}:{}",
                    data.owner, state.repository, state.branch
                )
            })?;
        Ok(())
    }

    async fn import(&self, data: &ProviderData, id: &str) -> anyhow::Result<BranchProtectionModel> {
        let addr = RepoChildAddr::from_id_lenient(id)?;
        let state = BranchProtectionModel {
            repository: addr.repo,
            branch: addr.child,
            ..Default::default()
        };
        self.read(data, state).await?.ok_or_else(|| not_found(Self::TYPE_NAME, id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_sections_stay_null_in_request() {
        let model = BranchProtectionModel {
            repository: "r".into(),
            branch: "main".into(),
            enforce_admins: Some(true),
            ..Default::default()
        };
        let body = serde_json::to_value(model.to_request()).unwrap();
        assert!(body["required_status_checks"].is_null());
        assert!(body["required_pull_request_reviews"].is_null());
        assert!(body["restrictions"].is_null());
        assert_eq!(body["enforce_admins"], true);
    }

    #[test]
    fn review_section_only_sends_set_fields() {
        let model = BranchProtectionModel {
            required_approving_review_count: Some(2),
            restrict_pushes_teams: Some(vec!["core".into()]),
            ..Default::default()
        };
        let body = serde_json::to_value(model.to_request()).unwrap();
        assert_eq!(body["required_pull_request_reviews"]["required_approving_review_count"], 2);
        assert!(body["required_pull_request_reviews"].get("dismiss_stale_reviews").is_none());
        assert_eq!(body["restrictions"]["teams"][0], "core");
        assert_eq!(body["restrictions"]["users"].as_array().unwrap().len(), 0);
    }

    #[test]
    fn unset_attributes_ignore_remote_defaults() {
        let remote: GitHubBranchProtection = serde_json::from_str(
            r#"{
                "enforce_admins": {"enabled": false},
                "required_pull_request_reviews": {"required_approving_review_count": 1, "dismiss_stale_reviews": false},
                "allow_force_pushes": {"enabled": false},
                "required_linear_history": {"enabled": true}
            }"#,
        )
        .unwrap();

        let state = BranchProtectionModel::default().apply_remote(remote);
        assert_eq!(state.enforce_admins, Some(false));
        assert_eq!(state.required_approving_review_count, Some(1));
        assert_eq!(state.dismiss_stale_reviews, None);
        assert_eq!(state.allow_force_pushes, None);
        assert_eq!(state.required_linear_history, Some(true));
        assert_eq!(state.restrict_pushes_users, None);
    }

    #[test]
    fn review_count_tracks_remote_changes() {
        let without_reviews: GitHubBranchProtection =
            serde_json::from_str(r#"{"enforce_admins": {"enabled": true}}"#).unwrap();

        let state = BranchProtectionModel {
            required_approving_review_count: Some(2),
            ..Default::default()
        }
        .apply_remote(without_reviews.clone());
        assert_eq!(state.required_approving_review_count, Some(0));

        let state = BranchProtectionModel::default().apply_remote(without_reviews);
        assert_eq!(state.required_approving_review_count, None);
    }
}
