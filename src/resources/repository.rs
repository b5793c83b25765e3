use anyhow::Context;
use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{
    addr::{RepoAddr, ResourceAddress},
    error::NotFoundExt,
    github_ext::{
        Conditional,
        repos::{CreateRepositoryRequest, GitHubRepository, RepositoryOpsExt, UpdateRepositoryRequest},
    },
    resource::{ProviderData, Resource},
    resources::{normalize_opt_set, not_found},
    schema::{Attribute, Kind, Schema, Validator},
    util::{non_empty, normalize_set},
};

lazy_static! {
    pub(crate) static ref REPO_NAME: Regex = Regex::new(r"^[A-Za-z0-9_.-]{1,100}$").unwrap();
}

pub(crate) const VISIBILITIES: &[&str] = &["public", "private", "internal"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryModel {
    pub name: String,
    pub description: Option<String>,
    pub homepage_url: Option<String>,
    pub visibility: Option<String>,
    pub has_issues: Option<bool>,
    pub has_projects: Option<bool>,
    pub has_wiki: Option<bool>,
    pub has_discussions: Option<bool>,
    pub is_template: Option<bool>,
    pub allow_merge_commit: Option<bool>,
    pub allow_squash_merge: Option<bool>,
    pub allow_rebase_merge: Option<bool>,
    pub allow_auto_merge: Option<bool>,
    pub delete_branch_on_merge: Option<bool>,
    pub auto_init: Option<bool>,
    pub archived: Option<bool>,
    pub archive_on_destroy: Option<bool>,
    pub topics: Option<Vec<String>>,
    pub full_name: Option<String>,
    pub html_url: Option<String>,
    pub ssh_clone_url: Option<String>,
    pub http_clone_url: Option<String>,
    pub git_clone_url: Option<String>,
    pub node_id: Option<String>,
    pub repo_id: Option<u64>,
    pub default_branch: Option<String>,
    pub etag: Option<String>,
}

impl RepositoryModel {
    /// Folds a repository response into state, keeping the config-only fields.
    fn apply_remote(mut self, repo: GitHubRepository, etag: Option<String>) -> Self {
        self.name = repo.name;
        self.description = non_empty(repo.description);
        self.homepage_url = non_empty(repo.homepage);
        self.visibility = repo
            .visibility
            .or_else(|| Some(if repo.private { "private" } else { "public" }.to_string()));
        self.has_issues = repo.has_issues.or(self.has_issues);
        self.has_projects = repo.has_projects.or(self.has_projects);
        self.has_wiki = repo.has_wiki.or(self.has_wiki);
        self.has_discussions = repo.has_discussions.or(self.has_discussions);
        self.is_template = repo.is_template.or(self.is_template);
        self.allow_merge_commit = repo.allow_merge_commit.or(self.allow_merge_commit);
        self.allow_squash_merge = repo.allow_squash_merge.or(self.allow_squash_merge);
        self.allow_rebase_merge = repo.allow_rebase_merge.or(self.allow_rebase_merge);
        self.allow_auto_merge = repo.allow_auto_merge.or(self.allow_auto_merge);
        self.delete_branch_on_merge = repo.delete_branch_on_merge.or(self.delete_branch_on_merge);
        self.archived = Some(repo.archived);

        let mut topics = repo.topics;
        normalize_set(&mut topics);
        self.topics = Some(topics);

        self.full_name = Some(repo.full_name);
        self.html_url = repo.html_url;
        self.ssh_clone_url = repo.ssh_url;
        self.http_clone_url = repo.clone_url;
        self.git_clone_url = repo.git_url;
        self.node_id = Some(repo.node_id);
        self.repo_id = Some(repo.id);
        self.default_branch = repo.default_branch;
        if etag.is_some() {
            self.etag = etag;
        }
        self
    }

    fn update_request(&self) -> UpdateRepositoryRequest {
        UpdateRepositoryRequest {
            description: Some(self.description.clone().unwrap_or_default()),
            homepage: Some(self.homepage_url.clone().unwrap_or_default()),
            has_issues: self.has_issues,
            has_projects: self.has_projects,
            has_wiki: self.has_wiki,
            has_discussions: self.has_discussions,
            is_template: self.is_template,
            allow_merge_commit: self.allow_merge_commit,
            allow_squash_merge: self.allow_squash_merge,
            allow_rebase_merge: self.allow_rebase_merge,
            allow_auto_merge: self.allow_auto_merge,
            delete_branch_on_merge: self.delete_branch_on_merge,
            ..Default::default()
        }
    }
}

pub struct RepositoryResource;

impl RepositoryResource {
    async fn fetch(&self, data: &ProviderData, state: RepositoryModel) -> anyhow::Result<Option<RepositoryModel>> {
        let response = data
            .client
            .get_repository(&data.owner, &state.name, state.etag.as_deref())
            .await
            .or_not_found()
            .with_context(|| format!("Failed to read repository {}/{}", data.owner, state.name))?;

        Ok(match response {
            None => None,
            Some(Conditional::NotModified) => Some(state),
            Some(Conditional::Modified { value, etag }) => Some(state.apply_remote(value, etag)),
        })
    }

    async fn set_archived(&self, data: &ProviderData, name: &str, archived: bool) -> anyhow::Result<()> {
        let request = UpdateRepositoryRequest {
            archived: Some(archived),
            ..Default::default()
        };
        data.client
            .update_repository(&data.owner, name, &request)
            .await
            .with_context(|| format!("Failed to set archived={archived} on repository {}/{}", data.owner, name))?;
        Ok(())
    }
}

#[async_trait]
impl Resource for RepositoryResource {
    type Model = RepositoryModel;

    const TYPE_NAME: &'static str = "github_repository";

    fn schema(&self) -> Schema {
        Schema::new("A GitHub repository owned by the configured user or organization.")
            .attr(
                "name",
                Attribute::required_string()
                    .describe("The name of the repository.")
                    .validate(Validator::Regex(&REPO_NAME, "must be 1-100 letters, digits, '.', '-' or '_'")),
            )
            .attr("description", Attribute::optional_string())
            .attr("homepage_url", Attribute::optional_string())
            .attr(
                "visibility",
                Attribute::optional_string()
                    .also_computed()
                    .validate(Validator::OneOf(VISIBILITIES)),
            )
            .attr("has_issues", Attribute::optional_bool().default(true))
            .attr("has_projects", Attribute::optional_bool().default(false))
            .attr("has_wiki", Attribute::optional_bool().default(false))
            .attr("has_discussions", Attribute::optional_bool().default(false))
            .attr("is_template", Attribute::optional_bool().default(false))
            .attr("allow_merge_commit", Attribute::optional_bool().default(true))
            .attr("allow_squash_merge", Attribute::optional_bool().default(true))
            .attr("allow_rebase_merge", Attribute::optional_bool().default(true))
            .attr("allow_auto_merge", Attribute::optional_bool().default(false))
            .attr("delete_branch_on_merge", Attribute::optional_bool().default(false))
            .attr(
                "auto_init",
                Attribute::optional_bool()
                    .default(false)
                    .requires_replace()
                    .describe("Create an initial commit with an empty README."),
            )
            .attr("archived", Attribute::optional_bool().default(false))
            .attr(
                "archive_on_destroy",
                Attribute::optional_bool()
                    .default(false)
                    .describe("Archive the repository instead of deleting it on destroy."),
            )
            .attr("topics", Attribute::optional(Kind::set_of(Kind::String)).also_computed())
            .attr("full_name", Attribute::computed_string())
            .attr("html_url", Attribute::computed_string())
            .attr("ssh_clone_url", Attribute::computed_string())
            .attr("http_clone_url", Attribute::computed_string())
            .attr("git_clone_url", Attribute::computed_string())
            .attr("node_id", Attribute::computed_string())
            .attr("repo_id", Attribute::computed(Kind::Int))
            .attr("default_branch", Attribute::computed_string())
            .attr("etag", Attribute::computed_string())
    }

    fn modify_plan(&self, _prior: Option<&RepositoryModel>, planned: &mut RepositoryModel) {
        normalize_opt_set(&mut planned.topics);
    }

    async fn create(&self, data: &ProviderData, plan: RepositoryModel) -> anyhow::Result<RepositoryModel> {
        let owner = &data.owner;
        let request = CreateRepositoryRequest {
            name: plan.name.clone(),
            description: plan.description.clone(),
            homepage: plan.homepage_url.clone(),
            visibility: plan.visibility.clone(),
            has_issues: plan.has_issues.unwrap_or(true),
            has_projects: plan.has_projects.unwrap_or(false),
            has_wiki: plan.has_wiki.unwrap_or(false),
            has_discussions: plan.has_discussions.unwrap_or(false),
            is_template: plan.is_template.unwrap_or(false),
            allow_merge_commit: plan.allow_merge_commit.unwrap_or(true),
            allow_squash_merge: plan.allow_squash_merge.unwrap_or(true),
            allow_rebase_merge: plan.allow_rebase_merge.unwrap_or(true),
            allow_auto_merge: plan.allow_auto_merge.unwrap_or(false),
            delete_branch_on_merge: plan.delete_branch_on_merge.unwrap_or(false),
            auto_init: plan.auto_init.unwrap_or(false),
        };

        let org = data.is_organization.then_some(owner.as_str());
        data.client
            .create_repository(org, &request)
            .await
            .with_context(|| format!("Failed to create repository {owner}/{}", plan.name))?;
        tracing::info!("Created repository {owner}/{}", plan.name);

        if let Some(topics) = plan.topics.as_ref().filter(|t| !t.is_empty()) {
            data.client
                .replace_topics(owner, &plan.name, topics)
                .await
                .with_context(|| format!("Failed to set topics on {owner}/{}", plan.name))?;
        }

        if plan.archived == Some(true) {
            self.set_archived(data, &plan.name, true).await?;
        }

        let name = plan.name.clone();
        let created = RepositoryModel { etag: None, ..plan };
        self.fetch(data, created)
            .await?
            .with_context(|| format!("Repository {owner}/{name} vanished right after creation"))
    }

    async fn read(&self, data: &ProviderData, state: RepositoryModel) -> anyhow::Result<Option<RepositoryModel>> {
        self.fetch(data, state).await
    }

    async fn update(
        &self,
        data: &ProviderData,
        prior: RepositoryModel,
        plan: RepositoryModel,
    ) -> anyhow::Result<RepositoryModel> {
        let owner = &data.owner;
        let was_archived = prior.archived == Some(true);
        let archive = plan.archived == Some(true);

        // Archived repositories are read-only, so unarchive before anything else.
        if was_archived && !archive {
            self.set_archived(data, &prior.name, false).await?;
        }

        let mut request = plan.update_request();
        if prior.name != plan.name {
            request.name = Some(plan.name.clone());
        }
        if prior.visibility != plan.visibility {
            request.visibility = plan.visibility.clone();
        }

        if !(was_archived && archive) {
            data.client
                .update_repository(owner, &prior.name, &request)
                .await
                .with_context(|| format!("Failed to update repository {owner}/{}", prior.name))?;
        }

        if prior.topics != plan.topics {
            let topics = plan.topics.clone().unwrap_or_default();
            data.client
                .replace_topics(owner, &plan.name, &topics)
                .await
                .with_context(|| format!("Failed to set topics on {owner}/{}", plan.name))?;
        }

        if archive && !was_archived {
            self.set_archived(data, &plan.name, true).await?;
        }

        tracing::info!("Updated repository {owner}/{}", plan.name);

        let name = plan.name.clone();
        let updated = RepositoryModel { etag: None, ..plan };
        self.fetch(data, updated)
            .await?
            .with_context(|| format!("Repository {owner}/{name} vanished during update"))
    }

    async fn delete(&self, data: &ProviderData, state: RepositoryModel) -> anyhow::Result<()> {
        let owner = &data.owner;

        if state.archive_on_destroy == Some(true) {
            if state.archived != Some(true) {
                self.set_archived(data, &state.name, true).await?;
            }
            tracing::info!("Archived repository {owner}/{} instead of deleting it", state.name);
            return Ok(());
        }

        data.client
            .delete_repository(owner, &state.name)
            .await
            .with_context(|| format!("Failed to delete repository {owner}/{}", state.name))?;
        Ok(())
    }

    async fn import(&self, data: &ProviderData, id: &str) -> anyhow::Result<RepositoryModel> {
        let addr = RepoAddr::from_id(id)?;
        let state = RepositoryModel {
            name: addr.repo,
            auto_init: Some(false),
            archive_on_destroy: Some(false),
            ..Default::default()
        };
        self.fetch(data, state).await?.ok_or_else(|| not_found(Self::TYPE_NAME, id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response() -> GitHubRepository {
        serde_json::from_str(
            r#"{
                "id": 1296269, "node_id": "MDEwOlJlcG9zaXRvcnkxMjk2MjY5",
                "name": "Hello-World", "full_name": "octocat/Hello-World",
                "description": "", "homepage": null, "private": false, "visibility": "public",
                "has_issues": true, "has_projects": true, "has_wiki": true, "has_discussions": false,
                "allow_merge_commit": true, "allow_squash_merge": false,
                "archived": false, "default_branch": "main", "topics": ["rust", "cli"],
                "html_url": "https://github.com/octocat/Hello-World",
                "ssh_url": "git@github.com:octocat/Hello-World.git",
                "clone_url": "https://github.com/octocat/Hello-World.git",
                "git_url": "git://github.com/octocat/Hello-World.git"
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn remote_fields_map_into_state() {
        let state = RepositoryModel {
            name: "Hello-World".into(),
            archive_on_destroy: Some(true),
            allow_auto_merge: Some(false),
            ..Default::default()
        }
        .apply_remote(response(), Some("W/\"abc\"".into()));

        assert_eq!(state.description, None);
        assert_eq!(state.topics, Some(vec!["cli".to_string(), "rust".to_string()]));
        assert_eq!(state.allow_squash_merge, Some(false));
        assert_eq!(state.allow_auto_merge, Some(false));
        assert_eq!(state.archive_on_destroy, Some(true));
        assert_eq!(state.repo_id, Some(1296269));
        assert_eq!(state.ssh_clone_url.as_deref(), Some("git@github.com:octocat/Hello-World.git"));
        assert_eq!(state.etag.as_deref(), Some("W/\"abc\""));
    }

    #[test]
    fn update_request_clears_text_fields_with_empty_strings() {
        let request = RepositoryModel {
            name: "r".into(),
            has_wiki: Some(true),
            ..Default::default()
        }
        .update_request();
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["description"], "");
        assert_eq!(body["has_wiki"], true);
        assert!(body.get("archived").is_none());
        assert!(body.get("name").is_none());
    }

    #[test]
    fn names_are_validated() {
        assert!(REPO_NAME.is_match("hello-world.rs"));
        assert!(!REPO_NAME.is_match("hello world"));
        assert!(!REPO_NAME.is_match(""));
    }
}
