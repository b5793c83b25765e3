use anyhow::{Context, bail};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    datasources::repo_target,
    diag::Diagnostics,
    github_ext::{
        Conditional,
        repos::{GitHubRepository, RepositoryOpsExt},
    },
    resource::{DataSource, ProviderData},
    schema::{Attribute, Kind, Schema, Validator},
    util::{non_empty, normalize_set},
};

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryDataModel {
    pub name: Option<String>,
    pub full_name: Option<String>,
    pub description: Option<String>,
    pub homepage_url: Option<String>,
    pub visibility: Option<String>,
    pub private: Option<bool>,
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
    pub archived: Option<bool>,
    pub default_branch: Option<String>,
    pub topics: Vec<String>,
    pub html_url: Option<String>,
    pub ssh_clone_url: Option<String>,
    pub http_clone_url: Option<String>,
    pub git_clone_url: Option<String>,
    pub node_id: Option<String>,
    pub repo_id: Option<u64>,
    pub id: Option<String>,
}

impl RepositoryDataModel {
    fn apply_remote(mut self, repo: GitHubRepository) -> Self {
        self.id = Some(repo.full_name.clone());
        self.name = Some(repo.name);
        self.full_name = Some(repo.full_name);
        self.description = non_empty(repo.description);
        self.homepage_url = non_empty(repo.homepage);
        self.visibility = repo
            .visibility
            .or_else(|| Some(if repo.private { "private" } else { "public" }.to_string()));
        self.private = Some(repo.private);
        self.has_issues = repo.has_issues;
        self.has_projects = repo.has_projects;
        self.has_wiki = repo.has_wiki;
        self.has_discussions = repo.has_discussions;
        self.is_template = repo.is_template;
        self.allow_merge_commit = repo.allow_merge_commit;
        self.allow_squash_merge = repo.allow_squash_merge;
        self.allow_rebase_merge = repo.allow_rebase_merge;
        self.allow_auto_merge = repo.allow_auto_merge;
        self.delete_branch_on_merge = repo.delete_branch_on_merge;
        self.archived = Some(repo.archived);
        self.default_branch = repo.default_branch;
        self.topics = repo.topics;
        normalize_set(&mut self.topics);
        self.html_url = repo.html_url;
        self.ssh_clone_url = repo.ssh_url;
        self.http_clone_url = repo.clone_url;
        self.git_clone_url = repo.git_url;
        self.node_id = Some(repo.node_id);
        self.repo_id = Some(repo.id);
        self
    }
}

pub struct RepositoryDataSource;

#[async_trait]
impl DataSource for RepositoryDataSource {
    type Model = RepositoryDataModel;

    const TYPE_NAME: &'static str = "github_repository";

    fn schema(&self) -> Schema {
        let mut schema = Schema::new("Looks up a single repository.")
            .attr(
                "name",
                Attribute::optional_string()
                    .also_computed()
                    .validate(Validator::ConflictsWith(&["full_name"])),
            )
            .attr(
                "full_name",
                Attribute::optional_string()
                    .also_computed()
                    .describe("owner/repository, for repositories outside the configured owner."),
            );
        for attr in ["description", "homepage_url", "visibility", "default_branch"] {
            schema = schema.attr(attr, Attribute::computed_string());
        }
        for attr in [
            "private",
            "has_issues",
            "has_projects",
            "has_wiki",
            "has_discussions",
            "is_template",
            "allow_merge_commit",
            "allow_squash_merge",
            "allow_rebase_merge",
            "allow_auto_merge",
            "delete_branch_on_merge",
            "archived",
        ] {
            schema = schema.attr(attr, Attribute::computed(Kind::Bool));
        }
        schema
            .attr("topics", Attribute::computed(Kind::set_of(Kind::String)))
            .attr("html_url", Attribute::computed_string())
            .attr("ssh_clone_url", Attribute::computed_string())
            .attr("http_clone_url", Attribute::computed_string())
            .attr("git_clone_url", Attribute::computed_string())
            .attr("node_id", Attribute::computed_string())
            .attr("repo_id", Attribute::computed(Kind::Int))
            .attr("id", Attribute::computed_string())
    }

    fn validate(&self, model: &RepositoryDataModel, diags: &mut Diagnostics) {
        if model.name.is_none() && model.full_name.is_none() {
            diags.attribute_error("name", "Missing attribute", "One of name or full_name must be set");
        }
    }

    async fn read(&self, data: &ProviderData, config: RepositoryDataModel) -> anyhow::Result<RepositoryDataModel> {
        let (owner, repo) = repo_target(&data.owner, config.name.as_deref(), config.full_name.as_deref())?;
        let (owner, repo) = (owner.to_string(), repo.to_string());

        let response = data
            .client
            .get_repository(&owner, &repo, None)
            .await
            .with_context(|| format!("Failed to read repository {owner}/{repo}"))?;
        match response {
            Conditional::Modified { value, .. } => Ok(config.apply_remote(value)),
            Conditional::NotModified => bail!("GitHub answered 304 for {owner}/{repo} without an ETag"),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoriesDataModel {
    pub query: String,
    pub sort: Option<String>,
    pub include_repo_id: Option<bool>,
    pub results_per_page: Option<i64>,
    pub full_names: Vec<String>,
    pub names: Vec<String>,
    pub repo_ids: Vec<u64>,
    pub id: Option<String>,
}

pub struct RepositoriesDataSource;

#[async_trait]
impl DataSource for RepositoriesDataSource {
    type Model = RepositoriesDataModel;

    const TYPE_NAME: &'static str = "github_repositories";

    fn schema(&self) -> Schema {
        Schema::new("Searches repositories with GitHub's search syntax.")
            .attr("query", Attribute::required_string())
            .attr(
                "sort",
                Attribute::optional_string()
                    .default("updated")
                    .validate(Validator::OneOf(&["stars", "fork", "updated"])),
            )
            .attr("include_repo_id", Attribute::optional_bool().default(false))
            .attr(
                "results_per_page",
                Attribute::optional(Kind::Int)
                    .default(100)
                    .validate(Validator::IntBetween(0, 1000))
                    .describe("Maximum number of results to collect."),
            )
            .attr("full_names", Attribute::computed(Kind::list_of(Kind::String)))
            .attr("names", Attribute::computed(Kind::list_of(Kind::String)))
            .attr("repo_ids", Attribute::computed(Kind::list_of(Kind::Int)))
            .attr("id", Attribute::computed_string())
    }

    async fn read(&self, data: &ProviderData, mut config: RepositoriesDataModel) -> anyhow::Result<RepositoriesDataModel> {
        let limit = config.results_per_page.unwrap_or(100).clamp(0, 1000) as usize;
        let mut repos = data
            .client
            .search_repositories(&config.query, config.sort.as_deref(), limit)
            .await
            .with_context(|| format!("Failed to search repositories for {:?}", config.query))?;
        repos.truncate(limit);

        config.full_names = repos.iter().map(|r| r.full_name.clone()).collect();
        config.names = repos.iter().map(|r| r.name.clone()).collect();
        config.repo_ids = if config.include_repo_id == Some(true) {
            repos.iter().map(|r| r.id).collect()
        } else {
            Vec::new()
        };
        config.id = Some(config.query.clone());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_or_full_name_is_required() {
        let mut diags = Diagnostics::new();
        RepositoryDataSource.validate(&RepositoryDataModel::default(), &mut diags);
        assert!(diags.has_error());
    }

    #[test]
    fn maps_repository_fields() {
        let repo: GitHubRepository = serde_json::from_value(serde_json::json!({
            "id": 1296269,
            "node_id": "MDEwOlJlcG9zaXRvcnkxMjk2MjY5",
            "name": "Hello-World",
            "full_name": "octocat/Hello-World",
            "description": "",
            "private": true,
            "archived": false,
            "topics": ["rust", "api"],
            "default_branch": "main"
        }))
        .unwrap();
        let model = RepositoryDataModel::default().apply_remote(repo);
        assert_eq!(model.id.as_deref(), Some("octocat/Hello-World"));
        assert_eq!(model.visibility.as_deref(), Some("private"));
        assert_eq!(model.description, None);
        assert_eq!(model.topics, vec!["api", "rust"]);
    }
}
