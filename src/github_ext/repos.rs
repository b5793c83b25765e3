use async_trait::async_trait;
use octocrab::{Octocrab, Result};
use serde::{Deserialize, Serialize};

use super::{Conditional, RestExt, enc};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GitHubRepository {
    pub id: u64,
    pub node_id: String,
    pub name: String,
    pub full_name: String,
    pub description: Option<String>,
    pub homepage: Option<String>,
    pub private: bool,
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
    pub archived: bool,
    pub default_branch: Option<String>,
    #[serde(default)]
    pub topics: Vec<String>,
    pub html_url: Option<String>,
    pub ssh_url: Option<String>,
    pub clone_url: Option<String>,
    pub git_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CreateRepositoryRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visibility: Option<String>,
    pub has_issues: bool,
    pub has_projects: bool,
    pub has_wiki: bool,
    pub has_discussions: bool,
    pub is_template: bool,
    pub allow_merge_commit: bool,
    pub allow_squash_merge: bool,
    pub allow_rebase_merge: bool,
    pub allow_auto_merge: bool,
    pub delete_branch_on_merge: bool,
    pub auto_init: bool,
}

/// PATCH body. Unset fields are left alone; send an empty string to clear text fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UpdateRepositoryRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visibility: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_issues: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_projects: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_wiki: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_discussions: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_template: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_merge_commit: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_squash_merge: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_rebase_merge: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_auto_merge: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete_branch_on_merge: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_branch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archived: Option<bool>,
}

#[derive(Debug, Serialize)]
struct TopicsRequest<'a> {
    names: &'a [String],
}

#[derive(Debug, Serialize)]
struct RenameBranchRequest<'a> {
    new_name: &'a str,
}

#[derive(Debug, Serialize)]
struct SearchQuery<'a> {
    q: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sort: Option<&'a str>,
    per_page: u8,
    page: u32,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    total_count: u64,
    items: Vec<GitHubRepository>,
}

#[async_trait]
pub trait RepositoryOpsExt {
    async fn create_repository(
        &self,
        org: Option<&str>,
        repo_data: &CreateRepositoryRequest,
    ) -> Result<GitHubRepository>;
    async fn get_repository(&self, owner: &str, repo: &str, etag: Option<&str>)
    -> anyhow::Result<Conditional<GitHubRepository>>;
    async fn update_repository(
        &self,
        owner: &str,
        repo: &str,
        repo_data: &UpdateRepositoryRequest,
    ) -> Result<GitHubRepository>;
    async fn delete_repository(&self, owner: &str, repo: &str) -> Result<()>;
    async fn replace_topics(&self, owner: &str, repo: &str, topics: &[String]) -> Result<()>;
    async fn rename_branch(&self, owner: &str, repo: &str, branch: &str, new_name: &str) -> Result<()>;
    async fn search_repositories(&self, query: &str, sort: Option<&str>, limit: usize) -> Result<Vec<GitHubRepository>>;
}

#[async_trait]
impl RepositoryOpsExt for Octocrab {
    async fn create_repository(
        &self,
        org: Option<&str>,
        repo_data: &CreateRepositoryRequest,
    ) -> Result<GitHubRepository> {
        let route = match org {
            Some(org) => format!("/orgs/{}/repos", org),
            None => "/user/repos".to_string(),
        };
        self.post(route, Some(repo_data)).await
    }

    async fn get_repository(
        &self,
        owner: &str,
        repo: &str,
        etag: Option<&str>,
    ) -> anyhow::Result<Conditional<GitHubRepository>> {
        let route = format!("/repos/{}/{}", owner, repo);
        self.get_conditional(route, etag).await
    }

    async fn update_repository(
        &self,
        owner: &str,
        repo: &str,
        repo_data: &UpdateRepositoryRequest,
    ) -> Result<GitHubRepository> {
        let route = format!("/repos/{}/{}", owner, repo);
        self.patch(route, Some(repo_data)).await
    }

    async fn delete_repository(&self, owner: &str, repo: &str) -> Result<()> {
        let route = format!("/repos/{}/{}", owner, repo);
        self.delete_no_content(route).await
    }

    async fn replace_topics(&self, owner: &str, repo: &str, topics: &[String]) -> Result<()> {
        let route = format!("/repos/{}/{}/topics", owner, repo);
        self.put_no_content(route, &TopicsRequest { names: topics }).await
    }

    async fn rename_branch(&self, owner: &str, repo: &str, branch: &str, new_name: &str) -> Result<()> {
        let route = format!("/repos/{}/{}/branches/{}/rename", owner, repo, enc(branch));
        self.post_no_content(route, &RenameBranchRequest { new_name }).await
    }

    async fn search_repositories(&self, query: &str, sort: Option<&str>, limit: usize) -> Result<Vec<GitHubRepository>> {
        let mut results = Vec::new();
        let mut page = 1;

        loop {
            let response: SearchResponse = self
                .get(
                    "/search/repositories",
                    Some(&SearchQuery {
                        q: query,
                        sort,
                        per_page: 100,
                        page,
                    }),
                )
                .await?;

            let fetched = response.items.len();
            results.extend(response.items);

            if fetched == 0 || results.len() >= limit || results.len() as u64 >= response.total_count {
                break;
            }
            page += 1;
        }

        results.truncate(limit);
        Ok(results)
    }
}
