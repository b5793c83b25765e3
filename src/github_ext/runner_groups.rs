use async_trait::async_trait;
use octocrab::{Octocrab, Result};
use serde::{Deserialize, Serialize};

use super::{Conditional, RestExt};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GitHubRunnerGroup {
    pub id: u64,
    pub name: String,
    pub visibility: String,
    #[serde(default)]
    pub default: bool,
    #[serde(default)]
    pub inherited: bool,
    #[serde(default)]
    pub allows_public_repositories: bool,
    #[serde(default)]
    pub restricted_to_workflows: bool,
    #[serde(default)]
    pub selected_workflows: Vec<String>,
    pub runners_url: Option<String>,
    pub selected_repositories_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunnerGroupRequest {
    pub name: String,
    pub visibility: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_repository_ids: Option<Vec<u64>>,
    pub allows_public_repositories: bool,
    pub restricted_to_workflows: bool,
    pub selected_workflows: Vec<String>,
}

#[derive(Debug, Serialize)]
struct SelectedRepositoriesRequest<'a> {
    selected_repository_ids: &'a [u64],
}

#[derive(Debug, Deserialize)]
struct RepositoryId {
    id: u64,
}

#[async_trait]
pub trait RunnerGroupExt {
    async fn create_runner_group(&self, org: &str, group: &RunnerGroupRequest) -> Result<GitHubRunnerGroup>;
    async fn get_runner_group(&self, org: &str, id: u64, etag: Option<&str>)
    -> anyhow::Result<Conditional<GitHubRunnerGroup>>;
    async fn update_runner_group(&self, org: &str, id: u64, group: &RunnerGroupRequest) -> Result<GitHubRunnerGroup>;
    async fn delete_runner_group(&self, org: &str, id: u64) -> Result<()>;
    async fn set_runner_group_repositories(&self, org: &str, id: u64, repository_ids: &[u64]) -> Result<()>;
    async fn list_runner_group_repositories(&self, org: &str, id: u64) -> anyhow::Result<Vec<u64>>;
}

#[async_trait]
impl RunnerGroupExt for Octocrab {
    async fn create_runner_group(&self, org: &str, group: &RunnerGroupRequest) -> Result<GitHubRunnerGroup> {
        let route = format!("/orgs/{}/actions/runner-groups", org);
        self.post(route, Some(group)).await
    }

    async fn get_runner_group(
        &self,
        org: &str,
        id: u64,
        etag: Option<&str>,
    ) -> anyhow::Result<Conditional<GitHubRunnerGroup>> {
        let route = format!("/orgs/{}/actions/runner-groups/{}", org, id);
        self.get_conditional(route, etag).await
    }

    async fn update_runner_group(&self, org: &str, id: u64, group: &RunnerGroupRequest) -> Result<GitHubRunnerGroup> {
        let route = format!("/orgs/{}/actions/runner-groups/{}", org, id);
        self.patch(route, Some(group)).await
    }

    async fn delete_runner_group(&self, org: &str, id: u64) -> Result<()> {
        let route = format!("/orgs/{}/actions/runner-groups/{}", org, id);
        self.delete_no_content(route).await
    }

    async fn set_runner_group_repositories(&self, org: &str, id: u64, repository_ids: &[u64]) -> Result<()> {
        let route = format!("/orgs/{}/actions/runner-groups/{}/repositories", org, id);
        self.put_no_content(
            route,
            &SelectedRepositoriesRequest {
                selected_repository_ids: repository_ids,
            },
        )
        .await
    }

    async fn list_runner_group_repositories(&self, org: &str, id: u64) -> anyhow::Result<Vec<u64>> {
        let route = format!("/orgs/{}/actions/runner-groups/{}/repositories", org, id);
        let repos: Vec<RepositoryId> = self.list_all_wrapped(route, "repositories").await?;
        Ok(repos.into_iter().map(|r| r.id).collect())
    }
}
