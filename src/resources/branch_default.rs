use anyhow::{Context, bail};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    addr::{RepoAddr, ResourceAddress},
    error::NotFoundExt,
    github_ext::{
        Conditional,
        repos::{RepositoryOpsExt, UpdateRepositoryRequest},
    },
    resource::{ProviderData, Resource},
    resources::not_found,
    schema::{Attribute, Schema},
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BranchDefaultModel {
    pub repository: String,
    pub branch: String,
    pub rename: Option<bool>,
    pub etag: Option<String>,
}

pub struct BranchDefaultResource;

impl BranchDefaultResource {
    async fn fetch(&self, data: &ProviderData, mut state: BranchDefaultModel) -> anyhow::Result<Option<BranchDefaultModel>> {
        let response = data
            .client
            .get_repository(&data.owner, &state.repository, state.etag.as_deref())
            .await
            .or_not_found()
            .with_context(|| format!("Failed to read repository {}/{}", data.owner, state.repository))?;

        match response {
            None => Ok(None),
            Some(Conditional::NotModified) => Ok(Some(state)),
            Some(Conditional::Modified { value, etag }) => {
                if let Some(branch) = value.default_branch {
                    state.branch = branch;
                }
                state.etag = etag;
                Ok(Some(state))
            }
        }
    }

    async fn apply(&self, data: &ProviderData, plan: BranchDefaultModel) -> anyhow::Result<BranchDefaultModel> {
        let owner = &data.owner;
        let repo = plan.repository.clone();

        if plan.rename == Some(true) {
            let current = match data.client.get_repository(owner, &repo, None).await? {
                Conditional::Modified { value, .. } => value.default_branch,
                Conditional::NotModified => None,
            };
            let Some(current) = current else {
                bail!("Repository {owner}/{repo} has no default branch to rename");
            };
            if current != plan.branch {
                data.client
                    .rename_branch(owner, &repo, &current, &plan.branch)
                    .await
                    .with_context(|| format!("Failed to rename {current} to {} on {owner}/{repo}", plan.branch))?;
                tracing::info!("Renamed default branch of {owner}/{repo} from {current} to {}", plan.branch);
            }
        } else {
            let request = UpdateRepositoryRequest {
                default_branch: Some(plan.branch.clone()),
                ..Default::default()
            };
            data.client
                .update_repository(owner, &repo, &request)
                .await
                .with_context(|| format!("Failed to set default branch of {owner}/{repo} to {}", plan.branch))?;
            tracing::info!("Set default branch of {owner}/{repo} to {}", plan.branch);
        }

        let fresh = BranchDefaultModel { etag: None, ..plan };
        self.fetch(data, fresh)
            .await?
            .with_context(|| format!("Repository {owner}/{repo} not found"))
    }
}

#[async_trait]
impl Resource for BranchDefaultResource {
    type Model = BranchDefaultModel;

    const TYPE_NAME: &'static str = "github_branch_default";

    fn schema(&self) -> Schema {
        Schema::new("The default branch of a repository.")
            .attr("repository", Attribute::required_string().requires_replace())
            .attr("branch", Attribute::required_string())
            .attr(
                "rename",
                Attribute::optional_bool()
                    .default(false)
                    .describe("Rename the current default branch instead of switching to an existing one."),
            )
            .attr("etag", Attribute::computed_string())
    }

    async fn create(&self, data: &ProviderData, plan: BranchDefaultModel) -> anyhow::Result<BranchDefaultModel> {
        self.apply(data, plan).await
    }

    async fn read(&self, data: &ProviderData, state: BranchDefaultModel) -> anyhow::Result<Option<BranchDefaultModel>> {
        self.fetch(data, state).await
    }

    async fn update(
        &self,
        data: &ProviderData,
        _prior: BranchDefaultModel,
        plan: BranchDefaultModel,
    ) -> anyhow::Result<BranchDefaultModel> {
        self.apply(data, plan).await
    }

    async fn delete(&self, data: &ProviderData, state: BranchDefaultModel) -> anyhow::Result<()> {
        tracing::info!(
            "Dropping default branch of {}/{} from state; GitHub keeps {}",
            data.owner,
            state.repository,
            state.branch
        );
        Ok(())
    }

    async fn import(&self, data: &ProviderData, id: &str) -> anyhow::Result<BranchDefaultModel> {
        let addr = RepoAddr::from_id(id)?;
        let state = BranchDefaultModel {
            repository: addr.repo,
            rename: Some(false),
            ..Default::default()
        };
        self.fetch(data, state).await?.ok_or_else(|| not_found(Self::TYPE_NAME, id))
    }
}
