use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    addr::{BranchAddr, ResourceAddress},
    error::NotFoundExt,
    github_ext::{Conditional, git::GitRefExt},
    resource::{ProviderData, Resource},
    resources::not_found,
    schema::{Attribute, Schema},
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BranchModel {
    pub repository: String,
    pub branch: String,
    pub source_branch: Option<String>,
    pub source_sha: Option<String>,
    pub etag: Option<String>,
    #[serde(rename = "ref")]
    pub git_ref: Option<String>,
    pub sha: Option<String>,
}

pub struct BranchResource;

impl BranchResource {
    async fn fetch(&self, data: &ProviderData, mut state: BranchModel) -> anyhow::Result<Option<BranchModel>> {
        let response = data
            .client
            .get_ref(
                &data.owner,
                &state.repository,
                &format!("heads/{}", state.branch),
                state.etag.as_deref(),
            )
            .await
            .or_not_found()
            .with_context(|| format!("Failed to read branch {} of {}/{}", state.branch, data.owner, state.repository))?;

        match response {
            None => Ok(None),
            Some(Conditional::NotModified) => Ok(Some(state)),
            Some(Conditional::Modified { value, etag }) => {
                state.git_ref = Some(value.git_ref);
                state.sha = Some(value.object.sha);
                state.etag = etag;
                Ok(Some(state))
            }
        }
    }
}

#[async_trait]
impl Resource for BranchResource {
    type Model = BranchModel;

    const TYPE_NAME: &'static str = "github_branch";

    fn schema(&self) -> Schema {
        Schema::new("A branch in a repository, created from a source branch or commit.")
            .attr("repository", Attribute::required_string().requires_replace())
            .attr("branch", Attribute::required_string().requires_replace())
            .attr(
                "source_branch",
                Attribute::optional_string()
                    .default("main")
                    .requires_replace()
                    .describe("The branch to create from when source_sha is not set."),
            )
            .attr(
                "source_sha",
                Attribute::optional_string().also_computed().requires_replace(),
            )
            .attr("etag", Attribute::computed_string())
            .attr("ref", Attribute::computed_string())
            .attr("sha", Attribute::computed_string())
    }

    async fn create(&self, data: &ProviderData, plan: BranchModel) -> anyhow::Result<BranchModel> {
        let owner = &data.owner;
        let repo = &plan.repository;

        let source_sha = match &plan.source_sha {
            Some(sha) => sha.clone(),
            None => {
                let source = plan.source_branch.as_deref().unwrap_or("main");
                match data.client.get_ref(owner, repo, &format!("heads/{source}"), None).await {
                    Ok(Conditional::Modified { value, .. }) => value.object.sha,
                    Ok(Conditional::NotModified) => {
                        anyhow::bail!("Unexpected 304 resolving source branch {source} of {owner}/{repo}")
                    }
                    Err(e) => return Err(e.context(format!("Failed to resolve source branch {source} of {owner}/{repo}"))),
                }
            }
        };

        data.client
            .create_ref(owner, repo, &format!("heads/{}", plan.branch), &source_sha)
            .await
            .with_context(|| format!("Failed to create branch {} on {owner}/{repo}", plan.branch))?;
        tracing::info!("Created branch {} on {owner}/{repo} at {source_sha}", plan.branch);

        let branch = plan.branch.clone();
        let created = BranchModel {
            source_sha: Some(source_sha),
            etag: None,
            ..plan
        };
        self.fetch(data, created)
            .await?
            .with_context(|| format!("Branch {branch} vanished right after creation"))
    }

    async fn read(&self, data: &ProviderData, state: BranchModel) -> anyhow::Result<Option<BranchModel>> {
        self.fetch(data, state).await
    }

    /// Every configurable attribute forces replacement, so there is nothing to send.
    async fn update(&self, _data: &ProviderData, _prior: BranchModel, plan: BranchModel) -> anyhow::Result<BranchModel> {
        Ok(plan)
    }

    async fn delete(&self, data: &ProviderData, state: BranchModel) -> anyhow::Result<()> {
        data.client
            .delete_ref(&data.owner, &state.repository, &format!("heads/{}", state.branch))
            .await
            .with_context(|| format!("Failed to delete branch {} on {}/{}", state.branch, data.owner, state.repository))?;
        Ok(())
    }

    async fn import(&self, data: &ProviderData, id: &str) -> anyhow::Result<BranchModel> {
        let addr = BranchAddr::from_id(id)?;
        let state = BranchModel {
            repository: addr.repo,
            branch: addr.branch,
            source_branch: Some(addr.source_branch.unwrap_or_else(|| "main".to_string())),
            ..Default::default()
        };
        self.fetch(data, state).await?.ok_or_else(|| not_found(Self::TYPE_NAME, id))
    }
}
