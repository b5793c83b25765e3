use anyhow::{Context, bail};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    error::NotFoundExt,
    github_ext::{
        Conditional,
        git::{GitRef, GitRefExt},
    },
    resource::{DataSource, ProviderData},
    schema::{Attribute, Schema},
};

fn modified(response: Conditional<GitRef>, what: &str) -> anyhow::Result<(GitRef, Option<String>)> {
    match response {
        Conditional::Modified { value, etag } => Ok((value, etag)),
        Conditional::NotModified => bail!("GitHub answered 304 for {what} without an ETag"),
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BranchDataModel {
    pub repository: String,
    pub branch: String,
    pub etag: Option<String>,
    #[serde(rename = "ref")]
    pub git_ref: Option<String>,
    pub sha: Option<String>,
    pub id: Option<String>,
}

pub struct BranchDataSource;

#[async_trait]
impl DataSource for BranchDataSource {
    type Model = BranchDataModel;

    const TYPE_NAME: &'static str = "github_branch";

    fn schema(&self) -> Schema {
        Schema::new("Looks up a branch. Outputs are null when the branch does not exist.")
            .attr("repository", Attribute::required_string())
            .attr("branch", Attribute::required_string())
            .attr("etag", Attribute::computed_string())
            .attr("ref", Attribute::computed_string())
            .attr("sha", Attribute::computed_string())
            .attr("id", Attribute::computed_string())
    }

    async fn read(&self, data: &ProviderData, mut config: BranchDataModel) -> anyhow::Result<BranchDataModel> {
        let what = format!("branch {} of {}/{}", config.branch, data.owner, config.repository);
        let response = data
            .client
            .get_ref(&data.owner, &config.repository, &format!("heads/{}", config.branch), None)
            .await
            .or_not_found()
            .with_context(|| format!("Failed to read {what}"))?;

        config.id = Some(format!("{}:{}", config.repository, config.branch));
        let Some(response) = response else {
            tracing::debug!("{what} does not exist");
            return Ok(config);
        };
        let (git_ref, etag) = modified(response, &what)?;
        config.git_ref = Some(git_ref.git_ref);
        config.sha = Some(git_ref.object.sha);
        config.etag = etag;
        Ok(config)
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RefDataModel {
    pub repository: String,
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub owner: Option<String>,
    pub etag: Option<String>,
    pub sha: Option<String>,
    pub id: Option<String>,
}

pub struct RefDataSource;

#[async_trait]
impl DataSource for RefDataSource {
    type Model = RefDataModel;

    const TYPE_NAME: &'static str = "github_ref";

    fn schema(&self) -> Schema {
        Schema::new("Looks up a git reference such as heads/main or tags/v1.0.0.")
            .attr("repository", Attribute::required_string())
            .attr("ref", Attribute::required_string())
            .attr(
                "owner",
                Attribute::optional_string().describe("Defaults to the configured owner."),
            )
            .attr("etag", Attribute::computed_string())
            .attr("sha", Attribute::computed_string())
            .attr("id", Attribute::computed_string())
    }

    async fn read(&self, data: &ProviderData, mut config: RefDataModel) -> anyhow::Result<RefDataModel> {
        let owner = config.owner.clone().unwrap_or_else(|| data.owner.clone());
        let what = format!("ref {} of {owner}/{}", config.git_ref, config.repository);
        let response = data
            .client
            .get_ref(&owner, &config.repository, &config.git_ref, None)
            .await
            .with_context(|| format!("Failed to read {what}"))?;

        let (git_ref, etag) = modified(response, &what)?;
        config.id = Some(format!("{}:{}", config.repository, config.git_ref));
        config.sha = Some(git_ref.object.sha);
        config.etag = etag;
        Ok(config)
    }
}
