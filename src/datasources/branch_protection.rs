use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    github_ext::branch_protection::{BranchProtectionExt, BranchProtectionRule},
    resource::{DataSource, ProviderData},
    schema::{Attribute, Kind, Schema},
};

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BranchProtectionRulesDataModel {
    pub repository: String,
    pub rules: Vec<BranchProtectionRule>,
    pub id: Option<String>,
}

pub struct BranchProtectionRulesDataSource;

#[async_trait]
impl DataSource for BranchProtectionRulesDataSource {
    type Model = BranchProtectionRulesDataModel;

    const TYPE_NAME: &'static str = "github_branch_protection_rules";

    fn schema(&self) -> Schema {
        Schema::new("Lists the branch protection rule patterns of a repository.")
            .attr("repository", Attribute::required_string())
            .attr(
                "rules",
                Attribute::computed(Kind::list_of(Kind::object(&[("pattern", Kind::String)]))),
            )
            .attr("id", Attribute::computed_string())
    }

    async fn read(
        &self,
        data: &ProviderData,
        mut config: BranchProtectionRulesDataModel,
    ) -> anyhow::Result<BranchProtectionRulesDataModel> {
        config.rules = data
            .client
            .list_branch_protection_rules(&data.owner, &config.repository)
            .await
            .with_context(|| format!("Failed to list branch protection rules of {}/{}", data.owner, config.repository))?;
        config.id = Some(config.repository.clone());
        Ok(config)
    }
}
