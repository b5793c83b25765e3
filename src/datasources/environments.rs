use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    github_ext::environments::EnvironmentExt,
    resource::{DataSource, ProviderData},
    schema::{Attribute, Kind, Schema},
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicySummary {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeploymentPoliciesDataModel {
    pub repository: String,
    pub environment_name: String,
    pub policies: Vec<PolicySummary>,
    pub id: Option<String>,
}

pub struct DeploymentPoliciesDataSource;

#[async_trait]
impl DataSource for DeploymentPoliciesDataSource {
    type Model = DeploymentPoliciesDataModel;

    const TYPE_NAME: &'static str = "github_repository_deployment_branch_policies";

    fn schema(&self) -> Schema {
        Schema::new("Lists the deployment branch policies of an environment.")
            .attr("repository", Attribute::required_string())
            .attr("environment_name", Attribute::required_string())
            .attr(
                "policies",
                Attribute::computed(Kind::list_of(Kind::object(&[("id", Kind::Int), ("name", Kind::String)]))),
            )
            .attr("id", Attribute::computed_string())
    }

    async fn read(&self, data: &ProviderData, mut config: DeploymentPoliciesDataModel) -> anyhow::Result<DeploymentPoliciesDataModel> {
        let policies = data
            .client
            .list_branch_policies(&data.owner, &config.repository, &config.environment_name)
            .await
            .with_context(|| {
                format!(
                    "Failed to list branch policies of {}/{} environment {}",
                    data.owner, config.repository, config.environment_name
                )
            })?;
        config.policies = policies
            .into_iter()
            .map(|p| PolicySummary { id: p.id, name: p.name })
            .collect();
        config.id = Some(format!("{}:{}", config.repository, config.environment_name));
        Ok(config)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentSummary {
    pub name: String,
    pub node_id: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentsDataModel {
    pub repository: String,
    pub environments: Vec<EnvironmentSummary>,
    pub id: Option<String>,
}

pub struct EnvironmentsDataSource;

#[async_trait]
impl DataSource for EnvironmentsDataSource {
    type Model = EnvironmentsDataModel;

    const TYPE_NAME: &'static str = "github_repository_environments";

    fn schema(&self) -> Schema {
        Schema::new("Lists the deployment environments of a repository.")
            .attr("repository", Attribute::required_string())
            .attr(
                "environments",
                Attribute::computed(Kind::list_of(Kind::object(&[
                    ("name", Kind::String),
                    ("node_id", Kind::String),
                ]))),
            )
            .attr("id", Attribute::computed_string())
    }

    async fn read(&self, data: &ProviderData, mut config: EnvironmentsDataModel) -> anyhow::Result<EnvironmentsDataModel> {
        let environments = data
            .client
            .list_environments(&data.owner, &config.repository)
            .await
            .with_context(|| format!("Failed to list environments of {}/{}", data.owner, config.repository))?;
        config.environments = environments
            .into_iter()
            .map(|e| EnvironmentSummary {
                name: e.name,
                node_id: e.node_id,
            })
            .collect();
        config.id = Some(config.repository.clone());
        Ok(config)
    }
}
