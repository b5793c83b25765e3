use anyhow::{Context, bail};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    addr::{RepoEnvChildAddr, ResourceAddress, parse_numeric},
    error::NotFoundExt,
    github_ext::{Conditional, environments::EnvironmentExt},
    resource::{ProviderData, Resource},
    resources::not_found,
    schema::{Attribute, Kind, Schema},
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeploymentPolicyModel {
    pub repository: String,
    pub environment_name: String,
    pub name: String,
    pub policy_id: Option<u64>,
    pub etag: Option<String>,
}

pub struct DeploymentPolicyResource;

impl DeploymentPolicyResource {
    fn policy_id(state: &DeploymentPolicyModel) -> anyhow::Result<u64> {
        match state.policy_id {
            Some(id) => Ok(id),
            None => bail!(
                "Deployment branch policy {} of {}:{} has no policy_id in state",
                state.name,
                state.repository,
                state.environment_name
            ),
        }
    }
}

#[async_trait]
impl Resource for DeploymentPolicyResource {
    type Model = DeploymentPolicyModel;

    const TYPE_NAME: &'static str = "github_repository_deployment_branch_policy";

    fn schema(&self) -> Schema {
        Schema::new("A branch name pattern allowed to deploy to an environment with custom branch policies.")
            .attr("repository", Attribute::required_string().requires_replace())
            .attr("environment_name", Attribute::required_string().requires_replace())
            .attr("name", Attribute::required_string().describe("A branch name pattern, such as release/*."))
            .attr("policy_id", Attribute::computed(Kind::Int))
            .attr("etag", Attribute::computed_string())
    }

    async fn create(&self, data: &ProviderData, plan: DeploymentPolicyModel) -> anyhow::Result<DeploymentPolicyModel> {
        let policy = data
            .client
            .create_branch_policy(&data.owner, &plan.repository, &plan.environment_name, &plan.name)
            .await
            .with_context(|| {
                format!(
                    "Failed to create branch policy {} on {}/{} environment {}",
                    plan.name, data.owner, plan.repository, plan.environment_name
                )
            })?;
        tracing::info!(
            "Created branch policy {} ({}) on {}/{} environment {}",
            policy.name,
            policy.id,
            data.owner,
            plan.repository,
            plan.environment_name
        );
        Ok(DeploymentPolicyModel {
            name: policy.name,
            policy_id: Some(policy.id),
            etag: None,
            ..plan
        })
    }

    async fn read(&self, data: &ProviderData, mut state: DeploymentPolicyModel) -> anyhow::Result<Option<DeploymentPolicyModel>> {
        let id = Self::policy_id(&state)?;
        let response = data
            .client
            .get_branch_policy(&data.owner, &state.repository, &state.environment_name, id, state.etag.as_deref())
            .await
            .or_not_found()
            .with_context(|| {
                format!(
                    "Failed to read branch policy {id} on {}/{} environment {}",
                    data.owner, state.repository, state.environment_name
                )
            })?;

        match response {
            None => Ok(None),
            Some(Conditional::NotModified) => Ok(Some(state)),
            Some(Conditional::Modified { value, etag }) => {
                state.name = value.name;
                state.policy_id = Some(value.id);
                state.etag = etag;
                Ok(Some(state))
            }
        }
    }

    async fn update(
        &self,
        data: &ProviderData,
        prior: DeploymentPolicyModel,
        plan: DeploymentPolicyModel,
    ) -> anyhow::Result<DeploymentPolicyModel> {
        let id = Self::policy_id(&prior)?;
        let policy = data
            .client
            .update_branch_policy(&data.owner, &plan.repository, &plan.environment_name, id, &plan.name)
            .await
            .with_context(|| {
                format!(
                    "Failed to update branch policy {id} on {}/{} environment {}",
                    data.owner, plan.repository, plan.environment_name
                )
            })?;
        tracing::info!("Renamed branch policy {id} to {}", policy.name);
        Ok(DeploymentPolicyModel {
            name: policy.name,
            policy_id: Some(policy.id),
            etag: None,
            ..plan
        })
    }

    async fn delete(&self, data: &ProviderData, state: DeploymentPolicyModel) -> anyhow::Result<()> {
        let id = Self::policy_id(&state)?;
        data.client
            .delete_branch_policy(&data.owner, &state.repository, &state.environment_name, id)
            .await
            .with_context(|| {
                format!(
                    "Failed to delete branch policy {id} on {}/{} environment {}",
                    data.owner, state.repository, state.environment_name
                )
            })?;
        Ok(())
    }

    async fn import(&self, data: &ProviderData, id: &str) -> anyhow::Result<DeploymentPolicyModel> {
        let addr = RepoEnvChildAddr::from_id(id)?;
        let policy_id = parse_numeric(id, &addr.child, "<repository>:<environment>:<policy_id>")?;
        let state = DeploymentPolicyModel {
            repository: addr.repo,
            environment_name: addr.environment,
            policy_id: Some(policy_id),
            ..Default::default()
        };
        self.read(data, state).await?.ok_or_else(|| not_found(Self::TYPE_NAME, id))
    }
}
