use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    addr::{ResourceAddress, TeamChildAddr},
    error::NotFoundExt,
    github_ext::teams::TeamExt,
    resource::{ProviderData, Resource},
    resources::{not_found, team::team_slug},
    schema::{Attribute, Schema},
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamRepositoryModel {
    pub team_id: String,
    pub repository: String,
    pub permission: Option<String>,
}

pub struct TeamRepositoryResource;

impl TeamRepositoryResource {
    async fn put(&self, data: &ProviderData, plan: TeamRepositoryModel) -> anyhow::Result<TeamRepositoryModel> {
        let org = data.org(Self::TYPE_NAME)?;
        let slug = team_slug(data, org, &plan.team_id).await?;
        let permission = plan.permission.as_deref().unwrap_or("pull");

        data.client
            .set_team_repository(org, &slug, &data.owner, &plan.repository, permission)
            .await
            .with_context(|| format!("Failed to grant team {slug} {permission} on {}/{}", data.owner, plan.repository))?;
        tracing::info!("Granted team {slug} {permission} on {}/{}", data.owner, plan.repository);
        Ok(plan)
    }
}

#[async_trait]
impl Resource for TeamRepositoryResource {
    type Model = TeamRepositoryModel;

    const TYPE_NAME: &'static str = "github_team_repository";

    fn schema(&self) -> Schema {
        Schema::new("A team's access to a repository.")
            .attr(
                "team_id",
                Attribute::required_string()
                    .requires_replace()
                    .describe("The team's numeric id or slug."),
            )
            .attr("repository", Attribute::required_string().requires_replace())
            .attr(
                "permission",
                Attribute::optional_string()
                    .default("pull")
                    .describe("One of pull, triage, push, maintain, admin, or a custom repository role."),
            )
    }

    async fn create(&self, data: &ProviderData, plan: TeamRepositoryModel) -> anyhow::Result<TeamRepositoryModel> {
        self.put(data, plan).await
    }

    async fn read(
        &self,
        data: &ProviderData,
        mut state: TeamRepositoryModel,
    ) -> anyhow::Result<Option<TeamRepositoryModel>> {
        let org = data.org(Self::TYPE_NAME)?;
        let Some(slug) = team_slug(data, org, &state.team_id).await.or_not_found()? else {
            return Ok(None);
        };

        let repo = data
            .client
            .get_team_repository(org, &slug, &data.owner, &state.repository)
            .await
            .or_not_found()
            .with_context(|| format!("Failed to read team {slug}'s access to {}/{}", data.owner, state.repository))?;

        Ok(repo.map(|repo| {
            state.permission = Some(repo.permission());
            state
        }))
    }

    async fn update(
        &self,
        data: &ProviderData,
        _prior: TeamRepositoryModel,
        plan: TeamRepositoryModel,
    ) -> anyhow::Result<TeamRepositoryModel> {
        self.put(data, plan).await
    }

    async fn delete(&self, data: &ProviderData, state: TeamRepositoryModel) -> anyhow::Result<()> {
        let org = data.org(Self::TYPE_NAME)?;
        let slug = team_slug(data, org, &state.team_id).await?;
        data.client
            .remove_team_repository(org, &slug, &data.owner, &state.repository)
            .await
            .with_context(|| format!("Failed to remove team {slug} from {}/{}", data.owner, state.repository))?;
        Ok(())
    }

    async fn import(&self, data: &ProviderData, id: &str) -> anyhow::Result<TeamRepositoryModel> {
        let addr = TeamChildAddr::from_id(id)?;
        let state = TeamRepositoryModel {
            team_id: addr.team,
            repository: addr.child,
            ..Default::default()
        };
        self.read(data, state).await?.ok_or_else(|| not_found(Self::TYPE_NAME, id))
    }
}
