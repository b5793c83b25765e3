use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    addr::{ResourceAddress, TeamChildAddr},
    error::NotFoundExt,
    github_ext::{Conditional, teams::TeamExt},
    resource::{ProviderData, Resource},
    resources::{not_found, team::team_slug},
    schema::{Attribute, Schema, Validator},
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamMembershipModel {
    pub team_id: String,
    pub username: String,
    pub role: Option<String>,
    pub etag: Option<String>,
}

pub struct TeamMembershipResource;

impl TeamMembershipResource {
    async fn put(&self, data: &ProviderData, plan: TeamMembershipModel) -> anyhow::Result<TeamMembershipModel> {
        let org = data.org(Self::TYPE_NAME)?;
        let slug = team_slug(data, org, &plan.team_id).await?;
        let role = plan.role.as_deref().unwrap_or("member");

        let membership = data
            .client
            .set_team_membership(org, &slug, &plan.username, role)
            .await
            .with_context(|| format!("Failed to add {} to team {slug}", plan.username))?;
        tracing::info!("Set {} as {} of team {slug} ({})", plan.username, membership.role, membership.state);

        Ok(TeamMembershipModel {
            role: Some(membership.role),
            etag: None,
            ..plan
        })
    }
}

#[async_trait]
impl Resource for TeamMembershipResource {
    type Model = TeamMembershipModel;

    const TYPE_NAME: &'static str = "github_team_membership";

    fn schema(&self) -> Schema {
        Schema::new("A user's membership in a team.")
            .attr(
                "team_id",
                Attribute::required_string()
                    .requires_replace()
                    .describe("The team's numeric id or slug."),
            )
            .attr("username", Attribute::required_string().requires_replace())
            .attr(
                "role",
                Attribute::optional_string()
                    .default("member")
                    .validate(Validator::OneOf(&["member", "maintainer"])),
            )
            .attr("etag", Attribute::computed_string())
    }

    async fn create(&self, data: &ProviderData, plan: TeamMembershipModel) -> anyhow::Result<TeamMembershipModel> {
        self.put(data, plan).await
    }

    async fn read(
        &self,
        data: &ProviderData,
        mut state: TeamMembershipModel,
    ) -> anyhow::Result<Option<TeamMembershipModel>> {
        let org = data.org(Self::TYPE_NAME)?;
        let Some(slug) = team_slug(data, org, &state.team_id).await.or_not_found()? else {
            return Ok(None);
        };

        let response = data
            .client
            .get_team_membership(org, &slug, &state.username, state.etag.as_deref())
            .await
            .or_not_found()
            .with_context(|| format!("Failed to read {}'s membership of team {slug}", state.username))?;

        match response {
            None => Ok(None),
            Some(Conditional::NotModified) => Ok(Some(state)),
            Some(Conditional::Modified { value, etag }) => {
                state.role = Some(value.role);
                state.etag = etag;
                Ok(Some(state))
            }
        }
    }

    async fn update(
        &self,
        data: &ProviderData,
        _prior: TeamMembershipModel,
        plan: TeamMembershipModel,
    ) -> anyhow::Result<TeamMembershipModel> {
        self.put(data, plan).await
    }

    async fn delete(&self, data: &ProviderData, state: TeamMembershipModel) -> anyhow::Result<()> {
        let org = data.org(Self::TYPE_NAME)?;
        let slug = team_slug(data, org, &state.team_id).await?;
        data.client
            .remove_team_membership(org, &slug, &state.username)
            .await
            .with_context(|| format!("Failed to remove {} from team {slug}", state.username))?;
        Ok(())
    }

    async fn import(&self, data: &ProviderData, id: &str) -> anyhow::Result<TeamMembershipModel> {
        let addr = TeamChildAddr::from_id(id)?;
        let state = TeamMembershipModel {
            team_id: addr.team,
            username: addr.child,
            ..Default::default()
        };
        self.read(data, state).await?.ok_or_else(|| not_found(Self::TYPE_NAME, id))
    }
}
