use anyhow::{Context, bail};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    error::NotFoundExt,
    github_ext::{
        Conditional,
        teams::{GitHubTeam, TeamExt, TeamRequest},
    },
    resource::{ProviderData, Resource},
    resources::not_found,
    schema::{Attribute, Kind, Schema, Validator},
    util::non_empty,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamModel {
    pub name: String,
    pub description: Option<String>,
    pub privacy: Option<String>,
    pub parent_team_id: Option<u64>,
    pub slug: Option<String>,
    pub node_id: Option<String>,
    pub team_id: Option<u64>,
    pub members_count: Option<u64>,
    pub etag: Option<String>,
}

impl TeamModel {
    fn apply_remote(mut self, team: GitHubTeam, etag: Option<String>) -> Self {
        self.name = team.name;
        self.description = non_empty(team.description);
        self.privacy = team.privacy.or(self.privacy);
        self.parent_team_id = team.parent.map(|p| p.id);
        self.slug = Some(team.slug);
        self.node_id = Some(team.node_id);
        self.team_id = Some(team.id);
        self.members_count = team.members_count.or(self.members_count);
        self.etag = etag;
        self
    }

    fn to_request(&self) -> TeamRequest {
        TeamRequest {
            name: self.name.clone(),
            description: self.description.clone(),
            privacy: self.privacy.clone(),
            parent_team_id: self.parent_team_id,
        }
    }
}

/// Resolves a team reference that may be a numeric id or a slug to the slug.
pub(crate) async fn team_slug(data: &ProviderData, org: &str, team: &str) -> anyhow::Result<String> {
    match team.parse::<u64>() {
        Ok(id) => Ok(data
            .client
            .get_team_by_id(org, id)
            .await
            .with_context(|| format!("Failed to look up team {id} in {org}"))?
            .slug),
        Err(_) => Ok(team.to_string()),
    }
}

pub struct TeamResource;

#[async_trait]
impl Resource for TeamResource {
    type Model = TeamModel;

    const TYPE_NAME: &'static str = "github_team";

    fn schema(&self) -> Schema {
        Schema::new("A team in the configured organization.")
            .attr("name", Attribute::required_string())
            .attr("description", Attribute::optional_string())
            .attr(
                "privacy",
                Attribute::optional_string()
                    .default("secret")
                    .validate(Validator::OneOf(&["secret", "closed"])),
            )
            .attr("parent_team_id", Attribute::optional(Kind::Int))
            .attr("slug", Attribute::computed_string())
            .attr("node_id", Attribute::computed_string())
            .attr("team_id", Attribute::computed(Kind::Int))
            .attr("members_count", Attribute::computed(Kind::Int))
            .attr("etag", Attribute::computed_string())
    }

    fn validate(&self, model: &TeamModel, diags: &mut crate::diag::Diagnostics) {
        if model.parent_team_id.is_some() && model.privacy.as_deref() == Some("secret") {
            diags.attribute_error(
                "privacy",
                "Invalid attribute combination",
                "Nested teams must be closed; set privacy = \"closed\" when parent_team_id is set",
            );
        }
    }

    async fn create(&self, data: &ProviderData, plan: TeamModel) -> anyhow::Result<TeamModel> {
        let org = data.org(Self::TYPE_NAME)?;
        let team = data
            .client
            .create_team(org, &plan.to_request())
            .await
            .with_context(|| format!("Failed to create team {} in {org}", plan.name))?;
        tracing::info!("Created team {} ({}) in {org}", team.slug, team.id);
        Ok(plan.apply_remote(team, None))
    }

    async fn read(&self, data: &ProviderData, state: TeamModel) -> anyhow::Result<Option<TeamModel>> {
        let org = data.org(Self::TYPE_NAME)?;

        let slug = match (&state.slug, state.team_id) {
            (Some(slug), _) => slug.clone(),
            (None, Some(id)) => match data.client.get_team_by_id(org, id).await.or_not_found()? {
                Some(team) => team.slug,
                None => return Ok(None),
            },
            (None, None) => bail!("Team {} has neither a slug nor an id in state", state.name),
        };

        let response = data
            .client
            .get_team(org, &slug, state.etag.as_deref())
            .await
            .or_not_found()
            .with_context(|| format!("Failed to read team {slug} in {org}"))?;

        Ok(match response {
            None => None,
            Some(Conditional::NotModified) => Some(state),
            Some(Conditional::Modified { value, etag }) => Some(state.apply_remote(value, etag)),
        })
    }

    async fn update(&self, data: &ProviderData, prior: TeamModel, plan: TeamModel) -> anyhow::Result<TeamModel> {
        let org = data.org(Self::TYPE_NAME)?;
        let Some(slug) = prior.slug.as_deref() else {
            bail!("Team {} has no slug in state", prior.name);
        };
        let team = data
            .client
            .update_team(org, slug, &plan.to_request())
            .await
            .with_context(|| format!("Failed to update team {slug} in {org}"))?;
        tracing::info!("Updated team {slug} in {org}");
        Ok(plan.apply_remote(team, None))
    }

    async fn delete(&self, data: &ProviderData, state: TeamModel) -> anyhow::Result<()> {
        let org = data.org(Self::TYPE_NAME)?;
        let Some(slug) = state.slug.as_deref() else {
            bail!("Team {} has no slug in state", state.name);
        };
        data.client
            .delete_team(org, slug)
            .await
            .with_context(|| format!("Failed to delete team {slug} in {org}"))?;
        Ok(())
    }

    async fn import(&self, data: &ProviderData, id: &str) -> anyhow::Result<TeamModel> {
        if id.is_empty() {
            return Err(crate::error::invalid_id(id, "<team_id> or <team_slug>"));
        }
        let state = match id.parse::<u64>() {
            Ok(team_id) => TeamModel {
                team_id: Some(team_id),
                ..Default::default()
            },
            Err(_) => TeamModel {
                slug: Some(id.to_string()),
                ..Default::default()
            },
        };
        self.read(data, state).await?.ok_or_else(|| not_found(Self::TYPE_NAME, id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag::Diagnostics;

    #[test]
    fn maps_team_response() {
        let team: GitHubTeam = serde_json::from_str(
            r#"{"id":1,"node_id":"MDQ6VGVhbTE=","slug":"justice-league","name":"Justice League",
                "description":"A great team.","privacy":"closed","permission":"admin",
                "members_count":3,"parent":{"id":7,"slug":"heroes"}}"#,
        )
        .unwrap();
        let state = TeamModel::default().apply_remote(team, Some("\"e1\"".into()));
        assert_eq!(state.slug.as_deref(), Some("justice-league"));
        assert_eq!(state.parent_team_id, Some(7));
        assert_eq!(state.members_count, Some(3));
        assert_eq!(state.etag.as_deref(), Some("\"e1\""));
    }

    #[test]
    fn nested_teams_cannot_be_secret() {
        let mut diags = Diagnostics::new();
        let model = TeamModel {
            name: "child".into(),
            privacy: Some("secret".into()),
            parent_team_id: Some(7),
            ..Default::default()
        };
        TeamResource.validate(&model, &mut diags);
        assert!(diags.has_error());
    }
}
