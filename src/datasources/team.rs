use anyhow::{Context, bail};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    github_ext::{Conditional, teams::TeamExt},
    resource::{DataSource, ProviderData},
    schema::{Attribute, Kind, Schema},
    util::non_empty,
};

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamDataModel {
    pub slug: String,
    pub summary_only: Option<bool>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub privacy: Option<String>,
    pub permission: Option<String>,
    pub node_id: Option<String>,
    pub members: Vec<String>,
    pub id: Option<String>,
}

pub struct TeamDataSource;

#[async_trait]
impl DataSource for TeamDataSource {
    type Model = TeamDataModel;

    const TYPE_NAME: &'static str = "github_team";

    fn schema(&self) -> Schema {
        Schema::new("Looks up a team of the configured organization by slug.")
            .attr("slug", Attribute::required_string())
            .attr(
                "summary_only",
                Attribute::optional_bool()
                    .default(false)
                    .describe("Skip listing the team's members."),
            )
            .attr("name", Attribute::computed_string())
            .attr("description", Attribute::computed_string())
            .attr("privacy", Attribute::computed_string())
            .attr("permission", Attribute::computed_string())
            .attr("node_id", Attribute::computed_string())
            .attr("members", Attribute::computed(Kind::list_of(Kind::String)))
            .attr("id", Attribute::computed_string())
    }

    async fn read(&self, data: &ProviderData, mut config: TeamDataModel) -> anyhow::Result<TeamDataModel> {
        let org = data.org(Self::TYPE_NAME)?;
        let team = match data
            .client
            .get_team(org, &config.slug, None)
            .await
            .with_context(|| format!("Failed to read team {} in {org}", config.slug))?
        {
            Conditional::Modified { value, .. } => value,
            Conditional::NotModified => bail!("GitHub answered 304 for team {} without an ETag", config.slug),
        };

        if config.summary_only != Some(true) {
            config.members = data
                .client
                .list_team_members(org, &team.slug)
                .await
                .with_context(|| format!("Failed to list members of team {} in {org}", team.slug))?
                .into_iter()
                .map(|m| m.login)
                .collect();
        }

        config.id = Some(team.id.to_string());
        config.name = Some(team.name);
        config.description = non_empty(team.description);
        config.privacy = team.privacy;
        config.permission = team.permission;
        config.node_id = Some(team.node_id);
        Ok(config)
    }
}
