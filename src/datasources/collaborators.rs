use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    github_ext::collaborators::{CollaboratorExt, GitHubCollaborator, normalize_role},
    resource::{DataSource, ProviderData},
    schema::{Attribute, Kind, Schema, Validator},
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollaboratorSummary {
    pub login: String,
    pub id: u64,
    pub permission: String,
}

impl From<GitHubCollaborator> for CollaboratorSummary {
    fn from(c: GitHubCollaborator) -> Self {
        let permission = match c.role_name.as_deref().filter(|r| !r.is_empty()) {
            Some(role) => normalize_role(role),
            None => c
                .permissions
                .as_ref()
                .map(|p| p.highest().to_string())
                .unwrap_or_else(|| "pull".to_string()),
        };
        CollaboratorSummary {
            login: c.login,
            id: c.id,
            permission,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CollaboratorsDataModel {
    pub owner: Option<String>,
    pub repository: String,
    pub affiliation: Option<String>,
    pub collaborators: Vec<CollaboratorSummary>,
    pub id: Option<String>,
}

pub struct CollaboratorsDataSource;

#[async_trait]
impl DataSource for CollaboratorsDataSource {
    type Model = CollaboratorsDataModel;

    const TYPE_NAME: &'static str = "github_collaborators";

    fn schema(&self) -> Schema {
        Schema::new("Lists the collaborators of a repository.")
            .attr("owner", Attribute::optional_string().describe("Defaults to the configured owner."))
            .attr("repository", Attribute::required_string())
            .attr(
                "affiliation",
                Attribute::optional_string()
                    .default("all")
                    .validate(Validator::OneOf(&["all", "direct", "outside"])),
            )
            .attr(
                "collaborators",
                Attribute::computed(Kind::list_of(Kind::object(&[
                    ("login", Kind::String),
                    ("id", Kind::Int),
                    ("permission", Kind::String),
                ]))),
            )
            .attr("id", Attribute::computed_string())
    }

    async fn read(&self, data: &ProviderData, mut config: CollaboratorsDataModel) -> anyhow::Result<CollaboratorsDataModel> {
        let owner = config.owner.clone().unwrap_or_else(|| data.owner.clone());
        let affiliation = config.affiliation.clone().unwrap_or_else(|| "all".to_string());
        let collaborators = data
            .client
            .list_collaborators(&owner, &config.repository, &affiliation)
            .await
            .with_context(|| format!("Failed to list collaborators of {owner}/{}", config.repository))?;

        config.collaborators = collaborators.into_iter().map(CollaboratorSummary::from).collect();
        config.id = Some(format!("{owner}/{}", config.repository));
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_prefers_role_name() {
        let c: GitHubCollaborator = serde_json::from_str(
            r#"{"login":"octocat","id":1,"role_name":"write",
                "permissions":{"pull":true,"triage":true,"push":true,"maintain":false,"admin":false}}"#,
        )
        .unwrap();
        assert_eq!(CollaboratorSummary::from(c).permission, "push");

        let c: GitHubCollaborator = serde_json::from_str(
            r#"{"login":"hubot","id":2,"permissions":{"pull":true,"admin":true}}"#,
        )
        .unwrap();
        assert_eq!(CollaboratorSummary::from(c).permission, "admin");
    }
}
