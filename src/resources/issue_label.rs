use anyhow::Context;
use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{
    addr::{RepoChildAddr, ResourceAddress},
    error::NotFoundExt,
    github_ext::{
        Conditional,
        labels::{GitHubLabel, LabelExt, LabelRequest},
    },
    resource::{ProviderData, Resource},
    resources::not_found,
    schema::{Attribute, Schema, Validator},
    util::non_empty,
};

lazy_static! {
    static ref LABEL_COLOR: Regex = Regex::new(r"^#?[0-9A-Fa-f]{6}$").unwrap();
}

/// The color as GitHub stores it: six lowercase hex digits, no `#`.
pub(crate) fn canonical_color(color: &str) -> String {
    color.trim_start_matches('#').to_ascii_lowercase()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IssueLabelModel {
    pub repository: String,
    pub name: String,
    pub color: String,
    pub description: Option<String>,
    pub url: Option<String>,
    pub etag: Option<String>,
}

impl IssueLabelModel {
    fn apply_remote(mut self, label: GitHubLabel, etag: Option<String>) -> Self {
        self.name = label.name;
        // Keep the configured spelling when it means the same color.
        if canonical_color(&self.color) != canonical_color(&label.color) {
            self.color = label.color;
        }
        self.description = non_empty(label.description);
        self.url = Some(label.url);
        self.etag = etag;
        self
    }
}

pub struct IssueLabelResource;

#[async_trait]
impl Resource for IssueLabelResource {
    type Model = IssueLabelModel;

    const TYPE_NAME: &'static str = "github_issue_label";

    fn schema(&self) -> Schema {
        Schema::new("An issue label of a repository.")
            .attr("repository", Attribute::required_string().requires_replace())
            .attr("name", Attribute::required_string())
            .attr(
                "color",
                Attribute::required_string()
                    .validate(Validator::Regex(&LABEL_COLOR, "must be a six-digit hex color")),
            )
            .attr("description", Attribute::optional_string())
            .attr("url", Attribute::computed_string())
            .attr("etag", Attribute::computed_string())
    }

    fn modify_plan(&self, prior: Option<&IssueLabelModel>, planned: &mut IssueLabelModel) {
        if let Some(prior) = prior {
            if canonical_color(&prior.color) == canonical_color(&planned.color) {
                planned.color = prior.color.clone();
            }
        }
    }

    async fn create(&self, data: &ProviderData, plan: IssueLabelModel) -> anyhow::Result<IssueLabelModel> {
        let request = LabelRequest {
            name: Some(plan.name.clone()),
            new_name: None,
            color: canonical_color(&plan.color),
            description: plan.description.clone(),
        };
        let label = data
            .client
            .create_label(&data.owner, &plan.repository, &request)
            .await
            .with_context(|| format!("Failed to create label {} in {}/{}", plan.name, data.owner, plan.repository))?;
        tracing::info!("Created label {} in {}/{}", label.name, data.owner, plan.repository);
        Ok(plan.apply_remote(label, None))
    }

    async fn read(&self, data: &ProviderData, state: IssueLabelModel) -> anyhow::Result<Option<IssueLabelModel>> {
        let response = data
            .client
            .get_label(&data.owner, &state.repository, &state.name, state.etag.as_deref())
            .await
            .or_not_found()
            .with_context(|| format!("Failed to read label {} in {}/{}", state.name, data.owner, state.repository))?;

        Ok(match response {
            None => None,
            Some(Conditional::NotModified) => Some(state),
            Some(Conditional::Modified { value, etag }) => Some(state.apply_remote(value, etag)),
        })
    }

    async fn update(&self, data: &ProviderData, prior: IssueLabelModel, plan: IssueLabelModel) -> anyhow::Result<IssueLabelModel> {
        let request = LabelRequest {
            name: None,
            new_name: (prior.name != plan.name).then(|| plan.name.clone()),
            color: canonical_color(&plan.color),
            description: Some(plan.description.clone().unwrap_or_default()),
        };
        let label = data
            .client
            .update_label(&data.owner, &plan.repository, &prior.name, &request)
            .await
            .with_context(|| format!("Failed to update label {} in {}/{}", prior.name, data.owner, plan.repository))?;
        tracing::info!("Updated label {} in {}/{}", label.name, data.owner, plan.repository);
        Ok(plan.apply_remote(label, None))
    }

    async fn delete(&self, data: &ProviderData, state: IssueLabelModel) -> anyhow::Result<()> {
        data.client
            .delete_label(&data.owner, &state.repository, &state.name)
            .await
            .with_context(|| format!("Failed to delete label {} in {}/{}", state.name, data.owner, state.repository))?;
        Ok(())
    }

    async fn import(&self, data: &ProviderData, id: &str) -> anyhow::Result<IssueLabelModel> {
        let addr = RepoChildAddr::from_id(id)?;
        let state = IssueLabelModel {
            repository: addr.repo,
            name: addr.child,
            ..Default::default()
        };
        self.read(data, state).await?.ok_or_else(|| not_found(Self::TYPE_NAME, id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_spelling_is_suppressed() {
        let prior = IssueLabelModel {
            color: "#FF0000".into(),
            ..Default::default()
        };
        let mut planned = IssueLabelModel {
            color: "ff0000".into(),
            ..Default::default()
        };
        IssueLabelResource.modify_plan(Some(&prior), &mut planned);
        assert_eq!(planned.color, "#FF0000");

        planned.color = "00ff00".into();
        IssueLabelResource.modify_plan(Some(&prior), &mut planned);
        assert_eq!(planned.color, "00ff00");
    }

    #[test]
    fn read_keeps_configured_spelling() {
        let label = GitHubLabel {
            id: 208045946,
            name: "bug".into(),
            color: "f29513".into(),
            description: Some("Something isn't working".into()),
            url: "https://api.github.com/repos/octocat/Hello-World/labels/bug".into(),
        };
        let state = IssueLabelModel {
            color: "#F29513".into(),
            ..Default::default()
        }
        .apply_remote(label, None);
        assert_eq!(state.color, "#F29513");
        assert_eq!(state.description.as_deref(), Some("Something isn't working"));
    }
}
