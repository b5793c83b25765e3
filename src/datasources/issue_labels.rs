use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    github_ext::labels::LabelExt,
    resource::{DataSource, ProviderData},
    schema::{Attribute, Kind, Schema},
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LabelSummary {
    pub name: String,
    pub color: String,
    pub description: Option<String>,
    pub url: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IssueLabelsDataModel {
    pub repository: String,
    pub labels: Vec<LabelSummary>,
    pub id: Option<String>,
}

pub struct IssueLabelsDataSource;

#[async_trait]
impl DataSource for IssueLabelsDataSource {
    type Model = IssueLabelsDataModel;

    const TYPE_NAME: &'static str = "github_issue_labels";

    fn schema(&self) -> Schema {
        Schema::new("Lists the issue labels of a repository.")
            .attr("repository", Attribute::required_string())
            .attr(
                "labels",
                Attribute::computed(Kind::list_of(Kind::object(&[
                    ("name", Kind::String),
                    ("color", Kind::String),
                    ("description", Kind::String),
                    ("url", Kind::String),
                ]))),
            )
            .attr("id", Attribute::computed_string())
    }

    async fn read(&self, data: &ProviderData, mut config: IssueLabelsDataModel) -> anyhow::Result<IssueLabelsDataModel> {
        let labels = data
            .client
            .list_labels(&data.owner, &config.repository)
            .await
            .with_context(|| format!("Failed to list labels of {}/{}", data.owner, config.repository))?;
        config.labels = labels
            .into_iter()
            .map(|l| LabelSummary {
                name: l.name,
                color: l.color,
                description: l.description,
                url: l.url,
            })
            .collect();
        config.id = Some(config.repository.clone());
        Ok(config)
    }
}
