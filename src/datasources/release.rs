use anyhow::{Context, bail};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    diag::Diagnostics,
    github_ext::{
        Conditional,
        releases::{GitHubRelease, ReleaseExt},
    },
    resource::{DataSource, ProviderData},
    schema::{Attribute, Kind, Schema, Validator},
};

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReleaseDataModel {
    pub repository: String,
    pub owner: Option<String>,
    pub retrieve_by: String,
    pub release_tag: Option<String>,
    pub release_id: Option<u64>,
    pub tag_name: Option<String>,
    pub target_commitish: Option<String>,
    pub name: Option<String>,
    pub body: Option<String>,
    pub draft: Option<bool>,
    pub prerelease: Option<bool>,
    pub url: Option<String>,
    pub html_url: Option<String>,
    pub upload_url: Option<String>,
    pub assets_url: Option<String>,
    pub tarball_url: Option<String>,
    pub zipball_url: Option<String>,
    pub created_at: Option<String>,
    pub published_at: Option<String>,
    pub id: Option<String>,
}

impl ReleaseDataModel {
    fn apply_remote(mut self, release: GitHubRelease) -> Self {
        self.id = Some(release.id.to_string());
        self.release_id = Some(release.id);
        self.release_tag = Some(release.tag_name.clone());
        self.tag_name = Some(release.tag_name);
        self.target_commitish = Some(release.target_commitish);
        self.name = release.name;
        self.body = release.body;
        self.draft = Some(release.draft);
        self.prerelease = Some(release.prerelease);
        self.url = Some(release.url);
        self.html_url = Some(release.html_url);
        self.upload_url = Some(release.upload_url);
        self.assets_url = Some(release.assets_url);
        self.tarball_url = release.tarball_url;
        self.zipball_url = release.zipball_url;
        self.created_at = release.created_at;
        self.published_at = release.published_at;
        self
    }
}

pub struct ReleaseDataSource;

#[async_trait]
impl DataSource for ReleaseDataSource {
    type Model = ReleaseDataModel;

    const TYPE_NAME: &'static str = "github_release";

    fn schema(&self) -> Schema {
        let mut schema = Schema::new("Looks up a release by id, by tag, or the latest one.")
            .attr("repository", Attribute::required_string())
            .attr("owner", Attribute::optional_string().describe("Defaults to the configured owner."))
            .attr(
                "retrieve_by",
                Attribute::required_string().validate(Validator::OneOf(&["latest", "id", "tag"])),
            )
            .attr("release_tag", Attribute::optional_string().also_computed())
            .attr("release_id", Attribute::optional(Kind::Int).also_computed());
        for attr in [
            "tag_name",
            "target_commitish",
            "name",
            "body",
            "url",
            "html_url",
            "upload_url",
            "assets_url",
            "tarball_url",
            "zipball_url",
            "created_at",
            "published_at",
        ] {
            schema = schema.attr(attr, Attribute::computed_string());
        }
        schema
            .attr("draft", Attribute::computed(Kind::Bool))
            .attr("prerelease", Attribute::computed(Kind::Bool))
            .attr("id", Attribute::computed_string())
    }

    fn validate(&self, model: &ReleaseDataModel, diags: &mut Diagnostics) {
        match model.retrieve_by.as_str() {
            "tag" if model.release_tag.as_deref().is_none_or(str::is_empty) => diags.attribute_error(
                "release_tag",
                "Missing attribute",
                "release_tag must be set when retrieve_by is \"tag\"",
            ),
            "id" if model.release_id.is_none_or(|id| id == 0) => diags.attribute_error(
                "release_id",
                "Missing attribute",
                "release_id must be set when retrieve_by is \"id\"",
            ),
            _ => {}
        }
    }

    async fn read(&self, data: &ProviderData, config: ReleaseDataModel) -> anyhow::Result<ReleaseDataModel> {
        let owner = config.owner.clone().unwrap_or_else(|| data.owner.clone());
        let repo = config.repository.clone();

        let release = match (config.retrieve_by.as_str(), config.release_id, config.release_tag.as_deref()) {
            ("latest", _, _) => data
                .client
                .get_latest_release(&owner, &repo)
                .await
                .with_context(|| format!("Failed to read the latest release of {owner}/{repo}"))?,
            ("id", Some(id), _) => match data
                .client
                .get_release(&owner, &repo, id, None)
                .await
                .with_context(|| format!("Failed to read release {id} of {owner}/{repo}"))?
            {
                Conditional::Modified { value, .. } => value,
                Conditional::NotModified => bail!("GitHub answered 304 for release {id} without an ETag"),
            },
            ("tag", _, Some(tag)) => data
                .client
                .get_release_by_tag(&owner, &repo, tag)
                .await
                .with_context(|| format!("Failed to read release {tag} of {owner}/{repo}"))?,
            (other, _, _) => bail!("Cannot retrieve a release by {other:?} without the matching release_id or release_tag"),
        };

        Ok(config.apply_remote(release))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retrieve_by_requires_its_key() {
        let mut diags = Diagnostics::new();
        let model = ReleaseDataModel {
            repository: "widgets".into(),
            retrieve_by: "tag".into(),
            ..Default::default()
        };
        ReleaseDataSource.validate(&model, &mut diags);
        assert!(diags.has_error());

        let mut diags = Diagnostics::new();
        let model = ReleaseDataModel {
            repository: "widgets".into(),
            retrieve_by: "id".into(),
            release_id: Some(42),
            ..Default::default()
        };
        ReleaseDataSource.validate(&model, &mut diags);
        assert!(!diags.has_error());
    }
}
