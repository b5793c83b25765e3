use anyhow::{Context, bail};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    addr::{RepoChildAddr, ResourceAddress, parse_numeric},
    error::NotFoundExt,
    github_ext::{
        Conditional,
        releases::{GitHubRelease, ReleaseExt, ReleaseRequest},
    },
    resource::{ProviderData, Resource},
    resources::not_found,
    schema::{Attribute, Kind, Schema},
    util::non_empty,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReleaseModel {
    pub repository: String,
    pub tag_name: String,
    pub target_commitish: Option<String>,
    pub name: Option<String>,
    pub body: Option<String>,
    pub draft: Option<bool>,
    pub prerelease: Option<bool>,
    pub generate_release_notes: Option<bool>,
    pub discussion_category_name: Option<String>,
    pub release_id: Option<u64>,
    pub node_id: Option<String>,
    pub url: Option<String>,
    pub html_url: Option<String>,
    pub upload_url: Option<String>,
    pub tarball_url: Option<String>,
    pub zipball_url: Option<String>,
    pub assets_url: Option<String>,
    pub created_at: Option<String>,
    pub published_at: Option<String>,
    pub etag: Option<String>,
}

impl ReleaseModel {
    fn to_request(&self) -> ReleaseRequest {
        ReleaseRequest {
            tag_name: self.tag_name.clone(),
            target_commitish: self.target_commitish.clone().unwrap_or_else(|| "main".into()),
            name: self.name.clone(),
            body: self.body.clone(),
            draft: self.draft.unwrap_or(true),
            prerelease: self.prerelease.unwrap_or(true),
            generate_release_notes: self.generate_release_notes,
            discussion_category_name: self.discussion_category_name.clone(),
        }
    }

    fn apply_remote(mut self, release: GitHubRelease, etag: Option<String>) -> Self {
        self.tag_name = release.tag_name;
        self.target_commitish = Some(release.target_commitish);
        self.name = non_empty(release.name).or(self.name.filter(|n| n.is_empty()));
        // Generated notes are GitHub's text, not ours; refreshing them would show as drift.
        if self.generate_release_notes != Some(true) {
            self.body = non_empty(release.body).or(self.body.filter(|b| b.is_empty()));
        }
        self.draft = Some(release.draft);
        self.prerelease = Some(release.prerelease);
        self.release_id = Some(release.id);
        self.node_id = Some(release.node_id);
        self.url = Some(release.url);
        self.html_url = Some(release.html_url);
        self.upload_url = Some(release.upload_url);
        self.tarball_url = release.tarball_url;
        self.zipball_url = release.zipball_url;
        self.assets_url = Some(release.assets_url);
        self.created_at = release.created_at;
        self.published_at = release.published_at;
        self.etag = etag;
        self
    }
}

pub struct ReleaseResource;

impl ReleaseResource {
    fn release_id(state: &ReleaseModel) -> anyhow::Result<u64> {
        match state.release_id {
            Some(id) => Ok(id),
            None => bail!("Release {} in {} has no release_id in state", state.tag_name, state.repository),
        }
    }
}

#[async_trait]
impl Resource for ReleaseResource {
    type Model = ReleaseModel;

    const TYPE_NAME: &'static str = "github_release";

    fn schema(&self) -> Schema {
        Schema::new("A release of a repository.")
            .attr("repository", Attribute::required_string().requires_replace())
            .attr("tag_name", Attribute::required_string())
            .attr("target_commitish", Attribute::optional_string().default("main"))
            .attr("name", Attribute::optional_string())
            .attr("body", Attribute::optional_string())
            .attr("draft", Attribute::optional_bool().default(true))
            .attr("prerelease", Attribute::optional_bool().default(true))
            .attr(
                "generate_release_notes",
                Attribute::optional_bool()
                    .default(false)
                    .describe("Let GitHub write the release body from merged pull requests."),
            )
            .attr("discussion_category_name", Attribute::optional_string())
            .attr("release_id", Attribute::computed(Kind::Int))
            .attr("node_id", Attribute::computed_string())
            .attr("url", Attribute::computed_string())
            .attr("html_url", Attribute::computed_string())
            .attr("upload_url", Attribute::computed_string())
            .attr("tarball_url", Attribute::computed_string())
            .attr("zipball_url", Attribute::computed_string())
            .attr("assets_url", Attribute::computed_string())
            .attr("created_at", Attribute::computed_string())
            .attr("published_at", Attribute::computed_string())
            .attr("etag", Attribute::computed_string())
    }

    async fn create(&self, data: &ProviderData, plan: ReleaseModel) -> anyhow::Result<ReleaseModel> {
        let release = data
            .client
            .create_release(&data.owner, &plan.repository, &plan.to_request())
            .await
            .with_context(|| format!("Failed to create release {} in {}/{}", plan.tag_name, data.owner, plan.repository))?;
        tracing::info!("Created release {} ({}) in {}/{}", release.tag_name, release.id, data.owner, plan.repository);
        Ok(plan.apply_remote(release, None))
    }

    async fn read(&self, data: &ProviderData, state: ReleaseModel) -> anyhow::Result<Option<ReleaseModel>> {
        let id = Self::release_id(&state)?;
        let response = data
            .client
            .get_release(&data.owner, &state.repository, id, state.etag.as_deref())
            .await
            .or_not_found()
            .with_context(|| format!("Failed to read release {id} in {}/{}", data.owner, state.repository))?;

        Ok(match response {
            None => None,
            Some(Conditional::NotModified) => Some(state),
            Some(Conditional::Modified { value, etag }) => Some(state.apply_remote(value, etag)),
        })
    }

    async fn update(&self, data: &ProviderData, prior: ReleaseModel, plan: ReleaseModel) -> anyhow::Result<ReleaseModel> {
        let id = Self::release_id(&prior)?;
        let release = data
            .client
            .update_release(&data.owner, &plan.repository, id, &plan.to_request())
            .await
            .with_context(|| format!("Failed to update release {id} in {}/{}", data.owner, plan.repository))?;
        tracing::info!("Updated release {} ({id}) in {}/{}", release.tag_name, data.owner, plan.repository);
        Ok(plan.apply_remote(release, None))
    }

    async fn delete(&self, data: &ProviderData, state: ReleaseModel) -> anyhow::Result<()> {
        let id = Self::release_id(&state)?;
        data.client
            .delete_release(&data.owner, &state.repository, id)
            .await
            .with_context(|| format!("Failed to delete release {id} in {}/{}", data.owner, state.repository))?;
        Ok(())
    }

    async fn import(&self, data: &ProviderData, id: &str) -> anyhow::Result<ReleaseModel> {
        let addr = RepoChildAddr::from_id(id)?;
        let release_id = parse_numeric(id, &addr.child, "<repository>:<release_id>")?;
        let state = ReleaseModel {
            repository: addr.repo,
            release_id: Some(release_id),
            generate_release_notes: Some(false),
            ..Default::default()
        };
        self.read(data, state).await?.ok_or_else(|| not_found(Self::TYPE_NAME, id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> GitHubRelease {
        serde_json::from_str(
            r#"{"id":1,"node_id":"MDc6UmVsZWFzZTE=","tag_name":"v1.0.0","target_commitish":"master",
                "name":"v1.0.0","body":"Description of the release","draft":false,"prerelease":false,
                "url":"https://api.github.com/repos/octocat/Hello-World/releases/1",
                "html_url":"https://github.com/octocat/Hello-World/releases/v1.0.0",
                "upload_url":"https://uploads.github.com/repos/octocat/Hello-World/releases/1/assets{?name,label}",
                "assets_url":"https://api.github.com/repos/octocat/Hello-World/releases/1/assets",
                "tarball_url":"https://api.github.com/repos/octocat/Hello-World/tarball/v1.0.0",
                "zipball_url":"https://api.github.com/repos/octocat/Hello-World/zipball/v1.0.0",
                "created_at":"2013-02-27T19:35:32Z","published_at":"2013-02-27T19:35:32Z"}"#,
        )
        .unwrap()
    }

    #[test]
    fn request_uses_defaults() {
        let model = ReleaseModel {
            tag_name: "v1.0.0".into(),
            ..Default::default()
        };
        let request = model.to_request();
        assert_eq!(request.target_commitish, "main");
        assert!(request.draft);
        assert!(request.prerelease);
    }

    #[test]
    fn maps_release_response() {
        let state = ReleaseModel::default().apply_remote(fixture(), Some("\"abc\"".into()));
        assert_eq!(state.release_id, Some(1));
        assert_eq!(state.target_commitish.as_deref(), Some("master"));
        assert_eq!(state.draft, Some(false));
        assert_eq!(state.body.as_deref(), Some("Description of the release"));
        assert_eq!(state.etag.as_deref(), Some("\"abc\""));
    }

    #[test]
    fn generated_body_is_not_refreshed() {
        let state = ReleaseModel {
            generate_release_notes: Some(true),
            ..Default::default()
        }
        .apply_remote(fixture(), None);
        assert_eq!(state.body, None);
    }
}
