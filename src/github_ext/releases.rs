use async_trait::async_trait;
use octocrab::{Octocrab, Result};
use serde::{Deserialize, Serialize};

use super::{Conditional, RestExt, enc};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GitHubRelease {
    pub id: u64,
    pub node_id: String,
    pub tag_name: String,
    pub target_commitish: String,
    pub name: Option<String>,
    pub body: Option<String>,
    pub draft: bool,
    pub prerelease: bool,
    pub url: String,
    pub html_url: String,
    pub upload_url: String,
    pub assets_url: String,
    pub tarball_url: Option<String>,
    pub zipball_url: Option<String>,
    pub created_at: Option<String>,
    pub published_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReleaseRequest {
    pub tag_name: String,
    pub target_commitish: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    pub draft: bool,
    pub prerelease: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generate_release_notes: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discussion_category_name: Option<String>,
}

#[async_trait]
pub trait ReleaseExt {
    async fn create_release(&self, owner: &str, repo: &str, release: &ReleaseRequest) -> Result<GitHubRelease>;
    async fn get_release(&self, owner: &str, repo: &str, id: u64, etag: Option<&str>)
    -> anyhow::Result<Conditional<GitHubRelease>>;
    async fn update_release(&self, owner: &str, repo: &str, id: u64, release: &ReleaseRequest) -> Result<GitHubRelease>;
    async fn delete_release(&self, owner: &str, repo: &str, id: u64) -> Result<()>;
    async fn get_latest_release(&self, owner: &str, repo: &str) -> Result<GitHubRelease>;
    async fn get_release_by_tag(&self, owner: &str, repo: &str, tag: &str) -> Result<GitHubRelease>;
}

#[async_trait]
impl ReleaseExt for Octocrab {
    async fn create_release(&self, owner: &str, repo: &str, release: &ReleaseRequest) -> Result<GitHubRelease> {
        let route = format!("/repos/{}/{}/releases", owner, repo);
        self.post(route, Some(release)).await
    }

    async fn get_release(
        &self,
        owner: &str,
        repo: &str,
        id: u64,
        etag: Option<&str>,
    ) -> anyhow::Result<Conditional<GitHubRelease>> {
        let route = format!("/repos/{}/{}/releases/{}", owner, repo, id);
        self.get_conditional(route, etag).await
    }

    async fn update_release(&self, owner: &str, repo: &str, id: u64, release: &ReleaseRequest) -> Result<GitHubRelease> {
        let route = format!("/repos/{}/{}/releases/{}", owner, repo, id);
        self.patch(route, Some(release)).await
    }

    async fn delete_release(&self, owner: &str, repo: &str, id: u64) -> Result<()> {
        let route = format!("/repos/{}/{}/releases/{}", owner, repo, id);
        self.delete_no_content(route).await
    }

    async fn get_latest_release(&self, owner: &str, repo: &str) -> Result<GitHubRelease> {
        let route = format!("/repos/{}/{}/releases/latest", owner, repo);
        self.get(route, None::<&()>).await
    }

    async fn get_release_by_tag(&self, owner: &str, repo: &str, tag: &str) -> Result<GitHubRelease> {
        let route = format!("/repos/{}/{}/releases/tags/{}", owner, repo, enc(tag));
        self.get(route, None::<&()>).await
    }
}
