use async_trait::async_trait;
use octocrab::{Octocrab, Result};
use serde::{Deserialize, Serialize};

use super::{Conditional, RestExt, enc};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GitHubLabel {
    pub id: u64,
    pub name: String,
    pub color: String,
    pub description: Option<String>,
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LabelRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_name: Option<String>,
    pub color: String,
    pub description: Option<String>,
}

#[async_trait]
pub trait LabelExt {
    async fn create_label(&self, owner: &str, repo: &str, label: &LabelRequest) -> Result<GitHubLabel>;
    async fn get_label(&self, owner: &str, repo: &str, name: &str, etag: Option<&str>)
    -> anyhow::Result<Conditional<GitHubLabel>>;
    async fn update_label(&self, owner: &str, repo: &str, name: &str, label: &LabelRequest) -> Result<GitHubLabel>;
    async fn delete_label(&self, owner: &str, repo: &str, name: &str) -> Result<()>;
    async fn list_labels(&self, owner: &str, repo: &str) -> Result<Vec<GitHubLabel>>;
}

#[async_trait]
impl LabelExt for Octocrab {
    async fn create_label(&self, owner: &str, repo: &str, label: &LabelRequest) -> Result<GitHubLabel> {
        let route = format!("/repos/{}/{}/labels", owner, repo);
        self.post(route, Some(label)).await
    }

    async fn get_label(
        &self,
        owner: &str,
        repo: &str,
        name: &str,
        etag: Option<&str>,
    ) -> anyhow::Result<Conditional<GitHubLabel>> {
        let route = format!("/repos/{}/{}/labels/{}", owner, repo, enc(name));
        self.get_conditional(route, etag).await
    }

    async fn update_label(&self, owner: &str, repo: &str, name: &str, label: &LabelRequest) -> Result<GitHubLabel> {
        let route = format!("/repos/{}/{}/labels/{}", owner, repo, enc(name));
        self.patch(route, Some(label)).await
    }

    async fn delete_label(&self, owner: &str, repo: &str, name: &str) -> Result<()> {
        let route = format!("/repos/{}/{}/labels/{}", owner, repo, enc(name));
        self.delete_no_content(route).await
    }

    async fn list_labels(&self, owner: &str, repo: &str) -> Result<Vec<GitHubLabel>> {
        let route = format!("/repos/{}/{}/labels", owner, repo);
        self.list_all(route).await
    }
}
