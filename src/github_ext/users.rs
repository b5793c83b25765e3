use async_trait::async_trait;
use octocrab::{Octocrab, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GitHubUser {
    pub login: String,
    pub id: u64,
    pub node_id: String,
    pub avatar_url: String,
    pub name: Option<String>,
    pub company: Option<String>,
    pub blog: Option<String>,
    pub location: Option<String>,
    pub email: Option<String>,
    pub bio: Option<String>,
    #[serde(default)]
    pub public_repos: u64,
    #[serde(default)]
    pub followers: u64,
    #[serde(default)]
    pub following: u64,
    pub created_at: String,
    pub updated_at: String,
}

#[async_trait]
pub trait UserExt {
    async fn get_user(&self, username: &str) -> Result<GitHubUser>;
}

#[async_trait]
impl UserExt for Octocrab {
    async fn get_user(&self, username: &str) -> Result<GitHubUser> {
        let route = format!("/users/{}", username);
        self.get(route, None::<&()>).await
    }
}
