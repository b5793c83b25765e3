use async_trait::async_trait;
use octocrab::{Octocrab, Result};
use serde::{Deserialize, Serialize};

use super::RestExt;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GitHubCustomRole {
    pub id: u64,
    pub name: String,
    pub description: Option<String>,
    pub base_role: String,
    #[serde(default)]
    pub permissions: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CustomRoleRequest {
    pub name: String,
    pub description: Option<String>,
    pub base_role: String,
    pub permissions: Vec<String>,
}

#[async_trait]
pub trait CustomRoleExt {
    async fn create_custom_role(&self, org: &str, role: &CustomRoleRequest) -> Result<GitHubCustomRole>;
    async fn get_custom_role(&self, org: &str, id: u64) -> Result<GitHubCustomRole>;
    async fn update_custom_role(&self, org: &str, id: u64, role: &CustomRoleRequest) -> Result<GitHubCustomRole>;
    async fn delete_custom_role(&self, org: &str, id: u64) -> Result<()>;
    async fn list_custom_roles(&self, org: &str) -> anyhow::Result<Vec<GitHubCustomRole>>;
}

#[async_trait]
impl CustomRoleExt for Octocrab {
    async fn create_custom_role(&self, org: &str, role: &CustomRoleRequest) -> Result<GitHubCustomRole> {
        let route = format!("/orgs/{}/custom-repository-roles", org);
        self.post(route, Some(role)).await
    }

    async fn get_custom_role(&self, org: &str, id: u64) -> Result<GitHubCustomRole> {
        let route = format!("/orgs/{}/custom-repository-roles/{}", org, id);
        self.get(route, None::<&()>).await
    }

    async fn update_custom_role(&self, org: &str, id: u64, role: &CustomRoleRequest) -> Result<GitHubCustomRole> {
        let route = format!("/orgs/{}/custom-repository-roles/{}", org, id);
        self.patch(route, Some(role)).await
    }

    async fn delete_custom_role(&self, org: &str, id: u64) -> Result<()> {
        let route = format!("/orgs/{}/custom-repository-roles/{}", org, id);
        self.delete_no_content(route).await
    }

    async fn list_custom_roles(&self, org: &str) -> anyhow::Result<Vec<GitHubCustomRole>> {
        let route = format!("/orgs/{}/custom-repository-roles", org);
        self.list_all_wrapped(route, "custom_roles").await
    }
}
