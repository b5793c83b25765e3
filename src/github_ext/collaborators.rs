use async_trait::async_trait;
use octocrab::{Octocrab, Result};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use super::{PageQuery, RestExt};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GitHubCollaboratorPermissions {
    #[serde(default)]
    pub pull: bool,
    #[serde(default)]
    pub triage: bool,
    #[serde(default)]
    pub push: bool,
    #[serde(default)]
    pub maintain: bool,
    #[serde(default)]
    pub admin: bool,
}

impl GitHubCollaboratorPermissions {
    /// The highest role these flags grant, using the names the REST API accepts on write.
    pub fn highest(&self) -> &'static str {
        if self.admin {
            "admin"
        } else if self.maintain {
            "maintain"
        } else if self.push {
            "push"
        } else if self.triage {
            "triage"
        } else {
            "pull"
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubCollaborator {
    pub login: String,
    pub id: u64,
    #[serde(default)]
    pub permissions: Option<GitHubCollaboratorPermissions>,
    #[serde(default)]
    pub role_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubCollaboratorPermission {
    pub permission: String,
    #[serde(default)]
    pub role_name: Option<String>,
    pub user: Option<GitHubCollaborator>,
}

impl GitHubCollaboratorPermission {
    /// `role_name` carries write-side names (`push`, `maintain`, custom roles); the
    /// legacy `permission` field collapses them to read/write/admin.
    pub fn effective(&self) -> String {
        if let Some(user) = &self.user {
            if let Some(role) = user.role_name.as_deref().filter(|r| !r.is_empty()) {
                return normalize_role(role);
            }
        }
        match self.role_name.as_deref().filter(|r| !r.is_empty()) {
            Some(role) => normalize_role(role),
            None => normalize_role(&self.permission),
        }
    }
}

/// Maps the read-side role names to the ones accepted when adding a collaborator.
pub fn normalize_role(role: &str) -> String {
    match role {
        "read" => "pull".to_string(),
        "write" => "push".to_string(),
        other => other.to_string(),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubInvitee {
    pub login: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubInvitation {
    pub id: u64,
    pub invitee: Option<GitHubInvitee>,
    #[serde(default)]
    pub permissions: Option<String>,
}

#[derive(Debug, Serialize)]
struct AddCollaboratorRequest<'a> {
    permission: &'a str,
}

#[derive(Debug, Serialize)]
struct ListCollaboratorsQuery<'a> {
    affiliation: &'a str,
    per_page: u8,
    page: u32,
}

#[async_trait]
pub trait CollaboratorExt {
    async fn get_collaborator_permission(
        &self,
        owner: &str,
        repo: &str,
        username: &str,
    ) -> Result<GitHubCollaboratorPermission>;

    /// Adds or updates a collaborator. Returns the invitation when GitHub had to send one.
    async fn add_collaborator(
        &self,
        owner: &str,
        repo: &str,
        username: &str,
        permission: &str,
    ) -> anyhow::Result<Option<GitHubInvitation>>;

    async fn remove_collaborator(&self, owner: &str, repo: &str, username: &str) -> Result<()>;
    async fn list_collaborators(&self, owner: &str, repo: &str, affiliation: &str) -> Result<Vec<GitHubCollaborator>>;
    async fn list_invitations(&self, owner: &str, repo: &str) -> Result<Vec<GitHubInvitation>>;
    async fn update_invitation(&self, owner: &str, repo: &str, invitation_id: u64, permission: &str) -> Result<()>;
    async fn delete_invitation(&self, owner: &str, repo: &str, invitation_id: u64) -> Result<()>;
}

#[async_trait]
impl CollaboratorExt for Octocrab {
    async fn get_collaborator_permission(
        &self,
        owner: &str,
        repo: &str,
        username: &str,
    ) -> Result<GitHubCollaboratorPermission> {
        let route = format!("/repos/{}/{}/collaborators/{}/permission", owner, repo, username);
        self.get(route, None::<&()>).await
    }

    async fn add_collaborator(
        &self,
        owner: &str,
        repo: &str,
        username: &str,
        permission: &str,
    ) -> anyhow::Result<Option<GitHubInvitation>> {
        let route = format!("/repos/{}/{}/collaborators/{}", owner, repo, username);
        let response = self._put(route, Some(&AddCollaboratorRequest { permission })).await?;
        let response = octocrab::map_github_error(response).await?;

        if response.status() != StatusCode::CREATED {
            return Ok(None);
        }
        let body = self.body_to_string(response).await?;
        if body.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&body)?))
    }

    async fn remove_collaborator(&self, owner: &str, repo: &str, username: &str) -> Result<()> {
        let route = format!("/repos/{}/{}/collaborators/{}", owner, repo, username);
        self.delete_no_content(route).await
    }

    async fn list_collaborators(&self, owner: &str, repo: &str, affiliation: &str) -> Result<Vec<GitHubCollaborator>> {
        let route = format!("/repos/{}/{}/collaborators", owner, repo);
        let query = PageQuery::default();
        self.list_all_with(
            route,
            &ListCollaboratorsQuery {
                affiliation,
                per_page: query.per_page,
                page: query.page,
            },
        )
        .await
    }

    async fn list_invitations(&self, owner: &str, repo: &str) -> Result<Vec<GitHubInvitation>> {
        let route = format!("/repos/{}/{}/invitations", owner, repo);
        self.list_all(route).await
    }

    async fn update_invitation(&self, owner: &str, repo: &str, invitation_id: u64, permission: &str) -> Result<()> {
        let route = format!("/repos/{}/{}/invitations/{}", owner, repo, invitation_id);
        self.patch_no_content(route, &serde_json::json!({ "permissions": permission })).await
    }

    async fn delete_invitation(&self, owner: &str, repo: &str, invitation_id: u64) -> Result<()> {
        let route = format!("/repos/{}/{}/invitations/{}", owner, repo, invitation_id);
        self.delete_no_content(route).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effective_permission_prefers_role_name() {
        let p: GitHubCollaboratorPermission = serde_json::from_str(
            r#"{"permission":"write","role_name":"maintain","user":{"login":"octocat","id":1}}"#,
        )
        .unwrap();
        assert_eq!(p.effective(), "maintain");

        let p: GitHubCollaboratorPermission =
            serde_json::from_str(r#"{"permission":"write","user":{"login":"octocat","id":1}}"#).unwrap();
        assert_eq!(p.effective(), "push");

        let p: GitHubCollaboratorPermission =
            serde_json::from_str(r#"{"permission":"read","role_name":"","user":null}"#).unwrap();
        assert_eq!(p.effective(), "pull");
    }

    #[test]
    fn highest_permission() {
        let perms = GitHubCollaboratorPermissions {
            pull: true,
            triage: true,
            push: true,
            ..Default::default()
        };
        assert_eq!(perms.highest(), "push");
        assert_eq!(GitHubCollaboratorPermissions::default().highest(), "pull");
    }
}
