use async_trait::async_trait;
use octocrab::{Octocrab, Result};
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};

use super::{Conditional, RestExt, collaborators::GitHubCollaboratorPermissions};

/// Accept header that makes the team-repository check return the repository with
/// the team's permissions instead of an empty 204.
pub const REPOSITORY_MEDIA_TYPE: &str = "application/vnd.github.v3.repository+json";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GitHubTeamParent {
    pub id: u64,
    #[serde(default)]
    pub slug: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GitHubTeam {
    pub id: u64,
    pub node_id: String,
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub privacy: Option<String>,
    pub permission: Option<String>,
    #[serde(default)]
    pub members_count: Option<u64>,
    #[serde(default)]
    pub parent: Option<GitHubTeamParent>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TeamRequest {
    pub name: String,
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub privacy: Option<String>,
    pub parent_team_id: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GitHubTeamMembership {
    pub role: String,
    pub state: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubTeamRepository {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    #[serde(default)]
    pub permissions: Option<GitHubCollaboratorPermissions>,
    #[serde(default)]
    pub role_name: Option<String>,
}

impl GitHubTeamRepository {
    /// The team's permission on the repository as accepted on write.
    pub fn permission(&self) -> String {
        match self.role_name.as_deref().filter(|r| !r.is_empty()) {
            Some(role) => super::collaborators::normalize_role(role),
            None => self
                .permissions
                .as_ref()
                .map(|p| p.highest().to_string())
                .unwrap_or_else(|| "pull".to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubTeamMember {
    pub login: String,
    pub id: u64,
}

#[derive(Debug, Deserialize)]
struct GitHubOrg {
    id: u64,
}

#[derive(Debug, Serialize)]
struct RoleRequest<'a> {
    role: &'a str,
}

#[derive(Debug, Serialize)]
struct PermissionRequest<'a> {
    permission: &'a str,
}

#[async_trait]
pub trait TeamExt {
    async fn create_team(&self, org: &str, team: &TeamRequest) -> Result<GitHubTeam>;
    async fn get_team(&self, org: &str, slug: &str, etag: Option<&str>) -> anyhow::Result<Conditional<GitHubTeam>>;
    async fn get_team_by_id(&self, org: &str, team_id: u64) -> anyhow::Result<GitHubTeam>;
    async fn update_team(&self, org: &str, slug: &str, team: &TeamRequest) -> Result<GitHubTeam>;
    async fn delete_team(&self, org: &str, slug: &str) -> Result<()>;
    async fn list_team_members(&self, org: &str, slug: &str) -> Result<Vec<GitHubTeamMember>>;

    async fn get_team_membership(
        &self,
        org: &str,
        slug: &str,
        username: &str,
        etag: Option<&str>,
    ) -> anyhow::Result<Conditional<GitHubTeamMembership>>;
    async fn set_team_membership(&self, org: &str, slug: &str, username: &str, role: &str) -> Result<GitHubTeamMembership>;
    async fn remove_team_membership(&self, org: &str, slug: &str, username: &str) -> Result<()>;

    async fn get_team_repository(
        &self,
        org: &str,
        slug: &str,
        owner: &str,
        repo: &str,
    ) -> anyhow::Result<GitHubTeamRepository>;
    async fn set_team_repository(&self, org: &str, slug: &str, owner: &str, repo: &str, permission: &str) -> Result<()>;
    async fn remove_team_repository(&self, org: &str, slug: &str, owner: &str, repo: &str) -> Result<()>;
}

#[async_trait]
impl TeamExt for Octocrab {
    async fn create_team(&self, org: &str, team: &TeamRequest) -> Result<GitHubTeam> {
        let route = format!("/orgs/{}/teams", org);
        self.post(route, Some(team)).await
    }

    async fn get_team(&self, org: &str, slug: &str, etag: Option<&str>) -> anyhow::Result<Conditional<GitHubTeam>> {
        let route = format!("/orgs/{}/teams/{}", org, slug);
        self.get_conditional(route, etag).await
    }

    async fn get_team_by_id(&self, org: &str, team_id: u64) -> anyhow::Result<GitHubTeam> {
        let org: GitHubOrg = self.get(format!("/orgs/{}", org), None::<&()>).await?;
        let route = format!("/organizations/{}/team/{}", org.id, team_id);
        Ok(self.get(route, None::<&()>).await?)
    }

    async fn update_team(&self, org: &str, slug: &str, team: &TeamRequest) -> Result<GitHubTeam> {
        let route = format!("/orgs/{}/teams/{}", org, slug);
        self.patch(route, Some(team)).await
    }

    async fn delete_team(&self, org: &str, slug: &str) -> Result<()> {
        let route = format!("/orgs/{}/teams/{}", org, slug);
        self.delete_no_content(route).await
    }

    async fn list_team_members(&self, org: &str, slug: &str) -> Result<Vec<GitHubTeamMember>> {
        let route = format!("/orgs/{}/teams/{}/members", org, slug);
        self.list_all(route).await
    }

    async fn get_team_membership(
        &self,
        org: &str,
        slug: &str,
        username: &str,
        etag: Option<&str>,
    ) -> anyhow::Result<Conditional<GitHubTeamMembership>> {
        let route = format!("/orgs/{}/teams/{}/memberships/{}", org, slug, username);
        self.get_conditional(route, etag).await
    }

    async fn set_team_membership(&self, org: &str, slug: &str, username: &str, role: &str) -> Result<GitHubTeamMembership> {
        let route = format!("/orgs/{}/teams/{}/memberships/{}", org, slug, username);
        self.put(route, Some(&RoleRequest { role })).await
    }

    async fn remove_team_membership(&self, org: &str, slug: &str, username: &str) -> Result<()> {
        let route = format!("/orgs/{}/teams/{}/memberships/{}", org, slug, username);
        self.delete_no_content(route).await
    }

    async fn get_team_repository(
        &self,
        org: &str,
        slug: &str,
        owner: &str,
        repo: &str,
    ) -> anyhow::Result<GitHubTeamRepository> {
        let route = format!("/orgs/{}/teams/{}/repos/{}/{}", org, slug, owner, repo);
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(REPOSITORY_MEDIA_TYPE));

        let response = self._get_with_headers(route.as_str(), Some(headers)).await?;
        let response = octocrab::map_github_error(response).await?;
        let body = self.body_to_string(response).await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn set_team_repository(&self, org: &str, slug: &str, owner: &str, repo: &str, permission: &str) -> Result<()> {
        let route = format!("/orgs/{}/teams/{}/repos/{}/{}", org, slug, owner, repo);
        self.put_no_content(route, &PermissionRequest { permission }).await
    }

    async fn remove_team_repository(&self, org: &str, slug: &str, owner: &str, repo: &str) -> Result<()> {
        let route = format!("/orgs/{}/teams/{}/repos/{}/{}", org, slug, owner, repo);
        self.delete_no_content(route).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn team_repository_permission() {
        let repo: GitHubTeamRepository = serde_json::from_str(
            r#"{"id":1296269,"name":"Hello-World","full_name":"octocat/Hello-World",
                "permissions":{"admin":false,"maintain":false,"push":true,"triage":true,"pull":true},
                "role_name":"write"}"#,
        )
        .unwrap();
        assert_eq!(repo.permission(), "push");

        let repo: GitHubTeamRepository = serde_json::from_str(
            r#"{"id":1,"name":"r","full_name":"o/r",
                "permissions":{"admin":false,"maintain":true,"push":true,"triage":true,"pull":true}}"#,
        )
        .unwrap();
        assert_eq!(repo.permission(), "maintain");
    }

    #[test]
    fn team_request_keeps_null_parent() {
        let body = serde_json::to_value(TeamRequest {
            name: "core".into(),
            ..Default::default()
        })
        .unwrap();
        assert!(body["parent_team_id"].is_null());
        assert!(body.get("privacy").is_none());
    }
}
