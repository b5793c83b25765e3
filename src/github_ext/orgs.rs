use async_trait::async_trait;
use octocrab::{Octocrab, Result};
use serde::{Deserialize, Serialize};

use super::{Conditional, RestExt};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GitHubOrgMembership {
    pub state: String,
    pub role: String,
}

#[derive(Debug, Serialize)]
struct MembershipRequest<'a> {
    role: &'a str,
}

#[async_trait]
pub trait OrgMembershipExt {
    async fn get_org_membership(
        &self,
        org: &str,
        username: &str,
        etag: Option<&str>,
    ) -> anyhow::Result<Conditional<GitHubOrgMembership>>;
    async fn set_org_membership(&self, org: &str, username: &str, role: &str) -> Result<GitHubOrgMembership>;
    async fn remove_org_membership(&self, org: &str, username: &str) -> Result<()>;
}

#[async_trait]
impl OrgMembershipExt for Octocrab {
    async fn get_org_membership(
        &self,
        org: &str,
        username: &str,
        etag: Option<&str>,
    ) -> anyhow::Result<Conditional<GitHubOrgMembership>> {
        let route = format!("/orgs/{}/memberships/{}", org, username);
        self.get_conditional(route, etag).await
    }

    async fn set_org_membership(&self, org: &str, username: &str, role: &str) -> Result<GitHubOrgMembership> {
        let route = format!("/orgs/{}/memberships/{}", org, username);
        self.put(route, Some(&MembershipRequest { role })).await
    }

    async fn remove_org_membership(&self, org: &str, username: &str) -> Result<()> {
        let route = format!("/orgs/{}/memberships/{}", org, username);
        self.delete_no_content(route).await
    }
}
