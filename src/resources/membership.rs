use anyhow::{Context, bail};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    addr::{OrgMemberAddr, ResourceAddress},
    error::NotFoundExt,
    github_ext::{Conditional, orgs::OrgMembershipExt},
    resource::{ProviderData, Resource},
    resources::not_found,
    schema::{Attribute, Schema, Validator},
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MembershipModel {
    pub username: String,
    pub role: Option<String>,
    pub downgrade_on_destroy: Option<bool>,
    pub etag: Option<String>,
}

pub struct MembershipResource;

impl MembershipResource {
    async fn put(&self, data: &ProviderData, plan: MembershipModel) -> anyhow::Result<MembershipModel> {
        let org = data.org(Self::TYPE_NAME)?;
        let role = plan.role.as_deref().unwrap_or("member");
        let membership = data
            .client
            .set_org_membership(org, &plan.username, role)
            .await
            .with_context(|| format!("Failed to set {} as {role} of {org}", plan.username))?;
        tracing::info!("Set {} as {role} of {org} ({})", plan.username, membership.state);
        Ok(MembershipModel {
            role: Some(membership.role),
            etag: None,
            ..plan
        })
    }
}

#[async_trait]
impl Resource for MembershipResource {
    type Model = MembershipModel;

    const TYPE_NAME: &'static str = "github_membership";

    fn schema(&self) -> Schema {
        Schema::new("A user's membership in the configured organization.")
            .attr("username", Attribute::required_string().requires_replace())
            .attr(
                "role",
                Attribute::optional_string()
                    .default("member")
                    .validate(Validator::OneOf(&["member", "admin"])),
            )
            .attr(
                "downgrade_on_destroy",
                Attribute::optional_bool()
                    .default(false)
                    .describe("Demote to member on destroy instead of removing the user from the organization."),
            )
            .attr("etag", Attribute::computed_string())
    }

    async fn create(&self, data: &ProviderData, plan: MembershipModel) -> anyhow::Result<MembershipModel> {
        self.put(data, plan).await
    }

    async fn read(&self, data: &ProviderData, mut state: MembershipModel) -> anyhow::Result<Option<MembershipModel>> {
        let org = data.org(Self::TYPE_NAME)?;
        let response = data
            .client
            .get_org_membership(org, &state.username, state.etag.as_deref())
            .await
            .or_not_found()
            .with_context(|| format!("Failed to read {}'s membership of {org}", state.username))?;

        match response {
            None => Ok(None),
            Some(Conditional::NotModified) => Ok(Some(state)),
            Some(Conditional::Modified { value, etag }) => {
                state.role = Some(value.role);
                state.etag = etag;
                Ok(Some(state))
            }
        }
    }

    async fn update(
        &self,
        data: &ProviderData,
        _prior: MembershipModel,
        plan: MembershipModel,
    ) -> anyhow::Result<MembershipModel> {
        self.put(data, plan).await
    }

    async fn delete(&self, data: &ProviderData, state: MembershipModel) -> anyhow::Result<()> {
        let org = data.org(Self::TYPE_NAME)?;

        if state.downgrade_on_destroy == Some(true) {
            data.client
                .set_org_membership(org, &state.username, "member")
                .await
                .with_context(|| format!("Failed to downgrade {} in {org}", state.username))?;
            tracing::info!("Downgraded {} to member of {org}", state.username);
            return Ok(());
        }

        data.client
            .remove_org_membership(org, &state.username)
            .await
            .with_context(|| format!("Failed to remove {} from {org}", state.username))?;
        Ok(())
    }

    async fn import(&self, data: &ProviderData, id: &str) -> anyhow::Result<MembershipModel> {
        let addr = OrgMemberAddr::from_id(id)?;
        let org = data.org(Self::TYPE_NAME)?;
        if !addr.org.eq_ignore_ascii_case(org) {
            bail!("Cannot import {id:?}: the provider manages {org}, not {}", addr.org);
        }
        let state = MembershipModel {
            username: addr.username,
            downgrade_on_destroy: Some(false),
            ..Default::default()
        };
        self.read(data, state).await?.ok_or_else(|| not_found(Self::TYPE_NAME, id))
    }
}
