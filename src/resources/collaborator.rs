use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    addr::{RepoChildAddr, ResourceAddress},
    error::{NotFoundExt, is_not_found},
    github_ext::collaborators::{CollaboratorExt, GitHubInvitation, normalize_role},
    resource::{ProviderData, Resource},
    resources::not_found,
    schema::{Attribute, Kind, Schema},
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollaboratorModel {
    pub repository: String,
    pub username: String,
    pub permission: Option<String>,
    pub permission_diff_suppression: Option<bool>,
    pub invitation_id: Option<u64>,
}

/// Whether GitHub treats the two roles as equivalent for organization-owned
/// repositories, where `triage` and `maintain` may be reported as `pull` and `push`.
fn equivalent_roles(a: &str, b: &str) -> bool {
    matches!(
        (a, b),
        ("triage", "pull") | ("pull", "triage") | ("maintain", "push") | ("push", "maintain")
    )
}

/// Invitations use `read`/`write` where collaborators use `pull`/`push`.
fn invitation_permission(permission: &str) -> &str {
    match permission {
        "pull" => "read",
        "push" => "write",
        other => other,
    }
}

fn is_invitee(invitation: &GitHubInvitation, username: &str) -> bool {
    invitation
        .invitee
        .as_ref()
        .is_some_and(|i| i.login.eq_ignore_ascii_case(username))
}

pub struct CollaboratorResource;

impl CollaboratorResource {
    async fn pending_invitation(
        &self,
        data: &ProviderData,
        repo: &str,
        username: &str,
    ) -> anyhow::Result<Option<GitHubInvitation>> {
        let invitations = data
            .client
            .list_invitations(&data.owner, repo)
            .await
            .with_context(|| format!("Failed to list invitations on {}/{repo}", data.owner))?;
        Ok(invitations.into_iter().find(|i| is_invitee(i, username)))
    }
}

#[async_trait]
impl Resource for CollaboratorResource {
    type Model = CollaboratorModel;

    const TYPE_NAME: &'static str = "github_repository_collaborator";

    fn schema(&self) -> Schema {
        Schema::new("A user with direct access to a repository, or a pending invitation for one.")
            .attr("repository", Attribute::required_string().requires_replace())
            .attr("username", Attribute::required_string().requires_replace())
            .attr(
                "permission",
                Attribute::optional_string()
                    .default("push")
                    .describe("One of pull, triage, push, maintain, admin, or the name of a custom repository role."),
            )
            .attr(
                "permission_diff_suppression",
                Attribute::optional_bool()
                    .default(false)
                    .describe("Ignore triage/pull and maintain/push differences."),
            )
            .attr("invitation_id", Attribute::computed(Kind::Int))
    }

    fn modify_plan(&self, prior: Option<&CollaboratorModel>, planned: &mut CollaboratorModel) {
        let Some(prior) = prior else {
            return;
        };
        if planned.permission_diff_suppression != Some(true) {
            return;
        }
        if let (Some(old), Some(new)) = (&prior.permission, &planned.permission) {
            if equivalent_roles(old, new) {
                planned.permission = prior.permission.clone();
            }
        }
    }

    async fn create(&self, data: &ProviderData, plan: CollaboratorModel) -> anyhow::Result<CollaboratorModel> {
        let owner = &data.owner;
        let permission = plan.permission.as_deref().unwrap_or("push");

        let invitation = data
            .client
            .add_collaborator(owner, &plan.repository, &plan.username, permission)
            .await
            .with_context(|| format!("Failed to add {} to {owner}/{}", plan.username, plan.repository))?;

        match &invitation {
            Some(invitation) => tracing::info!(
                "Invited {} to {owner}/{} as {permission} (invitation {})",
                plan.username,
                plan.repository,
                invitation.id
            ),
            None => tracing::info!("Added {} to {owner}/{} as {permission}", plan.username, plan.repository),
        }

        Ok(CollaboratorModel {
            invitation_id: invitation.map(|i| i.id),
            ..plan
        })
    }

    async fn read(&self, data: &ProviderData, mut state: CollaboratorModel) -> anyhow::Result<Option<CollaboratorModel>> {
        let owner = &data.owner;
        let permission = data
            .client
            .get_collaborator_permission(owner, &state.repository, &state.username)
            .await
            .or_not_found()
            .with_context(|| format!("Failed to read {}'s access to {owner}/{}", state.username, state.repository))?;

        if let Some(permission) = permission.map(|p| p.effective()).filter(|p| p != "none") {
            state.permission = Some(permission);
            state.invitation_id = None;
            return Ok(Some(state));
        }

        match self.pending_invitation(data, &state.repository, &state.username).await? {
            Some(invitation) => {
                state.invitation_id = Some(invitation.id);
                if let Some(permission) = invitation.permissions.as_deref() {
                    state.permission = Some(normalize_role(permission));
                }
                Ok(Some(state))
            }
            None => Ok(None),
        }
    }

    async fn update(
        &self,
        data: &ProviderData,
        prior: CollaboratorModel,
        plan: CollaboratorModel,
    ) -> anyhow::Result<CollaboratorModel> {
        let owner = &data.owner;
        let permission = plan.permission.as_deref().unwrap_or("push");

        if let Some(invitation_id) = prior.invitation_id {
            data.client
                .update_invitation(owner, &plan.repository, invitation_id, invitation_permission(permission))
                .await
                .with_context(|| format!("Failed to update invitation {invitation_id} on {owner}/{}", plan.repository))?;
            return Ok(CollaboratorModel {
                invitation_id: Some(invitation_id),
                ..plan
            });
        }

        self.create(data, plan).await
    }

    async fn delete(&self, data: &ProviderData, state: CollaboratorModel) -> anyhow::Result<()> {
        let owner = &data.owner;

        match data
            .client
            .remove_collaborator(owner, &state.repository, &state.username)
            .await
        {
            Ok(()) => {}
            Err(e) => {
                let e = anyhow::Error::from(e);
                if !is_not_found(&e) {
                    return Err(e.context(format!("Failed to remove {} from {owner}/{}", state.username, state.repository)));
                }
            }
        }

        if let Some(invitation) = self.pending_invitation(data, &state.repository, &state.username).await? {
            data.client
                .delete_invitation(owner, &state.repository, invitation.id)
                .await
                .with_context(|| format!("Failed to cancel invitation {} on {owner}/{}", invitation.id, state.repository))?;
        }
        Ok(())
    }

    async fn import(&self, data: &ProviderData, id: &str) -> anyhow::Result<CollaboratorModel> {
        let addr = RepoChildAddr::from_id(id)?;
        let state = CollaboratorModel {
            repository: addr.repo,
            username: addr.child,
            permission_diff_suppression: Some(false),
            ..Default::default()
        };
        self.read(data, state).await?.ok_or_else(|| not_found(Self::TYPE_NAME, id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(permission: &str, suppress: bool) -> CollaboratorModel {
        CollaboratorModel {
            repository: "widgets".into(),
            username: "octocat".into(),
            permission: Some(permission.into()),
            permission_diff_suppression: Some(suppress),
            invitation_id: None,
        }
    }

    #[test]
    fn suppression_keeps_equivalent_prior_role() {
        let prior = model("maintain", true);
        let mut planned = model("push", true);
        CollaboratorResource.modify_plan(Some(&prior), &mut planned);
        assert_eq!(planned.permission.as_deref(), Some("maintain"));

        let mut planned = model("admin", true);
        CollaboratorResource.modify_plan(Some(&prior), &mut planned);
        assert_eq!(planned.permission.as_deref(), Some("admin"));
    }

    #[test]
    fn no_suppression_without_the_flag() {
        let prior = model("triage", false);
        let mut planned = model("pull", false);
        CollaboratorResource.modify_plan(Some(&prior), &mut planned);
        assert_eq!(planned.permission.as_deref(), Some("pull"));
    }

    #[test]
    fn invitation_permissions_use_read_write() {
        assert_eq!(invitation_permission("push"), "write");
        assert_eq!(invitation_permission("pull"), "read");
        assert_eq!(invitation_permission("maintain"), "maintain");
    }
}
