//! OIDC subject claim templates for Actions tokens.
//!
//! Neither scope has a delete endpoint: destroying one of these resets the
//! setting to GitHub's default.

use anyhow::{Context, bail};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    addr::{RepoAddr, ResourceAddress},
    diag::Diagnostics,
    error::NotFoundExt,
    github_ext::actions::{ActionsExt, OidcSubjectClaim},
    resource::{ProviderData, Resource},
    resources::not_found,
    schema::{Attribute, Kind, Schema, Validator},
};

pub(crate) const DEFAULT_CLAIM_KEYS: &[&str] = &["repo", "context"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepoOidcTemplateModel {
    pub repository: String,
    pub use_default: bool,
    pub include_claim_keys: Option<Vec<String>>,
}

impl RepoOidcTemplateModel {
    fn to_claim(&self) -> OidcSubjectClaim {
        OidcSubjectClaim {
            use_default: Some(self.use_default),
            include_claim_keys: if self.use_default {
                None
            } else {
                self.include_claim_keys.clone()
            },
        }
    }
}

pub struct RepoOidcTemplateResource;

impl RepoOidcTemplateResource {
    async fn put(&self, data: &ProviderData, plan: RepoOidcTemplateModel) -> anyhow::Result<RepoOidcTemplateModel> {
        data.client
            .put_repo_oidc_subject_claim(&data.owner, &plan.repository, &plan.to_claim())
            .await
            .with_context(|| format!("Failed to set the OIDC subject claim template of {}/{}", data.owner, plan.repository))?;
        tracing::info!("Set the OIDC subject claim template of {}/{}", data.owner, plan.repository);
        Ok(plan)
    }
}

#[async_trait]
impl Resource for RepoOidcTemplateResource {
    type Model = RepoOidcTemplateModel;

    const TYPE_NAME: &'static str = "github_actions_repository_oidc_subject_claim_customization_template";

    fn schema(&self) -> Schema {
        Schema::new("The OIDC subject claim template of a repository.")
            .attr("repository", Attribute::required_string().requires_replace())
            .attr(
                "use_default",
                Attribute::required(Kind::Bool).describe("Use the organization's template instead of include_claim_keys."),
            )
            .attr("include_claim_keys", Attribute::optional(Kind::list_of(Kind::String)))
    }

    fn validate(&self, model: &RepoOidcTemplateModel, diags: &mut Diagnostics) {
        let has_keys = model.include_claim_keys.as_ref().is_some_and(|keys| !keys.is_empty());
        if !model.use_default && !has_keys {
            diags.attribute_error(
                "include_claim_keys",
                "Missing attribute",
                "include_claim_keys must be set when use_default is false",
            );
        }
    }

    async fn create(&self, data: &ProviderData, plan: RepoOidcTemplateModel) -> anyhow::Result<RepoOidcTemplateModel> {
        self.put(data, plan).await
    }

    async fn read(&self, data: &ProviderData, mut state: RepoOidcTemplateModel) -> anyhow::Result<Option<RepoOidcTemplateModel>> {
        let claim = data
            .client
            .get_repo_oidc_subject_claim(&data.owner, &state.repository)
            .await
            .or_not_found()
            .with_context(|| format!("Failed to read the OIDC subject claim template of {}/{}", data.owner, state.repository))?;

        let Some(claim) = claim else {
            return Ok(None);
        };
        state.use_default = claim.use_default.unwrap_or(true);
        if !state.use_default {
            state.include_claim_keys = claim.include_claim_keys;
        }
        Ok(Some(state))
    }

    async fn update(
        &self,
        data: &ProviderData,
        _prior: RepoOidcTemplateModel,
        plan: RepoOidcTemplateModel,
    ) -> anyhow::Result<RepoOidcTemplateModel> {
        self.put(data, plan).await
    }

    async fn delete(&self, data: &ProviderData, state: RepoOidcTemplateModel) -> anyhow::Result<()> {
        let reset = OidcSubjectClaim {
            use_default: Some(true),
            include_claim_keys: None,
        };
        data.client
            .put_repo_oidc_subject_claim(&data.owner, &state.repository, &reset)
            .await
            .with_context(|| format!("Failed to reset the OIDC subject claim template of {}/{}", data.owner, state.repository))?;
        tracing::info!("Reset the OIDC subject claim template of {}/{} to the default", data.owner, state.repository);
        Ok(())
    }

    async fn import(&self, data: &ProviderData, id: &str) -> anyhow::Result<RepoOidcTemplateModel> {
        let addr = RepoAddr::from_id(id)?;
        let state = RepoOidcTemplateModel {
            repository: addr.repo,
            ..Default::default()
        };
        self.read(data, state).await?.ok_or_else(|| not_found(Self::TYPE_NAME, id))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrgOidcTemplateModel {
    pub include_claim_keys: Vec<String>,
}

pub struct OrgOidcTemplateResource;

impl OrgOidcTemplateResource {
    async fn put(&self, data: &ProviderData, keys: Vec<String>) -> anyhow::Result<()> {
        let org = data.org(Self::TYPE_NAME)?;
        let claim = OidcSubjectClaim {
            use_default: None,
            include_claim_keys: Some(keys),
        };
        data.client
            .put_org_oidc_subject_claim(org, &claim)
            .await
            .with_context(|| format!("Failed to set the OIDC subject claim template of {org}"))?;
        Ok(())
    }
}

#[async_trait]
impl Resource for OrgOidcTemplateResource {
    type Model = OrgOidcTemplateModel;

    const TYPE_NAME: &'static str = "github_actions_organization_oidc_subject_claim_customization_template";

    fn schema(&self) -> Schema {
        Schema::new("The OIDC subject claim template of the configured organization.").attr(
            "include_claim_keys",
            Attribute::required(Kind::list_of(Kind::String)).validate(Validator::LengthBetween(1, usize::MAX)),
        )
    }

    async fn create(&self, data: &ProviderData, plan: OrgOidcTemplateModel) -> anyhow::Result<OrgOidcTemplateModel> {
        self.put(data, plan.include_claim_keys.clone()).await?;
        tracing::info!("Set the organization OIDC subject claim template to {:?}", plan.include_claim_keys);
        Ok(plan)
    }

    async fn read(&self, data: &ProviderData, mut state: OrgOidcTemplateModel) -> anyhow::Result<Option<OrgOidcTemplateModel>> {
        let org = data.org(Self::TYPE_NAME)?;
        let claim = data
            .client
            .get_org_oidc_subject_claim(org)
            .await
            .or_not_found()
            .with_context(|| format!("Failed to read the OIDC subject claim template of {org}"))?;

        Ok(claim.map(|claim| {
            state.include_claim_keys = claim.include_claim_keys.unwrap_or_default();
            state
        }))
    }

    async fn update(
        &self,
        data: &ProviderData,
        _prior: OrgOidcTemplateModel,
        plan: OrgOidcTemplateModel,
    ) -> anyhow::Result<OrgOidcTemplateModel> {
        self.create(data, plan).await
    }

    async fn delete(&self, data: &ProviderData, _state: OrgOidcTemplateModel) -> anyhow::Result<()> {
        let defaults = DEFAULT_CLAIM_KEYS.iter().map(|k| k.to_string()).collect();
        self.put(data, defaults).await?;
        tracing::info!("Reset the organization OIDC subject claim template to the default");
        Ok(())
    }

    async fn import(&self, data: &ProviderData, id: &str) -> anyhow::Result<OrgOidcTemplateModel> {
        let org = data.org(Self::TYPE_NAME)?;
        if !id.eq_ignore_ascii_case(org) {
            bail!("Cannot import {id:?}: the provider manages {org}; use the organization name as the ID");
        }
        self.read(data, OrgOidcTemplateModel::default())
            .await?
            .ok_or_else(|| not_found(Self::TYPE_NAME, id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_required_without_default() {
        let mut diags = Diagnostics::new();
        let model = RepoOidcTemplateModel {
            repository: "widgets".into(),
            use_default: false,
            include_claim_keys: None,
        };
        RepoOidcTemplateResource.validate(&model, &mut diags);
        assert!(diags.has_error());
    }

    #[test]
    fn default_template_drops_keys_from_request() {
        let model = RepoOidcTemplateModel {
            repository: "widgets".into(),
            use_default: true,
            include_claim_keys: Some(vec!["repo".into()]),
        };
        let body = serde_json::to_value(model.to_claim()).unwrap();
        assert_eq!(body, serde_json::json!({"use_default": true}));
    }
}
