//! Actions secrets at repository, organization and environment scope.
//!
//! Values are write-only on GitHub, so state keeps what was sent and drift is
//! detected from `updated_at`. When a secret changed outside of this provider and
//! `destroy_on_drift` is set, read clears the values so the next plan recreates it.

use anyhow::{Context, bail};
use async_trait::async_trait;
use lazy_static::lazy_static;
use octocrab::Octocrab;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{
    addr::{RepoChildAddr, RepoEnvChildAddr, ResourceAddress},
    crypto::seal_secret,
    diag::Diagnostics,
    error::NotFoundExt,
    github_ext::actions::{ActionsExt, ActionsScope, GitHubSecret, PutSecretRequest},
    resource::{ProviderData, Resource},
    resources::{normalize_opt_set, not_found, observed_set},
    schema::{Attribute, Kind, Schema, Validator},
};

lazy_static! {
    pub(crate) static ref SECRET_NAME: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
    static ref BASE64: Regex = Regex::new(r"^[A-Za-z0-9+/]*={0,2}$").unwrap();
}

pub(crate) const ORG_VISIBILITIES: &[&str] = &["all", "private", "selected"];

/// Attributes every secret resource shares.
fn value_attributes(schema: Schema, name_attr: &str) -> Schema {
    schema
        .attr(
            name_attr,
            Attribute::required_string()
                .requires_replace()
                .validate(Validator::Regex(
                    &SECRET_NAME,
                    "must contain only letters, digits and underscores, and not start with a digit",
                )),
        )
        .attr(
            "plaintext_value",
            Attribute::optional_string()
                .sensitive()
                .requires_replace()
                .validate(Validator::ConflictsWith(&["encrypted_value"])),
        )
        .attr(
            "encrypted_value",
            Attribute::optional_string()
                .sensitive()
                .requires_replace()
                .validate(Validator::Regex(&BASE64, "must be base64-encoded")),
        )
        .attr(
            "destroy_on_drift",
            Attribute::optional_bool()
                .default(true)
                .describe("Recreate the secret when it was changed outside of this provider."),
        )
        .attr("created_at", Attribute::computed_string())
        .attr("updated_at", Attribute::computed_string())
}

pub(crate) fn validate_secret_name(attribute: &str, name: &str, diags: &mut Diagnostics) {
    if name.to_ascii_uppercase().starts_with("GITHUB_") {
        diags.attribute_error(
            attribute,
            "Invalid secret name",
            format!("{name}: secret names must not start with GITHUB_"),
        );
    }
}

/// Encrypts the value for the scope's public key and PUTs it, then reads back the timestamps.
async fn put_value(
    client: &Octocrab,
    scope: ActionsScope<'_>,
    name: &str,
    plaintext: Option<&str>,
    encrypted: Option<&str>,
    visibility: Option<String>,
    selected_repository_ids: Option<Vec<u64>>,
) -> anyhow::Result<GitHubSecret> {
    let key = client
        .get_public_key(scope)
        .await
        .context("Failed to fetch the Actions public key")?;

    let encrypted_value = match (plaintext, encrypted) {
        (Some(plaintext), _) => seal_secret(&key.key, plaintext)?,
        (None, Some(encrypted)) => encrypted.to_string(),
        (None, None) => bail!("Secret {name} has no value; set plaintext_value or encrypted_value"),
    };

    client
        .put_secret(
            scope,
            name,
            &PutSecretRequest {
                encrypted_value,
                key_id: key.key_id,
                visibility,
                selected_repository_ids,
            },
        )
        .await
        .with_context(|| format!("Failed to write secret {name}"))?;

    client
        .get_secret(scope, name)
        .await
        .with_context(|| format!("Failed to read back secret {name}"))
}

/// The shared value fields of the three secret models.
struct SecretValues<'a> {
    plaintext_value: &'a mut Option<String>,
    encrypted_value: &'a mut Option<String>,
    destroy_on_drift: Option<bool>,
    created_at: &'a mut Option<String>,
    updated_at: &'a mut Option<String>,
}

impl SecretValues<'_> {
    fn observe(self, name: &str, remote: &GitHubSecret) {
        let drifted = self.updated_at.as_deref().is_some_and(|seen| seen != remote.updated_at);
        if drifted && self.destroy_on_drift != Some(false) {
            tracing::warn!("Secret {name} was updated outside of this provider, it will be recreated");
            *self.plaintext_value = None;
            *self.encrypted_value = None;
        }
        *self.created_at = Some(remote.created_at.clone());
        *self.updated_at = Some(remote.updated_at.clone());
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepoSecretModel {
    pub repository: String,
    pub secret_name: String,
    pub plaintext_value: Option<String>,
    pub encrypted_value: Option<String>,
    pub destroy_on_drift: Option<bool>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl RepoSecretModel {
    fn values(&mut self) -> SecretValues<'_> {
        SecretValues {
            plaintext_value: &mut self.plaintext_value,
            encrypted_value: &mut self.encrypted_value,
            destroy_on_drift: self.destroy_on_drift,
            created_at: &mut self.created_at,
            updated_at: &mut self.updated_at,
        }
    }
}

pub struct RepoSecretResource;

impl RepoSecretResource {
    async fn put(&self, data: &ProviderData, mut plan: RepoSecretModel) -> anyhow::Result<RepoSecretModel> {
        let scope = ActionsScope::Repo {
            owner: &data.owner,
            repo: &plan.repository,
        };
        let remote = put_value(
            &data.client,
            scope,
            &plan.secret_name,
            plan.plaintext_value.as_deref(),
            plan.encrypted_value.as_deref(),
            None,
            None,
        )
        .await?;
        tracing::info!("Wrote secret {} on {}/{}", plan.secret_name, data.owner, plan.repository);
        plan.created_at = Some(remote.created_at);
        plan.updated_at = Some(remote.updated_at);
        Ok(plan)
    }
}

#[async_trait]
impl Resource for RepoSecretResource {
    type Model = RepoSecretModel;

    const TYPE_NAME: &'static str = "github_actions_secret";

    fn schema(&self) -> Schema {
        let schema = Schema::new("An Actions secret on a repository.")
            .attr("repository", Attribute::required_string().requires_replace());
        value_attributes(schema, "secret_name")
    }

    fn validate(&self, model: &RepoSecretModel, diags: &mut Diagnostics) {
        validate_secret_name("secret_name", &model.secret_name, diags);
    }

    async fn create(&self, data: &ProviderData, plan: RepoSecretModel) -> anyhow::Result<RepoSecretModel> {
        self.put(data, plan).await
    }

    async fn read(&self, data: &ProviderData, mut state: RepoSecretModel) -> anyhow::Result<Option<RepoSecretModel>> {
        let scope = ActionsScope::Repo {
            owner: &data.owner,
            repo: &state.repository,
        };
        let remote = data
            .client
            .get_secret(scope, &state.secret_name)
            .await
            .or_not_found()
            .with_context(|| format!("Failed to read secret {} on {}/{}", state.secret_name, data.owner, state.repository))?;

        let Some(remote) = remote else {
            return Ok(None);
        };
        let name = state.secret_name.clone();
        state.values().observe(&name, &remote);
        Ok(Some(state))
    }

    async fn update(&self, data: &ProviderData, _prior: RepoSecretModel, plan: RepoSecretModel) -> anyhow::Result<RepoSecretModel> {
        self.put(data, plan).await
    }

    async fn delete(&self, data: &ProviderData, state: RepoSecretModel) -> anyhow::Result<()> {
        let scope = ActionsScope::Repo {
            owner: &data.owner,
            repo: &state.repository,
        };
        data.client
            .delete_secret(scope, &state.secret_name)
            .await
            .with_context(|| format!("Failed to delete secret {} on {}/{}", state.secret_name, data.owner, state.repository))?;
        Ok(())
    }

    async fn import(&self, data: &ProviderData, id: &str) -> anyhow::Result<RepoSecretModel> {
        let addr = RepoChildAddr::from_id(id)?;
        let state = RepoSecretModel {
            repository: addr.repo,
            secret_name: addr.child,
            destroy_on_drift: Some(true),
            ..Default::default()
        };
        self.read(data, state).await?.ok_or_else(|| not_found(Self::TYPE_NAME, id))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrgSecretModel {
    pub secret_name: String,
    pub plaintext_value: Option<String>,
    pub encrypted_value: Option<String>,
    pub visibility: String,
    pub selected_repository_ids: Option<Vec<u64>>,
    pub destroy_on_drift: Option<bool>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl OrgSecretModel {
    fn values(&mut self) -> SecretValues<'_> {
        SecretValues {
            plaintext_value: &mut self.plaintext_value,
            encrypted_value: &mut self.encrypted_value,
            destroy_on_drift: self.destroy_on_drift,
            created_at: &mut self.created_at,
            updated_at: &mut self.updated_at,
        }
    }
}

/// `selected_repository_ids` only means something with `visibility = "selected"`.
pub(crate) fn validate_selected_repositories(visibility: &str, selected: &Option<Vec<u64>>, diags: &mut Diagnostics) {
    if visibility != "selected" && selected.as_ref().is_some_and(|ids| !ids.is_empty()) {
        diags.attribute_error(
            "selected_repository_ids",
            "Invalid attribute combination",
            format!("selected_repository_ids can only be set when visibility is \"selected\", not {visibility:?}"),
        );
    }
}

pub struct OrgSecretResource;

impl OrgSecretResource {
    async fn put(&self, data: &ProviderData, mut plan: OrgSecretModel) -> anyhow::Result<OrgSecretModel> {
        let org = data.org(Self::TYPE_NAME)?;
        let selected = (plan.visibility == "selected").then(|| plan.selected_repository_ids.clone().unwrap_or_default());
        let remote = put_value(
            &data.client,
            ActionsScope::Org { org },
            &plan.secret_name,
            plan.plaintext_value.as_deref(),
            plan.encrypted_value.as_deref(),
            Some(plan.visibility.clone()),
            selected,
        )
        .await?;
        tracing::info!("Wrote organization secret {} on {org}", plan.secret_name);
        plan.created_at = Some(remote.created_at);
        plan.updated_at = Some(remote.updated_at);
        Ok(plan)
    }
}

#[async_trait]
impl Resource for OrgSecretResource {
    type Model = OrgSecretModel;

    const TYPE_NAME: &'static str = "github_actions_organization_secret";

    fn schema(&self) -> Schema {
        value_attributes(Schema::new("An Actions secret shared across an organization."), "secret_name")
            .attr(
                "visibility",
                Attribute::required_string().validate(Validator::OneOf(ORG_VISIBILITIES)),
            )
            .attr("selected_repository_ids", Attribute::optional(Kind::set_of(Kind::Int)))
    }

    fn validate(&self, model: &OrgSecretModel, diags: &mut Diagnostics) {
        validate_secret_name("secret_name", &model.secret_name, diags);
        validate_selected_repositories(&model.visibility, &model.selected_repository_ids, diags);
    }

    fn modify_plan(&self, _prior: Option<&OrgSecretModel>, planned: &mut OrgSecretModel) {
        normalize_opt_set(&mut planned.selected_repository_ids);
    }

    async fn create(&self, data: &ProviderData, plan: OrgSecretModel) -> anyhow::Result<OrgSecretModel> {
        self.put(data, plan).await
    }

    async fn read(&self, data: &ProviderData, mut state: OrgSecretModel) -> anyhow::Result<Option<OrgSecretModel>> {
        let org = data.org(Self::TYPE_NAME)?;
        let remote = data
            .client
            .get_secret(ActionsScope::Org { org }, &state.secret_name)
            .await
            .or_not_found()
            .with_context(|| format!("Failed to read organization secret {} on {org}", state.secret_name))?;

        let Some(remote) = remote else {
            return Ok(None);
        };
        if let Some(visibility) = &remote.visibility {
            state.visibility = visibility.clone();
        }
        if state.visibility == "selected" {
            let ids = data
                .client
                .list_org_secret_repositories(org, &state.secret_name)
                .await
                .with_context(|| format!("Failed to list repositories for secret {}", state.secret_name))?;
            state.selected_repository_ids = observed_set(&state.selected_repository_ids, ids);
        }
        let name = state.secret_name.clone();
        state.values().observe(&name, &remote);
        Ok(Some(state))
    }

    async fn update(&self, data: &ProviderData, _prior: OrgSecretModel, plan: OrgSecretModel) -> anyhow::Result<OrgSecretModel> {
        self.put(data, plan).await
    }

    async fn delete(&self, data: &ProviderData, state: OrgSecretModel) -> anyhow::Result<()> {
        let org = data.org(Self::TYPE_NAME)?;
        data.client
            .delete_secret(ActionsScope::Org { org }, &state.secret_name)
            .await
            .with_context(|| format!("Failed to delete organization secret {} on {org}", state.secret_name))?;
        Ok(())
    }

    async fn import(&self, data: &ProviderData, id: &str) -> anyhow::Result<OrgSecretModel> {
        if id.is_empty() || id.contains(':') {
            return Err(crate::error::invalid_id(id, "<secret_name>"));
        }
        let state = OrgSecretModel {
            secret_name: id.to_string(),
            destroy_on_drift: Some(true),
            ..Default::default()
        };
        self.read(data, state).await?.ok_or_else(|| not_found(Self::TYPE_NAME, id))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvSecretModel {
    pub repository: String,
    pub environment: String,
    pub secret_name: String,
    pub plaintext_value: Option<String>,
    pub encrypted_value: Option<String>,
    pub destroy_on_drift: Option<bool>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl EnvSecretModel {
    fn scope<'a>(&'a self, owner: &'a str) -> ActionsScope<'a> {
        ActionsScope::Environment {
            owner,
            repo: &self.repository,
            environment: &self.environment,
        }
    }
}

pub struct EnvSecretResource;

impl EnvSecretResource {
    async fn put(&self, data: &ProviderData, mut plan: EnvSecretModel) -> anyhow::Result<EnvSecretModel> {
        let remote = put_value(
            &data.client,
            plan.scope(&data.owner),
            &plan.secret_name,
            plan.plaintext_value.as_deref(),
            plan.encrypted_value.as_deref(),
            None,
            None,
        )
        .await?;
        tracing::info!(
            "Wrote secret {} on {}/{} environment {}",
            plan.secret_name,
            data.owner,
            plan.repository,
            plan.environment
        );
        plan.created_at = Some(remote.created_at);
        plan.updated_at = Some(remote.updated_at);
        Ok(plan)
    }
}

#[async_trait]
impl Resource for EnvSecretResource {
    type Model = EnvSecretModel;

    const TYPE_NAME: &'static str = "github_actions_environment_secret";

    fn schema(&self) -> Schema {
        let schema = Schema::new("An Actions secret on a deployment environment.")
            .attr("repository", Attribute::required_string().requires_replace())
            .attr("environment", Attribute::required_string().requires_replace());
        value_attributes(schema, "secret_name")
    }

    fn validate(&self, model: &EnvSecretModel, diags: &mut Diagnostics) {
        validate_secret_name("secret_name", &model.secret_name, diags);
    }

    async fn create(&self, data: &ProviderData, plan: EnvSecretModel) -> anyhow::Result<EnvSecretModel> {
        self.put(data, plan).await
    }

    async fn read(&self, data: &ProviderData, mut state: EnvSecretModel) -> anyhow::Result<Option<EnvSecretModel>> {
        let remote = data
            .client
            .get_secret(state.scope(&data.owner), &state.secret_name)
            .await
            .or_not_found()
            .with_context(|| {
                format!(
                    "Failed to read secret {} on {}/{} environment {}",
                    state.secret_name, data.owner, state.repository, state.environment
                )
            })?;

        let Some(remote) = remote else {
            return Ok(None);
        };
        let name = state.secret_name.clone();
        SecretValues {
            plaintext_value: &mut state.plaintext_value,
            encrypted_value: &mut state.encrypted_value,
            destroy_on_drift: state.destroy_on_drift,
            created_at: &mut state.created_at,
            updated_at: &mut state.updated_at,
        }
        .observe(&name, &remote);
        Ok(Some(state))
    }

    async fn update(&self, data: &ProviderData, _prior: EnvSecretModel, plan: EnvSecretModel) -> anyhow::Result<EnvSecretModel> {
        self.put(data, plan).await
    }

    async fn delete(&self, data: &ProviderData, state: EnvSecretModel) -> anyhow::Result<()> {
        data.client
            .delete_secret(state.scope(&data.owner), &state.secret_name)
            .await
            .with_context(|| {
                format!(
                    "Failed to delete secret {} on {}/{} environment {}",
                    state.secret_name, data.owner, state.repository, state.environment
                )
            })?;
        Ok(())
    }

    async fn import(&self, data: &ProviderData, id: &str) -> anyhow::Result<EnvSecretModel> {
        let addr = RepoEnvChildAddr::from_id(id)?;
        let state = EnvSecretModel {
            repository: addr.repo,
            environment: addr.environment,
            secret_name: addr.child,
            destroy_on_drift: Some(true),
            ..Default::default()
        };
        self.read(data, state).await?.ok_or_else(|| not_found(Self::TYPE_NAME, id))
    }
}
