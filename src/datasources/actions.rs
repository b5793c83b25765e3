//! Actions lookups: the sealing key, secret and variable listings, OIDC templates.

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    datasources::repo_target,
    diag::Diagnostics,
    github_ext::actions::{ActionsExt, ActionsScope},
    resource::{DataSource, ProviderData},
    schema::{Attribute, Kind, Schema, Validator},
};

fn repo_inputs(schema: Schema) -> Schema {
    schema
        .attr(
            "name",
            Attribute::optional_string().validate(Validator::ConflictsWith(&["full_name"])),
        )
        .attr("full_name", Attribute::optional_string())
}

fn require_repo(name: &Option<String>, full_name: &Option<String>, diags: &mut Diagnostics) {
    if name.is_none() && full_name.is_none() {
        diags.attribute_error("name", "Missing attribute", "One of name or full_name must be set");
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PublicKeyDataModel {
    pub repository: String,
    pub key_id: Option<String>,
    pub key: Option<String>,
    pub id: Option<String>,
}

pub struct PublicKeyDataSource;

#[async_trait]
impl DataSource for PublicKeyDataSource {
    type Model = PublicKeyDataModel;

    const TYPE_NAME: &'static str = "github_actions_public_key";

    fn schema(&self) -> Schema {
        Schema::new("The public key used to encrypt a repository's Actions secrets.")
            .attr("repository", Attribute::required_string())
            .attr("key_id", Attribute::computed_string())
            .attr("key", Attribute::computed_string())
            .attr("id", Attribute::computed_string())
    }

    async fn read(&self, data: &ProviderData, mut config: PublicKeyDataModel) -> anyhow::Result<PublicKeyDataModel> {
        let scope = ActionsScope::Repo {
            owner: &data.owner,
            repo: &config.repository,
        };
        let key = data
            .client
            .get_public_key(scope)
            .await
            .with_context(|| format!("Failed to read the Actions public key of {}/{}", data.owner, config.repository))?;
        config.id = Some(key.key_id.clone());
        config.key_id = Some(key.key_id);
        config.key = Some(key.key);
        Ok(config)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SecretSummary {
    pub name: String,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SecretsDataModel {
    pub name: Option<String>,
    pub full_name: Option<String>,
    pub secrets: Vec<SecretSummary>,
    pub id: Option<String>,
}

pub struct SecretsDataSource;

#[async_trait]
impl DataSource for SecretsDataSource {
    type Model = SecretsDataModel;

    const TYPE_NAME: &'static str = "github_actions_secrets";

    fn schema(&self) -> Schema {
        repo_inputs(Schema::new("Lists a repository's Actions secrets. Values are never returned."))
            .attr(
                "secrets",
                Attribute::computed(Kind::list_of(Kind::object(&[
                    ("name", Kind::String),
                    ("created_at", Kind::String),
                    ("updated_at", Kind::String),
                ]))),
            )
            .attr("id", Attribute::computed_string())
    }

    fn validate(&self, model: &SecretsDataModel, diags: &mut Diagnostics) {
        require_repo(&model.name, &model.full_name, diags);
    }

    async fn read(&self, data: &ProviderData, mut config: SecretsDataModel) -> anyhow::Result<SecretsDataModel> {
        let (owner, repo) = repo_target(&data.owner, config.name.as_deref(), config.full_name.as_deref())?;
        let secrets = data
            .client
            .list_secrets(ActionsScope::Repo { owner, repo })
            .await
            .with_context(|| format!("Failed to list secrets of {owner}/{repo}"))?;
        let id = format!("{owner}/{repo}");

        config.secrets = secrets
            .into_iter()
            .map(|s| SecretSummary {
                name: s.name,
                created_at: s.created_at,
                updated_at: s.updated_at,
                visibility: None,
            })
            .collect();
        config.id = Some(id);
        Ok(config)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VariableSummary {
    pub name: String,
    pub value: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VariablesDataModel {
    pub name: Option<String>,
    pub full_name: Option<String>,
    pub variables: Vec<VariableSummary>,
    pub id: Option<String>,
}

pub struct VariablesDataSource;

#[async_trait]
impl DataSource for VariablesDataSource {
    type Model = VariablesDataModel;

    const TYPE_NAME: &'static str = "github_actions_variables";

    fn schema(&self) -> Schema {
        repo_inputs(Schema::new("Lists a repository's Actions variables."))
            .attr(
                "variables",
                Attribute::computed(Kind::list_of(Kind::object(&[
                    ("name", Kind::String),
                    ("value", Kind::String),
                    ("created_at", Kind::String),
                    ("updated_at", Kind::String),
                ]))),
            )
            .attr("id", Attribute::computed_string())
    }

    fn validate(&self, model: &VariablesDataModel, diags: &mut Diagnostics) {
        require_repo(&model.name, &model.full_name, diags);
    }

    async fn read(&self, data: &ProviderData, mut config: VariablesDataModel) -> anyhow::Result<VariablesDataModel> {
        let (owner, repo) = repo_target(&data.owner, config.name.as_deref(), config.full_name.as_deref())?;
        let variables = data
            .client
            .list_variables(ActionsScope::Repo { owner, repo })
            .await
            .with_context(|| format!("Failed to list variables of {owner}/{repo}"))?;
        let id = format!("{owner}/{repo}");

        config.variables = variables
            .into_iter()
            .map(|v| VariableSummary {
                name: v.name,
                value: v.value,
                created_at: v.created_at,
                updated_at: v.updated_at,
            })
            .collect();
        config.id = Some(id);
        Ok(config)
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OrgSecretsDataModel {
    pub secrets: Vec<SecretSummary>,
    pub id: Option<String>,
}

pub struct OrgSecretsDataSource;

#[async_trait]
impl DataSource for OrgSecretsDataSource {
    type Model = OrgSecretsDataModel;

    const TYPE_NAME: &'static str = "github_actions_organization_secrets";

    fn schema(&self) -> Schema {
        Schema::new("Lists the configured organization's Actions secrets.")
            .attr(
                "secrets",
                Attribute::computed(Kind::list_of(Kind::object(&[
                    ("name", Kind::String),
                    ("visibility", Kind::String),
                    ("created_at", Kind::String),
                    ("updated_at", Kind::String),
                ]))),
            )
            .attr("id", Attribute::computed_string())
    }

    async fn read(&self, data: &ProviderData, mut config: OrgSecretsDataModel) -> anyhow::Result<OrgSecretsDataModel> {
        let org = data.org(Self::TYPE_NAME)?;
        let secrets = data
            .client
            .list_secrets(ActionsScope::Org { org })
            .await
            .with_context(|| format!("Failed to list organization secrets of {org}"))?;

        config.secrets = secrets
            .into_iter()
            .map(|s| SecretSummary {
                name: s.name,
                created_at: s.created_at,
                updated_at: s.updated_at,
                visibility: s.visibility,
            })
            .collect();
        config.id = Some(org.to_string());
        Ok(config)
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RepoOidcTemplateDataModel {
    pub name: String,
    pub use_default: Option<bool>,
    pub include_claim_keys: Vec<String>,
    pub id: Option<String>,
}

pub struct RepoOidcTemplateDataSource;

#[async_trait]
impl DataSource for RepoOidcTemplateDataSource {
    type Model = RepoOidcTemplateDataModel;

    const TYPE_NAME: &'static str = "github_actions_repository_oidc_subject_claim_customization_template";

    fn schema(&self) -> Schema {
        Schema::new("A repository's OIDC subject claim template.")
            .attr("name", Attribute::required_string().describe("The repository name."))
            .attr("use_default", Attribute::computed(Kind::Bool))
            .attr("include_claim_keys", Attribute::computed(Kind::list_of(Kind::String)))
            .attr("id", Attribute::computed_string())
    }

    async fn read(&self, data: &ProviderData, mut config: RepoOidcTemplateDataModel) -> anyhow::Result<RepoOidcTemplateDataModel> {
        let claim = data
            .client
            .get_repo_oidc_subject_claim(&data.owner, &config.name)
            .await
            .with_context(|| format!("Failed to read the OIDC subject claim template of {}/{}", data.owner, config.name))?;
        config.id = Some(config.name.clone());
        config.use_default = Some(claim.use_default.unwrap_or(true));
        config.include_claim_keys = claim.include_claim_keys.unwrap_or_default();
        Ok(config)
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OrgOidcTemplateDataModel {
    pub include_claim_keys: Vec<String>,
    pub id: Option<String>,
}

pub struct OrgOidcTemplateDataSource;

#[async_trait]
impl DataSource for OrgOidcTemplateDataSource {
    type Model = OrgOidcTemplateDataModel;

    const TYPE_NAME: &'static str = "github_actions_organization_oidc_subject_claim_customization_template";

    fn schema(&self) -> Schema {
        Schema::new("The configured organization's OIDC subject claim template.")
            .attr("include_claim_keys", Attribute::computed(Kind::list_of(Kind::String)))
            .attr("id", Attribute::computed_string())
    }

    async fn read(&self, data: &ProviderData, mut config: OrgOidcTemplateDataModel) -> anyhow::Result<OrgOidcTemplateDataModel> {
        let org = data.org(Self::TYPE_NAME)?;
        let claim = data
            .client
            .get_org_oidc_subject_claim(org)
            .await
            .with_context(|| format!("Failed to read the OIDC subject claim template of {org}"))?;
        config.include_claim_keys = claim.include_claim_keys.unwrap_or_default();
        config.id = Some(org.to_string());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repo_listing_needs_a_repository() {
        let mut diags = Diagnostics::new();
        SecretsDataSource.validate(&SecretsDataModel::default(), &mut diags);
        assert!(diags.has_error());

        let mut diags = Diagnostics::new();
        let model = VariablesDataModel {
            full_name: Some("octo/widgets".into()),
            ..Default::default()
        };
        VariablesDataSource.validate(&model, &mut diags);
        assert!(!diags.has_error());
    }

    #[test]
    fn repo_secret_summaries_omit_visibility() {
        let summary = SecretSummary {
            name: "TOKEN".into(),
            created_at: "2019-08-10T14:59:22Z".into(),
            updated_at: "2020-01-10T14:59:22Z".into(),
            visibility: None,
        };
        let value = serde_json::to_value(summary).unwrap();
        assert!(value.get("visibility").is_none());
    }
}
