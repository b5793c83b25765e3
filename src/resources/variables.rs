use anyhow::Context;
use async_trait::async_trait;
use octocrab::Octocrab;
use serde::{Deserialize, Serialize};

use crate::{
    addr::{RepoChildAddr, RepoEnvChildAddr, ResourceAddress},
    diag::Diagnostics,
    error::{NotFoundExt, invalid_id},
    github_ext::actions::{ActionsExt, ActionsScope, GitHubVariable, VariableRequest},
    resource::{ProviderData, Resource},
    resources::{
        normalize_opt_set, not_found,
        secrets::{ORG_VISIBILITIES, SECRET_NAME, validate_selected_repositories},
    },
    schema::{Attribute, Kind, Schema, Validator},
};

fn variable_attributes(schema: Schema) -> Schema {
    schema
        .attr(
            "variable_name",
            Attribute::required_string().requires_replace().validate(Validator::Regex(
                &SECRET_NAME,
                "must contain only letters, digits and underscores, and not start with a digit",
            )),
        )
        .attr("value", Attribute::required_string())
        .attr("created_at", Attribute::computed_string())
        .attr("updated_at", Attribute::computed_string())
}

/// POSTs a new variable or PATCHes an existing one, then reads it back for timestamps.
async fn write_variable(
    client: &Octocrab,
    scope: ActionsScope<'_>,
    request: VariableRequest,
    exists: bool,
) -> anyhow::Result<GitHubVariable> {
    let name = request.name.clone();
    if exists {
        client
            .update_variable(scope, &name, &request)
            .await
            .with_context(|| format!("Failed to update variable {name}"))?;
    } else {
        client
            .create_variable(scope, &request)
            .await
            .with_context(|| format!("Failed to create variable {name}"))?;
    }
    client
        .get_variable(scope, &name)
        .await
        .with_context(|| format!("Failed to read back variable {name}"))
}

async fn read_variable(client: &Octocrab, scope: ActionsScope<'_>, name: &str) -> anyhow::Result<Option<GitHubVariable>> {
    client
        .get_variable(scope, name)
        .await
        .or_not_found()
        .with_context(|| format!("Failed to read variable {name}"))
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepoVariableModel {
    pub repository: String,
    pub variable_name: String,
    pub value: String,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl RepoVariableModel {
    fn apply_remote(mut self, remote: GitHubVariable) -> Self {
        self.value = remote.value;
        self.created_at = Some(remote.created_at);
        self.updated_at = Some(remote.updated_at);
        self
    }

    fn request(&self) -> VariableRequest {
        VariableRequest {
            name: self.variable_name.clone(),
            value: self.value.clone(),
            ..Default::default()
        }
    }
}

pub struct RepoVariableResource;

impl RepoVariableResource {
    async fn put(&self, data: &ProviderData, plan: RepoVariableModel, exists: bool) -> anyhow::Result<RepoVariableModel> {
        let scope = ActionsScope::Repo {
            owner: &data.owner,
            repo: &plan.repository,
        };
        let remote = write_variable(&data.client, scope, plan.request(), exists).await?;
        tracing::info!("Wrote variable {} on {}/{}", plan.variable_name, data.owner, plan.repository);
        Ok(plan.apply_remote(remote))
    }
}

#[async_trait]
impl Resource for RepoVariableResource {
    type Model = RepoVariableModel;

    const TYPE_NAME: &'static str = "github_actions_variable";

    fn schema(&self) -> Schema {
        variable_attributes(
            Schema::new("An Actions variable on a repository.")
                .attr("repository", Attribute::required_string().requires_replace()),
        )
    }

    async fn create(&self, data: &ProviderData, plan: RepoVariableModel) -> anyhow::Result<RepoVariableModel> {
        self.put(data, plan, false).await
    }

    async fn read(&self, data: &ProviderData, state: RepoVariableModel) -> anyhow::Result<Option<RepoVariableModel>> {
        let scope = ActionsScope::Repo {
            owner: &data.owner,
            repo: &state.repository,
        };
        let remote = read_variable(&data.client, scope, &state.variable_name).await?;
        Ok(remote.map(|remote| state.apply_remote(remote)))
    }

    async fn update(
        &self,
        data: &ProviderData,
        _prior: RepoVariableModel,
        plan: RepoVariableModel,
    ) -> anyhow::Result<RepoVariableModel> {
        self.put(data, plan, true).await
    }

    async fn delete(&self, data: &ProviderData, state: RepoVariableModel) -> anyhow::Result<()> {
        let scope = ActionsScope::Repo {
            owner: &data.owner,
            repo: &state.repository,
        };
        data.client
            .delete_variable(scope, &state.variable_name)
            .await
            .with_context(|| format!("Failed to delete variable {} on {}/{}", state.variable_name, data.owner, state.repository))?;
        Ok(())
    }

    async fn import(&self, data: &ProviderData, id: &str) -> anyhow::Result<RepoVariableModel> {
        let addr = RepoChildAddr::from_id(id)?;
        let state = RepoVariableModel {
            repository: addr.repo,
            variable_name: addr.child,
            ..Default::default()
        };
        self.read(data, state).await?.ok_or_else(|| not_found(Self::TYPE_NAME, id))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrgVariableModel {
    pub variable_name: String,
    pub value: String,
    pub visibility: String,
    pub selected_repository_ids: Option<Vec<u64>>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

pub struct OrgVariableResource;

impl OrgVariableResource {
    async fn put(&self, data: &ProviderData, mut plan: OrgVariableModel, exists: bool) -> anyhow::Result<OrgVariableModel> {
        let org = data.org(Self::TYPE_NAME)?;
        let request = VariableRequest {
            name: plan.variable_name.clone(),
            value: plan.value.clone(),
            visibility: Some(plan.visibility.clone()),
            selected_repository_ids: (plan.visibility == "selected")
                .then(|| plan.selected_repository_ids.clone().unwrap_or_default()),
        };
        let remote = write_variable(&data.client, ActionsScope::Org { org }, request, exists).await?;
        tracing::info!("Wrote organization variable {} on {org}", plan.variable_name);
        plan.created_at = Some(remote.created_at);
        plan.updated_at = Some(remote.updated_at);
        Ok(plan)
    }
}

#[async_trait]
impl Resource for OrgVariableResource {
    type Model = OrgVariableModel;

    const TYPE_NAME: &'static str = "github_actions_organization_variable";

    fn schema(&self) -> Schema {
        variable_attributes(Schema::new("An Actions variable shared across an organization."))
            .attr(
                "visibility",
                Attribute::required_string().validate(Validator::OneOf(ORG_VISIBILITIES)),
            )
            .attr("selected_repository_ids", Attribute::optional(Kind::set_of(Kind::Int)))
    }

    fn validate(&self, model: &OrgVariableModel, diags: &mut Diagnostics) {
        validate_selected_repositories(&model.visibility, &model.selected_repository_ids, diags);
    }

    fn modify_plan(&self, _prior: Option<&OrgVariableModel>, planned: &mut OrgVariableModel) {
        normalize_opt_set(&mut planned.selected_repository_ids);
    }

    async fn create(&self, data: &ProviderData, plan: OrgVariableModel) -> anyhow::Result<OrgVariableModel> {
        self.put(data, plan, false).await
    }

    async fn read(&self, data: &ProviderData, mut state: OrgVariableModel) -> anyhow::Result<Option<OrgVariableModel>> {
        let org = data.org(Self::TYPE_NAME)?;
        let Some(remote) = read_variable(&data.client, ActionsScope::Org { org }, &state.variable_name).await? else {
            return Ok(None);
        };

        state.value = remote.value;
        if let Some(visibility) = remote.visibility {
            state.visibility = visibility;
        }
        if state.visibility == "selected" {
            let mut ids = data
                .client
                .list_org_variable_repositories(org, &state.variable_name)
                .await
                .with_context(|| format!("Failed to list repositories for variable {}", state.variable_name))?;
            ids.sort();
            state.selected_repository_ids = Some(ids);
        }
        state.created_at = Some(remote.created_at);
        state.updated_at = Some(remote.updated_at);
        Ok(Some(state))
    }

    async fn update(
        &self,
        data: &ProviderData,
        _prior: OrgVariableModel,
        plan: OrgVariableModel,
    ) -> anyhow::Result<OrgVariableModel> {
        self.put(data, plan, true).await
    }

    async fn delete(&self, data: &ProviderData, state: OrgVariableModel) -> anyhow::Result<()> {
        let org = data.org(Self::TYPE_NAME)?;
        data.client
            .delete_variable(ActionsScope::Org { org }, &state.variable_name)
            .await
            .with_context(|| format!("Failed to delete organization variable {} on {org}", state.variable_name))?;
        Ok(())
    }

    async fn import(&self, data: &ProviderData, id: &str) -> anyhow::Result<OrgVariableModel> {
        if id.is_empty() || id.contains(':') {
            return Err(invalid_id(id, "<variable_name>"));
        }
        let state = OrgVariableModel {
            variable_name: id.to_string(),
            ..Default::default()
        };
        self.read(data, state).await?.ok_or_else(|| not_found(Self::TYPE_NAME, id))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvVariableModel {
    pub repository: String,
    pub environment: String,
    pub variable_name: String,
    pub value: String,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl EnvVariableModel {
    fn scope<'a>(&'a self, owner: &'a str) -> ActionsScope<'a> {
        ActionsScope::Environment {
            owner,
            repo: &self.repository,
            environment: &self.environment,
        }
    }
}

pub struct EnvVariableResource;

impl EnvVariableResource {
    async fn put(&self, data: &ProviderData, mut plan: EnvVariableModel, exists: bool) -> anyhow::Result<EnvVariableModel> {
        let request = VariableRequest {
            name: plan.variable_name.clone(),
            value: plan.value.clone(),
            ..Default::default()
        };
        let remote = write_variable(&data.client, plan.scope(&data.owner), request, exists).await?;
        tracing::info!(
            "Wrote variable {} on {}/{} environment {}",
            plan.variable_name,
            data.owner,
            plan.repository,
            plan.environment
        );
        plan.value = remote.value;
        plan.created_at = Some(remote.created_at);
        plan.updated_at = Some(remote.updated_at);
        Ok(plan)
    }
}

#[async_trait]
impl Resource for EnvVariableResource {
    type Model = EnvVariableModel;

    const TYPE_NAME: &'static str = "github_actions_environment_variable";

    fn schema(&self) -> Schema {
        variable_attributes(
            Schema::new("An Actions variable on a deployment environment.")
                .attr("repository", Attribute::required_string().requires_replace())
                .attr("environment", Attribute::required_string().requires_replace()),
        )
    }

    async fn create(&self, data: &ProviderData, plan: EnvVariableModel) -> anyhow::Result<EnvVariableModel> {
        self.put(data, plan, false).await
    }

    async fn read(&self, data: &ProviderData, mut state: EnvVariableModel) -> anyhow::Result<Option<EnvVariableModel>> {
        let Some(remote) = read_variable(&data.client, state.scope(&data.owner), &state.variable_name).await? else {
            return Ok(None);
        };
        state.value = remote.value;
        state.created_at = Some(remote.created_at);
        state.updated_at = Some(remote.updated_at);
        Ok(Some(state))
    }

    async fn update(
        &self,
        data: &ProviderData,
        _prior: EnvVariableModel,
        plan: EnvVariableModel,
    ) -> anyhow::Result<EnvVariableModel> {
        self.put(data, plan, true).await
    }

    async fn delete(&self, data: &ProviderData, state: EnvVariableModel) -> anyhow::Result<()> {
        data.client
            .delete_variable(state.scope(&data.owner), &state.variable_name)
            .await
            .with_context(|| {
                format!(
                    "Failed to delete variable {} on {}/{} environment {}",
                    state.variable_name, data.owner, state.repository, state.environment
                )
            })?;
        Ok(())
    }

    async fn import(&self, data: &ProviderData, id: &str) -> anyhow::Result<EnvVariableModel> {
        let addr = RepoEnvChildAddr::from_id(id)?;
        let state = EnvVariableModel {
            repository: addr.repo,
            environment: addr.environment,
            variable_name: addr.child,
            ..Default::default()
        };
        self.read(data, state).await?.ok_or_else(|| not_found(Self::TYPE_NAME, id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_variable_response() {
        let remote: GitHubVariable = serde_json::from_str(
            r#"{"name":"USERNAME","value":"octocat","created_at":"2019-08-10T14:59:22Z",
                "updated_at":"2020-01-10T14:59:22Z"}"#,
        )
        .unwrap();
        let state = RepoVariableModel {
            repository: "widgets".into(),
            variable_name: "USERNAME".into(),
            value: "stale".into(),
            ..Default::default()
        }
        .apply_remote(remote);
        assert_eq!(state.value, "octocat");
        assert_eq!(state.updated_at.as_deref(), Some("2020-01-10T14:59:22Z"));
    }

    #[test]
    fn repo_request_has_no_visibility() {
        let model = RepoVariableModel {
            variable_name: "USERNAME".into(),
            value: "octocat".into(),
            ..Default::default()
        };
        let body = serde_json::to_value(model.request()).unwrap();
        assert_eq!(body, serde_json::json!({"name": "USERNAME", "value": "octocat"}));
    }

    #[test]
    fn org_selected_ids_are_sorted_in_plan() {
        let mut model = OrgVariableModel {
            visibility: "selected".into(),
            selected_repository_ids: Some(vec![30, 10, 20, 10]),
            ..Default::default()
        };
        OrgVariableResource.modify_plan(None, &mut model);
        assert_eq!(model.selected_repository_ids, Some(vec![10, 20, 30]));
    }
}
