use anyhow::{Context, bail};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    addr::parse_numeric,
    diag::Diagnostics,
    error::NotFoundExt,
    github_ext::{
        Conditional,
        runner_groups::{GitHubRunnerGroup, RunnerGroupExt, RunnerGroupRequest},
    },
    resource::{ProviderData, Resource},
    resources::{normalize_opt_set, not_found, observed_set, secrets::validate_selected_repositories},
    schema::{Attribute, Kind, Schema, Validator},
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerGroupModel {
    pub name: String,
    pub visibility: String,
    pub selected_repository_ids: Option<Vec<u64>>,
    pub allows_public_repositories: Option<bool>,
    pub restricted_to_workflows: Option<bool>,
    pub selected_workflows: Option<Vec<String>>,
    pub default: Option<bool>,
    pub inherited: Option<bool>,
    pub runners_url: Option<String>,
    pub selected_repositories_url: Option<String>,
    pub runner_group_id: Option<u64>,
    pub etag: Option<String>,
}

impl RunnerGroupModel {
    fn selected_ids(&self) -> Option<Vec<u64>> {
        (self.visibility == "selected").then(|| self.selected_repository_ids.clone().unwrap_or_default())
    }

    fn to_request(&self) -> RunnerGroupRequest {
        RunnerGroupRequest {
            name: self.name.clone(),
            visibility: self.visibility.clone(),
            selected_repository_ids: self.selected_ids(),
            allows_public_repositories: self.allows_public_repositories.unwrap_or(false),
            restricted_to_workflows: self.restricted_to_workflows.unwrap_or(false),
            selected_workflows: self.selected_workflows.clone().unwrap_or_default(),
        }
    }

    fn apply_remote(mut self, group: GitHubRunnerGroup, etag: Option<String>) -> Self {
        self.name = group.name;
        self.visibility = group.visibility;
        self.allows_public_repositories = Some(group.allows_public_repositories);
        self.restricted_to_workflows = Some(group.restricted_to_workflows);
        let configured = self.selected_workflows.is_some();
        self.selected_workflows =
            (configured || !group.selected_workflows.is_empty()).then_some(group.selected_workflows);
        self.default = Some(group.default);
        self.inherited = Some(group.inherited);
        self.runners_url = group.runners_url;
        self.selected_repositories_url = group.selected_repositories_url;
        self.runner_group_id = Some(group.id);
        self.etag = etag;
        self
    }
}

pub struct RunnerGroupResource;

impl RunnerGroupResource {
    fn group_id(state: &RunnerGroupModel) -> anyhow::Result<u64> {
        match state.runner_group_id {
            Some(id) => Ok(id),
            None => bail!("Runner group {} has no runner_group_id in state", state.name),
        }
    }

    async fn fetch_repositories(&self, data: &ProviderData, org: &str, model: &mut RunnerGroupModel) -> anyhow::Result<()> {
        let id = Self::group_id(model)?;
        if model.visibility != "selected" {
            return Ok(());
        }
        let ids = data
            .client
            .list_runner_group_repositories(org, id)
            .await
            .with_context(|| format!("Failed to list repositories of runner group {id} in {org}"))?;
        model.selected_repository_ids = observed_set(&model.selected_repository_ids, ids);
        Ok(())
    }
}

#[async_trait]
impl Resource for RunnerGroupResource {
    type Model = RunnerGroupModel;

    const TYPE_NAME: &'static str = "github_actions_runner_group";

    fn schema(&self) -> Schema {
        Schema::new("A self-hosted runner group in the configured organization.")
            .attr("name", Attribute::required_string())
            .attr(
                "visibility",
                Attribute::required_string().validate(Validator::OneOf(&["all", "selected", "private"])),
            )
            .attr("selected_repository_ids", Attribute::optional(Kind::set_of(Kind::Int)))
            .attr("allows_public_repositories", Attribute::optional_bool().default(false))
            .attr("restricted_to_workflows", Attribute::optional_bool().default(false))
            .attr(
                "selected_workflows",
                Attribute::optional(Kind::list_of(Kind::String))
                    .describe("Workflow refs allowed to use the group when restricted_to_workflows is set."),
            )
            .attr("default", Attribute::computed(Kind::Bool))
            .attr("inherited", Attribute::computed(Kind::Bool))
            .attr("runners_url", Attribute::computed_string())
            .attr("selected_repositories_url", Attribute::computed_string())
            .attr("runner_group_id", Attribute::computed(Kind::Int))
            .attr("etag", Attribute::computed_string())
    }

    fn validate(&self, model: &RunnerGroupModel, diags: &mut Diagnostics) {
        validate_selected_repositories(&model.visibility, &model.selected_repository_ids, diags);
    }

    fn modify_plan(&self, _prior: Option<&RunnerGroupModel>, planned: &mut RunnerGroupModel) {
        normalize_opt_set(&mut planned.selected_repository_ids);
    }

    async fn create(&self, data: &ProviderData, plan: RunnerGroupModel) -> anyhow::Result<RunnerGroupModel> {
        let org = data.org(Self::TYPE_NAME)?;
        let group = data
            .client
            .create_runner_group(org, &plan.to_request())
            .await
            .with_context(|| format!("Failed to create runner group {} in {org}", plan.name))?;
        tracing::info!("Created runner group {} ({}) in {org}", group.name, group.id);
        let selected = plan.selected_repository_ids.clone();
        let mut state = plan.apply_remote(group, None);
        state.selected_repository_ids = selected;
        Ok(state)
    }

    async fn read(&self, data: &ProviderData, state: RunnerGroupModel) -> anyhow::Result<Option<RunnerGroupModel>> {
        let org = data.org(Self::TYPE_NAME)?;
        let id = Self::group_id(&state)?;
        let response = data
            .client
            .get_runner_group(org, id, state.etag.as_deref())
            .await
            .or_not_found()
            .with_context(|| format!("Failed to read runner group {id} in {org}"))?;

        let mut state = match response {
            None => return Ok(None),
            Some(Conditional::NotModified) => state,
            Some(Conditional::Modified { value, etag }) => state.apply_remote(value, etag),
        };
        // The repository list isn't covered by the group's ETag.
        self.fetch_repositories(data, org, &mut state).await?;
        Ok(Some(state))
    }

    async fn update(&self, data: &ProviderData, prior: RunnerGroupModel, plan: RunnerGroupModel) -> anyhow::Result<RunnerGroupModel> {
        let org = data.org(Self::TYPE_NAME)?;
        let id = Self::group_id(&prior)?;
        let mut request = plan.to_request();
        // PATCH ignores the repository list; it has its own endpoint.
        request.selected_repository_ids = None;
        let group = data
            .client
            .update_runner_group(org, id, &request)
            .await
            .with_context(|| format!("Failed to update runner group {id} in {org}"))?;

        let selected = plan.selected_ids();
        if selected.is_some() && selected != prior.selected_ids() {
            let ids = selected.unwrap_or_default();
            data.client
                .set_runner_group_repositories(org, id, &ids)
                .await
                .with_context(|| format!("Failed to set repositories of runner group {id} in {org}"))?;
        }
        tracing::info!("Updated runner group {} ({id}) in {org}", group.name);

        let configured = plan.selected_repository_ids.clone();
        let mut state = plan.apply_remote(group, None);
        state.selected_repository_ids = configured;
        Ok(state)
    }

    async fn delete(&self, data: &ProviderData, state: RunnerGroupModel) -> anyhow::Result<()> {
        let org = data.org(Self::TYPE_NAME)?;
        let id = Self::group_id(&state)?;
        data.client
            .delete_runner_group(org, id)
            .await
            .with_context(|| format!("Failed to delete runner group {id} in {org}"))?;
        Ok(())
    }

    async fn import(&self, data: &ProviderData, id: &str) -> anyhow::Result<RunnerGroupModel> {
        let group_id = parse_numeric(id, id, "<runner_group_id>")?;
        let state = RunnerGroupModel {
            runner_group_id: Some(group_id),
            ..Default::default()
        };
        self.read(data, state).await?.ok_or_else(|| not_found(Self::TYPE_NAME, id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> GitHubRunnerGroup {
        serde_json::from_str(
            r#"{"id":2,"name":"octo-runner-group","visibility":"selected","default":false,
                "selected_repositories_url":"https://api.github.com/orgs/octo-org/actions/runner-groups/2/repositories",
                "runners_url":"https://api.github.com/orgs/octo-org/actions/runner-groups/2/runners",
                "inherited":false,"allows_public_repositories":true,"restricted_to_workflows":false,
                "selected_workflows":[]}"#,
        )
        .unwrap()
    }

    #[test]
    fn maps_group_response() {
        let state = RunnerGroupModel::default().apply_remote(fixture(), Some("\"g\"".into()));
        assert_eq!(state.runner_group_id, Some(2));
        assert_eq!(state.allows_public_repositories, Some(true));
        assert_eq!(state.restricted_to_workflows, Some(false));
        assert_eq!(state.selected_workflows, None);
        assert_eq!(state.default, Some(false));
    }

    #[test]
    fn request_only_sends_ids_when_selected() {
        let mut model = RunnerGroupModel {
            name: "g".into(),
            visibility: "all".into(),
            selected_repository_ids: Some(vec![1]),
            ..Default::default()
        };
        assert_eq!(model.to_request().selected_repository_ids, None);

        model.visibility = "selected".into();
        assert_eq!(model.to_request().selected_repository_ids, Some(vec![1]));
    }
}
