use anyhow::{Context, bail};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    addr::parse_numeric,
    error::NotFoundExt,
    github_ext::custom_roles::{CustomRoleExt, CustomRoleRequest, GitHubCustomRole},
    resource::{ProviderData, Resource},
    resources::not_found,
    schema::{Attribute, Kind, Schema, Validator},
    util::{non_empty, normalize_set},
};

pub(crate) const BASE_ROLES: &[&str] = &["read", "triage", "write", "maintain"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomRoleModel {
    pub name: String,
    pub description: Option<String>,
    pub base_role: String,
    pub permissions: Vec<String>,
    pub role_id: Option<u64>,
}

impl CustomRoleModel {
    fn to_request(&self) -> CustomRoleRequest {
        CustomRoleRequest {
            name: self.name.clone(),
            description: self.description.clone(),
            base_role: self.base_role.clone(),
            permissions: self.permissions.clone(),
        }
    }

    fn apply_remote(mut self, role: GitHubCustomRole) -> Self {
        self.name = role.name;
        self.description = non_empty(role.description);
        self.base_role = role.base_role;
        self.permissions = role.permissions;
        normalize_set(&mut self.permissions);
        self.role_id = Some(role.id);
        self
    }
}

pub struct CustomRoleResource;

impl CustomRoleResource {
    fn role_id(state: &CustomRoleModel) -> anyhow::Result<u64> {
        match state.role_id {
            Some(id) => Ok(id),
            None => bail!("Custom role {} has no role_id in state", state.name),
        }
    }
}

#[async_trait]
impl Resource for CustomRoleResource {
    type Model = CustomRoleModel;

    const TYPE_NAME: &'static str = "github_organization_custom_role";

    fn schema(&self) -> Schema {
        Schema::new("A custom repository role in the configured organization.")
            .attr("name", Attribute::required_string())
            .attr("description", Attribute::optional_string())
            .attr(
                "base_role",
                Attribute::required_string().validate(Validator::OneOf(BASE_ROLES)),
            )
            .attr(
                "permissions",
                Attribute::required(Kind::set_of(Kind::String)).validate(Validator::LengthBetween(1, usize::MAX)),
            )
            .attr("role_id", Attribute::computed(Kind::Int))
    }

    fn modify_plan(&self, _prior: Option<&CustomRoleModel>, planned: &mut CustomRoleModel) {
        normalize_set(&mut planned.permissions);
    }

    async fn create(&self, data: &ProviderData, plan: CustomRoleModel) -> anyhow::Result<CustomRoleModel> {
        let org = data.org(Self::TYPE_NAME)?;
        let role = data
            .client
            .create_custom_role(org, &plan.to_request())
            .await
            .with_context(|| format!("Failed to create custom role {} in {org}", plan.name))?;
        tracing::info!("Created custom role {} ({}) in {org}", role.name, role.id);
        Ok(plan.apply_remote(role))
    }

    async fn read(&self, data: &ProviderData, state: CustomRoleModel) -> anyhow::Result<Option<CustomRoleModel>> {
        let org = data.org(Self::TYPE_NAME)?;
        let id = Self::role_id(&state)?;
        let role = data
            .client
            .get_custom_role(org, id)
            .await
            .or_not_found()
            .with_context(|| format!("Failed to read custom role {id} in {org}"))?;
        Ok(role.map(|role| state.apply_remote(role)))
    }

    async fn update(&self, data: &ProviderData, prior: CustomRoleModel, plan: CustomRoleModel) -> anyhow::Result<CustomRoleModel> {
        let org = data.org(Self::TYPE_NAME)?;
        let id = Self::role_id(&prior)?;
        let role = data
            .client
            .update_custom_role(org, id, &plan.to_request())
            .await
            .with_context(|| format!("Failed to update custom role {id} in {org}"))?;
        tracing::info!("Updated custom role {} ({id}) in {org}", role.name);
        Ok(plan.apply_remote(role))
    }

    async fn delete(&self, data: &ProviderData, state: CustomRoleModel) -> anyhow::Result<()> {
        let org = data.org(Self::TYPE_NAME)?;
        let id = Self::role_id(&state)?;
        data.client
            .delete_custom_role(org, id)
            .await
            .with_context(|| format!("Failed to delete custom role {id} in {org}"))?;
        Ok(())
    }

    async fn import(&self, data: &ProviderData, id: &str) -> anyhow::Result<CustomRoleModel> {
        let role_id = parse_numeric(id, id, "<role_id>")?;
        let state = CustomRoleModel {
            role_id: Some(role_id),
            ..Default::default()
        };
        self.read(data, state).await?.ok_or_else(|| not_found(Self::TYPE_NAME, id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_role_and_sorts_permissions() {
        let role: GitHubCustomRole = serde_json::from_str(
            r#"{"id":8030,"name":"Security Engineer","description":"Able to contribute code and maintain the security pipeline",
                "base_role":"maintain","permissions":["delete_alerts_code_scanning","add_label"]}"#,
        )
        .unwrap();
        let state = CustomRoleModel::default().apply_remote(role);
        assert_eq!(state.role_id, Some(8030));
        assert_eq!(state.permissions, vec!["add_label", "delete_alerts_code_scanning"]);
    }

    #[test]
    fn empty_description_reads_as_unset() {
        let role = GitHubCustomRole {
            id: 1,
            name: "r".into(),
            description: Some(String::new()),
            base_role: "read".into(),
            permissions: vec!["add_label".into()],
        };
        assert_eq!(CustomRoleModel::default().apply_remote(role).description, None);
    }
}
