use anyhow::{Context, anyhow};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    github_ext::custom_roles::CustomRoleExt,
    resource::{DataSource, ProviderData},
    schema::{Attribute, Kind, Schema},
    util::{non_empty, normalize_set},
};

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomRoleDataModel {
    pub name: String,
    pub description: Option<String>,
    pub base_role: Option<String>,
    pub permissions: Vec<String>,
    pub id: Option<String>,
}

pub struct CustomRoleDataSource;

#[async_trait]
impl DataSource for CustomRoleDataSource {
    type Model = CustomRoleDataModel;

    const TYPE_NAME: &'static str = "github_organization_custom_role";

    fn schema(&self) -> Schema {
        Schema::new("Looks up a custom repository role of the configured organization by name.")
            .attr("name", Attribute::required_string())
            .attr("description", Attribute::computed_string())
            .attr("base_role", Attribute::computed_string())
            .attr("permissions", Attribute::computed(Kind::set_of(Kind::String)))
            .attr("id", Attribute::computed_string())
    }

    async fn read(&self, data: &ProviderData, mut config: CustomRoleDataModel) -> anyhow::Result<CustomRoleDataModel> {
        let org = data.org(Self::TYPE_NAME)?;
        let roles = data
            .client
            .list_custom_roles(org)
            .await
            .with_context(|| format!("Failed to list custom roles of {org}"))?;

        let role = roles
            .into_iter()
            .find(|r| r.name == config.name)
            .ok_or_else(|| anyhow!("No custom role named {:?} in {org}", config.name))?;

        config.id = Some(role.id.to_string());
        config.description = non_empty(role.description);
        config.base_role = Some(role.base_role);
        config.permissions = role.permissions;
        normalize_set(&mut config.permissions);
        Ok(config)
    }
}
