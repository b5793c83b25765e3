use std::sync::Arc;

use anyhow::Context;
use indexmap::IndexMap;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;

use crate::{
    client::get_client,
    config::ProviderConfig,
    datasources,
    diag::{Diagnostic, Diagnostics},
    error::{ProviderError, octocrab_status},
    resource::{DynDataSource, DynResource, ProviderData},
    resources,
    schema::Schema,
};

pub mod get;
pub mod op_exec;
pub mod plan;

pub use plan::{PlanAction, PlanResponse};

/// Result of a provider call. Failures travel as diagnostics, never as errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response<T> {
    pub result: Option<T>,
    #[serde(default)]
    pub diagnostics: Diagnostics,
}

impl<T> Response<T> {
    pub fn ok(result: Option<T>) -> Self {
        Response {
            result,
            diagnostics: Diagnostics::new(),
        }
    }

    pub fn failed(diagnostics: Diagnostics) -> Self {
        Response {
            result: None,
            diagnostics,
        }
    }

    pub fn from_result(res: anyhow::Result<Option<T>>, summary: impl Into<String>) -> Self {
        match res {
            Ok(result) => Response::ok(result),
            Err(e) => {
                let mut diagnostics = Diagnostics::new();
                diagnostics.api_error(summary, &e);
                Response::failed(diagnostics)
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProviderSchema {
    pub provider: Schema,
    pub resources: IndexMap<String, Schema>,
    pub data_sources: IndexMap<String, Schema>,
}

pub struct GitHubProvider {
    data: RwLock<Option<ProviderData>>,
    resources: IndexMap<&'static str, Arc<dyn DynResource>>,
    data_sources: IndexMap<&'static str, Arc<dyn DynDataSource>>,
}

impl Default for GitHubProvider {
    fn default() -> Self {
        GitHubProvider {
            data: RwLock::new(None),
            resources: resources::all().into_iter().map(|r| (r.type_name(), r)).collect(),
            data_sources: datasources::all().into_iter().map(|d| (d.type_name(), d)).collect(),
        }
    }
}

impl GitHubProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resource_types(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.resources.keys().copied()
    }

    pub fn data_source_types(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.data_sources.keys().copied()
    }

    pub fn resource(&self, type_name: &str) -> anyhow::Result<Arc<dyn DynResource>> {
        self.resources
            .get(type_name)
            .cloned()
            .ok_or_else(|| ProviderError::UnknownResourceType(type_name.to_string()).into())
    }

    pub fn data_source(&self, type_name: &str) -> anyhow::Result<Arc<dyn DynDataSource>> {
        self.data_sources
            .get(type_name)
            .cloned()
            .ok_or_else(|| ProviderError::UnknownDataSource(type_name.to_string()).into())
    }

    pub(crate) async fn data(&self) -> anyhow::Result<ProviderData> {
        self.data.read().await.clone().ok_or_else(|| ProviderError::NotConfigured.into())
    }

    pub fn get_schema(&self) -> ProviderSchema {
        ProviderSchema {
            provider: ProviderConfig::schema(),
            resources: self
                .resources
                .iter()
                .map(|(name, r)| (name.to_string(), r.schema()))
                .collect(),
            data_sources: self
                .data_sources
                .iter()
                .map(|(name, d)| (name.to_string(), d.schema()))
                .collect(),
        }
    }

    pub async fn configure(&self, config: Value) -> Diagnostics {
        let mut diags = if config.is_null() {
            Diagnostics::new()
        } else {
            ProviderConfig::schema().validate_config(&config)
        };
        if diags.has_error() {
            return diags;
        }

        match Self::connect(config).await {
            Ok(data) => *self.data.write().await = Some(data),
            Err(e) => diags.api_error("Failed to configure the GitHub provider", &e),
        }
        diags
    }

    /// Installs an already-built client, bypassing config parsing.
    pub async fn configure_with(&self, data: ProviderData) {
        *self.data.write().await = Some(data);
    }

    async fn connect(config: Value) -> anyhow::Result<ProviderData> {
        let config = ProviderConfig::from_value(config)?;
        let client = get_client(&config)?;

        let owner = match config.owner {
            Some(owner) => owner,
            None => {
                client
                    .current()
                    .user()
                    .await
                    .context("Failed to look up the authenticated user")?
                    .login
            }
        };

        let is_organization = match client.orgs(&owner).get().await {
            Ok(_) => true,
            Err(e) if octocrab_status(&e) == Some(StatusCode::NOT_FOUND) => false,
            Err(e) => return Err(e).with_context(|| format!("Failed to look up owner {owner}")),
        };

        tracing::info!(owner = %owner, is_organization, "Configured GitHub provider");

        Ok(ProviderData {
            client,
            owner,
            is_organization,
        })
    }

    pub fn validate_resource_config(&self, type_name: &str, config: &Value) -> Diagnostics {
        match self.resource(type_name) {
            Ok(resource) => resource.validate_config(config),
            Err(e) => Diagnostic::error("Unknown resource type", e.to_string()).into(),
        }
    }

    pub fn validate_data_source_config(&self, type_name: &str, config: &Value) -> Diagnostics {
        match self.data_source(type_name) {
            Ok(data_source) => data_source.validate_config(config),
            Err(e) => Diagnostic::error("Unknown data source type", e.to_string()).into(),
        }
    }

    pub fn plan_resource_change(
        &self,
        type_name: &str,
        prior_state: Option<Value>,
        proposed_new_state: Option<Value>,
    ) -> Response<PlanResponse> {
        let res = self
            .resource(type_name)
            .and_then(|resource| resource.plan(prior_state, proposed_new_state));
        Response::from_result(res.map(Some), format!("Failed to plan {type_name}"))
    }
}
