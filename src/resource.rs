use std::fmt::Debug;

use async_trait::async_trait;
use octocrab::Octocrab;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::{
    diag::Diagnostics,
    error::ProviderError,
    op::ProviderOp,
    provider::{
        op_exec,
        plan::{self, PlanResponse},
    },
    schema::Schema,
};

/// Everything a lifecycle call needs from the configured provider.
#[derive(Clone)]
pub struct ProviderData {
    pub client: Octocrab,
    pub owner: String,
    pub is_organization: bool,
}

impl ProviderData {
    /// Returns the owner if it is an organization, for org-scoped endpoints.
    pub fn org(&self, type_name: &'static str) -> anyhow::Result<&str> {
        if !self.is_organization {
            return Err(ProviderError::OrganizationRequired {
                type_name,
                owner: self.owner.clone(),
            }
            .into());
        }
        Ok(&self.owner)
    }
}

/// A managed GitHub object with a full lifecycle.
///
/// `read` returns `Ok(None)` when the object no longer exists on GitHub, which
/// drops it from state. `import` takes the resource's composite ID.
#[async_trait]
pub trait Resource: Send + Sync + 'static {
    type Model: Serialize + DeserializeOwned + Clone + PartialEq + Debug + Default + Send + Sync;

    const TYPE_NAME: &'static str;

    fn schema(&self) -> Schema;

    /// Cross-attribute checks the schema validators can't express.
    fn validate(&self, _model: &Self::Model, _diags: &mut Diagnostics) {}

    /// Adjusts a planned model so semantically equal values don't show as changes.
    fn modify_plan(&self, _prior: Option<&Self::Model>, _planned: &mut Self::Model) {}

    async fn create(&self, data: &ProviderData, plan: Self::Model) -> anyhow::Result<Self::Model>;

    async fn read(&self, data: &ProviderData, state: Self::Model) -> anyhow::Result<Option<Self::Model>>;

    async fn update(&self, data: &ProviderData, prior: Self::Model, plan: Self::Model) -> anyhow::Result<Self::Model>;

    async fn delete(&self, data: &ProviderData, state: Self::Model) -> anyhow::Result<()>;

    async fn import(&self, data: &ProviderData, id: &str) -> anyhow::Result<Self::Model>;
}

/// A read-only lookup.
#[async_trait]
pub trait DataSource: Send + Sync + 'static {
    type Model: Serialize + DeserializeOwned + Debug + Default + Send + Sync;

    const TYPE_NAME: &'static str;

    fn schema(&self) -> Schema;

    fn validate(&self, _model: &Self::Model, _diags: &mut Diagnostics) {}

    async fn read(&self, data: &ProviderData, config: Self::Model) -> anyhow::Result<Self::Model>;
}

/// Object-safe view of a [`Resource`] over JSON state.
#[async_trait]
pub trait DynResource: Send + Sync {
    fn type_name(&self) -> &'static str;
    fn schema(&self) -> Schema;
    fn state_attributes(&self) -> Vec<String>;
    fn validate_config(&self, config: &Value) -> Diagnostics;
    fn plan(&self, prior: Option<Value>, proposed: Option<Value>) -> anyhow::Result<PlanResponse>;
    async fn apply(
        &self,
        data: &ProviderData,
        prior: Option<Value>,
        planned: Option<Value>,
        op: ProviderOp,
    ) -> anyhow::Result<Option<Value>>;
    async fn read(&self, data: &ProviderData, state: Value) -> anyhow::Result<Option<Value>>;
    async fn import(&self, data: &ProviderData, id: &str) -> anyhow::Result<Value>;
}

pub fn decode<T: DeserializeOwned>(type_name: &str, value: Value) -> anyhow::Result<T> {
    serde_json::from_value(value).map_err(|e| anyhow::anyhow!("Failed to decode {type_name} state: {e}"))
}

pub fn encode<T: Serialize>(model: &T) -> anyhow::Result<Value> {
    Ok(serde_json::to_value(model)?)
}

#[async_trait]
impl<R: Resource> DynResource for R {
    fn type_name(&self) -> &'static str {
        R::TYPE_NAME
    }

    fn schema(&self) -> Schema {
        Resource::schema(self)
    }

    fn state_attributes(&self) -> Vec<String> {
        match encode(&R::Model::default()) {
            Ok(Value::Object(map)) => map.keys().cloned().collect(),
            _ => Vec::new(),
        }
    }

    fn validate_config(&self, config: &Value) -> Diagnostics {
        let schema = Resource::schema(self);
        let mut diags = schema.validate_config(config);
        if diags.has_error() {
            return diags;
        }

        let mut config = config.clone();
        schema.apply_defaults(&mut config);
        match decode::<R::Model>(R::TYPE_NAME, config) {
            Ok(model) => Resource::validate(self, &model, &mut diags),
            Err(e) => diags.api_error("Invalid configuration", &e),
        }
        diags
    }

    fn plan(&self, prior: Option<Value>, proposed: Option<Value>) -> anyhow::Result<PlanResponse> {
        plan::plan_change(self, prior, proposed)
    }

    async fn apply(
        &self,
        data: &ProviderData,
        prior: Option<Value>,
        planned: Option<Value>,
        op: ProviderOp,
    ) -> anyhow::Result<Option<Value>> {
        op_exec::exec_op(self, data, prior, planned, op).await
    }

    async fn read(&self, data: &ProviderData, state: Value) -> anyhow::Result<Option<Value>> {
        let state: R::Model = decode(R::TYPE_NAME, state)?;
        match Resource::read(self, data, state).await? {
            Some(model) => Ok(Some(encode(&model)?)),
            None => {
                tracing::warn!("{} no longer exists on GitHub, removing it from state", R::TYPE_NAME);
                Ok(None)
            }
        }
    }

    async fn import(&self, data: &ProviderData, id: &str) -> anyhow::Result<Value> {
        let model = Resource::import(self, data, id).await?;
        encode(&model)
    }
}

/// Object-safe view of a [`DataSource`].
#[async_trait]
pub trait DynDataSource: Send + Sync {
    fn type_name(&self) -> &'static str;
    fn schema(&self) -> Schema;
    fn state_attributes(&self) -> Vec<String>;
    fn validate_config(&self, config: &Value) -> Diagnostics;
    async fn read(&self, data: &ProviderData, config: Value) -> anyhow::Result<Value>;
}

#[async_trait]
impl<D: DataSource> DynDataSource for D {
    fn type_name(&self) -> &'static str {
        D::TYPE_NAME
    }

    fn schema(&self) -> Schema {
        DataSource::schema(self)
    }

    fn state_attributes(&self) -> Vec<String> {
        match encode(&D::Model::default()) {
            Ok(Value::Object(map)) => map.keys().cloned().collect(),
            _ => Vec::new(),
        }
    }

    fn validate_config(&self, config: &Value) -> Diagnostics {
        let schema = DataSource::schema(self);
        let mut diags = schema.validate_config(config);
        if diags.has_error() {
            return diags;
        }

        let mut config = config.clone();
        schema.apply_defaults(&mut config);
        match decode::<D::Model>(D::TYPE_NAME, config) {
            Ok(model) => DataSource::validate(self, &model, &mut diags),
            Err(e) => diags.api_error("Invalid configuration", &e),
        }
        diags
    }

    async fn read(&self, data: &ProviderData, config: Value) -> anyhow::Result<Value> {
        let mut config = config;
        DataSource::schema(self).apply_defaults(&mut config);
        let model: D::Model = decode(D::TYPE_NAME, config)?;
        encode(&DataSource::read(self, data, model).await?)
    }
}
