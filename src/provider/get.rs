use serde_json::Value;

use crate::{GitHubProvider, diag::Diagnostics, op::ProviderOp, provider::Response};

impl GitHubProvider {
    pub async fn apply_resource_change(
        &self,
        type_name: &str,
        prior_state: Option<Value>,
        planned_state: Option<Value>,
        planned_private: Option<String>,
    ) -> Response<Value> {
        let res: anyhow::Result<Option<Value>> = async {
            let resource = self.resource(type_name)?;
            let data = self.data().await?;
            let op = match planned_private.as_deref().filter(|s| !s.is_empty()) {
                Some(private) => ProviderOp::from_str(private)?,
                None => ProviderOp::infer(
                    prior_state.as_ref().is_some_and(|v| !v.is_null()),
                    planned_state.as_ref().is_some_and(|v| !v.is_null()),
                ),
            };
            resource.apply(&data, prior_state, planned_state, op).await
        }
        .await;

        Response::from_result(res, format!("Failed to apply {type_name}"))
    }

    /// Refreshes state. A `None` result means the object is gone and should be dropped.
    pub async fn read_resource(&self, type_name: &str, current_state: Value) -> Response<Value> {
        let res: anyhow::Result<Option<Value>> = async {
            let resource = self.resource(type_name)?;
            let data = self.data().await?;
            resource.read(&data, current_state).await
        }
        .await;

        Response::from_result(res, format!("Failed to read {type_name}"))
    }

    pub async fn import_resource_state(&self, type_name: &str, id: &str) -> Response<Value> {
        let res: anyhow::Result<Option<Value>> = async {
            let resource = self.resource(type_name)?;
            let data = self.data().await?;
            resource.import(&data, id).await.map(Some)
        }
        .await;

        Response::from_result(res, format!("Failed to import {type_name} {id:?}"))
    }

    pub async fn read_data_source(&self, type_name: &str, config: Value) -> Response<Value> {
        let res: anyhow::Result<Result<Option<Value>, Diagnostics>> = async {
            let data_source = self.data_source(type_name)?;
            let diags = data_source.validate_config(&config);
            if diags.has_error() {
                return Ok(Err(diags));
            }
            let data = self.data().await?;
            data_source.read(&data, config).await.map(|v| Ok(Some(v)))
        }
        .await;

        match res {
            Ok(Err(diags)) => Response::failed(diags),
            Ok(Ok(value)) => Response::ok(value),
            Err(e) => Response::from_result(Err(e), format!("Failed to read data source {type_name}")),
        }
    }
}
