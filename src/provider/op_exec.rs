use anyhow::{Context, bail};
use serde_json::Value;

use crate::{
    op::ProviderOp,
    resource::{ProviderData, Resource, decode, encode},
};

/// Runs a planned op against GitHub and returns the new state (`None` once deleted).
pub async fn exec_op<R: Resource>(
    resource: &R,
    data: &ProviderData,
    prior: Option<Value>,
    planned: Option<Value>,
    op: ProviderOp,
) -> anyhow::Result<Option<Value>> {
    let prior = prior.filter(|v| !v.is_null());
    let planned = planned.filter(|v| !v.is_null());

    match op {
        ProviderOp::NoOp => Ok(planned),
        ProviderOp::Create => {
            let Some(planned) = planned else {
                bail!("Cannot create {} without a planned state", R::TYPE_NAME)
            };
            let plan: R::Model = decode(R::TYPE_NAME, planned)?;
            let created = resource
                .create(data, plan)
                .await
                .with_context(|| format!("Failed to create {}", R::TYPE_NAME))?;
            tracing::info!("Created {}", R::TYPE_NAME);
            Ok(Some(encode(&created)?))
        }
        ProviderOp::Update { changed } => {
            let (Some(prior), Some(planned)) = (prior, planned) else {
                bail!("Cannot update {} without both prior and planned state", R::TYPE_NAME)
            };
            let prior: R::Model = decode(R::TYPE_NAME, prior)?;
            let plan: R::Model = decode(R::TYPE_NAME, planned)?;
            let updated = resource
                .update(data, prior, plan)
                .await
                .with_context(|| format!("Failed to update {}", R::TYPE_NAME))?;
            tracing::info!(changed = ?changed, "Updated {}", R::TYPE_NAME);
            Ok(Some(encode(&updated)?))
        }
        ProviderOp::Replace { attributes } => {
            let (Some(prior), Some(planned)) = (prior, planned) else {
                bail!("Cannot replace {} without both prior and planned state", R::TYPE_NAME)
            };
            let prior: R::Model = decode(R::TYPE_NAME, prior)?;
            let plan: R::Model = decode(R::TYPE_NAME, planned)?;
            resource
                .delete(data, prior)
                .await
                .with_context(|| format!("Failed to delete {} for replacement", R::TYPE_NAME))?;
            let created = resource
                .create(data, plan)
                .await
                .with_context(|| format!("Failed to recreate {}", R::TYPE_NAME))?;
            tracing::info!(forced_by = ?attributes, "Replaced {}", R::TYPE_NAME);
            Ok(Some(encode(&created)?))
        }
        ProviderOp::Delete => {
            let Some(prior) = prior else {
                return Ok(None);
            };
            let prior: R::Model = decode(R::TYPE_NAME, prior)?;
            resource
                .delete(data, prior)
                .await
                .with_context(|| format!("Failed to delete {}", R::TYPE_NAME))?;
            tracing::info!("Deleted {}", R::TYPE_NAME);
            Ok(None)
        }
    }
}
