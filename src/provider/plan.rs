use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    diag::Diagnostics,
    error::ProviderError,
    op::ProviderOp,
    resource::{Resource, decode, encode},
    util::{diff_ron_values, mask_sensitive},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanAction {
    NoOp,
    Create,
    Update,
    Replace,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanResponse {
    pub planned_state: Option<Value>,
    pub action: PlanAction,
    #[serde(default)]
    pub requires_replace: Vec<String>,
    /// The planned [`ProviderOp`], RON-encoded, to hand back on apply.
    pub planned_private: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl PlanResponse {
    fn new(planned_state: Option<Value>, action: PlanAction, op: ProviderOp, message: Option<String>) -> anyhow::Result<Self> {
        let requires_replace = match &op {
            ProviderOp::Replace { attributes } => attributes.clone(),
            _ => Vec::new(),
        };
        Ok(PlanResponse {
            planned_state,
            action,
            requires_replace,
            planned_private: op.to_string()?,
            message,
        })
    }
}

fn fail_on_errors(type_name: &str, diags: Diagnostics) -> anyhow::Result<()> {
    if let Some(first) = diags.iter().find(|d| d.severity == crate::diag::Severity::Error) {
        return Err(ProviderError::Validation {
            attribute: first.attribute.clone().unwrap_or_else(|| type_name.to_string()),
            message: if first.detail.is_empty() {
                first.summary.clone()
            } else {
                first.detail.clone()
            },
        }
        .into());
    }
    Ok(())
}

/// Computes the change between prior state and the proposed new state.
///
/// Computed attributes the proposal leaves null keep their prior value, so only
/// attributes the user actually changed show up in the plan.
pub fn plan_change<R: Resource>(resource: &R, prior: Option<Value>, proposed: Option<Value>) -> anyhow::Result<PlanResponse> {
    let schema = resource.schema();
    let prior = prior.filter(|v| !v.is_null());
    let proposed = proposed.filter(|v| !v.is_null());

    match (prior, proposed) {
        (None, None) => PlanResponse::new(None, PlanAction::NoOp, ProviderOp::NoOp, None),
        (Some(_), None) => PlanResponse::new(
            None,
            PlanAction::Delete,
            ProviderOp::Delete,
            Some(format!("Delete {}", R::TYPE_NAME)),
        ),
        (None, Some(mut proposed)) => {
            schema.apply_defaults(&mut proposed);
            fail_on_errors(R::TYPE_NAME, schema.validate_state(&proposed))?;

            let mut planned: R::Model = decode(R::TYPE_NAME, proposed)?;
            let mut diags = Diagnostics::new();
            resource.validate(&planned, &mut diags);
            fail_on_errors(R::TYPE_NAME, diags)?;
            resource.modify_plan(None, &mut planned);

            PlanResponse::new(
                Some(encode(&planned)?),
                PlanAction::Create,
                ProviderOp::Create,
                Some(format!("Create {}", R::TYPE_NAME)),
            )
        }
        (Some(prior), Some(mut proposed)) => {
            schema.apply_defaults(&mut proposed);

            if let (Some(proposed_obj), Some(prior_obj)) = (proposed.as_object_mut(), prior.as_object()) {
                for name in schema.computed_attributes() {
                    let slot = proposed_obj.entry(name.to_string()).or_insert(Value::Null);
                    if slot.is_null() {
                        if let Some(old) = prior_obj.get(name) {
                            *slot = old.clone();
                        }
                    }
                }
            }
            fail_on_errors(R::TYPE_NAME, schema.validate_state(&proposed))?;

            let prior_model: R::Model = decode(R::TYPE_NAME, prior)?;
            let mut planned: R::Model = decode(R::TYPE_NAME, proposed)?;
            let mut diags = Diagnostics::new();
            resource.validate(&planned, &mut diags);
            fail_on_errors(R::TYPE_NAME, diags)?;
            resource.modify_plan(Some(&prior_model), &mut planned);

            let prior_value = encode(&prior_model)?;
            let planned_value = encode(&planned)?;

            let changed: Vec<String> = schema
                .attributes
                .keys()
                .filter(|name| prior_value.get(name.as_str()) != planned_value.get(name.as_str()))
                .cloned()
                .collect();

            if changed.is_empty() {
                return PlanResponse::new(Some(planned_value), PlanAction::NoOp, ProviderOp::NoOp, None);
            }

            let diff = diff_ron_values(
                &mask_sensitive(&schema, &prior_value),
                &mask_sensitive(&schema, &planned_value),
            )
            .unwrap_or_default();

            let replace: Vec<String> = changed.iter().filter(|name| schema.requires_replace(name)).cloned().collect();

            if replace.is_empty() {
                PlanResponse::new(
                    Some(planned_value),
                    PlanAction::Update,
                    ProviderOp::Update { changed },
                    Some(format!("Update {}\n{}", R::TYPE_NAME, diff)),
                )
            } else {
                let message = format!(
                    "Replace {} (forced by {})\n{}",
                    R::TYPE_NAME,
                    replace.join(", "),
                    diff
                );
                PlanResponse::new(
                    Some(planned_value),
                    PlanAction::Replace,
                    ProviderOp::Replace { attributes: replace },
                    Some(message),
                )
            }
        }
    }
}
