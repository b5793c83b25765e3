use documented::{Documented, DocumentedFields};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::schema::{Attribute, Schema};

#[derive(Debug, Default, PartialEq, Serialize, Deserialize, Documented, DocumentedFields, Clone)]
#[serde(deny_unknown_fields)]
/// The provider configuration block for GitHub.
pub struct ProviderConfig {
    /// The OAuth or personal access token used to authenticate. Falls back to GITHUB_TOKEN.
    pub token: Option<String>,
    /// The user or organization that owns managed resources. Falls back to GITHUB_OWNER, then to the token's user.
    pub owner: Option<String>,
    /// The GitHub API base URL, for GitHub Enterprise Server. Falls back to GITHUB_BASE_URL.
    pub base_url: Option<String>,
}

impl ProviderConfig {
    /// Parses the provider block and fills unset fields from the environment.
    pub fn from_value(value: Value) -> anyhow::Result<Self> {
        let config: ProviderConfig = if value.is_null() {
            ProviderConfig::default()
        } else {
            serde_json::from_value(value)?
        };
        Ok(config.with_env_defaults(|key| std::env::var(key).ok()))
    }

    pub fn with_env_defaults(mut self, env: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| env(key).filter(|v| !v.is_empty());

        if self.token.is_none() {
            self.token = non_empty("GITHUB_TOKEN");
        }
        if self.owner.is_none() {
            self.owner = non_empty("GITHUB_OWNER").or_else(|| non_empty("GITHUB_ORGANIZATION"));
        }
        if self.base_url.is_none() {
            self.base_url = non_empty("GITHUB_BASE_URL");
        }
        self
    }

    pub fn schema() -> Schema {
        let doc = |field: &str| Self::get_field_docs(field).unwrap_or_default();

        Schema::new(Self::DOCS)
            .attr("token", Attribute::optional_string().sensitive().describe(doc("token")))
            .attr("owner", Attribute::optional_string().describe(doc("owner")))
            .attr("base_url", Attribute::optional_string().describe(doc("base_url")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn explicit_values_win_over_env() {
        let env: HashMap<&str, &str> = [("GITHUB_TOKEN", "env-token"), ("GITHUB_OWNER", "env-owner")].into();
        let config = ProviderConfig {
            token: Some("block-token".into()),
            ..Default::default()
        }
        .with_env_defaults(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.token.as_deref(), Some("block-token"));
        assert_eq!(config.owner.as_deref(), Some("env-owner"));
        assert_eq!(config.base_url, None);
    }

    #[test]
    fn organization_env_is_a_fallback_for_owner() {
        let env: HashMap<&str, &str> = [("GITHUB_ORGANIZATION", "acme"), ("GITHUB_OWNER", "")].into();
        let config = ProviderConfig::default().with_env_defaults(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.owner.as_deref(), Some("acme"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let res: Result<ProviderConfig, _> = serde_json::from_value(json!({ "organization": "acme" }));
        assert!(res.is_err());
    }

    #[test]
    fn schema_uses_field_docs() {
        let schema = ProviderConfig::schema();
        assert!(schema.attributes["token"].sensitive);
        assert!(schema.attributes["owner"].description.contains("GITHUB_OWNER"));
    }
}
