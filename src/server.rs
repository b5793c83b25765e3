//! Line-delimited JSON over stdio.
//!
//! The host spawns the provider, waits for the handshake line, then writes one
//! [`ProviderRequest`] per line and reads one [`ProviderResponse`] per line back.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::{
    GitHubProvider,
    diag::{Diagnostic, Diagnostics},
    provider::Response,
};

pub const HANDSHAKE: &str = "GITHUB_PROVIDER|1|stdio";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum ProviderRequest {
    GetSchema,
    Configure {
        #[serde(default)]
        config: Value,
    },
    ValidateResourceConfig {
        type_name: String,
        config: Value,
    },
    ValidateDataSourceConfig {
        type_name: String,
        config: Value,
    },
    PlanResourceChange {
        type_name: String,
        #[serde(default)]
        prior_state: Option<Value>,
        #[serde(default)]
        proposed_new_state: Option<Value>,
    },
    ApplyResourceChange {
        type_name: String,
        #[serde(default)]
        prior_state: Option<Value>,
        #[serde(default)]
        planned_state: Option<Value>,
        #[serde(default)]
        planned_private: Option<String>,
    },
    ReadResource {
        type_name: String,
        current_state: Value,
    },
    ImportResourceState {
        type_name: String,
        id: String,
    },
    ReadDataSource {
        type_name: String,
        config: Value,
    },
    Stop,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderResponse {
    pub result: Option<Value>,
    #[serde(default)]
    pub diagnostics: Diagnostics,
}

impl ProviderResponse {
    fn diagnostics(diagnostics: Diagnostics) -> Self {
        ProviderResponse {
            result: None,
            diagnostics,
        }
    }
}

impl<T: Serialize> From<Response<T>> for ProviderResponse {
    fn from(response: Response<T>) -> Self {
        let mut diagnostics = response.diagnostics;
        let result = match response.result.map(serde_json::to_value).transpose() {
            Ok(result) => result,
            Err(e) => {
                diagnostics.push(Diagnostic::error("Failed to encode response", e.to_string()));
                None
            }
        };
        ProviderResponse { result, diagnostics }
    }
}

/// Handles one request. Returns `None` for `stop`.
pub async fn dispatch(provider: &GitHubProvider, request: ProviderRequest) -> Option<ProviderResponse> {
    let response = match request {
        ProviderRequest::GetSchema => Response::ok(Some(provider.get_schema())).into(),
        ProviderRequest::Configure { config } => ProviderResponse::diagnostics(provider.configure(config).await),
        ProviderRequest::ValidateResourceConfig { type_name, config } => {
            ProviderResponse::diagnostics(provider.validate_resource_config(&type_name, &config))
        }
        ProviderRequest::ValidateDataSourceConfig { type_name, config } => {
            ProviderResponse::diagnostics(provider.validate_data_source_config(&type_name, &config))
        }
        ProviderRequest::PlanResourceChange {
            type_name,
            prior_state,
            proposed_new_state,
        } => provider
            .plan_resource_change(&type_name, prior_state, proposed_new_state)
            .into(),
        ProviderRequest::ApplyResourceChange {
            type_name,
            prior_state,
            planned_state,
            planned_private,
        } => provider
            .apply_resource_change(&type_name, prior_state, planned_state, planned_private)
            .await
            .into(),
        ProviderRequest::ReadResource {
            type_name,
            current_state,
        } => provider.read_resource(&type_name, current_state).await.into(),
        ProviderRequest::ImportResourceState { type_name, id } => {
            provider.import_resource_state(&type_name, &id).await.into()
        }
        ProviderRequest::ReadDataSource { type_name, config } => {
            provider.read_data_source(&type_name, config).await.into()
        }
        ProviderRequest::Stop => return None,
    };
    Some(response)
}

/// Serves requests from `input` until `stop` or end of input.
pub async fn serve<R, W>(provider: &GitHubProvider, input: R, mut output: W) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    output.write_all(format!("{HANDSHAKE}\n").as_bytes()).await?;
    output.flush().await?;

    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<ProviderRequest>(&line) {
            Ok(request) => {
                tracing::debug!(?request, "Handling request");
                match dispatch(provider, request).await {
                    Some(response) => response,
                    None => {
                        tracing::info!("Stop requested, shutting down");
                        break;
                    }
                }
            }
            Err(e) => {
                tracing::warn!("Malformed request: {e}");
                ProviderResponse::diagnostics(Diagnostic::error("Malformed request", e.to_string()).into())
            }
        };

        let mut encoded = serde_json::to_string(&response)?;
        encoded.push('\n');
        output.write_all(encoded.as_bytes()).await?;
        output.flush().await?;
    }
    Ok(())
}

pub async fn serve_stdio(provider: &GitHubProvider) -> anyhow::Result<()> {
    serve(provider, BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn requests_are_tagged_by_method() {
        let request: ProviderRequest = serde_json::from_value(json!({
            "method": "import_resource_state",
            "type_name": "github_branch",
            "id": "widgets:main"
        }))
        .unwrap();
        assert_eq!(
            request,
            ProviderRequest::ImportResourceState {
                type_name: "github_branch".into(),
                id: "widgets:main".into()
            }
        );

        let request: ProviderRequest = serde_json::from_str(r#"{"method":"plan_resource_change","type_name":"github_team"}"#).unwrap();
        assert!(matches!(
            request,
            ProviderRequest::PlanResourceChange {
                prior_state: None,
                proposed_new_state: None,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn malformed_lines_become_diagnostics() {
        let provider = GitHubProvider::new();
        let input = b"not json\n{\"method\":\"stop\"}\n{\"method\":\"get_schema\"}\n";
        let mut output = Vec::new();
        serve(&provider, &input[..], &mut output).await.unwrap();

        let text = String::from_utf8(output).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], HANDSHAKE);
        assert_eq!(lines.len(), 2);

        let response: ProviderResponse = serde_json::from_str(lines[1]).unwrap();
        assert!(response.result.is_none());
        assert!(response.diagnostics.has_error());
    }
}
