use async_trait::async_trait;
use octocrab::{Octocrab, Result};
use serde::{Deserialize, Serialize};

use super::{RestExt, enc};

/// Where an Actions secret or variable lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionsScope<'a> {
    Repo { owner: &'a str, repo: &'a str },
    Org { org: &'a str },
    Environment {
        owner: &'a str,
        repo: &'a str,
        environment: &'a str,
    },
}

impl ActionsScope<'_> {
    fn base(&self) -> String {
        match self {
            ActionsScope::Repo { owner, repo } => format!("/repos/{}/{}/actions", owner, repo),
            ActionsScope::Org { org } => format!("/orgs/{}/actions", org),
            ActionsScope::Environment {
                owner,
                repo,
                environment,
            } => format!("/repos/{}/{}/environments/{}", owner, repo, enc(environment)),
        }
    }

    fn secrets(&self) -> String {
        format!("{}/secrets", self.base())
    }

    fn variables(&self) -> String {
        format!("{}/variables", self.base())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GitHubPublicKey {
    pub key_id: String,
    pub key: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GitHubSecret {
    pub name: String,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default)]
    pub visibility: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PutSecretRequest {
    pub encrypted_value: String,
    pub key_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visibility: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_repository_ids: Option<Vec<u64>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GitHubVariable {
    pub name: String,
    pub value: String,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default)]
    pub visibility: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct VariableRequest {
    pub name: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visibility: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_repository_ids: Option<Vec<u64>>,
}

#[derive(Debug, Deserialize)]
struct RepositoryId {
    id: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OidcSubjectClaim {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_default: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_claim_keys: Option<Vec<String>>,
}

#[async_trait]
pub trait ActionsExt {
    async fn get_public_key(&self, scope: ActionsScope<'_>) -> Result<GitHubPublicKey>;

    async fn put_secret(&self, scope: ActionsScope<'_>, name: &str, secret: &PutSecretRequest) -> Result<()>;
    async fn get_secret(&self, scope: ActionsScope<'_>, name: &str) -> Result<GitHubSecret>;
    async fn delete_secret(&self, scope: ActionsScope<'_>, name: &str) -> Result<()>;
    async fn list_secrets(&self, scope: ActionsScope<'_>) -> anyhow::Result<Vec<GitHubSecret>>;
    async fn list_org_secret_repositories(&self, org: &str, name: &str) -> anyhow::Result<Vec<u64>>;

    async fn create_variable(&self, scope: ActionsScope<'_>, variable: &VariableRequest) -> Result<()>;
    async fn update_variable(&self, scope: ActionsScope<'_>, name: &str, variable: &VariableRequest) -> Result<()>;
    async fn get_variable(&self, scope: ActionsScope<'_>, name: &str) -> Result<GitHubVariable>;
    async fn delete_variable(&self, scope: ActionsScope<'_>, name: &str) -> Result<()>;
    async fn list_variables(&self, scope: ActionsScope<'_>) -> anyhow::Result<Vec<GitHubVariable>>;
    async fn list_org_variable_repositories(&self, org: &str, name: &str) -> anyhow::Result<Vec<u64>>;

    async fn get_repo_oidc_subject_claim(&self, owner: &str, repo: &str) -> Result<OidcSubjectClaim>;
    async fn put_repo_oidc_subject_claim(&self, owner: &str, repo: &str, claim: &OidcSubjectClaim) -> Result<()>;
    async fn get_org_oidc_subject_claim(&self, org: &str) -> Result<OidcSubjectClaim>;
    async fn put_org_oidc_subject_claim(&self, org: &str, claim: &OidcSubjectClaim) -> Result<()>;
}

#[async_trait]
impl ActionsExt for Octocrab {
    async fn get_public_key(&self, scope: ActionsScope<'_>) -> Result<GitHubPublicKey> {
        let route = format!("{}/public-key", scope.secrets());
        self.get(route, None::<&()>).await
    }

    async fn put_secret(&self, scope: ActionsScope<'_>, name: &str, secret: &PutSecretRequest) -> Result<()> {
        let route = format!("{}/{}", scope.secrets(), enc(name));
        self.put_no_content(route, secret).await
    }

    async fn get_secret(&self, scope: ActionsScope<'_>, name: &str) -> Result<GitHubSecret> {
        let route = format!("{}/{}", scope.secrets(), enc(name));
        self.get(route, None::<&()>).await
    }

    async fn delete_secret(&self, scope: ActionsScope<'_>, name: &str) -> Result<()> {
        let route = format!("{}/{}", scope.secrets(), enc(name));
        self.delete_no_content(route).await
    }

    async fn list_secrets(&self, scope: ActionsScope<'_>) -> anyhow::Result<Vec<GitHubSecret>> {
        self.list_all_wrapped(scope.secrets(), "secrets").await
    }

    async fn list_org_secret_repositories(&self, org: &str, name: &str) -> anyhow::Result<Vec<u64>> {
        let route = format!("/orgs/{}/actions/secrets/{}/repositories", org, enc(name));
        let repos: Vec<RepositoryId> = self.list_all_wrapped(route, "repositories").await?;
        Ok(repos.into_iter().map(|r| r.id).collect())
    }

    async fn create_variable(&self, scope: ActionsScope<'_>, variable: &VariableRequest) -> Result<()> {
        self.post_no_content(scope.variables(), variable).await
    }

    async fn update_variable(&self, scope: ActionsScope<'_>, name: &str, variable: &VariableRequest) -> Result<()> {
        let route = format!("{}/{}", scope.variables(), enc(name));
        self.patch_no_content(route, variable).await
    }

    async fn get_variable(&self, scope: ActionsScope<'_>, name: &str) -> Result<GitHubVariable> {
        let route = format!("{}/{}", scope.variables(), enc(name));
        self.get(route, None::<&()>).await
    }

    async fn delete_variable(&self, scope: ActionsScope<'_>, name: &str) -> Result<()> {
        let route = format!("{}/{}", scope.variables(), enc(name));
        self.delete_no_content(route).await
    }

    async fn list_variables(&self, scope: ActionsScope<'_>) -> anyhow::Result<Vec<GitHubVariable>> {
        self.list_all_wrapped(scope.variables(), "variables").await
    }

    async fn list_org_variable_repositories(&self, org: &str, name: &str) -> anyhow::Result<Vec<u64>> {
        let route = format!("/orgs/{}/actions/variables/{}/repositories", org, enc(name));
        let repos: Vec<RepositoryId> = self.list_all_wrapped(route, "repositories").await?;
        Ok(repos.into_iter().map(|r| r.id).collect())
    }

    async fn get_repo_oidc_subject_claim(&self, owner: &str, repo: &str) -> Result<OidcSubjectClaim> {
        let route = format!("/repos/{}/{}/actions/oidc/customization/sub", owner, repo);
        self.get(route, None::<&()>).await
    }

    async fn put_repo_oidc_subject_claim(&self, owner: &str, repo: &str, claim: &OidcSubjectClaim) -> Result<()> {
        let route = format!("/repos/{}/{}/actions/oidc/customization/sub", owner, repo);
        self.put_no_content(route, claim).await
    }

    async fn get_org_oidc_subject_claim(&self, org: &str) -> Result<OidcSubjectClaim> {
        let route = format!("/orgs/{}/actions/oidc/customization/sub", org);
        self.get(route, None::<&()>).await
    }

    async fn put_org_oidc_subject_claim(&self, org: &str, claim: &OidcSubjectClaim) -> Result<()> {
        let route = format!("/orgs/{}/actions/oidc/customization/sub", org);
        self.put_no_content(route, claim).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_routes() {
        let repo = ActionsScope::Repo { owner: "acme", repo: "widgets" };
        assert_eq!(repo.secrets(), "/repos/acme/widgets/actions/secrets");

        let org = ActionsScope::Org { org: "acme" };
        assert_eq!(org.variables(), "/orgs/acme/actions/variables");

        let env = ActionsScope::Environment {
            owner: "acme",
            repo: "widgets",
            environment: "prod eu",
        };
        assert_eq!(env.secrets(), "/repos/acme/widgets/environments/prod%20eu/secrets");
    }

    #[test]
    fn secret_request_omits_org_fields_for_repos() {
        let body = serde_json::to_value(PutSecretRequest {
            encrypted_value: "c2VhbGVk".into(),
            key_id: "568250167242549743".into(),
            ..Default::default()
        })
        .unwrap();
        assert!(body.get("visibility").is_none());
        assert!(body.get("selected_repository_ids").is_none());
    }

    #[test]
    fn oidc_org_template_has_no_use_default() {
        let claim: OidcSubjectClaim = serde_json::from_str(r#"{"include_claim_keys":["repo","context"]}"#).unwrap();
        assert_eq!(claim.use_default, None);
        let body = serde_json::to_value(&claim).unwrap();
        assert!(body.get("use_default").is_none());
    }
}
