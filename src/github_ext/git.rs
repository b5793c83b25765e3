use async_trait::async_trait;
use octocrab::{Octocrab, Result};
use serde::{Deserialize, Serialize};

use super::{Conditional, RestExt, enc};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitRef {
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub node_id: Option<String>,
    pub object: GitObject,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitObject {
    pub sha: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Serialize)]
struct CreateRefRequest<'a> {
    #[serde(rename = "ref")]
    git_ref: &'a str,
    sha: &'a str,
}

/// Encodes a ref like `heads/feature/x` segment by segment, keeping the slashes
/// GitHub uses to separate namespace and name.
fn ref_path(git_ref: &str) -> String {
    let git_ref = git_ref.strip_prefix("refs/").unwrap_or(git_ref);
    git_ref.split('/').map(enc).collect::<Vec<_>>().join("/")
}

/// Normalizes a short ref (`heads/main`, `tags/v1`) or full ref to `refs/...`.
pub fn full_ref(git_ref: &str) -> String {
    if git_ref.starts_with("refs/") {
        git_ref.to_string()
    } else {
        format!("refs/{git_ref}")
    }
}

#[async_trait]
pub trait GitRefExt {
    async fn get_ref(&self, owner: &str, repo: &str, git_ref: &str, etag: Option<&str>)
    -> anyhow::Result<Conditional<GitRef>>;
    async fn create_ref(&self, owner: &str, repo: &str, git_ref: &str, sha: &str) -> Result<GitRef>;
    async fn delete_ref(&self, owner: &str, repo: &str, git_ref: &str) -> Result<()>;
}

#[async_trait]
impl GitRefExt for Octocrab {
    async fn get_ref(
        &self,
        owner: &str,
        repo: &str,
        git_ref: &str,
        etag: Option<&str>,
    ) -> anyhow::Result<Conditional<GitRef>> {
        let route = format!("/repos/{}/{}/git/ref/{}", owner, repo, ref_path(git_ref));
        self.get_conditional(route, etag).await
    }

    async fn create_ref(&self, owner: &str, repo: &str, git_ref: &str, sha: &str) -> Result<GitRef> {
        let route = format!("/repos/{}/{}/git/refs", owner, repo);
        let git_ref = full_ref(git_ref);
        self.post(route, Some(&CreateRefRequest { git_ref: &git_ref, sha })).await
    }

    async fn delete_ref(&self, owner: &str, repo: &str, git_ref: &str) -> Result<()> {
        let route = format!("/repos/{}/{}/git/refs/{}", owner, repo, ref_path(git_ref));
        self.delete_no_content(route).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ref_paths_keep_namespace_slashes() {
        assert_eq!(ref_path("heads/main"), "heads/main");
        assert_eq!(ref_path("refs/heads/feature/x"), "heads/feature/x");
        assert_eq!(ref_path("tags/v1 beta"), "tags/v1%20beta");
    }

    #[test]
    fn full_refs() {
        assert_eq!(full_ref("heads/main"), "refs/heads/main");
        assert_eq!(full_ref("refs/tags/v1"), "refs/tags/v1");
    }

    #[test]
    fn decodes_ref_response() {
        let r: GitRef = serde_json::from_str(
            r#"{"ref":"refs/heads/main","node_id":"MDM6UmVm","url":"https://api.github.com/x",
                "object":{"sha":"aa218f56b14c9653891f9e74264a383fa43fefbd","type":"commit","url":"https://api.github.com/y"}}"#,
        )
        .unwrap();
        assert_eq!(r.git_ref, "refs/heads/main");
        assert_eq!(r.object.kind, "commit");
    }
}
