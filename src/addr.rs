//! Composite identifiers for nested GitHub objects.
//!
//! Import IDs are colon-delimited (`repo:branch`, `repo:env:policy_id`). A few
//! resources also accept a slash, matching how people tend to write `repo/branch`.

use crate::error::invalid_id;

pub trait ResourceAddress: Sized {
    fn to_id(&self) -> String;
    fn from_id(id: &str) -> anyhow::Result<Self>;
}

/// Splits `id` into exactly two non-empty parts on the first `sep`.
pub fn split_two<'a>(id: &'a str, sep: char, expected: &'static str) -> anyhow::Result<(&'a str, &'a str)> {
    match id.split_once(sep) {
        Some((a, b)) if !a.is_empty() && !b.is_empty() => Ok((a, b)),
        _ => Err(invalid_id(id, expected)),
    }
}

/// Splits `id` into exactly three non-empty parts.
pub fn split_three<'a>(id: &'a str, sep: char, expected: &'static str) -> anyhow::Result<(&'a str, &'a str, &'a str)> {
    let parts: Vec<&str> = id.split(sep).collect();
    match parts[..] {
        [a, b, c] if !a.is_empty() && !b.is_empty() && !c.is_empty() => Ok((a, b, c)),
        _ => Err(invalid_id(id, expected)),
    }
}

pub fn parse_numeric(id: &str, part: &str, expected: &'static str) -> anyhow::Result<u64> {
    part.parse::<u64>().map_err(|_| invalid_id(id, expected))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoAddr {
    pub repo: String,
}

impl ResourceAddress for RepoAddr {
    fn to_id(&self) -> String {
        self.repo.clone()
    }

    fn from_id(id: &str) -> anyhow::Result<Self> {
        if id.is_empty() || id.contains(':') || id.contains('/') {
            return Err(invalid_id(id, "<repository>"));
        }
        Ok(RepoAddr { repo: id.to_string() })
    }
}

/// `repo:child`, where child is a branch, secret, variable, label, collaborator,
/// environment or release id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoChildAddr {
    pub repo: String,
    pub child: String,
}

impl RepoChildAddr {
    pub fn new(repo: impl Into<String>, child: impl Into<String>) -> Self {
        Self {
            repo: repo.into(),
            child: child.into(),
        }
    }

    /// Same as `from_id`, but falls back to `/` when there is no colon.
    pub fn from_id_lenient(id: &str) -> anyhow::Result<Self> {
        let sep = if id.contains(':') { ':' } else { '/' };
        let (repo, child) = split_two(id, sep, "<repository>:<name> or <repository>/<name>")?;
        Ok(Self::new(repo, child))
    }
}

impl ResourceAddress for RepoChildAddr {
    fn to_id(&self) -> String {
        format!("{}:{}", self.repo, self.child)
    }

    fn from_id(id: &str) -> anyhow::Result<Self> {
        let (repo, child) = split_two(id, ':', "<repository>:<name>")?;
        Ok(Self::new(repo, child))
    }
}

/// `repo:environment:child`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoEnvChildAddr {
    pub repo: String,
    pub environment: String,
    pub child: String,
}

impl ResourceAddress for RepoEnvChildAddr {
    fn to_id(&self) -> String {
        format!("{}:{}:{}", self.repo, self.environment, self.child)
    }

    fn from_id(id: &str) -> anyhow::Result<Self> {
        let (repo, environment, child) = split_three(id, ':', "<repository>:<environment>:<name>")?;
        Ok(RepoEnvChildAddr {
            repo: repo.to_string(),
            environment: environment.to_string(),
            child: child.to_string(),
        })
    }
}

/// `repo:branch`, optionally followed by `:source_branch`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchAddr {
    pub repo: String,
    pub branch: String,
    pub source_branch: Option<String>,
}

impl ResourceAddress for BranchAddr {
    fn to_id(&self) -> String {
        format!("{}:{}", self.repo, self.branch)
    }

    fn from_id(id: &str) -> anyhow::Result<Self> {
        const EXPECTED: &str = "<repository>:<branch> or <repository>:<branch>:<source_branch>";
        let parts: Vec<&str> = id.split(':').collect();
        match parts[..] {
            [repo, branch] if !repo.is_empty() && !branch.is_empty() => Ok(BranchAddr {
                repo: repo.to_string(),
                branch: branch.to_string(),
                source_branch: None,
            }),
            [repo, branch, source] if !repo.is_empty() && !branch.is_empty() && !source.is_empty() => Ok(BranchAddr {
                repo: repo.to_string(),
                branch: branch.to_string(),
                source_branch: Some(source.to_string()),
            }),
            _ => Err(invalid_id(id, EXPECTED)),
        }
    }
}

/// `team:child`, where team is a numeric id or a slug.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamChildAddr {
    pub team: String,
    pub child: String,
}

impl ResourceAddress for TeamChildAddr {
    fn to_id(&self) -> String {
        format!("{}:{}", self.team, self.child)
    }

    fn from_id(id: &str) -> anyhow::Result<Self> {
        let (team, child) = split_two(id, ':', "<team_id_or_slug>:<name>")?;
        Ok(TeamChildAddr {
            team: team.to_string(),
            child: child.to_string(),
        })
    }
}

/// `org:username`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrgMemberAddr {
    pub org: String,
    pub username: String,
}

impl ResourceAddress for OrgMemberAddr {
    fn to_id(&self) -> String {
        format!("{}:{}", self.org, self.username)
    }

    fn from_id(id: &str) -> anyhow::Result<Self> {
        let (org, username) = split_two(id, ':', "<organization>:<username>")?;
        Ok(OrgMemberAddr {
            org: org.to_string(),
            username: username.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repo_child_roundtrip() {
        let addr = RepoChildAddr::from_id("widgets:feature/x").unwrap();
        assert_eq!(addr.repo, "widgets");
        assert_eq!(addr.child, "feature/x");
        assert_eq!(addr.to_id(), "widgets:feature/x");
    }

    #[test]
    fn repo_child_rejects_missing_parts() {
        assert!(RepoChildAddr::from_id("widgets").is_err());
        assert!(RepoChildAddr::from_id("widgets:").is_err());
        assert!(RepoChildAddr::from_id(":main").is_err());
    }

    #[test]
    fn lenient_accepts_slash() {
        let addr = RepoChildAddr::from_id_lenient("widgets/main").unwrap();
        assert_eq!(addr, RepoChildAddr::new("widgets", "main"));

        let addr = RepoChildAddr::from_id_lenient("widgets:release/1.x").unwrap();
        assert_eq!(addr, RepoChildAddr::new("widgets", "release/1.x"));
    }

    #[test]
    fn three_part_ids() {
        let addr = RepoEnvChildAddr::from_id("widgets:production:42").unwrap();
        assert_eq!(addr.environment, "production");
        assert_eq!(addr.child, "42");
        assert_eq!(addr.to_id(), "widgets:production:42");

        assert!(RepoEnvChildAddr::from_id("widgets:production").is_err());
        assert!(RepoEnvChildAddr::from_id("a:b:c:d").is_err());
    }

    #[test]
    fn branch_with_source() {
        let addr = BranchAddr::from_id("widgets:feature:develop").unwrap();
        assert_eq!(addr.source_branch.as_deref(), Some("develop"));
        assert_eq!(addr.to_id(), "widgets:feature");

        let addr = BranchAddr::from_id("widgets:feature").unwrap();
        assert!(addr.source_branch.is_none());

        assert!(BranchAddr::from_id("widgets").is_err());
    }

    #[test]
    fn repo_rejects_delimiters() {
        assert!(RepoAddr::from_id("widgets").is_ok());
        assert!(RepoAddr::from_id("owner/widgets").is_err());
        assert!(RepoAddr::from_id("").is_err());
    }

    #[test]
    fn numeric_parts() {
        assert_eq!(parse_numeric("r:e:17", "17", "x").unwrap(), 17);
        assert!(parse_numeric("r:e:abc", "abc", "x").is_err());
    }
}
