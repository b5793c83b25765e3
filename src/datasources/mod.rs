//! Read-only lookups. Every data source reports an `id` derived from its inputs.

use std::sync::Arc;

use crate::resource::DynDataSource;

pub mod actions;
pub mod branch_protection;
pub mod collaborators;
pub mod custom_role;
pub mod environments;
pub mod git;
pub mod issue_labels;
pub mod release;
pub mod repository;
pub mod team;
pub mod user;

pub fn all() -> Vec<Arc<dyn DynDataSource>> {
    vec![
        Arc::new(repository::RepositoryDataSource),
        Arc::new(repository::RepositoriesDataSource),
        Arc::new(git::BranchDataSource),
        Arc::new(git::RefDataSource),
        Arc::new(team::TeamDataSource),
        Arc::new(user::UserDataSource),
        Arc::new(release::ReleaseDataSource),
        Arc::new(custom_role::CustomRoleDataSource),
        Arc::new(actions::PublicKeyDataSource),
        Arc::new(actions::SecretsDataSource),
        Arc::new(actions::VariablesDataSource),
        Arc::new(actions::OrgSecretsDataSource),
        Arc::new(environments::DeploymentPoliciesDataSource),
        Arc::new(actions::RepoOidcTemplateDataSource),
        Arc::new(actions::OrgOidcTemplateDataSource),
        Arc::new(issue_labels::IssueLabelsDataSource),
        Arc::new(branch_protection::BranchProtectionRulesDataSource),
        Arc::new(collaborators::CollaboratorsDataSource),
        Arc::new(environments::EnvironmentsDataSource),
    ]
}

/// Resolves a `name` / `full_name` pair to `(owner, repo)`, defaulting the owner.
pub(crate) fn repo_target<'a>(
    default_owner: &'a str,
    name: Option<&'a str>,
    full_name: Option<&'a str>,
) -> anyhow::Result<(&'a str, &'a str)> {
    match (full_name, name) {
        (Some(full_name), _) => match full_name.split_once('/') {
            Some((owner, repo)) if !owner.is_empty() && !repo.is_empty() && !repo.contains('/') => Ok((owner, repo)),
            _ => anyhow::bail!("full_name must look like owner/repository, got {full_name:?}"),
        },
        (None, Some(name)) => Ok((default_owner, name)),
        (None, None) => anyhow::bail!("One of name or full_name must be set"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_names_are_unique() {
        let mut names: Vec<_> = all().iter().map(|d| d.type_name()).collect();
        let count = names.len();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), count);
        assert_eq!(count, 19);
    }

    #[test]
    fn repo_target_prefers_full_name() {
        assert_eq!(repo_target("acme", Some("x"), Some("octo/widgets")).unwrap(), ("octo", "widgets"));
        assert_eq!(repo_target("acme", Some("widgets"), None).unwrap(), ("acme", "widgets"));
        assert!(repo_target("acme", None, Some("widgets")).is_err());
        assert!(repo_target("acme", None, None).is_err());
    }
}
