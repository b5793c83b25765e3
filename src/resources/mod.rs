//! The managed resource catalogue, one module per GitHub object.

use std::sync::Arc;

use crate::resource::DynResource;

pub mod branch;
pub mod branch_default;
pub mod branch_protection;
pub mod collaborator;
pub mod custom_role;
pub mod deployment_policy;
pub mod environment;
pub mod issue_label;
pub mod membership;
pub mod oidc;
pub mod release;
pub mod repository;
pub mod runner_group;
pub mod secrets;
pub mod team;
pub mod team_membership;
pub mod team_repository;
pub mod variables;

pub fn all() -> Vec<Arc<dyn DynResource>> {
    vec![
        Arc::new(repository::RepositoryResource),
        Arc::new(branch::BranchResource),
        Arc::new(branch_default::BranchDefaultResource),
        Arc::new(branch_protection::BranchProtectionResource),
        Arc::new(collaborator::CollaboratorResource),
        Arc::new(team::TeamResource),
        Arc::new(team_membership::TeamMembershipResource),
        Arc::new(team_repository::TeamRepositoryResource),
        Arc::new(membership::MembershipResource),
        Arc::new(secrets::RepoSecretResource),
        Arc::new(secrets::OrgSecretResource),
        Arc::new(secrets::EnvSecretResource),
        Arc::new(variables::RepoVariableResource),
        Arc::new(variables::OrgVariableResource),
        Arc::new(variables::EnvVariableResource),
        Arc::new(release::ReleaseResource),
        Arc::new(custom_role::CustomRoleResource),
        Arc::new(runner_group::RunnerGroupResource),
        Arc::new(environment::EnvironmentResource),
        Arc::new(deployment_policy::DeploymentPolicyResource),
        Arc::new(oidc::RepoOidcTemplateResource),
        Arc::new(oidc::OrgOidcTemplateResource),
        Arc::new(issue_label::IssueLabelResource),
    ]
}

/// A remote boolean setting as state should hold it: unset stays unset while GitHub
/// reports the off value.
pub(crate) fn observed_bool(current: Option<bool>, remote: bool) -> Option<bool> {
    if current.is_none() && !remote { None } else { Some(remote) }
}

/// Same as [`observed_bool`] for set-like lists, which come back sorted.
pub(crate) fn observed_set<T: Ord>(current: &Option<Vec<T>>, mut remote: Vec<T>) -> Option<Vec<T>> {
    if current.is_none() && remote.is_empty() {
        return None;
    }
    crate::util::normalize_set(&mut remote);
    Some(remote)
}

pub(crate) fn normalize_opt_set<T: Ord>(items: &mut Option<Vec<T>>) {
    if let Some(items) = items {
        crate::util::normalize_set(items);
    }
}

pub(crate) fn not_found(type_name: &str, id: &str) -> anyhow::Error {
    anyhow::anyhow!("Cannot import {type_name} {id:?}: it does not exist")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn observed_values_keep_unset_defaults() {
        assert_eq!(observed_bool(None, false), None);
        assert_eq!(observed_bool(None, true), Some(true));
        assert_eq!(observed_bool(Some(true), false), Some(false));

        assert_eq!(observed_set::<String>(&None, vec![]), None);
        assert_eq!(observed_set(&Some(vec![]), vec![3, 1]), Some(vec![1, 3]));
    }

    #[test]
    fn type_names_are_unique() {
        let mut names: Vec<_> = all().iter().map(|r| r.type_name()).collect();
        let count = names.len();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), count);
        assert_eq!(count, 23);
    }
}
