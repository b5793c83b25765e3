use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Invalid import ID {id:?}: expected {expected}")]
    InvalidImportId { id: String, expected: &'static str },

    #[error("Unknown resource type {0}")]
    UnknownResourceType(String),

    #[error("Unknown data source type {0}")]
    UnknownDataSource(String),

    #[error("Provider is not configured. Call configure before managing resources.")]
    NotConfigured,

    #[error("{type_name} requires an organization owner, but {owner} is a user account")]
    OrganizationRequired { type_name: &'static str, owner: String },

    #[error("Attribute {attribute}: {message}")]
    Validation { attribute: String, message: String },

    /// A raw request that bypassed octocrab's error mapping came back with a failure status.
    #[error("GitHub API returned {status}: {message}")]
    Api { status: StatusCode, message: String },
}

pub fn invalid_id(id: &str, expected: &'static str) -> anyhow::Error {
    ProviderError::InvalidImportId {
        id: id.to_string(),
        expected,
    }
    .into()
}

/// Walks an error chain looking for an HTTP status from either octocrab or a raw request.
pub fn status_code(err: &anyhow::Error) -> Option<StatusCode> {
    err.chain().find_map(|cause| {
        if let Some(octocrab::Error::GitHub { source, .. }) = cause.downcast_ref::<octocrab::Error>() {
            return Some(source.status_code);
        }
        match cause.downcast_ref::<ProviderError>() {
            Some(ProviderError::Api { status, .. }) => Some(*status),
            _ => None,
        }
    })
}

pub fn octocrab_status(err: &octocrab::Error) -> Option<StatusCode> {
    match err {
        octocrab::Error::GitHub { source, .. } => Some(source.status_code),
        _ => None,
    }
}

pub fn is_not_found(err: &anyhow::Error) -> bool {
    status_code(err) == Some(StatusCode::NOT_FOUND)
}

pub fn is_not_modified(err: &anyhow::Error) -> bool {
    status_code(err) == Some(StatusCode::NOT_MODIFIED)
}

/// Turns a 404 into `None` so reads can drop vanished objects from state.
pub trait NotFoundExt<T> {
    fn or_not_found(self) -> anyhow::Result<Option<T>>;
}

impl<T> NotFoundExt<T> for octocrab::Result<T> {
    fn or_not_found(self) -> anyhow::Result<Option<T>> {
        match self {
            Ok(value) => Ok(Some(value)),
            Err(e) if octocrab_status(&e) == Some(StatusCode::NOT_FOUND) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

impl<T> NotFoundExt<T> for anyhow::Result<T> {
    fn or_not_found(self) -> anyhow::Result<Option<T>> {
        match self {
            Ok(value) => Ok(Some(value)),
            Err(e) if is_not_found(&e) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn api_status_is_found_through_context() {
        let err: anyhow::Error = ProviderError::Api {
            status: StatusCode::NOT_FOUND,
            message: "Not Found".into(),
        }
        .into();
        let err = Err::<(), _>(err).context("Failed to read branch").unwrap_err();

        assert_eq!(status_code(&err), Some(StatusCode::NOT_FOUND));
        assert!(is_not_found(&err));
        assert!(!is_not_modified(&err));
    }

    #[test]
    fn not_found_becomes_none() {
        let res: anyhow::Result<u32> = Err(ProviderError::Api {
            status: StatusCode::NOT_FOUND,
            message: String::new(),
        }
        .into());
        assert!(res.or_not_found().unwrap().is_none());

        let res: anyhow::Result<u32> = Err(ProviderError::Api {
            status: StatusCode::FORBIDDEN,
            message: String::new(),
        }
        .into());
        assert!(res.or_not_found().is_err());
    }

    #[test]
    fn invalid_id_message_names_the_format() {
        let err = invalid_id("just-a-repo", "<repository>:<branch>");
        assert_eq!(
            err.to_string(),
            "Invalid import ID \"just-a-repo\": expected <repository>:<branch>"
        );
    }
}
