//! Extension traits on `Octocrab` for endpoints it doesn't wrap.
//!
//! Each submodule covers one API area and holds the request and response shapes
//! for it, mirroring GitHub's JSON field names.

use async_trait::async_trait;
use futures_util::TryStreamExt;
use octocrab::{Octocrab, Page, Result};
use reqwest::{
    StatusCode,
    header::{ETAG, HeaderMap, HeaderValue, IF_NONE_MATCH},
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use tokio::pin;

use crate::error::{ProviderError, octocrab_status};

pub mod actions;
pub mod branch_protection;
pub mod collaborators;
pub mod custom_roles;
pub mod environments;
pub mod git;
pub mod labels;
pub mod orgs;
pub mod releases;
pub mod repos;
pub mod runner_groups;
pub mod teams;
pub mod users;

/// Percent-encodes a user-supplied path segment (branch names, labels, tags).
pub fn enc(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}

/// Outcome of a GET sent with `If-None-Match`.
#[derive(Debug, Clone, PartialEq)]
pub enum Conditional<T> {
    NotModified,
    Modified { value: T, etag: Option<String> },
}

#[derive(Debug, Serialize)]
pub struct PageQuery {
    pub per_page: u8,
    pub page: u32,
}

impl Default for PageQuery {
    fn default() -> Self {
        PageQuery { per_page: 100, page: 1 }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

#[async_trait]
pub trait RestExt {
    /// PUT where GitHub answers 201/204 with an empty or ignorable body.
    async fn put_no_content<B: Serialize + Sync + ?Sized>(&self, route: String, body: &B) -> Result<()>;
    async fn post_no_content<B: Serialize + Sync + ?Sized>(&self, route: String, body: &B) -> Result<()>;
    async fn patch_no_content<B: Serialize + Sync + ?Sized>(&self, route: String, body: &B) -> Result<()>;
    async fn delete_no_content(&self, route: String) -> Result<()>;

    async fn get_conditional<T: DeserializeOwned + Send>(
        &self,
        route: String,
        etag: Option<&str>,
    ) -> anyhow::Result<Conditional<T>>;

    /// Follows `Link: next` until the last page.
    async fn list_all<T: DeserializeOwned + Send + 'static>(&self, route: String) -> Result<Vec<T>>;

    async fn list_all_with<T, P>(&self, route: String, params: &P) -> Result<Vec<T>>
    where
        T: DeserializeOwned + Send + 'static,
        P: Serialize + Sync;

    /// Pages through endpoints that wrap items as `{ "total_count": n, "<key>": [...] }`.
    async fn list_all_wrapped<T: DeserializeOwned + Send>(&self, route: String, key: &str) -> anyhow::Result<Vec<T>>;
}

#[async_trait]
impl RestExt for Octocrab {
    async fn put_no_content<B: Serialize + Sync + ?Sized>(&self, route: String, body: &B) -> Result<()> {
        let response = self._put(route, Some(body)).await?;
        octocrab::map_github_error(response).await.map(drop)
    }

    async fn post_no_content<B: Serialize + Sync + ?Sized>(&self, route: String, body: &B) -> Result<()> {
        let response = self._post(route, Some(body)).await?;
        octocrab::map_github_error(response).await.map(drop)
    }

    async fn patch_no_content<B: Serialize + Sync + ?Sized>(&self, route: String, body: &B) -> Result<()> {
        let response = self._patch(route, Some(body)).await?;
        octocrab::map_github_error(response).await.map(drop)
    }

    async fn delete_no_content(&self, route: String) -> Result<()> {
        let response = self._delete(route, None::<&()>).await?;
        octocrab::map_github_error(response).await.map(drop)
    }

    async fn get_conditional<T: DeserializeOwned + Send>(
        &self,
        route: String,
        etag: Option<&str>,
    ) -> anyhow::Result<Conditional<T>> {
        let mut headers = HeaderMap::new();
        if let Some(etag) = etag.filter(|e| !e.is_empty()) {
            headers.insert(IF_NONE_MATCH, HeaderValue::from_str(etag)?);
        }

        let response = match self._get_with_headers(route.as_str(), Some(headers)).await {
            Ok(response) => response,
            Err(e) if octocrab_status(&e) == Some(StatusCode::NOT_MODIFIED) => return Ok(Conditional::NotModified),
            Err(e) => return Err(e.into()),
        };

        let status = response.status();
        if status == StatusCode::NOT_MODIFIED {
            tracing::debug!("{route} not modified since {etag:?}");
            return Ok(Conditional::NotModified);
        }

        let etag = response
            .headers()
            .get(ETAG)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = self.body_to_string(response).await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&body)
                .map(|e| e.message)
                .unwrap_or(body);
            return Err(ProviderError::Api { status, message }.into());
        }

        Ok(Conditional::Modified {
            value: serde_json::from_str(&body)?,
            etag,
        })
    }

    async fn list_all<T: DeserializeOwned + Send + 'static>(&self, route: String) -> Result<Vec<T>> {
        self.list_all_with(route, &PageQuery::default()).await
    }

    async fn list_all_with<T, P>(&self, route: String, params: &P) -> Result<Vec<T>>
    where
        T: DeserializeOwned + Send + 'static,
        P: Serialize + Sync,
    {
        let page: Page<T> = self.get(route, Some(params)).await?;

        let mut items = Vec::new();
        let stream = page.into_stream(self);
        pin!(stream);

        while let Some(item) = stream.try_next().await? {
            items.push(item);
        }
        Ok(items)
    }

    async fn list_all_wrapped<T: DeserializeOwned + Send>(&self, route: String, key: &str) -> anyhow::Result<Vec<T>> {
        let mut items = Vec::new();
        let mut query = PageQuery::default();

        loop {
            let body: Value = self.get(&route, Some(&query)).await?;
            let batch: Vec<T> = match body.get(key) {
                Some(list) => serde_json::from_value(list.clone())?,
                None => Vec::new(),
            };
            let fetched = batch.len();
            items.extend(batch);

            let total = body.get("total_count").and_then(Value::as_u64);
            // Some endpoints cap per_page below what we ask for, so trust total_count when it's there.
            let done = match total {
                Some(total) => fetched == 0 || items.len() as u64 >= total,
                None => fetched < query.per_page as usize,
            };
            if done {
                break;
            }
            query.page += 1;
        }

        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_segments_are_encoded() {
        assert_eq!(enc("feature/login"), "feature%2Flogin");
        assert_eq!(enc("good first issue"), "good%20first%20issue");
        assert_eq!(enc("main"), "main");
    }

    #[test]
    fn page_query_defaults_to_max_page_size() {
        let q = PageQuery::default();
        assert_eq!((q.per_page, q.page), (100, 1));
    }
}
