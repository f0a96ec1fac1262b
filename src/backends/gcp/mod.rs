//! Google Cloud Asset Inventory backend.
//!
//! A single `searchAllResources` query covers the whole scope. Results come
//! back with their asset type, full resource name and labels, so no detail
//! fetch is needed. Pages are exposed as one lazy [`Stream`] by
//! [`search_stream`].

mod scanner;

#[cfg(feature = "gcp")]
mod client;

pub use scanner::AssetInventoryScanner;

#[cfg(feature = "gcp")]
pub use client::{CloudAssetClient, CloudAssetSettings};

use crate::core::{ScanError, TagMap};

use async_trait::async_trait;
use futures::stream::{self, Stream, TryStreamExt};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// One resource returned by a search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSearchResult {
    /// Full resource name, e.g. `//compute.googleapis.com/projects/p/zones/z/instances/i`.
    #[serde(default)]
    pub name: String,
    /// Asset type, e.g. `compute.googleapis.com/Instance`.
    #[serde(default)]
    pub asset_type: String,
    /// Project the resource belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    /// Resource location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// User-defined labels.
    #[serde(default)]
    pub labels: TagMap,
}

impl ResourceSearchResult {
    /// Creates a result with no labels.
    pub fn new(asset_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            asset_type: asset_type.into(),
            ..Self::default()
        }
    }

    /// Adds a label.
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }
}

/// A page of search results.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchAllResourcesPage {
    /// Results on this page.
    #[serde(default)]
    pub results: Vec<ResourceSearchResult>,
    /// Token for the next page; absent or empty on the last page.
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// The subset of the Cloud Asset API the scanner needs.
#[async_trait]
pub trait AssetInventoryApi: Send + Sync + Debug {
    /// Fetches one page of `searchAllResources` for `scope`.
    async fn search_all_resources(
        &self,
        scope: &str,
        page_token: Option<&str>,
    ) -> Result<SearchAllResourcesPage, ScanError>;

    /// Releases the client.
    async fn close(&self) -> Result<(), ScanError> {
        Ok(())
    }
}

enum Cursor {
    Start,
    Next(String),
    Done,
}

/// Streams every result of a scope-wide search, fetching pages on demand.
///
/// The stream ends when the API stops returning a page token. The first
/// error ends the stream.
pub fn search_stream<'a, A>(
    api: &'a A,
    scope: &'a str,
) -> impl Stream<Item = Result<ResourceSearchResult, ScanError>> + Send + 'a
where
    A: AssetInventoryApi + ?Sized,
{
    stream::try_unfold(Cursor::Start, move |cursor| async move {
        fetch_page(api, scope, cursor).await.map(|page| {
            page.map(|(results, next)| {
                (stream::iter(results.into_iter().map(Ok::<_, ScanError>)), next)
            })
        })
    })
    .try_flatten()
}

async fn fetch_page<A>(
    api: &A,
    scope: &str,
    cursor: Cursor,
) -> Result<Option<(Vec<ResourceSearchResult>, Cursor)>, ScanError>
where
    A: AssetInventoryApi + ?Sized,
{
    let token = match cursor {
        Cursor::Start => None,
        Cursor::Next(token) => Some(token),
        Cursor::Done => return Ok(None),
    };

    let page = api.search_all_resources(scope, token.as_deref()).await?;
    let next = match page.next_page_token {
        Some(token) if !token.is_empty() => Cursor::Next(token),
        _ => Cursor::Done,
    };

    Ok(Some((page.results, next)))
}

/// Expands a bare project id into a search scope.
///
/// Scopes that already name a parent (`projects/..`, `folders/..`,
/// `organizations/..`) are used as-is.
pub fn search_scope(scope: &str) -> String {
    if scope.contains('/') {
        scope.to_string()
    } else {
        format!("projects/{}", scope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::mock::MockAssetInventory;

    #[tokio::test]
    async fn test_search_stream_consumes_every_page_once() {
        let api = MockAssetInventory::new()
            .with_page(vec![
                ResourceSearchResult::new("T", "r1"),
                ResourceSearchResult::new("T", "r2"),
            ])
            .with_page(vec![])
            .with_page(vec![ResourceSearchResult::new("T", "r3")]);

        let names: Vec<String> = search_stream(&api, "projects/p")
            .map_ok(|r| r.name)
            .try_collect()
            .await
            .unwrap();

        assert_eq!(names, vec!["r1", "r2", "r3"]);
        assert_eq!(api.calls(), 3);
    }

    #[tokio::test]
    async fn test_search_stream_is_lazy() {
        let api = MockAssetInventory::new().with_page(vec![ResourceSearchResult::new("T", "r1")]);

        let stream = search_stream(&api, "projects/p");
        assert_eq!(api.calls(), 0);
        drop(stream);
    }

    #[tokio::test]
    async fn test_search_stream_surfaces_errors() {
        let api = MockAssetInventory::new()
            .with_page(vec![ResourceSearchResult::new("T", "r1")])
            .with_page(vec![ResourceSearchResult::new("T", "r2")])
            .failing_at_page(1, "quota exceeded");

        let result: Result<Vec<_>, _> = search_stream(&api, "projects/p").try_collect().await;
        assert!(matches!(result, Err(ScanError::FatalApi { .. })));
    }

    #[test]
    fn test_search_scope() {
        assert_eq!(search_scope("my-project"), "projects/my-project");
        assert_eq!(search_scope("organizations/123"), "organizations/123");
    }

    #[test]
    fn test_search_result_deserializes_api_shape() {
        let json = r#"{
            "name": "//storage.googleapis.com/logs",
            "assetType": "storage.googleapis.com/Bucket",
            "project": "projects/42",
            "labels": {"env": "prod"}
        }"#;

        let result: ResourceSearchResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.asset_type, "storage.googleapis.com/Bucket");
        assert_eq!(result.labels.get("env"), Some(&"prod".to_string()));
        assert!(result.location.is_none());
    }
}
