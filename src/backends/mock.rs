//! In-memory provider APIs for testing.
//!
//! [`MockConfigService`] and [`MockAssetInventory`] serve canned pages and
//! can inject failures, so both scanners can be exercised without network
//! access.

use crate::backends::aws::{
    BaseConfigurationItem, ConfigServiceApi, ListDiscoveredResourcesPage, ResourceIdentifier,
    ResourceKey,
};
use crate::backends::gcp::{AssetInventoryApi, ResourceSearchResult, SearchAllResourcesPage};
use crate::core::ScanError;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Mutex;

/// A mock AWS Config API.
///
/// # Examples
///
/// ```rust
/// use tagwarden::backends::mock::MockConfigService;
///
/// let client = MockConfigService::new()
///     .with_page("AWS::S3::Bucket", &["logs", "assets"])
///     .with_page("AWS::S3::Bucket", &["backups"])
///     .with_configuration(
///         "AWS::S3::Bucket",
///         "logs",
///         Some("arn:aws:s3:::logs"),
///         r#"{"tags": [{"key": "env", "value": "prod"}]}"#,
///     )
///     .with_list_failures(2);
/// ```
#[derive(Debug, Default)]
pub struct MockConfigService {
    /// Listed resource ids, per type, per page.
    pages: HashMap<String, Vec<Vec<String>>>,
    /// Configuration items keyed by resource id.
    items: HashMap<String, BaseConfigurationItem>,
    /// Remaining list calls that should fail.
    list_failures: AtomicU32,
    /// Remaining describe calls that should fail.
    describe_failures: AtomicU32,
    list_calls: AtomicU64,
    describe_calls: AtomicU64,
    /// Resource types in the order they were listed.
    listed: Mutex<Vec<String>>,
}

impl MockConfigService {
    /// Creates an empty mock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a page of resource ids for `resource_type`.
    pub fn with_page(mut self, resource_type: impl Into<String>, ids: &[&str]) -> Self {
        self.pages
            .entry(resource_type.into())
            .or_default()
            .push(ids.iter().map(|id| id.to_string()).collect());
        self
    }

    /// Registers the configuration item returned for `resource_id`.
    pub fn with_configuration(
        mut self,
        resource_type: impl Into<String>,
        resource_id: impl Into<String>,
        arn: Option<&str>,
        configuration: &str,
    ) -> Self {
        let resource_id = resource_id.into();
        self.items.insert(
            resource_id.clone(),
            BaseConfigurationItem {
                arn: arn.map(str::to_string),
                resource_type: Some(resource_type.into()),
                resource_id: Some(resource_id),
                configuration: Some(configuration.to_string()),
            },
        );
        self
    }

    /// Makes the next `n` list calls fail with a throttling error.
    pub fn with_list_failures(self, n: u32) -> Self {
        self.list_failures.store(n, Ordering::SeqCst);
        self
    }

    /// Makes the next `n` describe calls fail with a throttling error.
    pub fn with_describe_failures(self, n: u32) -> Self {
        self.describe_failures.store(n, Ordering::SeqCst);
        self
    }

    /// Returns the number of list calls made, including failed ones.
    pub fn list_calls(&self) -> u64 {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Returns the number of describe calls made, including failed ones.
    pub fn describe_calls(&self) -> u64 {
        self.describe_calls.load(Ordering::SeqCst)
    }

    /// Returns the distinct resource types listed, in first-seen order.
    pub fn listed_types(&self) -> Vec<String> {
        let listed = self.listed.lock().unwrap();
        let mut types: Vec<String> = Vec::new();
        for t in listed.iter() {
            if !types.contains(t) {
                types.push(t.clone());
            }
        }
        types
    }

    fn take_failure(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl ConfigServiceApi for MockConfigService {
    async fn list_discovered_resources(
        &self,
        resource_type: &str,
        next_token: Option<&str>,
    ) -> Result<ListDiscoveredResourcesPage, ScanError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if Self::take_failure(&self.list_failures) {
            return Err(ScanError::transient(
                "aws",
                "ListDiscoveredResources",
                "ThrottlingException: Rate exceeded",
            ));
        }
        self.listed.lock().unwrap().push(resource_type.to_string());

        let index = match next_token {
            Some(token) => token.parse::<usize>().map_err(|_| {
                ScanError::fatal("aws", "ListDiscoveredResources", "invalid next token")
            })?,
            None => 0,
        };

        let pages = self.pages.get(resource_type).map(Vec::as_slice).unwrap_or(&[]);
        let ids = pages.get(index).cloned().unwrap_or_default();
        let next_token = (index + 1 < pages.len()).then(|| (index + 1).to_string());

        Ok(ListDiscoveredResourcesPage {
            resource_identifiers: ids
                .into_iter()
                .map(|id| ResourceIdentifier {
                    resource_type: Some(resource_type.to_string()),
                    resource_name: Some(id.clone()),
                    resource_id: Some(id),
                })
                .collect(),
            next_token,
        })
    }

    async fn batch_get_resource_config(
        &self,
        keys: &[ResourceKey],
    ) -> Result<Vec<BaseConfigurationItem>, ScanError> {
        self.describe_calls.fetch_add(1, Ordering::SeqCst);
        if Self::take_failure(&self.describe_failures) {
            return Err(ScanError::transient(
                "aws",
                "BatchGetResourceConfig",
                "ThrottlingException: Rate exceeded",
            ));
        }

        Ok(keys
            .iter()
            .filter_map(|key| self.items.get(&key.resource_id).cloned())
            .collect())
    }
}

/// A mock Cloud Asset Inventory API.
///
/// # Examples
///
/// ```rust
/// use tagwarden::backends::mock::MockAssetInventory;
/// use tagwarden::backends::gcp::ResourceSearchResult;
///
/// let api = MockAssetInventory::new()
///     .with_page(vec![ResourceSearchResult::new(
///         "compute.googleapis.com/Instance",
///         "//compute.googleapis.com/projects/p/zones/z/instances/vm-1",
///     )
///     .with_label("env", "prod")])
///     .failing_at_page(1, "PERMISSION_DENIED");
/// ```
#[derive(Debug, Default)]
pub struct MockAssetInventory {
    pages: Vec<Vec<ResourceSearchResult>>,
    failure: Option<(usize, String)>,
    calls: AtomicU64,
    scopes: Mutex<Vec<String>>,
    closed: AtomicBool,
}

impl MockAssetInventory {
    /// Creates an empty mock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a page of results.
    pub fn with_page(mut self, results: Vec<ResourceSearchResult>) -> Self {
        self.pages.push(results);
        self
    }

    /// Makes the request for page `index` fail with `message`.
    pub fn failing_at_page(mut self, index: usize, message: impl Into<String>) -> Self {
        self.failure = Some((index, message.into()));
        self
    }

    /// Returns the number of page requests made.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Returns the scopes that were searched.
    pub fn scopes(&self) -> Vec<String> {
        self.scopes.lock().unwrap().clone()
    }

    /// Returns `true` once `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AssetInventoryApi for MockAssetInventory {
    async fn search_all_resources(
        &self,
        scope: &str,
        page_token: Option<&str>,
    ) -> Result<SearchAllResourcesPage, ScanError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.scopes.lock().unwrap().push(scope.to_string());

        let index = match page_token {
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| ScanError::fatal("gcp", "SearchAllResources", "invalid page token"))?,
            None => 0,
        };

        if let Some((fail_index, message)) = &self.failure {
            if *fail_index == index {
                return Err(ScanError::fatal("gcp", "SearchAllResources", message.clone()));
            }
        }

        Ok(SearchAllResourcesPage {
            results: self.pages.get(index).cloned().unwrap_or_default(),
            next_page_token: (index + 1 < self.pages.len()).then(|| (index + 1).to_string()),
        })
    }

    async fn close(&self) -> Result<(), ScanError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
