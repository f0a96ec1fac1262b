//! AWS Config backend.
//!
//! Resources are enumerated per type with `ListDiscoveredResources`, then
//! each one is described with `BatchGetResourceConfig` to obtain the
//! configuration blob that embeds its tags.
//!
//! The API is modelled by [`ConfigServiceApi`] so the scanner can run
//! against the HTTP client ([`AwsConfigClient`], `aws` feature) or a mock.

mod scanner;

#[cfg(feature = "aws")]
mod client;

pub use scanner::ConfigServiceScanner;

#[cfg(feature = "aws")]
pub use client::{AwsConfigClient, AwsConfigSettings, AwsCredentials};

use crate::core::ScanError;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Identifies one resource for a detail fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceKey {
    /// Resource type, e.g. `AWS::EC2::Instance`.
    pub resource_type: String,
    /// Provider resource id.
    pub resource_id: String,
}

/// One entry of a `ListDiscoveredResources` page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceIdentifier {
    /// Resource type.
    #[serde(default)]
    pub resource_type: Option<String>,
    /// Provider resource id.
    #[serde(default)]
    pub resource_id: Option<String>,
    /// Display name, if any.
    #[serde(default)]
    pub resource_name: Option<String>,
}

impl ResourceIdentifier {
    /// Returns the key used to fetch this resource's configuration.
    pub fn key(&self) -> Option<ResourceKey> {
        Some(ResourceKey {
            resource_type: self.resource_type.clone()?,
            resource_id: self.resource_id.clone()?,
        })
    }
}

/// A page of listed resources.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListDiscoveredResourcesPage {
    /// Resources on this page.
    #[serde(default)]
    pub resource_identifiers: Vec<ResourceIdentifier>,
    /// Continuation token; `None` on the last page.
    #[serde(default)]
    pub next_token: Option<String>,
}

/// The configuration snapshot returned by a detail fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseConfigurationItem {
    /// Resource ARN. Some resource types have none.
    #[serde(default)]
    pub arn: Option<String>,
    /// Resource type.
    #[serde(default)]
    pub resource_type: Option<String>,
    /// Provider resource id.
    #[serde(default)]
    pub resource_id: Option<String>,
    /// JSON-encoded configuration document.
    #[serde(default)]
    pub configuration: Option<String>,
}

/// The subset of the AWS Config API the scanner needs.
#[async_trait]
pub trait ConfigServiceApi: Send + Sync + Debug {
    /// Lists one page of discovered resources of `resource_type`.
    async fn list_discovered_resources(
        &self,
        resource_type: &str,
        next_token: Option<&str>,
    ) -> Result<ListDiscoveredResourcesPage, ScanError>;

    /// Fetches configuration items for the given keys.
    async fn batch_get_resource_config(
        &self,
        keys: &[ResourceKey],
    ) -> Result<Vec<BaseConfigurationItem>, ScanError>;
}
