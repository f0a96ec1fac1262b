//! Streaming search scanner for Cloud Asset Inventory.

use crate::audit;
use crate::backends::gcp::{search_scope, search_stream, AssetInventoryApi};
use crate::backends::skip_incomplete;
use crate::core::{
    Provider, RawTags, Resource, ResourceScanner, ScanContext, ScanError, ScanStats, ViolationSet,
};
use crate::policy::{ComplianceEvaluator, ResourcePolicy};

use async_trait::async_trait;
use futures::TryStreamExt;
use std::pin::pin;

/// Scans every resource in a project (or folder/organization) with one
/// streaming search, skipping the policy's excluded types.
///
/// Unlike the AWS scanner, errors are not retried: the first failure
/// aborts the scan and is returned to the caller.
#[derive(Debug)]
pub struct AssetInventoryScanner<A> {
    api: A,
    evaluator: ComplianceEvaluator,
}

impl<A: AssetInventoryApi> AssetInventoryScanner<A> {
    /// Creates a new scanner.
    pub fn new(api: A, policy: ResourcePolicy) -> Self {
        Self {
            api,
            evaluator: ComplianceEvaluator::new(policy),
        }
    }

    /// Returns the underlying API client.
    pub fn api(&self) -> &A {
        &self.api
    }
}

#[async_trait]
impl<A: AssetInventoryApi> ResourceScanner for AssetInventoryScanner<A> {
    fn name(&self) -> &str {
        "gcp-asset-inventory"
    }

    fn provider(&self) -> Provider {
        Provider::Gcp
    }

    async fn scan(&self, ctx: &ScanContext) -> Result<ViolationSet, ScanError> {
        let scope = search_scope(&ctx.scope);
        audit::emit_scan_started(ctx, self.name(), self.provider());

        let mut violations = ViolationSet::new();
        let mut stats = ScanStats::default();
        let mut results = pin!(search_stream(&self.api, &scope));

        while let Some(result) = results.try_next().await? {
            if ctx.is_cancelled() {
                return Err(ScanError::Cancelled);
            }

            if result.name.is_empty() || result.asset_type.is_empty() {
                skip_incomplete(ctx, &mut stats, &result.name, "search result has no name or type");
                continue;
            }

            if !self.evaluator.policy().in_scope(&result.asset_type) {
                stats.skipped_excluded += 1;
                continue;
            }

            let (tags, failed) = RawTags::Map(result.labels).normalize_lenient(&result.name)?;
            if failed {
                stats.decode_failures += 1;
            }
            let resource = Resource::new(result.asset_type, result.name).with_tags(tags);
            self.evaluator.apply(&resource, &mut violations);
            stats.evaluated += 1;
        }

        audit::emit_scan_completed(ctx, self.name(), &stats, &violations);
        Ok(violations)
    }

    async fn close(&self) -> Result<(), ScanError> {
        self.api.close().await
    }
}
