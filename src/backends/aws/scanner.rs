//! Paginated list + describe scanner for AWS Config.

use crate::audit;
use crate::backends::aws::{BaseConfigurationItem, ConfigServiceApi};
use crate::backends::skip_incomplete;
use crate::core::{
    Provider, RawTags, Resource, ResourceScanner, ScanContext, ScanError, ScanStats, TagMap,
    ViolationSet,
};
use crate::manager::retry::{retry_async, RetryConfig};
use crate::policy::{ComplianceEvaluator, ResourcePolicy};

use async_trait::async_trait;
use std::slice;

/// Scans the resource types listed in the policy's allow-list.
///
/// Types are processed one after another. AWS Config applies a single
/// request-rate limit per account, and fanning out across types produces
/// `ThrottlingException`s, so nothing here runs concurrently.
///
/// # Example
///
/// ```rust,ignore
/// use tagwarden::backends::aws::{AwsConfigClient, ConfigServiceScanner};
///
/// let scanner = ConfigServiceScanner::new(client, policy);
/// let violations = scanner.scan(&ctx).await?;
/// ```
#[derive(Debug)]
pub struct ConfigServiceScanner<C> {
    client: C,
    evaluator: ComplianceEvaluator,
    retry: RetryConfig,
}

impl<C: ConfigServiceApi> ConfigServiceScanner<C> {
    /// Creates a scanner with the default (unbounded) retry policy.
    pub fn new(client: C, policy: ResourcePolicy) -> Self {
        Self {
            client,
            evaluator: ComplianceEvaluator::new(policy),
            retry: RetryConfig::default(),
        }
    }

    /// Sets the retry policy used for every API call.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Returns the underlying API client.
    pub fn client(&self) -> &C {
        &self.client
    }

    async fn scan_type(
        &self,
        ctx: &ScanContext,
        resource_type: &str,
        violations: &mut ViolationSet,
        stats: &mut ScanStats,
    ) -> Result<(), ScanError> {
        tracing::info!(resource_type = %resource_type, "Searching for resources");

        let mut next_token: Option<String> = None;
        loop {
            let page = retry_async(
                &self.retry,
                &ctx.cancellation,
                "ListDiscoveredResources",
                |_| stats.retries += 1,
                || {
                    self.client
                        .list_discovered_resources(resource_type, next_token.as_deref())
                },
            )
            .await?;

            for identifier in &page.resource_identifiers {
                let Some(key) = identifier.key() else {
                    skip_incomplete(ctx, stats, resource_type, "listed without id or type");
                    continue;
                };

                let items = retry_async(
                    &self.retry,
                    &ctx.cancellation,
                    "BatchGetResourceConfig",
                    |_| stats.retries += 1,
                    || self.client.batch_get_resource_config(slice::from_ref(&key)),
                )
                .await?;

                match items.into_iter().next() {
                    Some(item) => self.evaluate_item(ctx, item, violations, stats)?,
                    None => skip_incomplete(ctx, stats, &key.resource_id, "no configuration item"),
                }
            }

            match page.next_token.filter(|t| !t.is_empty()) {
                Some(token) => next_token = Some(token),
                None => break,
            }
        }

        Ok(())
    }

    fn evaluate_item(
        &self,
        ctx: &ScanContext,
        item: BaseConfigurationItem,
        violations: &mut ViolationSet,
        stats: &mut ScanStats,
    ) -> Result<(), ScanError> {
        let (Some(arn), Some(resource_type)) = (item.arn, item.resource_type) else {
            skip_incomplete(
                ctx,
                stats,
                item.resource_id.as_deref().unwrap_or("unknown"),
                "configuration item has no ARN or type",
            );
            return Ok(());
        };

        if !self.evaluator.policy().in_scope(&resource_type) {
            stats.skipped_excluded += 1;
            return Ok(());
        }

        let tags = match item.configuration {
            Some(blob) => {
                let (tags, failed) = RawTags::ConfigurationBlob(blob).normalize_lenient(&arn)?;
                if failed {
                    stats.decode_failures += 1;
                }
                tags
            }
            None => TagMap::new(),
        };

        let resource = Resource::new(resource_type, arn).with_tags(tags);
        self.evaluator.apply(&resource, violations);
        stats.evaluated += 1;
        Ok(())
    }
}

#[async_trait]
impl<C: ConfigServiceApi> ResourceScanner for ConfigServiceScanner<C> {
    fn name(&self) -> &str {
        "aws-config"
    }

    fn provider(&self) -> Provider {
        Provider::Aws
    }

    async fn scan(&self, ctx: &ScanContext) -> Result<ViolationSet, ScanError> {
        let types = self.evaluator.policy().included_types().ok_or_else(|| {
            ScanError::configuration("AWS Config scanning requires an included-resources list")
        })?;

        audit::emit_scan_started(ctx, self.name(), self.provider());

        let mut violations = ViolationSet::new();
        let mut stats = ScanStats::default();

        for resource_type in types {
            self.scan_type(ctx, resource_type, &mut violations, &mut stats)
                .await?;
        }

        audit::emit_scan_completed(ctx, self.name(), &stats, &violations);
        Ok(violations)
    }
}
