//! Core traits for the tagwarden library.
//!
//! This module defines the `ResourceScanner` trait that every provider
//! backend implements. The orchestrator only ever talks to this trait.

use crate::core::error::ScanError;
use crate::core::result::ViolationSet;
use crate::core::types::{Provider, ScanContext};

use async_trait::async_trait;
use std::fmt::Debug;

/// A provider backend that walks an inventory and collects label violations.
///
/// # Implementation Notes
///
/// - `scan` must enumerate the full in-scope inventory exactly once.
/// - Resources whose tags cannot be decoded are evaluated with no tags;
///   resources with no identifier or type are skipped.
/// - Implementations should never panic; all errors are returned as `ScanError`.
///
/// # Example Implementation
///
/// ```rust,ignore
/// use tagwarden::core::{Provider, ResourceScanner, ScanContext, ScanError, ViolationSet};
/// use async_trait::async_trait;
///
/// #[derive(Debug)]
/// struct StaticScanner;
///
/// #[async_trait]
/// impl ResourceScanner for StaticScanner {
///     fn name(&self) -> &str {
///         "static"
///     }
///
///     fn provider(&self) -> Provider {
///         Provider::Aws
///     }
///
///     async fn scan(&self, _ctx: &ScanContext) -> Result<ViolationSet, ScanError> {
///         Ok(ViolationSet::new())
///     }
/// }
/// ```
#[async_trait]
pub trait ResourceScanner: Send + Sync + Debug {
    /// Returns a stable, human-readable name for logging.
    fn name(&self) -> &str;

    /// Returns the provider this scanner talks to.
    fn provider(&self) -> Provider;

    /// Scans the inventory bounded by `ctx.scope`.
    ///
    /// # Errors
    ///
    /// - `FatalApi` - the provider rejected a call the scanner does not retry.
    /// - `RetriesExhausted` - a bounded retry policy gave up.
    /// - `Cancelled` - `ctx.cancellation` was set during the scan.
    async fn scan(&self, ctx: &ScanContext) -> Result<ViolationSet, ScanError>;

    /// Releases any provider resources held by the scanner.
    async fn close(&self) -> Result<(), ScanError> {
        Ok(())
    }
}

/// An arc-wrapped scanner for shared ownership.
pub type ArcScanner = std::sync::Arc<dyn ResourceScanner>;
