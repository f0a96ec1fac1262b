//! Provider scanner implementations.
//!
//! Each provider module exposes a scanner that implements
//! [`ResourceScanner`](crate::core::ResourceScanner) on top of a small API
//! trait, plus an HTTP implementation of that trait behind a cargo feature.
//!
//! ## Available Backends
//!
//! - [`aws`] - AWS Config, paginated list + describe (HTTP client requires `aws` feature)
//! - [`gcp`] - Cloud Asset Inventory, streaming search (HTTP client requires `gcp` feature)
//! - [`mock`] - In-memory APIs for testing
//!
//! ## Implementing a Custom Backend
//!
//! ```rust,ignore
//! use tagwarden::core::{Provider, ResourceScanner, ScanContext, ScanError, ViolationSet};
//! use async_trait::async_trait;
//!
//! #[derive(Debug)]
//! pub struct MyScanner;
//!
//! #[async_trait]
//! impl ResourceScanner for MyScanner {
//!     fn name(&self) -> &str {
//!         "my-scanner"
//!     }
//!
//!     fn provider(&self) -> Provider {
//!         Provider::Aws
//!     }
//!
//!     async fn scan(&self, ctx: &ScanContext) -> Result<ViolationSet, ScanError> {
//!         todo!()
//!     }
//! }
//! ```

pub mod aws;
pub mod gcp;
pub mod mock;

// Re-exports
pub use aws::ConfigServiceScanner;
pub use gcp::AssetInventoryScanner;
pub use mock::{MockAssetInventory, MockConfigService};

use crate::audit;
use crate::core::{ScanContext, ScanError, ScanStats};

/// Counts and logs a resource that lacks an identifier or a type.
pub(crate) fn skip_incomplete(
    ctx: &ScanContext,
    stats: &mut ScanStats,
    identifier: &str,
    reason: &str,
) {
    stats.skipped_incomplete += 1;
    audit::emit_resource_skipped(ctx, identifier, &ScanError::incomplete(reason));
}
