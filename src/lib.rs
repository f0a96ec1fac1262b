//! # tagwarden
//!
//! Audits the resources of one cloud account or project against a
//! declarative tag/label policy and reports the resources that are missing
//! required labels or carry banned ones.
//!
//! ## Overview
//!
//! A run walks the provider's resource inventory, normalizes each
//! resource's tags, evaluates them against the policy, and groups
//! violations by resource type:
//!
//! - Load the policy from a YAML document
//! - Enumerate resources through AWS Config or Cloud Asset Inventory
//! - Record violations per bucket and resource type
//! - Write one CSV per group, zip them, and post a threaded summary
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tagwarden::backends::{AssetInventoryScanner, MockAssetInventory};
//! use tagwarden::policy::{PolicyDocument, ResourcePolicy};
//! use tagwarden::{LabelAuditor, Provider, ScanContext};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let document = PolicyDocument::from_yaml_str(
//!         "excluded-resources: []\nrequired-labels: [env]\nbanned-labels: []\n",
//!     )?;
//!     let policy = ResourcePolicy::for_provider(&document, Provider::Gcp)?;
//!
//!     let scanner = AssetInventoryScanner::new(MockAssetInventory::new(), policy);
//!     let auditor = LabelAuditor::builder().with_scanner(scanner).build()?;
//!
//!     let report = auditor.run(&ScanContext::new("my-project")).await?;
//!     println!("{} resources missing labels", report.missing_required_count());
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `default` - All of the following
//! - `aws` - AWS Config HTTP client (SigV4 signed)
//! - `gcp` - Cloud Asset Inventory HTTP client
//! - `slack` - Slack notifier
//!
//! ## Architecture
//!
//! - **Core**: Resources, tags, violation sets, the scanner trait, errors
//! - **Policy**: Policy document loading and compliance evaluation
//! - **Backends**: Provider scanners and their API clients
//! - **Manager**: Retry loop and the audit orchestrator
//! - **Report**: CSV exports, archive, message bodies
//! - **Notify**: Chat delivery
//! - **Audit**: Structured audit events

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod audit;
pub mod backends;
pub mod core;
pub mod manager;
pub mod notify;
pub mod policy;
pub mod report;
pub mod settings;

// Re-export commonly used types at the crate root
pub use crate::core::{
    ArcScanner, AuditError, AuditReport, Provider, RawTags, Resource, ResourceScanner,
    ScanContext, ScanError, TagMap, ViolationBucket, ViolationSet,
};

pub use crate::manager::{AuditorConfig, LabelAuditor, RetryConfig};
pub use crate::notify::Notifier;
pub use crate::policy::{ComplianceEvaluator, PolicyDocument, ResourcePolicy};

/// Prelude module for convenient imports.
///
/// ```rust
/// use tagwarden::prelude::*;
/// ```
pub mod prelude {
    pub use crate::core::{
        ArcScanner, AuditError, AuditReport, PolicyError, Provider, RawTags, Resource,
        ResourceScanner, ScanContext, ScanError, TagMap, ViolationBucket, ViolationSet,
    };
    pub use crate::manager::{AuditorConfig, LabelAuditor, RetryConfig};
    pub use crate::notify::Notifier;
    pub use crate::policy::{ComplianceEvaluator, PolicyDocument, ResourcePolicy};
}
