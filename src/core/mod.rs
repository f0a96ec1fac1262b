//! Core types and traits for the tagwarden library.
//!
//! - [`types`] - `Resource`, `TagMap`, `Provider`, `ScanContext`
//! - [`tags`] - provider tag encodings and their normalization
//! - [`traits`] - the `ResourceScanner` trait
//! - [`error`] - structured error types
//! - [`result`] - the violation aggregator and run report

pub mod error;
pub mod result;
pub mod tags;
pub mod traits;
pub mod types;

pub use error::{AuditError, NotifyError, PolicyError, ReportError, ScanError, SettingsError};
pub use result::{AuditReport, ScanStats, ViolationBucket, ViolationSet, ViolationsByType};
pub use tags::RawTags;
pub use traits::{ArcScanner, ResourceScanner};
pub use types::{CancellationFlag, Provider, Resource, ScanContext, TagMap};
