//! Core types used throughout the tagwarden library.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Normalized tag/label mapping of a resource.
pub type TagMap = BTreeMap<String, String>;

/// The cloud provider a scanner talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// AWS Config (paginated list + describe).
    Aws,
    /// Google Cloud Asset Inventory (streaming search).
    Gcp,
}

impl Provider {
    /// Returns the provider as a stable lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Aws => "aws",
            Self::Gcp => "gcp",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single cloud resource, ready for evaluation.
///
/// Resources are transient: they are built from one provider response,
/// evaluated, and dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    /// Provider-defined resource type (e.g. `AWS::S3::Bucket`).
    pub resource_type: String,

    /// ARN or fully-qualified resource name.
    pub identifier: String,

    /// Normalized tags.
    pub tags: TagMap,
}

impl Resource {
    /// Creates a new resource with no tags.
    pub fn new(resource_type: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            identifier: identifier.into(),
            tags: TagMap::new(),
        }
    }

    /// Replaces the tags.
    pub fn with_tags(mut self, tags: TagMap) -> Self {
        self.tags = tags;
        self
    }

    /// Adds a single tag.
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }
}

/// A cloneable cancellation flag shared between the caller and a running scan.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    /// Creates a new, unset flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Returns `true` once cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Context for one audit run.
#[derive(Debug, Clone)]
pub struct ScanContext {
    /// Unique identifier of this run, used to correlate log lines.
    pub run_id: String,

    /// Account name or project id bounding the scan.
    pub scope: String,

    /// Region, for providers that have one.
    pub region: Option<String>,

    /// When the run started.
    pub started_at: DateTime<Utc>,

    /// Cancellation flag checked by long-running loops.
    pub cancellation: CancellationFlag,
}

impl ScanContext {
    /// Creates a new context for the given scope.
    pub fn new(scope: impl Into<String>) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            scope: scope.into(),
            region: None,
            started_at: Utc::now(),
            cancellation: CancellationFlag::new(),
        }
    }

    /// Sets the region.
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Shares an existing cancellation flag with this context.
    pub fn with_cancellation(mut self, flag: CancellationFlag) -> Self {
        self.cancellation = flag;
        self
    }

    /// Returns `true` once cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}
