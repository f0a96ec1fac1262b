//! Scan result structures.
//!
//! [`ViolationSet`] is the aggregator: scanners record non-compliant
//! resources into it as they go, and the finished set is handed to
//! reporting. [`AuditReport`] wraps it with run metadata once a run
//! completes.

use crate::core::types::Provider;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Resource identifiers grouped by resource type.
///
/// Types iterate in sorted order; identifiers keep insertion order.
pub type ViolationsByType = BTreeMap<String, Vec<String>>;

/// The two groupings a non-compliant resource can land in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationBucket {
    /// The resource is missing at least one required label.
    NoRequiredLabel,
    /// The resource carries at least one banned label.
    BannedLabelPresent,
}

impl ViolationBucket {
    /// Both buckets, in report order.
    pub const ALL: [ViolationBucket; 2] = [Self::NoRequiredLabel, Self::BannedLabelPresent];

    /// Returns a short, file-name-safe slug.
    pub fn slug(&self) -> &'static str {
        match self {
            Self::NoRequiredLabel => "no-required-label",
            Self::BannedLabelPresent => "banned-label",
        }
    }

    /// Returns a human-readable heading.
    pub fn title(&self) -> &'static str {
        match self {
            Self::NoRequiredLabel => "Resources missing required labels",
            Self::BannedLabelPresent => "Resources carrying banned labels",
        }
    }
}

impl fmt::Display for ViolationBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

/// Non-compliant resources found during one scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViolationSet {
    /// Resources missing at least one required label.
    pub no_required_label: ViolationsByType,

    /// Resources carrying at least one banned label.
    pub banned_label_present: ViolationsByType,
}

impl ViolationSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `identifier` to `bucket[resource_type]`.
    pub fn record(
        &mut self,
        bucket: ViolationBucket,
        resource_type: impl Into<String>,
        identifier: impl Into<String>,
    ) {
        self.bucket_mut(bucket)
            .entry(resource_type.into())
            .or_default()
            .push(identifier.into());
    }

    /// Returns the grouping for a bucket.
    pub fn bucket(&self, bucket: ViolationBucket) -> &ViolationsByType {
        match bucket {
            ViolationBucket::NoRequiredLabel => &self.no_required_label,
            ViolationBucket::BannedLabelPresent => &self.banned_label_present,
        }
    }

    fn bucket_mut(&mut self, bucket: ViolationBucket) -> &mut ViolationsByType {
        match bucket {
            ViolationBucket::NoRequiredLabel => &mut self.no_required_label,
            ViolationBucket::BannedLabelPresent => &mut self.banned_label_present,
        }
    }

    /// Returns the number of identifiers recorded in a bucket.
    pub fn count(&self, bucket: ViolationBucket) -> usize {
        self.bucket(bucket).values().map(Vec::len).sum()
    }

    /// Returns `true` if neither bucket has any entries.
    pub fn is_empty(&self) -> bool {
        self.no_required_label.is_empty() && self.banned_label_present.is_empty()
    }

    /// Iterates over every `(bucket, type, identifiers)` group.
    pub fn groups(&self) -> impl Iterator<Item = (ViolationBucket, &str, &[String])> + '_ {
        ViolationBucket::ALL.into_iter().flat_map(move |bucket| {
            self.bucket(bucket)
                .iter()
                .map(move |(ty, ids)| (bucket, ty.as_str(), ids.as_slice()))
        })
    }
}

/// Counters collected while a scanner walks the inventory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStats {
    /// Resources that were evaluated against the policy.
    pub evaluated: u64,
    /// Resources dropped because they had no identifier or type.
    pub skipped_incomplete: u64,
    /// Resources dropped because their type is out of scope.
    pub skipped_excluded: u64,
    /// Resources whose tags could not be decoded (evaluated with no tags).
    pub decode_failures: u64,
    /// Provider calls that had to be repeated.
    pub retries: u64,
}

/// The outcome of a complete audit run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditReport {
    /// Run identifier.
    pub run_id: String,

    /// Provider that was scanned.
    pub provider: Provider,

    /// Account name or project id.
    pub scope: String,

    /// Report date (`YYYY-MM-DD`) in the configured time zone.
    pub date: String,

    /// Aggregated violations.
    pub violations: ViolationSet,

    /// Zip archive holding the CSV exports, if one was written.
    pub archive_path: Option<PathBuf>,

    /// When the run started.
    pub started_at: DateTime<Utc>,

    /// When the run completed.
    pub completed_at: DateTime<Utc>,

    /// How long the run took.
    #[serde(with = "duration_serde")]
    pub duration: Duration,
}

impl AuditReport {
    /// Returns the total number of resources missing required labels.
    pub fn missing_required_count(&self) -> usize {
        self.violations.count(ViolationBucket::NoRequiredLabel)
    }

    /// Returns the total number of resources carrying banned labels.
    pub fn banned_count(&self) -> usize {
        self.violations.count(ViolationBucket::BannedLabelPresent)
    }
}

/// Serde helper for Duration serialization.
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
