//! Compliance evaluation.
//!
//! Two pure predicates decide whether a resource's tags satisfy the policy.
//! Only key presence matters; tag values are never compared.

use crate::core::result::{ViolationBucket, ViolationSet};
use crate::core::types::{Resource, TagMap};
use crate::policy::rules::ResourcePolicy;

/// Returns `true` if `tags` carries every label in `required`.
///
/// An empty `required` list is always satisfied. Otherwise a resource with
/// no tags at all fails.
pub fn has_all_required(required: &[String], tags: &TagMap) -> bool {
    if required.is_empty() {
        return true;
    }
    if tags.is_empty() {
        return false;
    }
    required.iter().all(|label| tags.contains_key(label))
}

/// Returns `true` if `tags` carries none of the labels in `banned`.
pub fn has_no_banned(banned: &[String], tags: &TagMap) -> bool {
    banned.iter().all(|label| !tags.contains_key(label))
}

/// The result of evaluating one resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    /// At least one required label is missing.
    pub missing_required: bool,
    /// At least one banned label is present.
    pub banned_present: bool,
}

impl Verdict {
    /// Returns `true` if the resource passed both checks.
    pub fn is_compliant(&self) -> bool {
        !self.missing_required && !self.banned_present
    }
}

/// Applies a [`ResourcePolicy`] to resources and records failures.
#[derive(Debug, Clone)]
pub struct ComplianceEvaluator {
    policy: ResourcePolicy,
}

impl ComplianceEvaluator {
    /// Creates an evaluator for the given policy.
    pub fn new(policy: ResourcePolicy) -> Self {
        Self { policy }
    }

    /// Returns the policy being applied.
    pub fn policy(&self) -> &ResourcePolicy {
        &self.policy
    }

    /// Evaluates a resource without recording anything.
    pub fn evaluate(&self, resource: &Resource) -> Verdict {
        Verdict {
            missing_required: !has_all_required(&self.policy.required_labels, &resource.tags),
            banned_present: !has_no_banned(&self.policy.banned_labels, &resource.tags),
        }
    }

    /// Evaluates a resource and records it in each bucket it fails.
    ///
    /// A resource is recorded at most once per bucket.
    pub fn apply(&self, resource: &Resource, violations: &mut ViolationSet) -> Verdict {
        let verdict = self.evaluate(resource);

        if verdict.missing_required {
            violations.record(
                ViolationBucket::NoRequiredLabel,
                &resource.resource_type,
                &resource.identifier,
            );
        }
        if verdict.banned_present {
            violations.record(
                ViolationBucket::BannedLabelPresent,
                &resource.resource_type,
                &resource.identifier,
            );
        }

        if !verdict.is_compliant() {
            tracing::debug!(
                resource_type = %resource.resource_type,
                identifier = %resource.identifier,
                missing_required = verdict.missing_required,
                banned_present = verdict.banned_present,
                "Resource is not compliant"
            );
        }

        verdict
    }
}
