//! The resolved label policy for one run.

use crate::core::error::PolicyResult;
use crate::core::types::Provider;
use crate::policy::loader::{
    PolicyDocument, BANNED_LABELS_KEY, EXCLUDED_RESOURCES_KEY, INCLUDED_RESOURCES_KEY,
    REQUIRED_LABELS_KEY,
};

use std::collections::BTreeSet;

/// Which resource types a scan covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceScope {
    /// Only these types, scanned in this order.
    Include(Vec<String>),
    /// Every type except these.
    Exclude(BTreeSet<String>),
}

impl ResourceScope {
    /// Returns `true` if resources of `resource_type` should be evaluated.
    pub fn contains(&self, resource_type: &str) -> bool {
        match self {
            Self::Include(types) => types.iter().any(|t| t == resource_type),
            Self::Exclude(types) => !types.contains(resource_type),
        }
    }
}

/// Required/banned labels plus the set of resource types they apply to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourcePolicy {
    /// Resource types in scope.
    pub scope: ResourceScope,

    /// Labels every in-scope resource must carry.
    pub required_labels: Vec<String>,

    /// Labels no in-scope resource may carry.
    pub banned_labels: Vec<String>,
}

impl ResourcePolicy {
    /// Creates a policy from its parts.
    pub fn new(
        scope: ResourceScope,
        required_labels: Vec<String>,
        banned_labels: Vec<String>,
    ) -> Self {
        Self {
            scope,
            required_labels,
            banned_labels,
        }
    }

    /// Resolves the policy a provider's scanner needs from a document.
    ///
    /// AWS scans an allow-list (`included-resources`); GCP searches
    /// everything and skips a deny-list (`excluded-resources`).
    pub fn for_provider(doc: &PolicyDocument, provider: Provider) -> PolicyResult<Self> {
        let scope = match provider {
            Provider::Aws => {
                ResourceScope::Include(doc.string_collection(INCLUDED_RESOURCES_KEY)?.to_vec())
            }
            Provider::Gcp => ResourceScope::Exclude(
                doc.string_collection(EXCLUDED_RESOURCES_KEY)?
                    .iter()
                    .cloned()
                    .collect(),
            ),
        };

        Ok(Self {
            scope,
            required_labels: doc.string_collection(REQUIRED_LABELS_KEY)?.to_vec(),
            banned_labels: doc.string_collection(BANNED_LABELS_KEY)?.to_vec(),
        })
    }

    /// Returns the allow-listed types, if this policy has an allow-list.
    pub fn included_types(&self) -> Option<&[String]> {
        match &self.scope {
            ResourceScope::Include(types) => Some(types),
            ResourceScope::Exclude(_) => None,
        }
    }

    /// Returns `true` if resources of `resource_type` should be evaluated.
    pub fn in_scope(&self, resource_type: &str) -> bool {
        self.scope.contains(resource_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::PolicyError;

    const AWS_POLICY: &str = r#"
included-resources: [AWS::EC2::Instance, AWS::S3::Bucket]
required-labels: [env]
banned-labels: [temp]
"#;

    const GCP_POLICY: &str = r#"
excluded-resources: [compute.googleapis.com/Disk]
required-labels: [env, owner]
banned-labels: [temp, scratch]
"#;

    #[test]
    fn test_aws_policy_uses_allow_list() {
        let doc = PolicyDocument::from_yaml_str(AWS_POLICY).unwrap();
        let policy = ResourcePolicy::for_provider(&doc, Provider::Aws).unwrap();

        assert_eq!(
            policy.included_types().unwrap(),
            ["AWS::EC2::Instance", "AWS::S3::Bucket"]
        );
        assert!(policy.in_scope("AWS::S3::Bucket"));
        assert!(!policy.in_scope("AWS::RDS::DBInstance"));
    }

    #[test]
    fn test_gcp_policy_uses_deny_list() {
        let doc = PolicyDocument::from_yaml_str(GCP_POLICY).unwrap();
        let policy = ResourcePolicy::for_provider(&doc, Provider::Gcp).unwrap();

        assert!(policy.included_types().is_none());
        assert!(!policy.in_scope("compute.googleapis.com/Disk"));
        assert!(policy.in_scope("compute.googleapis.com/Instance"));
    }

    #[test]
    fn test_banned_labels_come_from_their_own_key() {
        let doc = PolicyDocument::from_yaml_str(GCP_POLICY).unwrap();
        let policy = ResourcePolicy::for_provider(&doc, Provider::Gcp).unwrap();

        assert_eq!(policy.required_labels, ["env", "owner"]);
        assert_eq!(policy.banned_labels, ["temp", "scratch"]);
    }

    #[test]
    fn test_bundled_policies_resolve() {
        let aws = PolicyDocument::from_yaml_str(include_str!("../../config/aws.yml")).unwrap();
        let aws = ResourcePolicy::for_provider(&aws, Provider::Aws).unwrap();
        assert!(aws.in_scope("AWS::S3::Bucket"));

        let gcp = PolicyDocument::from_yaml_str(include_str!("../../config/gcp.yml")).unwrap();
        let gcp = ResourcePolicy::for_provider(&gcp, Provider::Gcp).unwrap();
        assert!(!gcp.in_scope("compute.googleapis.com/Route"));
        assert_eq!(gcp.required_labels, aws.required_labels);
    }

    #[test]
    fn test_missing_scope_key_is_fatal() {
        let doc = PolicyDocument::from_yaml_str(AWS_POLICY).unwrap();
        let err = ResourcePolicy::for_provider(&doc, Provider::Gcp).unwrap_err();
        assert!(matches!(err, PolicyError::ConfigKeyMissing { .. }));
    }
}
