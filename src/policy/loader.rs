//! Policy document loading.
//!
//! The policy lives in a small YAML document of named string lists:
//!
//! ```yaml
//! included-resources:
//!   - AWS::EC2::Instance
//! required-labels:
//!   - env
//! banned-labels: []
//! ```

use crate::core::error::{PolicyError, PolicyResult};

use std::collections::BTreeMap;
use std::path::Path;

/// Key holding the resource types to scan (allow-list).
pub const INCLUDED_RESOURCES_KEY: &str = "included-resources";
/// Key holding the resource types to skip (deny-list).
pub const EXCLUDED_RESOURCES_KEY: &str = "excluded-resources";
/// Key holding the labels every resource must carry.
pub const REQUIRED_LABELS_KEY: &str = "required-labels";
/// Key holding the labels no resource may carry.
pub const BANNED_LABELS_KEY: &str = "banned-labels";

/// A parsed policy document: named, ordered string collections.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyDocument {
    collections: BTreeMap<String, Vec<String>>,
}

impl PolicyDocument {
    /// Parses a YAML document.
    ///
    /// Every top-level value must be a list of strings. A key bound to
    /// `null` is treated as an empty list.
    pub fn from_yaml_str(source: &str) -> PolicyResult<Self> {
        let raw: BTreeMap<String, Option<Vec<String>>> =
            serde_yaml::from_str(source).map_err(|e| PolicyError::parse(e.to_string()))?;

        let collections = raw
            .into_iter()
            .map(|(key, values)| (key, values.unwrap_or_default()))
            .collect();

        Ok(Self { collections })
    }

    /// Reads and parses a YAML document from disk.
    pub fn from_path(path: impl AsRef<Path>) -> PolicyResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| PolicyError::parse(format!("{}: {}", path.display(), e)))?;
        Self::from_yaml_str(&source)
    }

    /// Returns the ordered collection bound to `key`.
    pub fn string_collection(&self, key: &str) -> PolicyResult<&[String]> {
        self.collections
            .get(key)
            .map(Vec::as_slice)
            .ok_or_else(|| PolicyError::key_missing(key))
    }

    /// Returns `true` if the document defines `key`.
    pub fn contains_key(&self, key: &str) -> bool {
        self.collections.contains_key(key)
    }
}

/// Parses `source` and returns the collection bound to `key`.
pub fn string_collection(source: &str, key: &str) -> PolicyResult<Vec<String>> {
    PolicyDocument::from_yaml_str(source)?
        .string_collection(key)
        .map(<[String]>::to_vec)
}

#[cfg(test)]
mod tests {
    use super::*;

    const POLICY: &str = r#"
included-resources:
  - AWS::EC2::Instance
  - AWS::S3::Bucket
required-labels:
  - env
  - owner
banned-labels:
"#;

    #[test]
    fn test_string_collection_preserves_order() {
        let doc = PolicyDocument::from_yaml_str(POLICY).unwrap();
        assert_eq!(
            doc.string_collection(INCLUDED_RESOURCES_KEY).unwrap(),
            ["AWS::EC2::Instance", "AWS::S3::Bucket"]
        );
        assert_eq!(
            doc.string_collection(REQUIRED_LABELS_KEY).unwrap(),
            ["env", "owner"]
        );
    }

    #[test]
    fn test_null_collection_is_empty() {
        let doc = PolicyDocument::from_yaml_str(POLICY).unwrap();
        assert!(doc.string_collection(BANNED_LABELS_KEY).unwrap().is_empty());
    }

    #[test]
    fn test_missing_key() {
        let err = string_collection(POLICY, EXCLUDED_RESOURCES_KEY).unwrap_err();
        assert!(matches!(
            err,
            PolicyError::ConfigKeyMissing { ref key } if key == EXCLUDED_RESOURCES_KEY
        ));
    }

    #[test]
    fn test_malformed_document() {
        let err = PolicyDocument::from_yaml_str("required-labels: [env\n").unwrap_err();
        assert!(matches!(err, PolicyError::ConfigParse { .. }));

        let err = PolicyDocument::from_yaml_str("required-labels: env").unwrap_err();
        assert!(matches!(err, PolicyError::ConfigParse { .. }));
    }

    #[test]
    fn test_repeated_lookups_are_stable() {
        let first = string_collection(POLICY, REQUIRED_LABELS_KEY).unwrap();
        let second = string_collection(POLICY, REQUIRED_LABELS_KEY).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, POLICY.as_bytes()).unwrap();

        let doc = PolicyDocument::from_path(file.path()).unwrap();
        assert!(doc.contains_key(REQUIRED_LABELS_KEY));

        let err = PolicyDocument::from_path("/nonexistent/policy.yml").unwrap_err();
        assert!(matches!(err, PolicyError::ConfigParse { .. }));
    }
}
