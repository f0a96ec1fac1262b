//! Tag normalization.
//!
//! Providers encode tags differently. AWS Config embeds a list of
//! `{"key": .., "value": ..}` objects in a JSON configuration blob, while
//! Cloud Asset Inventory already returns a plain label map. [`RawTags`]
//! captures each shape and turns it into a [`TagMap`], so evaluation never
//! sees provider-specific encodings.

use crate::core::error::ScanError;
use crate::core::types::TagMap;

use serde::Deserialize;
use std::collections::HashMap;

const KEY_FIELD: &str = "key";
const VALUE_FIELD: &str = "value";

/// A provider-specific tag payload.
#[derive(Debug, Clone, PartialEq)]
pub enum RawTags {
    /// A list of single-pair entries keyed by `"key"` and `"value"`.
    KeyValueList(Vec<HashMap<String, String>>),

    /// A JSON configuration document that embeds a key/value list under `"tags"`.
    ConfigurationBlob(String),

    /// Tags that are already a map.
    Map(TagMap),
}

#[derive(Debug, Deserialize)]
struct ConfigurationTags {
    #[serde(default)]
    tags: Option<Vec<HashMap<String, String>>>,
}

impl RawTags {
    /// Decodes the payload into a tag map.
    ///
    /// # Errors
    ///
    /// Returns `ScanError::Decode` if a configuration blob is not valid JSON
    /// or its `tags` field is not a list of string maps.
    pub fn normalize(self) -> Result<TagMap, ScanError> {
        match self {
            Self::KeyValueList(entries) => Ok(normalize_key_value_list(&entries)),
            Self::ConfigurationBlob(blob) => decode_configuration_tags(&blob),
            Self::Map(map) => Ok(map),
        }
    }

    /// Decodes the payload, falling back to an empty map on absorbed errors.
    ///
    /// The second element is `true` when decoding failed. The resource is
    /// still evaluated with no tags, so it will fail any required-label check.
    ///
    /// # Errors
    ///
    /// Errors that [`ScanError::is_absorbed`] rejects are returned unchanged.
    pub fn normalize_lenient(self, identifier: &str) -> Result<(TagMap, bool), ScanError> {
        match self.normalize() {
            Ok(tags) => Ok((tags, false)),
            Err(e) if e.is_absorbed() => {
                tracing::warn!(
                    identifier = %identifier,
                    error = %e,
                    "Tag payload could not be decoded, evaluating with no tags"
                );
                Ok((TagMap::new(), true))
            }
            Err(e) => Err(e),
        }
    }
}

/// Builds a tag map from `{"key": .., "value": ..}` entries.
///
/// Entries without both fields, or with an empty key or value, are dropped.
pub fn normalize_key_value_list(entries: &[HashMap<String, String>]) -> TagMap {
    entries
        .iter()
        .filter_map(|entry| {
            let key = entry.get(KEY_FIELD)?;
            let value = entry.get(VALUE_FIELD)?;
            if key.is_empty() || value.is_empty() {
                return None;
            }
            Some((key.clone(), value.clone()))
        })
        .collect()
}

/// Extracts tags from an AWS Config configuration blob.
///
/// A blob without a `tags` field (or with `"tags": null`) has no tags.
pub fn decode_configuration_tags(blob: &str) -> Result<TagMap, ScanError> {
    let parsed: ConfigurationTags =
        serde_json::from_str(blob).map_err(|e| ScanError::decode(e.to_string()))?;

    Ok(parsed
        .tags
        .map(|entries| normalize_key_value_list(&entries))
        .unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_key_value_list_drops_partial_entries() {
        let entries = vec![
            entry(&[("key", "env"), ("value", "prod")]),
            entry(&[("key", "owner")]),
        ];

        let tags = normalize_key_value_list(&entries);
        assert_eq!(tags.len(), 1);
        assert_eq!(tags.get("env"), Some(&"prod".to_string()));
    }

    #[test]
    fn test_key_value_list_drops_empty_key_or_value() {
        let entries = vec![
            entry(&[("key", ""), ("value", "x")]),
            entry(&[("key", "team"), ("value", "")]),
            entry(&[("value", "orphan")]),
            entry(&[("key", "cost-center"), ("value", "42")]),
        ];

        let tags = normalize_key_value_list(&entries);
        assert_eq!(tags.len(), 1);
        assert!(tags.contains_key("cost-center"));
    }

    #[test]
    fn test_configuration_blob() {
        let blob = r#"{
            "instanceId": "i-0123",
            "tags": [{"key": "env", "value": "prod"}, {"key": "owner"}]
        }"#;

        let tags = decode_configuration_tags(blob).unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags.get("env"), Some(&"prod".to_string()));
    }

    #[test]
    fn test_configuration_blob_without_tags() {
        assert!(decode_configuration_tags(r#"{"bucketName": "logs"}"#)
            .unwrap()
            .is_empty());
        assert!(decode_configuration_tags(r#"{"tags": null}"#)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_configuration_blob_with_unexpected_shape() {
        // Some resource types encode tags as a map instead of a list.
        let err = decode_configuration_tags(r#"{"tags": {"env": "prod"}}"#).unwrap_err();
        assert!(matches!(err, ScanError::Decode { .. }));

        let err = decode_configuration_tags("not json").unwrap_err();
        assert!(matches!(err, ScanError::Decode { .. }));
    }

    #[test]
    fn test_normalize_lenient_falls_back_to_empty() {
        let (tags, failed) = RawTags::ConfigurationBlob("{".to_string())
            .normalize_lenient("arn:aws:x")
            .unwrap();
        assert!(tags.is_empty());
        assert!(failed);

        let (tags, failed) = RawTags::ConfigurationBlob(
            r#"{"tags": [{"key": "env", "value": "dev"}]}"#.to_string(),
        )
        .normalize_lenient("arn:aws:y")
        .unwrap();
        assert_eq!(tags.len(), 1);
        assert!(!failed);
    }

    #[test]
    fn test_map_passes_through() {
        let mut map = TagMap::new();
        map.insert("env".into(), "".into());

        let tags = RawTags::Map(map.clone()).normalize().unwrap();
        assert_eq!(tags, map);
    }
}
