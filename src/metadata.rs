//! Ordered request/response metadata

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Ordered mapping from header key to its values
///
/// Keys are lowercased ASCII on insertion, as gRPC metadata keys are. Key
/// insertion order and the value order within a key are both preserved, so
/// cassettes round-trip byte-for-byte reviewable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata {
    entries: IndexMap<String, Vec<String>>,
}

impl Metadata {
    /// Create an empty metadata map
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(key, value)` pairs, grouping repeated keys in order
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: AsRef<str>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut metadata = Self::new();
        for (key, value) in pairs {
            metadata.append(key.as_ref(), value);
        }
        metadata
    }

    /// Append a value under a key, keeping earlier values
    pub fn append(&mut self, key: &str, value: impl Into<String>) {
        self.entries
            .entry(key.to_ascii_lowercase())
            .or_default()
            .push(value.into());
    }

    /// Values recorded under a key, in append order
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.entries
            .get(&key.to_ascii_lowercase())
            .map(Vec::as_slice)
    }

    /// Iterate keys in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Flatten back to `(key, value)` pairs in stored order
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .flat_map(|(k, vs)| vs.iter().map(move |v| (k.as_str(), v.as_str())))
    }

    /// Number of distinct keys
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no keys are stored
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for Metadata {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::from_pairs(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_lowercased() {
        let mut metadata = Metadata::new();
        metadata.append("Authorization", "Bearer A");
        assert_eq!(metadata.get("authorization").unwrap(), ["Bearer A"]);
        assert_eq!(metadata.get("AUTHORIZATION").unwrap(), ["Bearer A"]);
    }

    #[test]
    fn test_multi_valued_keys_keep_order() {
        let metadata = Metadata::from_pairs([
            ("x-tag", "first"),
            ("x-other", "1"),
            ("x-tag", "second"),
        ]);
        assert_eq!(metadata.get("x-tag").unwrap(), ["first", "second"]);
        assert_eq!(metadata.len(), 2);
    }

    #[test]
    fn test_pairs_round_trip() {
        let metadata = Metadata::from_pairs([("a", "1"), ("b", "2"), ("a", "3")]);
        let pairs: Vec<(&str, &str)> = metadata.pairs().collect();
        assert_eq!(pairs, [("a", "1"), ("a", "3"), ("b", "2")]);
    }

    #[test]
    fn test_serde_preserves_insertion_order() {
        let metadata = Metadata::from_pairs([("zeta", "1"), ("alpha", "2")]);
        let json = serde_json::to_string(&metadata).unwrap();
        assert_eq!(json, r#"{"zeta":["1"],"alpha":["2"]}"#);
        let back: Metadata = serde_json::from_str(&json).unwrap();
        assert_eq!(back, metadata);
    }
}
