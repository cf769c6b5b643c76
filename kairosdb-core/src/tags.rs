//! Tag key-value pairs for data point metadata

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{KairosError, KairosResult};

/// Tag key - identifies a tag dimension
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TagKey(String);

/// Tag value - the value for a tag dimension
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TagValue(String);

/// A set of tag key-value pairs, iterated in natural key order
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TagSet {
    tags: BTreeMap<TagKey, TagValue>,
}

impl TagKey {
    /// Create a new tag key.
    ///
    /// Any character is allowed; escaping is a concern of the wire format.
    pub fn new<S: Into<String>>(key: S) -> KairosResult<Self> {
        let key = key.into();

        if key.is_empty() {
            return Err(KairosError::validation("Tag key cannot be empty"));
        }

        Ok(Self(key))
    }

    /// Get the string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Get the length in bytes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false for a constructed key
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl TagValue {
    /// Create a new tag value
    pub fn new<S: Into<String>>(value: S) -> KairosResult<Self> {
        let value = value.into();

        if value.is_empty() {
            return Err(KairosError::validation("Tag value cannot be empty"));
        }

        Ok(Self(value))
    }

    /// Get the string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Get the length in bytes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false for a constructed value
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl TagSet {
    /// Create a new empty tag set
    pub fn new() -> Self {
        Self {
            tags: BTreeMap::new(),
        }
    }

    /// Build a tag set from string pairs. Later duplicates win.
    pub fn from_pairs<I, K, V>(pairs: I) -> KairosResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut set = Self::new();
        for (key, value) in pairs {
            set.insert(TagKey::new(key)?, TagValue::new(value)?);
        }
        Ok(set)
    }

    /// Insert a tag, replacing and returning any previous value for the key
    pub fn insert(&mut self, key: TagKey, value: TagValue) -> Option<TagValue> {
        self.tags.insert(key, value)
    }

    /// Insert every tag of `other`, overwriting keys already present
    pub fn extend_from(&mut self, other: &TagSet) {
        for (key, value) in other.iter() {
            self.tags.insert(key.clone(), value.clone());
        }
    }

    /// Get a tag value by key
    pub fn get(&self, key: &str) -> Option<&TagValue> {
        self.tags.get(key)
    }

    /// Check if a tag key exists
    pub fn contains_key(&self, key: &str) -> bool {
        self.tags.contains_key(key)
    }

    /// Get the number of tags
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    /// Check if the tag set is empty
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Iterate over tag key-value pairs in key order
    pub fn iter(&self) -> impl Iterator<Item = (&TagKey, &TagValue)> {
        self.tags.iter()
    }

    /// Get all tag keys in order
    pub fn keys(&self) -> impl Iterator<Item = &TagKey> {
        self.tags.keys()
    }
}

impl fmt::Display for TagKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for TagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for TagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pairs: Vec<String> = self
            .tags
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        write!(f, "{{{}}}", pairs.join(", "))
    }
}

impl Borrow<str> for TagKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for TagKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for TagValue {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<&str> for TagValue {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl PartialEq<str> for TagValue {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for TagKey {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl PartialEq<str> for TagKey {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}
