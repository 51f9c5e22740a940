use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::Row;

/// Attribute name to required literal value.
///
/// Attributes missing from the map are unconstrained, so the empty map
/// matches every row. A constraint only applies when the row carries a
/// value for that attribute: rows with an empty cell are never excluded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterMap(BTreeMap<String, String>);

impl FilterMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a constraint, replacing any earlier value for the attribute
    pub fn insert(&mut self, attribute: impl Into<String>, value: impl Into<String>) {
        self.0.insert(attribute.into(), value.into());
    }

    pub fn get(&self, attribute: &str) -> Option<&str> {
        self.0.get(attribute).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Exact-string AND match over attributes present in both the filter and the row
    pub fn matches(&self, row: &Row) -> bool {
        self.0.iter().all(|(attribute, expected)| match row.get(attribute) {
            Some(actual) if !actual.is_empty() => actual == expected,
            _ => true,
        })
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FilterMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = FilterMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}
