//! Immutable snapshot of a single source.

use crate::key::normalize_key;
use crate::source::{FlatMap, Source};
use std::sync::Arc;

/// The flat key/value map one [`Source::build`] call produced.
///
/// There is no way to change a `Config` once built; call `build` again for
/// a fresh view.
#[derive(Debug, Clone)]
pub struct Config {
    source: Arc<dyn Source>,
    data: FlatMap,
}

impl Config {
    /// Wrap an already-normalized flat map.
    pub fn new(source: Arc<dyn Source>, data: FlatMap) -> Self {
        Self { source, data }
    }

    /// Value for `key`, or the empty string when absent.
    pub fn get(&self, key: &str) -> &str {
        self.try_get(key).unwrap_or_default()
    }

    /// Value for `key`, distinguishing absent from present-but-empty.
    pub fn try_get(&self, key: &str) -> Option<&str> {
        self.data.get(&normalize_key(key)).map(String::as_str)
    }

    /// All keys, ascending.
    pub fn keys(&self) -> Vec<&str> {
        self.data.keys().map(String::as_str).collect()
    }

    pub fn source(&self) -> &dyn Source {
        self.source.as_ref()
    }

    /// Shared handle to the source, for callers that outlive this snapshot.
    pub fn source_handle(&self) -> Arc<dyn Source> {
        Arc::clone(&self.source)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Key/value pairs in ascending key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.data.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub(crate) fn get_key_value_normalized(&self, key: &str) -> Option<(&str, &str)> {
        self.data
            .get_key_value(key)
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub(crate) fn get_normalized(&self, key: &str) -> Option<&str> {
        self.data.get(key).map(String::as_str)
    }
}
