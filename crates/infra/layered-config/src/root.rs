//! Layered aggregation of several sources.
//!
//! Sources are added lowest precedence first. A lookup scans the built
//! snapshots from the last added to the first and takes the first hit.

use crate::config::Config;
use crate::error::Result;
use crate::key::normalize_key;
use crate::source::Source;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Ordered list of sources, built into a [`RootConfig`].
#[derive(Debug, Default, Clone)]
pub struct Builder {
    sources: Vec<Arc<dyn Source>>,
}

impl Builder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a source. Later sources take precedence over earlier ones.
    pub fn add_source<S: Source + 'static>(&mut self, source: S) -> &mut Self {
        self.add_shared_source(Arc::new(source))
    }

    /// Append a source that is also held elsewhere.
    pub fn add_shared_source(&mut self, source: Arc<dyn Source>) -> &mut Self {
        self.sources.push(source);
        self
    }

    /// Registered sources, lowest precedence first.
    pub fn sources(&self) -> &[Arc<dyn Source>] {
        &self.sources
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Build every source in order.
    ///
    /// The first failing source aborts the whole build; no partial
    /// [`RootConfig`] is ever returned.
    pub fn build(&self) -> Result<RootConfig> {
        let mut configs = Vec::with_capacity(self.sources.len());
        for source in &self.sources {
            let config = match Arc::clone(source).build() {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!(source = %source.name(), error = %e, "configuration build aborted");
                    return Err(e);
                }
            };
            tracing::debug!(source = %source.name(), keys = config.len(), "built configuration source");
            configs.push(config);
        }
        Ok(RootConfig { configs })
    }
}

/// Immutable view over the snapshots of every source.
#[derive(Debug, Clone)]
pub struct RootConfig {
    configs: Vec<Config>,
}

impl RootConfig {
    /// Value for `key` from the highest-precedence source that has it, or
    /// the empty string.
    pub fn get(&self, key: &str) -> &str {
        self.try_get(key).unwrap_or_default()
    }

    pub fn try_get(&self, key: &str) -> Option<&str> {
        let key = normalize_key(key);
        self.configs
            .iter()
            .rev()
            .find_map(|config| config.get_normalized(&key))
    }

    /// Sorted union of every source's keys.
    pub fn keys(&self) -> Vec<&str> {
        self.key_set().into_iter().collect()
    }

    /// Resolved value for `key` together with the source that supplied it.
    pub fn get_entry(&self, key: &str) -> Option<Entry<'_>> {
        self.resolve(&normalize_key(key))
    }

    /// One entry per key, sorted by key.
    pub fn entries(&self) -> Vec<Entry<'_>> {
        self.key_set()
            .into_iter()
            .filter_map(|key| self.resolve(key))
            .collect()
    }

    /// Snapshots, lowest precedence first.
    pub fn configs(&self) -> &[Config] {
        &self.configs
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.key_set().len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.iter().all(Config::is_empty)
    }

    fn key_set(&self) -> BTreeSet<&str> {
        self.configs.iter().flat_map(Config::keys).collect()
    }

    fn resolve(&self, normalized: &str) -> Option<Entry<'_>> {
        self.configs.iter().rev().find_map(|config| {
            config
                .get_key_value_normalized(normalized)
                .map(|(key, value)| Entry { key, value, config })
        })
    }
}

/// A resolved key, its winning value, and where the value came from.
#[derive(Clone, Copy, Serialize)]
pub struct Entry<'a> {
    key: &'a str,
    value: &'a str,
    #[serde(rename = "source", serialize_with = "serialize_source_name")]
    config: &'a Config,
}

fn serialize_source_name<S: serde::Serializer>(
    config: &&Config,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(config.source().name())
}

impl<'a> Entry<'a> {
    pub fn key(&self) -> &'a str {
        self.key
    }

    pub fn value(&self) -> &'a str {
        self.value
    }

    pub fn source(&self) -> &'a dyn Source {
        self.config.source()
    }

    /// The snapshot that supplied the value.
    pub fn config(&self) -> &'a Config {
        self.config
    }
}

impl fmt::Debug for Entry<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("key", &self.key)
            .field("value", &self.value)
            .field("source", &self.source().name())
            .finish()
    }
}

impl fmt::Display for Entry<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={} ({})", self.key, self.value, self.source().name())
    }
}
