//! The [`Source`] trait and the in-memory source.

use crate::config::Config;
use crate::error::{ConfigError, Result};
use crate::key::normalize_key;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Flat map of normalized key to raw string value.
pub type FlatMap = BTreeMap<String, String>;

/// A source of configuration key/values.
///
/// `build` re-derives a fresh [`Config`] from the source's backing input on
/// every call and never mutates external state. It takes `Arc<Self>` so the
/// returned snapshot can keep a handle to its source for provenance.
pub trait Source: fmt::Debug + Send + Sync {
    /// Label shown in provenance output.
    fn name(&self) -> &str;

    fn build(self: Arc<Self>) -> Result<Config>;
}

/// Build a [`FlatMap`] from literal pairs, normalizing each key.
///
/// Two pairs whose keys normalize to the same key fail with
/// [`ConfigError::DuplicateKey`].
pub fn flatten_pairs<I, K, V>(pairs: I) -> Result<FlatMap>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Into<String>,
{
    let mut data = FlatMap::new();
    for (key, value) in pairs {
        let key = normalize_key(key.as_ref());
        if data.contains_key(&key) {
            return Err(ConfigError::DuplicateKey { key });
        }
        data.insert(key, value.into());
    }
    Ok(data)
}

/// Source over literal key/value pairs, typically used for defaults.
#[derive(Debug, Clone)]
pub struct MemorySource {
    name: String,
    pairs: Vec<(String, String)>,
}

impl MemorySource {
    pub fn new<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            name: "MemorySource".to_string(),
            pairs: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl Source for MemorySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn build(self: Arc<Self>) -> Result<Config> {
        let data = flatten_pairs(self.pairs.iter().map(|(k, v)| (k, v.clone())))
            .map_err(|e| e.in_source(&self.name))?;
        Ok(Config::new(self, data))
    }
}
