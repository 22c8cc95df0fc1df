//! Error type shared by every configuration source.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    /// The JSON document is not syntactically valid (or not UTF-8).
    #[error("invalid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// The JSON root is an array or a scalar.
    #[error("unsupported JSON root: expected an object, found {kind}")]
    UnsupportedRoot { kind: &'static str },

    /// Two values flattened to the same normalized key within one source.
    #[error("duplicate key '{key}'")]
    DuplicateKey { key: String },

    /// A source failed to build; carries the source name for context.
    #[error("source '{name}' failed to build: {source}")]
    SourceBuild {
        name: String,
        #[source]
        source: Box<ConfigError>,
    },
}

impl ConfigError {
    /// Wrap an error with the name of the source that produced it.
    pub fn in_source(self, name: impl Into<String>) -> Self {
        Self::SourceBuild {
            name: name.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, skipping any [`ConfigError::SourceBuild`] wrappers.
    pub fn root_cause(&self) -> &Self {
        match self {
            Self::SourceBuild { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;
