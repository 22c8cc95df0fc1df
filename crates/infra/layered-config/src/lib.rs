//! Layered configuration with per-key provenance.
//!
//! This crate provides:
//! - [`JsonSource`]: flattens a JSON document into hierarchical keys
//! - [`EnvVarsSource`]: environment variables, with `__` as a separator and
//!   legacy connection-string prefixes rewritten
//! - [`MemorySource`]: literal key/value pairs, typically defaults
//! - [`Builder`] / [`RootConfig`]: merges sources and remembers which one
//!   supplied each value
//!
//! # Keys
//! Keys are case-insensitive and `:`-delimited. `Logging__Level`,
//! `LOGGING:LEVEL` and `logging:level` all name the same key.
//!
//! # Precedence (lowest to highest)
//! Sources are consulted in the order they were added; the last source that
//! has a key wins.
//!
//! # Example
//! ```
//! use layered_config::{Builder, EnvVarsSource, JsonSource, Source};
//!
//! let json = br#"{
//!     // full-line comments are allowed
//!     "MyApp": { "Logging": { "Enabled": true, "Level": "info" } }
//! }"#;
//!
//! let mut builder = Builder::new();
//! builder
//!     .add_source(JsonSource::new(&json[..]).with_name("json file"))
//!     .add_source(
//!         EnvVarsSource::from_map("", [("MYAPP__LOGGING__level", "debug")]).with_name("env vars"),
//!     );
//! let config = builder.build()?;
//!
//! assert_eq!(config.get("myapp:logging:enabled"), "true");
//! let level = config.get_entry("MyApp:Logging:Level").unwrap();
//! assert_eq!(level.value(), "debug");
//! assert_eq!(level.source().name(), "env vars");
//! # Ok::<(), layered_config::ConfigError>(())
//! ```

pub mod config;
pub mod env;
pub mod error;
pub mod json;
pub mod key;
pub mod path;
pub mod root;
pub mod source;

// Re-exports for convenient access
pub use config::Config;
pub use env::{EnvVarsSource, transform_env_vars};
pub use error::{ConfigError, Result};
pub use json::{JsonSource, flatten_json};
pub use key::{KEY_DELIMITER, normalize_key};
pub use root::{Builder, Entry, RootConfig};
pub use source::{FlatMap, MemorySource, Source};
