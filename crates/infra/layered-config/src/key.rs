//! Key normalization.
//!
//! Every key that enters the crate (a JSON member name, an environment
//! variable name, a lookup argument) passes through [`normalize_key`] exactly
//! once. Stored keys are always normalized, so lookups are case-insensitive
//! and `__` can be used anywhere `:` is expected.

/// Hierarchical delimiter joining key segments.
pub const KEY_DELIMITER: &str = ":";

/// Lower-case `key` and rewrite every `__` to [`KEY_DELIMITER`].
///
/// Replacement runs left to right without overlap, so `"_____x"` becomes
/// `"::_x"`.
///
/// ```
/// use layered_config::normalize_key;
///
/// assert_eq!(normalize_key("Logging__LogLevel__Default"), "logging:loglevel:default");
/// assert_eq!(normalize_key("logging:loglevel:default"), "logging:loglevel:default");
/// ```
pub fn normalize_key(key: &str) -> String {
    key.to_lowercase().replace("__", KEY_DELIMITER)
}

/// Join a parent path and a child segment with [`KEY_DELIMITER`].
///
/// An empty parent yields the child unchanged.
pub fn join_key(parent: &str, child: &str) -> String {
    if parent.is_empty() {
        child.to_string()
    } else {
        format!("{parent}{KEY_DELIMITER}{child}")
    }
}
