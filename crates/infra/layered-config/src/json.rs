//! JSON flattening and the JSON source.
//!
//! A document such as
//!
//! ```json
//! {
//!     "foo": "bar",
//!     "ConnectionStrings": { "SqlServer": "<some value>" },
//!     "Hosts": ["a", "b"]
//! }
//! ```
//!
//! flattens to
//!
//! ```text
//! foo                          = bar
//! connectionstrings:sqlserver  = <some value>
//! hosts:0                      = a
//! hosts:1                      = b
//! ```
//!
//! Full-line `//` comments are allowed. Trailing comments after data on the
//! same line are not.

use crate::config::Config;
use crate::error::{ConfigError, Result};
use crate::path::PathStack;
use crate::source::{FlatMap, Source};
use serde::de::{Deserialize, Deserializer, MapAccess, Visitor};
use serde_json::value::RawValue;
use std::fmt;
use std::sync::Arc;

/// Drop every line whose first non-whitespace characters are `//`.
pub fn strip_comment_lines(input: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len());
    for line in input.split(|b| *b == b'\n') {
        if line.trim_ascii_start().starts_with(b"//") {
            continue;
        }
        out.extend_from_slice(line);
        out.push(b'\n');
    }
    out
}

/// Parse a JSON document and flatten it into normalized hierarchical keys.
///
/// Numbers and booleans are stored exactly as written in the document.
pub fn flatten_json(input: &[u8]) -> Result<FlatMap> {
    let text = strip_comment_lines(input);
    let root: &RawValue = serde_json::from_slice(&text)?;
    match JsonKind::of(root) {
        JsonKind::Object => {
            let mut flattener = JsonFlattener::default();
            flattener.visit_object(root)?;
            Ok(flattener.data)
        }
        kind => Err(ConfigError::UnsupportedRoot { kind: kind.name() }),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JsonKind {
    Object,
    Array,
    String,
    Number,
    Boolean,
    Null,
}

impl JsonKind {
    // A raw value is already validated and carries no surrounding
    // whitespace, so its first byte decides the kind.
    fn of(raw: &RawValue) -> Self {
        match raw.get().as_bytes().first() {
            Some(b'{') => Self::Object,
            Some(b'[') => Self::Array,
            Some(b'"') => Self::String,
            Some(b't' | b'f') => Self::Boolean,
            Some(b'n') => Self::Null,
            _ => Self::Number,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Object => "object",
            Self::Array => "array",
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Null => "null",
        }
    }
}

/// Object members in document order, values left unparsed.
struct Members<'a>(Vec<(String, &'a RawValue)>);

impl<'de> Deserialize<'de> for Members<'de> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct MembersVisitor;

        impl<'de> Visitor<'de> for MembersVisitor {
            type Value = Members<'de>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a JSON object")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut map: A,
            ) -> std::result::Result<Self::Value, A::Error> {
                let mut members = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some(member) = map.next_entry::<String, &'de RawValue>()? {
                    members.push(member);
                }
                Ok(Members(members))
            }
        }

        deserializer.deserialize_map(MembersVisitor)
    }
}

#[derive(Default)]
struct JsonFlattener {
    data: FlatMap,
    paths: PathStack,
}

impl JsonFlattener {
    fn visit_object(&mut self, raw: &RawValue) -> Result<()> {
        let Members(members) = serde_json::from_str(raw.get())?;
        if members.is_empty() {
            return self.record_empty_container();
        }
        for (key, value) in members {
            self.paths.enter(&key);
            self.visit_value(value)?;
            self.paths.exit();
        }
        Ok(())
    }

    fn visit_array(&mut self, raw: &RawValue) -> Result<()> {
        let elements: Vec<&RawValue> = serde_json::from_str(raw.get())?;
        if elements.is_empty() {
            return self.record_empty_container();
        }
        for (index, element) in elements.into_iter().enumerate() {
            self.paths.enter(&index.to_string());
            self.visit_value(element)?;
            self.paths.exit();
        }
        Ok(())
    }

    fn visit_value(&mut self, raw: &RawValue) -> Result<()> {
        match JsonKind::of(raw) {
            JsonKind::Object => self.visit_object(raw),
            JsonKind::Array => self.visit_array(raw),
            JsonKind::Null => self.record(String::new()),
            JsonKind::String => self.record(serde_json::from_str(raw.get())?),
            JsonKind::Number | JsonKind::Boolean => self.record(raw.get().to_string()),
        }
    }

    // The root object itself is never recorded.
    fn record_empty_container(&mut self) -> Result<()> {
        if self.paths.is_empty() {
            return Ok(());
        }
        self.record(String::new())
    }

    fn record(&mut self, value: String) -> Result<()> {
        let key = self.paths.peek();
        if self.data.contains_key(key) {
            return Err(ConfigError::DuplicateKey {
                key: key.to_string(),
            });
        }
        self.data.insert(key.to_string(), value);
        Ok(())
    }
}

/// Source over an in-memory JSON document.
#[derive(Debug, Clone)]
pub struct JsonSource {
    name: String,
    json: Vec<u8>,
}

impl JsonSource {
    pub fn new(json: impl Into<Vec<u8>>) -> Self {
        Self {
            name: "JsonSource".to_string(),
            json: json.into(),
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl Source for JsonSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn build(self: Arc<Self>) -> Result<Config> {
        let data = flatten_json(&self.json).map_err(|e| e.in_source(&self.name))?;
        tracing::trace!(source = %self.name, keys = data.len(), "flattened JSON document");
        Ok(Config::new(self, data))
    }
}
