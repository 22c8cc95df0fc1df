//! Path stack used while walking nested documents.

use crate::key::{KEY_DELIMITER, normalize_key};

/// Stack of normalized hierarchical paths.
///
/// Each entry is the full path of the node being visited, not just its last
/// segment, so [`PathStack::peek`] is always the key a leaf should be stored
/// under.
#[derive(Debug, Default, Clone)]
pub struct PathStack {
    paths: Vec<String>,
}

impl PathStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push the child path `peek() + ":" + segment`, normalized.
    ///
    /// Only a segment entered at the root has no parent; a parent whose
    /// path is empty still contributes the delimiter.
    pub fn enter(&mut self, segment: &str) {
        let path = if self.is_empty() {
            normalize_key(segment)
        } else {
            normalize_key(&format!("{}{KEY_DELIMITER}{segment}", self.peek()))
        };
        self.push(path);
    }

    /// Leave the current node.
    pub fn exit(&mut self) {
        self.pop();
    }

    pub fn push(&mut self, path: String) {
        self.paths.push(path);
    }

    pub fn pop(&mut self) -> Option<String> {
        self.paths.pop()
    }

    /// Current path, or the empty string at the root.
    pub fn peek(&self) -> &str {
        self.paths.last().map_or("", String::as_str)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}
