use std::fmt;

/// A caller-supplied cache key: a single string or an ordered path.
///
/// Paths are flattened by joining their segments with the client's
/// separator, so `["app", "user"]` and `"app.user"` address the same entry
/// under the default configuration. Nothing prevents that collision; keep
/// to one spelling per key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Single(String),
    Path(Vec<String>),
}

impl Key {
    /// Flatten the key into one string.
    pub fn joined(&self, separator: &str) -> String {
        match self {
            Key::Single(key) => key.clone(),
            Key::Path(segments) => segments.join(separator),
        }
    }
}

impl From<&str> for Key {
    fn from(key: &str) -> Self {
        Key::Single(key.to_string())
    }
}

impl From<String> for Key {
    fn from(key: String) -> Self {
        Key::Single(key)
    }
}

impl From<&String> for Key {
    fn from(key: &String) -> Self {
        Key::Single(key.clone())
    }
}

impl From<Vec<String>> for Key {
    fn from(segments: Vec<String>) -> Self {
        Key::Path(segments)
    }
}

impl From<Vec<&str>> for Key {
    fn from(segments: Vec<&str>) -> Self {
        Key::Path(segments.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for Key {
    fn from(segments: &[&str]) -> Self {
        Key::Path(segments.iter().map(|s| s.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Key {
    fn from(segments: [&str; N]) -> Self {
        Key::Path(segments.iter().map(|s| s.to_string()).collect())
    }
}

/// The address of a cache entry: a namespace plus a flattened key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NamespacedKey {
    namespace: String,
    key: String,
}

impl NamespacedKey {
    pub fn new(namespace: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            key: key.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl fmt::Display for NamespacedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.key)
    }
}
