//! Cache namespaces.
//!
//! A namespace is the key prefix that scopes one cache's entries and its
//! index in the shared store. Controller caches derive theirs from a
//! resource, an operation and an optional sub-namespace and entity id:
//!
//! ```text
//! {resource}:{operation}[:{sub_namespace}][:{entity_id}]:
//! ```

use std::fmt;

/// Namespace used when an LruCache is built without one.
pub const DEFAULT_NAMESPACE: &str = ":LRU-CACHE!";

/// Resource name used when none is known.
pub const UNDEFINED_RESOURCE: &str = "UNDEFINED-CONTROLLER!";

/// Operation name used when none is known.
pub const UNDEFINED_OPERATION: &str = "UNDEFINED-ACTION";

const SEPARATOR: char = ':';
const INDEX_SUFFIX: &str = "-i";

/// Key prefix owning a cache's entries and index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace(String);

impl Namespace {
    /// Wraps a raw prefix as-is.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self(prefix.into())
    }

    /// Derives the namespace of a controller cache.
    ///
    /// The sub-namespace is skipped when it equals the `{resource}:{operation}`
    /// base, and empty parts are ignored.
    #[must_use]
    pub fn compose(resource: &str, operation: &str, sub_namespace: Option<&str>, entity_id: Option<&str>) -> Self {
        let base = format!("{resource}{SEPARATOR}{operation}");
        let mut prefix = base.clone();

        if let Some(sub) = sub_namespace.filter(|s| !s.is_empty() && *s != base) {
            prefix.push(SEPARATOR);
            prefix.push_str(sub);
        }

        if let Some(entity) = entity_id.filter(|e| !e.is_empty()) {
            prefix.push(SEPARATOR);
            prefix.push_str(entity);
        }

        prefix.push(SEPARATOR);
        Self(prefix)
    }

    /// Returns the prefix.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the fully-qualified key for a caller key.
    #[must_use]
    pub fn qualify(&self, key: &str) -> String {
        format!("{}{}", self.0, key)
    }

    /// Strips the prefix from a fully-qualified key.
    #[must_use]
    pub fn strip<'a>(&self, qualified: &'a str) -> &'a str {
        qualified.strip_prefix(self.0.as_str()).unwrap_or(qualified)
    }

    /// Returns the key of the sorted-set index.
    #[must_use]
    pub fn index_key(&self) -> String {
        format!("{}{}", self.0, INDEX_SUFFIX)
    }
}

impl Default for Namespace {
    fn default() -> Self {
        Self::new(DEFAULT_NAMESPACE)
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Namespace {
    fn from(prefix: &str) -> Self {
        Self::new(prefix)
    }
}

impl From<String> for Namespace {
    fn from(prefix: String) -> Self {
        Self(prefix)
    }
}
