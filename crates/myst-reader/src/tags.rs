//! Registry of caller-supplied YAML tag handlers.
//!
//! Handlers are looked up when a [`Loader`] is built, which happens on every
//! read, so registering or removing a handler takes effect on the next
//! document.

use std::sync::Arc;

use serde_yaml::Value;

use crate::error::LoadError;
use crate::loader::{Loader, Node};

/// Builds a value from a tagged YAML node.
pub type Constructor = Arc<dyn Fn(&Loader<'_>, &Node) -> Result<Value, LoadError> + Send + Sync>;

/// Handle returned by [`TagRegistry::register`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RegistrationId(u64);

/// Tag handlers contributed from outside the reader.
#[derive(Clone, Default)]
pub struct TagRegistry {
    entries: Vec<(RegistrationId, String, Constructor)>,
    next_id: u64,
}

impl TagRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for `tag` (`!name` or a full `tag:` URI).
    ///
    /// The tag is checked when a loader is built; a malformed tag is skipped
    /// there with a warning.
    ///
    /// # Example
    ///
    /// ```
    /// use myst_reader::TagRegistry;
    /// use serde_yaml::Value;
    ///
    /// let mut registry = TagRegistry::new();
    /// registry.register("!custom", |loader, node| {
    ///     Ok(Value::String(loader.construct_scalar(node)?.to_uppercase()))
    /// });
    /// ```
    pub fn register<F>(&mut self, tag: impl Into<String>, constructor: F) -> RegistrationId
    where
        F: Fn(&Loader<'_>, &Node) -> Result<Value, LoadError> + Send + Sync + 'static,
    {
        let id = RegistrationId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, tag.into(), Arc::new(constructor)));
        id
    }

    /// Remove a handler. Returns `false` if it was already removed.
    pub fn unregister(&mut self, id: RegistrationId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry, _, _)| *entry != id);
        self.entries.len() != before
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Current `(tag, handler)` pairs in registration order.
    pub(crate) fn snapshot(&self) -> impl Iterator<Item = (&str, &Constructor)> {
        self.entries
            .iter()
            .map(|(_, tag, constructor)| (tag.as_str(), constructor))
    }
}

impl std::fmt::Debug for TagRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|(_, tag, _)| tag))
            .finish()
    }
}

/// Whether `tag` can name a node tag.
pub(crate) fn is_valid_tag(tag: &str) -> bool {
    !tag.is_empty()
        && !tag.chars().any(char::is_whitespace)
        && (tag.starts_with('!') || tag.starts_with("tag:"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn noop(_: &Loader<'_>, _: &Node) -> Result<Value, LoadError> {
        Ok(Value::Null)
    }

    #[test]
    fn test_register_and_unregister() {
        let mut registry = TagRegistry::new();
        let first = registry.register("!a", noop);
        let second = registry.register("!b", noop);
        assert_ne!(first, second);
        assert_eq!(registry.len(), 2);

        assert!(registry.unregister(first));
        assert!(!registry.unregister(first));

        let tags: Vec<&str> = registry.snapshot().map(|(tag, _)| tag).collect();
        assert_eq!(tags, vec!["!b"]);
    }

    #[test]
    fn test_snapshot_keeps_registration_order() {
        let mut registry = TagRegistry::new();
        registry.register("!z", noop);
        registry.register("!a", noop);
        registry.register("!z", noop);

        let tags: Vec<&str> = registry.snapshot().map(|(tag, _)| tag).collect();
        assert_eq!(tags, vec!["!z", "!a", "!z"]);
    }

    #[test]
    fn test_is_valid_tag() {
        assert!(is_valid_tag("!custom"));
        assert!(is_valid_tag("!"));
        assert!(is_valid_tag("tag:example.com,2024:thing"));
        assert!(!is_valid_tag(""));
        assert!(!is_valid_tag("missing arg"));
        assert!(!is_valid_tag("custom"));
        assert!(!is_valid_tag("! spaced"));
    }
}
