//! The metadata stack: path-scoped metadata with ancestor lookup.
//!
//! A scope is a path (directory or file) bound to one [`Metadata`] mapping.
//! Looking up a path merges every scope on the way from the filesystem root
//! down to that path, most general first:
//!
//! ```text
//! /site/src                 {"layout": "base", "nav": {"home": "/"}}
//! /site/src/blog            {"layout": "post"}
//! /site/src/blog/post.md    {"title": "Hello"}
//!
//! get(/site/src/blog/post.md)
//!   → {"layout": "post", "nav": {"home": "/"}, "title": "Hello"}
//! ```
//!
//! Scopes are stored flat, keyed by normalized path, and ancestors are found by
//! walking [`Path::ancestors`]; component-wise comparison means `/src/blog`
//! is never mistaken for an ancestor of `/src/blogroll`.

use crate::metadata::{Metadata, deep_merge};
use crate::paths::normalize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Clone)]
pub struct MetadataStack {
    scopes: BTreeMap<PathBuf, Metadata>,
}

impl MetadataStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the scope at `scope`, replacing any previous registration.
    /// Replacement does not merge; callers merge first if they need to.
    pub fn add(&mut self, scope: &Path, metadata: Metadata) {
        self.scopes.insert(normalize(scope), metadata);
    }

    /// Deep-merged view of every scope that is `path` or one of its ancestors,
    /// applied root first. Empty when nothing matches.
    pub fn get(&self, path: &Path) -> Metadata {
        let path = normalize(path);
        let mut chain: Vec<&Metadata> = path
            .ancestors()
            .filter_map(|ancestor| self.scopes.get(ancestor))
            .collect();
        chain.reverse();

        chain
            .into_iter()
            .fold(Metadata::new(), |acc, scope| deep_merge(acc, scope.clone()))
    }

    /// The mapping registered exactly at `scope`, without any cascade.
    pub fn scope(&self, scope: &Path) -> Option<&Metadata> {
        self.scopes.get(&normalize(scope))
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn map(value: Value) -> Metadata {
        match value {
            Value::Object(m) => m,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn empty_stack_returns_empty_mapping() {
        let stack = MetadataStack::new();
        assert!(stack.get(Path::new("/site/src/index.html")).is_empty());
    }

    #[test]
    fn directory_scope_visible_to_descendants() {
        let mut stack = MetadataStack::new();
        stack.add(Path::new("/site/src"), map(json!({"author": "ann"})));

        let got = stack.get(Path::new("/site/src/a/b/c.md"));
        assert_eq!(got.get("author"), Some(&json!("ann")));
    }

    #[test]
    fn scope_applies_to_its_own_path() {
        let mut stack = MetadataStack::new();
        stack.add(Path::new("/site/src/page.html"), map(json!({"x": 1})));
        assert_eq!(stack.get(Path::new("/site/src/page.html")).get("x"), Some(&json!(1)));
    }

    #[test]
    fn sibling_prefix_is_not_an_ancestor() {
        let mut stack = MetadataStack::new();
        stack.add(Path::new("/site/src/blog"), map(json!({"section": "blog"})));

        assert!(stack.get(Path::new("/site/src/blogroll/x.md")).is_empty());
    }

    #[test]
    fn specific_scope_overrides_general_on_scalars() {
        let mut stack = MetadataStack::new();
        stack.add(Path::new("/s"), map(json!({"layout": "base", "lang": "en"})));
        stack.add(Path::new("/s/blog"), map(json!({"layout": "post"})));

        let got = stack.get(Path::new("/s/blog/p.md"));
        assert_eq!(Value::Object(got), json!({"layout": "post", "lang": "en"}));
    }

    #[test]
    fn nested_mappings_merge_across_scopes() {
        let mut stack = MetadataStack::new();
        stack.add(Path::new("/s"), map(json!({"nav": {"home": "/", "blog": "/blog"}})));
        stack.add(Path::new("/s/blog"), map(json!({"nav": {"blog": "/blog/index.html"}})));
        stack.add(Path::new("/s/blog/p.md"), map(json!({"nav": {"self": "/p"}})));

        let got = stack.get(Path::new("/s/blog/p.md"));
        assert_eq!(
            got["nav"],
            json!({"home": "/", "blog": "/blog/index.html", "self": "/p"})
        );
    }

    #[test]
    fn insertion_order_does_not_change_precedence() {
        let mut stack = MetadataStack::new();
        stack.add(Path::new("/s/blog"), map(json!({"k": "specific"})));
        stack.add(Path::new("/s"), map(json!({"k": "general"})));

        assert_eq!(stack.get(Path::new("/s/blog/x")).get("k"), Some(&json!("specific")));
    }

    #[test]
    fn add_twice_replaces_instead_of_merging() {
        let mut stack = MetadataStack::new();
        stack.add(Path::new("/s"), map(json!({"a": 1})));
        stack.add(Path::new("/s"), map(json!({"b": 2})));

        let got = stack.get(Path::new("/s/x"));
        assert_eq!(Value::Object(got), json!({"b": 2}));
        assert_eq!(stack.len(), 1);
    }

    #[test]
    fn lookup_paths_are_normalized() {
        let mut stack = MetadataStack::new();
        stack.add(Path::new("/s/./blog/"), map(json!({"a": 1})));

        assert_eq!(stack.get(Path::new("/s/other/../blog/p.md")).get("a"), Some(&json!(1)));
        assert!(stack.scope(Path::new("/s/blog")).is_some());
    }
}
