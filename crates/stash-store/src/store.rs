//! The key-to-document map and its concurrency discipline.
//!
//! The outer map lock is held only long enough to look up or insert an
//! entry; each entry carries its own mutex serialising all reads and writes
//! against that key. Operations on distinct keys therefore proceed in
//! parallel, while a reader of one key observes either the state before or
//! after any concurrent mutation, never a torn intermediate.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::error::StoreError;
use crate::keys::KeyGenerator;
use crate::path::Path;
use crate::resolve::{assign, range_labels, resolve, resolve_parent_mut};

#[derive(Debug)]
struct Entry {
    root: Mutex<Value>,
}

/// Process-scoped mapping from opaque keys to root documents.
///
/// Entries are created by [`create`](DocumentStore::create) and live until
/// process exit; there is no delete operation and keys are never reused.
#[derive(Debug, Default)]
pub struct DocumentStore {
    entries: Mutex<HashMap<String, Arc<Entry>>>,
    keys: KeyGenerator,
}

impl DocumentStore {
    /// Builds an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `doc` under a freshly generated key and returns the key.
    pub fn create(&self, doc: Value) -> String {
        let mut entries = self.entries.lock().unwrap_or_else(|poison| poison.into_inner());
        let key = self.keys.next(|candidate| entries.contains_key(candidate));
        entries.insert(
            key.clone(),
            Arc::new(Entry {
                root: Mutex::new(doc),
            }),
        );
        key
    }

    /// Replaces the whole document stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::KeyNotFound`] when no entry exists for `key`.
    pub fn set_root(&self, key: &str, doc: Value) -> Result<(), StoreError> {
        let entry = self.entry(key)?;
        let mut root = entry.root.lock().unwrap_or_else(|poison| poison.into_inner());
        *root = doc;
        Ok(())
    }

    /// Replaces the subtree at `path` within the document stored under
    /// `key`. The empty path replaces the whole root.
    ///
    /// The replacement is prepared against a working copy and installed in
    /// one assignment under the entry lock, so concurrent readers never see
    /// a partially applied mutation.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::KeyNotFound`] for an unknown key and the
    /// resolution errors of [`resolve_parent_mut`] for the path.
    pub fn set_path(&self, key: &str, path: &Path, doc: Value) -> Result<(), StoreError> {
        if path.is_root() {
            return self.set_root(key, doc);
        }
        let entry = self.entry(key)?;
        let mut root = entry.root.lock().unwrap_or_else(|poison| poison.into_inner());
        let mut updated = root.clone();
        let (parent, last) = resolve_parent_mut(&mut updated, path)?;
        assign(parent, last, doc, path)?;
        *root = updated;
        Ok(())
    }

    /// Returns a copy of the subtree at `path` within the document stored
    /// under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::KeyNotFound`] for an unknown key and the
    /// resolution errors of [`resolve`] for the path.
    pub fn get(&self, key: &str, path: &Path) -> Result<Value, StoreError> {
        let entry = self.entry(key)?;
        let root = entry.root.lock().unwrap_or_else(|poison| poison.into_inner());
        resolve(&root, path).cloned()
    }

    /// Returns the iteration labels for the value at `path`: object field
    /// names in insertion order, or array indices as decimal strings.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::KeyNotFound`] for an unknown key, resolution
    /// errors for the path, and [`StoreError::RangeNotIterable`] for
    /// scalars.
    pub fn range(&self, key: &str, path: &Path) -> Result<Vec<String>, StoreError> {
        let entry = self.entry(key)?;
        let root = entry.root.lock().unwrap_or_else(|poison| poison.into_inner());
        let value = resolve(&root, path)?;
        range_labels(value, path)
    }

    /// Number of stored entries, for diagnostics.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .len()
    }

    /// Whether the store holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entry(&self, key: &str) -> Result<Arc<Entry>, StoreError> {
        self.entries
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::key_not_found(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn path(text: &str) -> Path {
        Path::parse(text).expect("valid path")
    }

    #[test]
    fn create_then_get_round_trips() {
        let store = DocumentStore::new();
        let doc = json!({"a": {"b": [10, 20, 30]}});
        let key = store.create(doc.clone());
        assert_eq!(store.get(&key, &Path::root()).expect("get"), doc);
    }

    #[test]
    fn repeated_reads_are_identical() {
        let store = DocumentStore::new();
        let key = store.create(json!({"a": [1, 2]}));
        let first = store.get(&key, &path("a.1")).expect("first read");
        let second = store.get(&key, &path("a.1")).expect("second read");
        assert_eq!(first, second);
    }

    #[test]
    fn unknown_key_is_reported() {
        let store = DocumentStore::new();
        let error = store.get("missing", &Path::root()).expect_err("unknown key");
        assert!(matches!(error, StoreError::KeyNotFound { .. }));
    }

    #[test]
    fn set_root_discards_previous_value() {
        let store = DocumentStore::new();
        let key = store.create(json!({"old": true}));
        store.set_root(&key, json!([1, 2, 3])).expect("replace");
        assert_eq!(
            store.get(&key, &Path::root()).expect("get"),
            json!([1, 2, 3])
        );
    }

    #[test]
    fn set_path_replaces_single_subtree() {
        let store = DocumentStore::new();
        let key = store.create(json!({"a": {"b": [10, 20, 30]}}));
        store
            .set_path(&key, &path("a.b[0]"), json!(99))
            .expect("set path");
        assert_eq!(
            store.get(&key, &Path::root()).expect("get"),
            json!({"a": {"b": [99, 20, 30]}})
        );
    }

    #[test]
    fn set_path_with_root_path_replaces_root() {
        let store = DocumentStore::new();
        let key = store.create(json!(1));
        store
            .set_path(&key, &Path::root(), json!({"fresh": true}))
            .expect("set root via path");
        assert_eq!(
            store.get(&key, &Path::root()).expect("get"),
            json!({"fresh": true})
        );
    }

    #[test]
    fn failed_mutation_leaves_document_untouched() {
        let store = DocumentStore::new();
        let original = json!({"a": {"b": [10]}});
        let key = store.create(original.clone());
        let error = store
            .set_path(&key, &path("a.b[9]"), json!(0))
            .expect_err("out of range");
        assert!(matches!(error, StoreError::PathNotFound { .. }));
        assert_eq!(store.get(&key, &Path::root()).expect("get"), original);
    }

    #[test]
    fn range_walks_objects_and_arrays() {
        let store = DocumentStore::new();
        let key = store.create(json!({"x": 1, "y": {"nested": [true, false]}}));
        assert_eq!(
            store.range(&key, &Path::root()).expect("object range"),
            vec!["x", "y"]
        );
        assert_eq!(
            store.range(&key, &path("y.nested")).expect("array range"),
            vec!["0", "1"]
        );
    }

    #[test]
    fn sequential_creates_yield_distinct_keys() {
        let store = DocumentStore::new();
        let mut keys = std::collections::HashSet::new();
        for _ in 0..100 {
            assert!(keys.insert(store.create(json!(null))));
        }
        assert_eq!(store.len(), 100);
    }
}
