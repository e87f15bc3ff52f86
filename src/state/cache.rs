//! Memoized listing snapshots.
//!
//! With `use_cache` on, a session keeps the filtered listing and its tree
//! keyed by browse root and listing fingerprint. Only the latest key is
//! held: a different root or filter replaces it, and any mutating action
//! clears it.

use std::sync::Arc;

use crate::services::storage::Entry;
use crate::workspace::tree::TreeNode;

/// Filtered listing plus the tree built from it.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub entries: Vec<Entry>,
    pub tree: Arc<TreeNode>,
}

impl Snapshot {
    pub fn new(entries: Vec<Entry>) -> Self {
        let tree = Arc::new(TreeNode::build(&entries));
        Self { entries, tree }
    }

    /// Entry at a root-relative path.
    pub fn entry(&self, path: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.path == path)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub root: String,
    pub fingerprint: u64,
}

#[derive(Debug, Default)]
pub struct TreeCache {
    slot: Option<(CacheKey, Arc<Snapshot>)>,
}

impl TreeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CacheKey) -> Option<Arc<Snapshot>> {
        self.slot
            .as_ref()
            .filter(|(cached, _)| cached == key)
            .map(|(_, snapshot)| snapshot.clone())
    }

    /// Store `snapshot`, evicting whatever was cached before.
    pub fn insert(&mut self, key: CacheKey, snapshot: Arc<Snapshot>) {
        if let Some((old, _)) = self.slot.replace((key, snapshot)) {
            tracing::debug!("Replacing cached tree for {:?}", old.root);
        }
    }

    pub fn invalidate(&mut self) {
        if let Some((old, _)) = self.slot.take() {
            tracing::debug!("Invalidating cached tree for {:?}", old.root);
        }
    }

    pub fn len(&self) -> usize {
        usize::from(self.slot.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.slot.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(root: &str, fingerprint: u64) -> CacheKey {
        CacheKey {
            root: root.to_string(),
            fingerprint,
        }
    }

    #[test]
    fn test_get_insert_invalidate() {
        let mut cache = TreeCache::new();
        let snapshot = Arc::new(Snapshot::new(vec![Entry::file("a.txt", 1)]));

        assert!(cache.get(&key("", 1)).is_none());
        cache.insert(key("", 1), snapshot.clone());
        assert_eq!(cache.get(&key("", 1)), Some(snapshot));
        assert!(cache.get(&key("", 2)).is_none());
        assert!(cache.get(&key("docs", 1)).is_none());

        cache.invalidate();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_new_key_evicts_previous() {
        let mut cache = TreeCache::new();
        for fingerprint in 0..100 {
            let snapshot = Arc::new(Snapshot::new(vec![Entry::file("a.txt", fingerprint)]));
            cache.insert(key("", fingerprint), snapshot);
        }

        assert_eq!(cache.len(), 1);
        assert!(cache.get(&key("", 0)).is_none());
        assert!(cache.get(&key("", 99)).is_some());

        cache.insert(key("docs", 1), Arc::new(Snapshot::new(Vec::new())));
        assert_eq!(cache.len(), 1);
        assert!(cache.get(&key("", 99)).is_none());
    }

    #[test]
    fn test_snapshot_lookup() {
        let snapshot = Snapshot::new(vec![Entry::file("a/b.txt", 1)]);
        assert!(snapshot.entry("a/b.txt").is_some());
        assert!(snapshot.entry("a").is_none());
        assert!(snapshot.tree.find_folder("a").is_some());
    }
}
