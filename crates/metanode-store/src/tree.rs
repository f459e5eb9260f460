//! Typed views over the ordered index.
//!
//! A [`MetaTree`] wraps a shared [`BTree`] of one entity type and offers
//! the operations the metadata server uses: copy-out `get`, upsert `put`,
//! insert-if-absent `create`, `delete`, and byte-level `range` scans.

use crate::btree::{BTree, StoreItem};
use crate::types::{Dentry, Extend, Inode, Multipart};
use metanode_common::{Error, Result};
use std::sync::Arc;
use tracing::debug;

/// Inode attributes keyed by inode ID
pub type InodeTree = MetaTree<Inode>;
/// Directory entries keyed by (parent ID, name)
pub type DentryTree = MetaTree<Dentry>;
/// Extended attributes keyed by inode ID
pub type ExtendTree = MetaTree<Extend>;
/// Multipart uploads keyed by (object key, upload ID)
pub type MultipartTree = MetaTree<Multipart>;

/// Typed view over one entity tree
pub struct MetaTree<T: StoreItem> {
    tree: Arc<BTree<T>>,
}

impl<T: StoreItem> MetaTree<T> {
    /// Create a view over an existing tree
    pub const fn new(tree: Arc<BTree<T>>) -> Self {
        Self { tree }
    }

    /// The underlying tree
    pub fn store(&self) -> &BTree<T> {
        &self.tree
    }

    /// Get an owned copy of the entity stored under `key`.
    ///
    /// Returns `None` when no entity has that key; a default-valued entity
    /// is never handed out in its place.
    pub fn get(&self, key: &T::Key) -> Option<T> {
        self.tree.copy_get(key)
    }

    /// Check if an entity with `key` exists
    pub fn has(&self, key: &T::Key) -> bool {
        self.tree.has(key)
    }

    /// Insert or replace the entity
    pub fn put(&self, item: T) {
        self.tree.replace_or_insert(item, true);
    }

    /// Insert the entity, failing if one with the same key exists.
    ///
    /// The stored entity is left untouched on failure.
    pub fn create(&self, item: T) -> Result<()> {
        let key = item.key();
        let (_, inserted) = self.tree.replace_or_insert(item, false);
        if inserted {
            return Ok(());
        }
        debug!("create rejected: {} {} exists", T::TREE_TYPE, key);
        Err(Error::duplicate_key(T::TREE_TYPE, key.to_string()))
    }

    /// Delete the entity stored under `key`.
    ///
    /// Deleting an absent key is a no-op. Returns whether an entity was
    /// removed.
    pub fn delete(&self, key: &T::Key) -> bool {
        self.tree.delete(key).is_some()
    }

    /// Serialize and visit entities in key order.
    ///
    /// Covers `[start, end)` when `end` is given, otherwise everything from
    /// `start` up. Stops when `visit` returns `Ok(false)`; an error from
    /// `visit` or from serialization stops the scan and is returned as is.
    pub fn range<E, F>(
        &self,
        start: &T::Key,
        end: Option<&T::Key>,
        visit: F,
    ) -> std::result::Result<(), E>
    where
        E: From<Error>,
        F: FnMut(&[u8]) -> std::result::Result<bool, E>,
    {
        let mut scan = RangeScan::new(visit);
        match end {
            Some(end) => self.tree.ascend_range(start, end, |item| scan.step(item)),
            None => self.tree.ascend_greater_or_equal(start, |item| scan.step(item)),
        }
        scan.finish()
    }

    /// Number of stored entities
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }
}

impl<T: StoreItem> Clone for MetaTree<T> {
    fn clone(&self) -> Self {
        Self {
            tree: Arc::clone(&self.tree),
        }
    }
}

impl<T: StoreItem> std::fmt::Debug for MetaTree<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetaTree").field("tree", &self.tree).finish()
    }
}

/// Serialize-then-visit state shared by tree ranges and snapshot scans.
///
/// The tree traversal callbacks only return a continue flag, so the first
/// error is parked here and surfaced by [`RangeScan::finish`].
pub(crate) struct RangeScan<E, F> {
    visit: F,
    err: Option<E>,
}

impl<E, F> RangeScan<E, F>
where
    E: From<Error>,
    F: FnMut(&[u8]) -> std::result::Result<bool, E>,
{
    pub(crate) const fn new(visit: F) -> Self {
        Self { visit, err: None }
    }

    pub(crate) fn step<T: StoreItem>(&mut self, item: &T) -> bool {
        let bytes = match item.marshal() {
            Ok(bytes) => bytes,
            Err(e) => {
                self.err = Some(E::from(e));
                return false;
            }
        };
        match (self.visit)(&bytes) {
            Ok(next) => next,
            Err(e) => {
                self.err = Some(e);
                false
            }
        }
    }

    pub(crate) fn finish(self) -> std::result::Result<(), E> {
        self.err.map_or(Ok(()), Err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DentryKey, MultipartKey, S_IFREG};

    fn inode_tree() -> InodeTree {
        MetaTree::new(Arc::new(BTree::new()))
    }

    fn decode_inodes(tree: &InodeTree, start: u64, end: Option<u64>) -> Vec<u64> {
        let mut out = Vec::new();
        tree.range(&start, end.as_ref(), |bytes| {
            out.push(Inode::unmarshal(bytes)?.inode);
            Ok::<_, Error>(true)
        })
        .unwrap();
        out
    }

    #[test]
    fn test_get_absent_is_none() {
        let tree = inode_tree();
        assert!(tree.get(&1).is_none());
        assert!(!tree.has(&1));
    }

    #[test]
    fn test_create_duplicate() {
        let tree = inode_tree();
        let mut first = Inode::new(3);
        first.size = 100;
        tree.create(first.clone()).unwrap();

        let mut second = Inode::new(3);
        second.size = 200;
        let err = tree.create(second).unwrap_err();
        assert!(err.is_duplicate_key());
        assert_eq!(tree.get(&3), Some(first));
    }

    #[test]
    fn test_put_is_idempotent() {
        let tree = inode_tree();
        let mut inode = Inode::new(8);
        inode.uid = 1000;

        tree.put(inode.clone());
        tree.put(inode.clone());
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.get(&8), Some(inode));
    }

    #[test]
    fn test_delete_absent_is_noop() {
        let tree = inode_tree();
        tree.put(Inode::new(1));
        assert!(!tree.delete(&2));
        assert!(tree.delete(&1));
        assert!(tree.is_empty());
    }

    #[test]
    fn test_range_bounds() {
        let tree = inode_tree();
        for ino in [5, 1, 4, 2, 3] {
            tree.create(Inode::new(ino)).unwrap();
        }

        assert_eq!(decode_inodes(&tree, 0, None), vec![1, 2, 3, 4, 5]);
        assert_eq!(decode_inodes(&tree, 2, Some(4)), vec![2, 3]);
        assert_eq!(decode_inodes(&tree, 4, None), vec![4, 5]);
        assert!(decode_inodes(&tree, 4, Some(4)).is_empty());
    }

    #[test]
    fn test_range_early_stop() {
        let tree = inode_tree();
        for ino in 1..=10 {
            tree.put(Inode::new(ino));
        }

        let mut visited = 0;
        tree.range(&0, None, |_| {
            visited += 1;
            Ok::<_, Error>(visited < 3)
        })
        .unwrap();
        assert_eq!(visited, 3);
    }

    #[derive(Debug, PartialEq)]
    enum ExportError {
        Full(usize),
        Store(String),
    }

    impl From<Error> for ExportError {
        fn from(e: Error) -> Self {
            Self::Store(e.to_string())
        }
    }

    #[test]
    fn test_range_propagates_visitor_error() {
        let tree = inode_tree();
        for ino in 1..=10 {
            tree.put(Inode::new(ino));
        }

        let mut visited = 0;
        let result = tree.range(&0, None, |_| {
            visited += 1;
            if visited == 4 {
                return Err(ExportError::Full(visited));
            }
            Ok(true)
        });
        assert_eq!(result, Err(ExportError::Full(4)));
        assert_eq!(visited, 4);
    }

    /// Record whose encoding fails for one poisoned ID
    #[derive(Clone, Debug)]
    struct Fragile {
        id: u64,
    }

    const POISONED: u64 = 3;

    impl StoreItem for Fragile {
        type Key = u64;
        const TREE_TYPE: metanode_common::TreeType = metanode_common::TreeType::Inode;

        fn key(&self) -> u64 {
            self.id
        }

        fn marshal(&self) -> Result<Vec<u8>> {
            if self.id == POISONED {
                return Err(Error::Serialization(format!("cannot encode {}", self.id)));
            }
            Ok(self.id.to_be_bytes().to_vec())
        }

        fn unmarshal(bytes: &[u8]) -> Result<Self> {
            let raw: [u8; 8] = bytes
                .try_into()
                .map_err(|_| Error::Deserialization("bad length".into()))?;
            Ok(Self {
                id: u64::from_be_bytes(raw),
            })
        }
    }

    fn fragile_tree() -> MetaTree<Fragile> {
        let tree = MetaTree::new(Arc::new(BTree::new()));
        for id in 1..=5 {
            tree.put(Fragile { id });
        }
        tree
    }

    #[test]
    fn test_range_stops_on_serialization_error() {
        let tree = fragile_tree();

        let mut visited = Vec::new();
        let err = tree
            .range(&0, None, |bytes| {
                visited.push(Fragile::unmarshal(bytes)?.id);
                Ok::<_, Error>(true)
            })
            .unwrap_err();
        assert_eq!(visited, vec![1, 2]);
        assert!(matches!(err, Error::Serialization(ref msg) if msg == "cannot encode 3"));
    }

    #[test]
    fn test_range_converts_serialization_error() {
        let tree = fragile_tree();

        let mut visited = 0;
        let result = tree.range(&2, Some(&5), |_| {
            visited += 1;
            Ok::<_, ExportError>(true)
        });
        assert_eq!(visited, 1);
        assert_eq!(
            result,
            Err(ExportError::Store(
                Error::Serialization("cannot encode 3".into()).to_string()
            ))
        );
    }

    #[test]
    fn test_dentry_range_lists_directory() {
        let tree: DentryTree = MetaTree::new(Arc::new(BTree::new()));
        tree.create(Dentry::new(1, "b", 11, S_IFREG)).unwrap();
        tree.create(Dentry::new(1, "a", 10, S_IFREG)).unwrap();
        tree.create(Dentry::new(2, "a", 20, S_IFREG)).unwrap();
        tree.create(Dentry::new(0, "root", 1, S_IFREG)).unwrap();

        let mut names = Vec::new();
        tree.range(
            &DentryKey::first_child(1),
            Some(&DentryKey::first_child(2)),
            |bytes| {
                names.push(Dentry::unmarshal(bytes)?.name);
                Ok::<_, Error>(true)
            },
        )
        .unwrap();
        assert_eq!(names, vec!["a", "b"]);

        let err = tree.create(Dentry::new(1, "a", 99, S_IFREG)).unwrap_err();
        assert_eq!(err.to_string(), "dentry already exists: 1/a");
        assert_eq!(tree.get(&DentryKey::new(1, "a")).unwrap().inode, 10);
    }

    #[test]
    fn test_multipart_get_put() {
        let tree: MultipartTree = MetaTree::new(Arc::new(BTree::new()));
        let key = MultipartKey::new("logs/app.log", "upload-1");
        tree.create(Multipart::new("logs/app.log", "upload-1", 5)).unwrap();

        let mut upload = tree.get(&key).unwrap();
        upload.extend.insert("content-type".into(), "text/plain".into());
        assert!(tree.get(&key).unwrap().extend.is_empty());

        tree.put(upload.clone());
        assert_eq!(tree.get(&key), Some(upload));
        assert!(tree.delete(&key));
        assert!(tree.get(&key).is_none());
    }

    #[test]
    fn test_views_share_store() {
        let store = Arc::new(BTree::new());
        let a: ExtendTree = MetaTree::new(Arc::clone(&store));
        let b = a.clone();

        let mut extend = Extend::new(4);
        extend.put("user.k", "v");
        a.put(extend);
        assert!(b.has(&4));
        assert_eq!(store.len(), 1);
    }
}
