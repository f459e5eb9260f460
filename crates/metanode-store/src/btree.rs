//! In-memory ordered index with copy-on-write snapshots
//!
//! Uses a persistent ordered map (`imbl::OrdMap`) behind a single
//! reader/writer lock:
//! - Linearizable point lookups, upserts and deletes
//! - In-order traversal over the whole tree or a key range
//! - O(1) structural clone for point-in-time snapshots
//!
//! A clone shares every node with its source until either side writes,
//! so a long scan runs against the clone without holding the live lock.

use imbl::OrdMap;
use metanode_common::config::DEFAULT_DEGREE;
use metanode_common::{Error, Result, TreeType};
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

/// An entity that can live in a [`BTree`].
///
/// Items are ordered by [`StoreItem::key`] only; two items with equal keys
/// are the same logical record, whatever their other fields hold.
pub trait StoreItem: Clone + Send + Sync + 'static {
    /// Ordering key of the entity
    type Key: Ord + Clone + fmt::Debug + fmt::Display + Send + Sync + 'static;

    /// Tree this entity type lives in
    const TREE_TYPE: TreeType;

    /// Extract the ordering key
    fn key(&self) -> Self::Key;

    /// Serialize the entity to its opaque byte form
    fn marshal(&self) -> Result<Vec<u8>>;

    /// Decode an entity previously produced by [`StoreItem::marshal`]
    fn unmarshal(bytes: &[u8]) -> Result<Self>;
}

/// Ordered map held by a [`BTree`]
pub type ItemMap<T> = OrdMap<<T as StoreItem>::Key, Arc<T>>;

/// Thread-safe ordered index of store items
pub struct BTree<T: StoreItem> {
    /// The actual tree
    tree: RwLock<ItemMap<T>>,
    /// Branching factor this tree was configured with
    degree: usize,
    /// Replication log index the contents reflect
    apply_id: AtomicU64,
}

impl<T: StoreItem> BTree<T> {
    /// Create a new empty tree with the default degree
    pub fn new() -> Self {
        Self::with_degree(DEFAULT_DEGREE)
    }

    /// Create a new empty tree with the given degree
    pub fn with_degree(degree: usize) -> Self {
        Self {
            tree: RwLock::new(OrdMap::new()),
            degree,
            apply_id: AtomicU64::new(0),
        }
    }

    /// Get the live item stored under `key`.
    ///
    /// The returned handle is shared with the tree; use
    /// [`BTree::copy_get`] when the caller needs its own copy.
    pub fn get(&self, key: &T::Key) -> Option<Arc<T>> {
        let tree = self.tree.read();
        tree.get(key).cloned()
    }

    /// Get an owned copy of the item stored under `key`
    pub fn copy_get(&self, key: &T::Key) -> Option<T> {
        let tree = self.tree.read();
        tree.get(key).map(|item| T::clone(item))
    }

    /// Call `f` with the live item under `key`, if present.
    ///
    /// The read lock is held until `f` returns; `f` must not write to
    /// this tree.
    pub fn find<R>(&self, key: &T::Key, f: impl FnOnce(&T) -> R) -> Option<R> {
        let tree = self.tree.read();
        tree.get(key).map(|item| f(item.as_ref()))
    }

    /// Call `f` with a copy of the item under `key`.
    ///
    /// The write lock is held until `f` returns, so no mutation of this
    /// tree can interleave with whatever `f` does with the copy.
    pub fn copy_find<R>(&self, key: &T::Key, f: impl FnOnce(Option<T>) -> R) -> R {
        let tree = self.tree.write();
        let item = tree.get(key).map(|item| T::clone(item));
        f(item)
    }

    /// Check if a key exists
    pub fn has(&self, key: &T::Key) -> bool {
        let tree = self.tree.read();
        tree.contains_key(key)
    }

    /// Delete the item stored under `key`, returning it
    pub fn delete(&self, key: &T::Key) -> Option<Arc<T>> {
        let mut tree = self.tree.write();
        tree.remove(key)
    }

    /// Run `f` with exclusive access to the underlying map
    pub fn execute<R>(&self, f: impl FnOnce(&mut ItemMap<T>) -> R) -> R {
        let mut tree = self.tree.write();
        f(&mut *tree)
    }

    /// Insert `item`, or replace the item with the same key.
    ///
    /// With `replace` set this is an upsert: the previous item (if any) is
    /// returned and the flag is always `true`. Without it an existing item
    /// is left untouched and returned with the flag `false`.
    pub fn replace_or_insert(&self, item: T, replace: bool) -> (Option<Arc<T>>, bool) {
        let key = item.key();
        let mut tree = self.tree.write();

        if !replace {
            if let Some(existing) = tree.get(&key) {
                return (Some(Arc::clone(existing)), false);
            }
        }

        (tree.insert(key, Arc::new(item)), true)
    }

    /// Visit every item in key order until `f` returns `false`.
    ///
    /// The read lock is held for the whole traversal. For large scans take
    /// a [`BTree::get_tree`] snapshot first and scan that instead.
    pub fn ascend(&self, mut f: impl FnMut(&T) -> bool) {
        let tree = self.tree.read();
        for (_, item) in tree.iter() {
            if !f(item.as_ref()) {
                break;
            }
        }
    }

    /// Visit items with keys in `[greater_or_equal, less_than)`
    pub fn ascend_range(
        &self,
        greater_or_equal: &T::Key,
        less_than: &T::Key,
        mut f: impl FnMut(&T) -> bool,
    ) {
        if greater_or_equal >= less_than {
            return;
        }
        let tree = self.tree.read();
        for (_, item) in tree.range(greater_or_equal.clone()..less_than.clone()) {
            if !f(item.as_ref()) {
                break;
            }
        }
    }

    /// Visit items with keys `>= pivot`
    pub fn ascend_greater_or_equal(&self, pivot: &T::Key, mut f: impl FnMut(&T) -> bool) {
        let tree = self.tree.read();
        for (_, item) in tree.range(pivot.clone()..) {
            if !f(item.as_ref()) {
                break;
            }
        }
    }

    /// Take a point-in-time copy of this tree.
    ///
    /// The copy shares structure with the source and has its own lock;
    /// later writes to either side are invisible to the other.
    pub fn get_tree(&self) -> Self {
        let tree = self.tree.write();
        let snapshot = tree.clone();
        let apply_id = self.apply_id.load(Ordering::SeqCst);
        drop(tree);

        debug!(
            "cloned {} tree: {} items, apply_id={}",
            T::TREE_TYPE,
            snapshot.len(),
            apply_id
        );
        Self {
            tree: RwLock::new(snapshot),
            degree: self.degree,
            apply_id: AtomicU64::new(apply_id),
        }
    }

    /// Remove every item.
    ///
    /// Trees obtained from [`BTree::get_tree`] before the reset keep their
    /// contents.
    pub fn reset(&self) {
        let mut tree = self.tree.write();
        let dropped = tree.len();
        tree.clear();
        debug!("reset {} tree: dropped {} items", T::TREE_TYPE, dropped);
    }

    /// Release the tree contents
    pub fn release(&self) {
        self.reset();
    }

    /// Record the replication log index the contents reflect
    pub fn set_apply_id(&self, index: u64) {
        self.apply_id.store(index, Ordering::SeqCst);
    }

    /// Replication log index the contents reflect
    pub fn apply_id(&self) -> u64 {
        self.apply_id.load(Ordering::SeqCst)
    }

    /// Flush to durable storage.
    ///
    /// The in-memory tree has nothing to flush; durability is handled by
    /// the persistence layer, so reaching this is a caller error.
    pub fn flush(&self) -> Result<()> {
        warn!("flush called on in-memory {} tree", T::TREE_TYPE);
        Err(Error::not_implemented(format!(
            "flush of in-memory {} tree",
            T::TREE_TYPE
        )))
    }

    /// Get item count
    pub fn len(&self) -> usize {
        self.tree.read().len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get item count as `u64`
    pub fn count(&self) -> u64 {
        self.len() as u64
    }

    /// Get the item with the largest key
    pub fn max_item(&self) -> Option<Arc<T>> {
        let tree = self.tree.read();
        tree.iter().next_back().map(|(_, item)| Arc::clone(item))
    }

    /// Configured branching factor
    pub const fn degree(&self) -> usize {
        self.degree
    }
}

impl<T: StoreItem> Default for BTree<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: StoreItem> Clone for BTree<T> {
    fn clone(&self) -> Self {
        self.get_tree()
    }
}

impl<T: StoreItem> fmt::Debug for BTree<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BTree")
            .field("tree_type", &T::TREE_TYPE)
            .field("len", &self.len())
            .field("degree", &self.degree)
            .field("apply_id", &self.apply_id())
            .finish()
    }
}
