//! Point-in-time snapshot over all four metadata trees.
//!
//! Each tree is cloned on its own, so every tree in the snapshot is
//! internally consistent but the four are not taken at one shared instant.
//! Scanning a snapshot never contends with writers on the live trees.

use crate::btree::{BTree, StoreItem};
use crate::tree::RangeScan;
use crate::types::{Dentry, Extend, Inode, Multipart};
use metanode_common::{Error, TreeType};
use tracing::debug;

/// Bulk export view over the metadata trees
pub trait Snapshot {
    /// Serialize and visit every entity of tree `tp` in key order.
    ///
    /// Stops when `visit` returns `Ok(false)`; the first error from `visit`
    /// or from serialization ends the scan and is returned.
    fn range<E, F>(&self, tp: TreeType, visit: F) -> Result<(), E>
    where
        E: From<Error>,
        F: FnMut(&[u8]) -> Result<bool, E>;

    /// Number of entities in tree `tp`
    fn count(&self, tp: TreeType) -> u64;

    /// Release the snapshot
    fn close(self)
    where
        Self: Sized;
}

/// Snapshot made of four independently cloned trees
#[derive(Debug)]
pub struct BTreeSnapshot {
    inode: BTree<Inode>,
    dentry: BTree<Dentry>,
    extend: BTree<Extend>,
    multipart: BTree<Multipart>,
}

impl BTreeSnapshot {
    /// Clone the given live trees
    pub fn new(
        inode: &BTree<Inode>,
        dentry: &BTree<Dentry>,
        extend: &BTree<Extend>,
        multipart: &BTree<Multipart>,
    ) -> Self {
        let snapshot = Self {
            inode: inode.get_tree(),
            dentry: dentry.get_tree(),
            extend: extend.get_tree(),
            multipart: multipart.get_tree(),
        };
        debug!(
            "snapshot taken: inode={} dentry={} extend={} multipart={} apply_id={}",
            snapshot.inode.len(),
            snapshot.dentry.len(),
            snapshot.extend.len(),
            snapshot.multipart.len(),
            snapshot.apply_id()
        );
        snapshot
    }

    /// Replication log index of the inode tree at clone time
    pub fn apply_id(&self) -> u64 {
        self.inode.apply_id()
    }

    pub const fn inodes(&self) -> &BTree<Inode> {
        &self.inode
    }

    pub const fn dentries(&self) -> &BTree<Dentry> {
        &self.dentry
    }

    pub const fn extends(&self) -> &BTree<Extend> {
        &self.extend
    }

    pub const fn multiparts(&self) -> &BTree<Multipart> {
        &self.multipart
    }
}

fn scan_all<T, E, F>(tree: &BTree<T>, visit: F) -> Result<(), E>
where
    T: StoreItem,
    E: From<Error>,
    F: FnMut(&[u8]) -> Result<bool, E>,
{
    let mut scan = RangeScan::new(visit);
    tree.ascend(|item| scan.step(item));
    scan.finish()
}

impl Snapshot for BTreeSnapshot {
    fn range<E, F>(&self, tp: TreeType, visit: F) -> Result<(), E>
    where
        E: From<Error>,
        F: FnMut(&[u8]) -> Result<bool, E>,
    {
        match tp {
            TreeType::Inode => scan_all(&self.inode, visit),
            TreeType::Dentry => scan_all(&self.dentry, visit),
            TreeType::Extend => scan_all(&self.extend, visit),
            TreeType::Multipart => scan_all(&self.multipart, visit),
        }
    }

    fn count(&self, tp: TreeType) -> u64 {
        match tp {
            TreeType::Inode => self.inode.count(),
            TreeType::Dentry => self.dentry.count(),
            TreeType::Extend => self.extend.count(),
            TreeType::Multipart => self.multipart.count(),
        }
    }

    fn close(self) {
        debug!("snapshot closed at apply_id={}", self.apply_id());
    }
}
