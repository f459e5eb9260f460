//! Metadata tree bundle
//!
//! Owns the four live trees of one metadata node and hands out typed
//! views and snapshots. Created empty at server start and passed to the
//! request handlers, the apply path and the persistence layer.

use crate::btree::BTree;
use crate::snapshot::BTreeSnapshot;
use crate::tree::{DentryTree, ExtendTree, InodeTree, MetaTree, MultipartTree};
use crate::types::{Dentry, Extend, Inode, Multipart};
use metanode_common::{MetaTreeConfig, Result, TreeType};
use std::sync::Arc;
use tracing::{debug, info};

/// The four metadata trees of one metadata node
#[derive(Debug)]
pub struct MetaTrees {
    inode: Arc<BTree<Inode>>,
    dentry: Arc<BTree<Dentry>>,
    extend: Arc<BTree<Extend>>,
    multipart: Arc<BTree<Multipart>>,
    config: MetaTreeConfig,
}

impl MetaTrees {
    /// Create empty trees
    pub fn new(config: MetaTreeConfig) -> Result<Self> {
        config.validate()?;
        let degree = config.degree;
        info!("Created metadata trees (degree={})", degree);
        Ok(Self {
            inode: Arc::new(BTree::with_degree(degree)),
            dentry: Arc::new(BTree::with_degree(degree)),
            extend: Arc::new(BTree::with_degree(degree)),
            multipart: Arc::new(BTree::with_degree(degree)),
            config,
        })
    }

    pub fn inode_tree(&self) -> InodeTree {
        MetaTree::new(Arc::clone(&self.inode))
    }

    pub fn dentry_tree(&self) -> DentryTree {
        MetaTree::new(Arc::clone(&self.dentry))
    }

    pub fn extend_tree(&self) -> ExtendTree {
        MetaTree::new(Arc::clone(&self.extend))
    }

    pub fn multipart_tree(&self) -> MultipartTree {
        MetaTree::new(Arc::clone(&self.multipart))
    }

    /// Take a snapshot of all four trees.
    ///
    /// Each tree is cloned atomically on its own; writes landing between
    /// two clones may be visible in one tree of the snapshot and not in
    /// another.
    pub fn snapshot(&self) -> BTreeSnapshot {
        BTreeSnapshot::new(&self.inode, &self.dentry, &self.extend, &self.multipart)
    }

    /// Number of entities in tree `tp`
    pub fn count(&self, tp: TreeType) -> u64 {
        match tp {
            TreeType::Inode => self.inode.count(),
            TreeType::Dentry => self.dentry.count(),
            TreeType::Extend => self.extend.count(),
            TreeType::Multipart => self.multipart.count(),
        }
    }

    /// Clear all four trees
    pub fn reset(&self) {
        self.inode.reset();
        self.dentry.reset();
        self.extend.reset();
        self.multipart.reset();
        debug!("reset all metadata trees");
    }

    /// Record the replication log index on all four trees
    pub fn set_apply_id(&self, index: u64) {
        self.inode.set_apply_id(index);
        self.dentry.set_apply_id(index);
        self.extend.set_apply_id(index);
        self.multipart.set_apply_id(index);
    }

    /// Replication log index the trees reflect
    pub fn apply_id(&self) -> u64 {
        self.inode.apply_id()
    }

    pub const fn config(&self) -> &MetaTreeConfig {
        &self.config
    }
}
