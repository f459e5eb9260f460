//! Metanode Metadata Store - In-memory metadata trees
//!
//! This crate implements the ordered, concurrently accessible indexes that
//! hold a metadata node's inodes, dentries, extended attributes and
//! multipart uploads, plus copy-on-write snapshots for bulk export.
//!
//! # Layout
//!
//! - [`BTree`] -- generic lock-guarded ordered index with O(1) clone
//! - [`MetaTree`] -- typed view (`get`/`put`/`create`/`delete`/`range`)
//! - [`BTreeSnapshot`] -- frozen clones of all four trees
//! - [`MetaTrees`] -- the live trees of one node

pub mod btree;
pub mod snapshot;
pub mod store;
pub mod tree;
pub mod types;

// Re-exports
pub use btree::{BTree, ItemMap, StoreItem};
pub use snapshot::{BTreeSnapshot, Snapshot};
pub use store::MetaTrees;
pub use tree::{DentryTree, ExtendTree, InodeTree, MetaTree, MultipartTree};
pub use types::{Dentry, DentryKey, Extend, ExtentKey, Inode, Multipart, MultipartKey, Part};
