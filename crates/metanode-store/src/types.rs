//! Metadata entity types.
//!
//! These are the four record kinds held by a metadata node. Each is
//! serialized with bincode when a tree range or snapshot hands it out
//! as bytes.

use crate::btree::StoreItem;
use derive_more::Display;
use metanode_common::{Error, Result, TreeType};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// File type bits of `Inode::mode`
pub const S_IFMT: u32 = 0o170_000;
/// Directory file type
pub const S_IFDIR: u32 = 0o040_000;
/// Regular file type
pub const S_IFREG: u32 = 0o100_000;

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    bincode::serialize(value).map_err(|e| Error::Serialization(e.to_string()))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    bincode::deserialize(bytes).map_err(|e| Error::Deserialization(e.to_string()))
}

// ---- Inode ----

/// Location of one extent of file data
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtentKey {
    pub file_offset: u64,
    pub partition_id: u64,
    pub extent_id: u64,
    pub extent_offset: u64,
    pub size: u32,
    pub crc: u32,
}

/// Inode attributes, one per filesystem object
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inode {
    pub inode: u64,
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
    pub size: u64,
    pub generation: u64,
    pub create_time: i64,
    pub access_time: i64,
    pub modify_time: i64,
    pub link_target: Vec<u8>,
    pub nlink: u32,
    pub flag: i32,
    pub extents: Vec<ExtentKey>,
}

impl Inode {
    /// Create an inode with only its ID set
    #[must_use]
    pub fn new(inode: u64) -> Self {
        Self {
            inode,
            nlink: 1,
            generation: 1,
            ..Default::default()
        }
    }

    /// Check if this inode is a directory
    #[must_use]
    pub const fn is_dir(&self) -> bool {
        self.mode & S_IFMT == S_IFDIR
    }
}

impl StoreItem for Inode {
    type Key = u64;
    const TREE_TYPE: TreeType = TreeType::Inode;

    fn key(&self) -> u64 {
        self.inode
    }

    fn marshal(&self) -> Result<Vec<u8>> {
        encode(self)
    }

    fn unmarshal(bytes: &[u8]) -> Result<Self> {
        decode(bytes)
    }
}

// ---- Dentry ----

/// Ordering key of a dentry: parent first, then name
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
#[display("{parent_id}/{name}")]
pub struct DentryKey {
    pub parent_id: u64,
    pub name: String,
}

impl DentryKey {
    pub fn new(parent_id: u64, name: impl Into<String>) -> Self {
        Self {
            parent_id,
            name: name.into(),
        }
    }

    /// Smallest key under `parent_id`, for listing a directory
    #[must_use]
    pub const fn first_child(parent_id: u64) -> Self {
        Self {
            parent_id,
            name: String::new(),
        }
    }
}

/// Directory entry linking a name under a parent to an inode
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dentry {
    pub parent_id: u64,
    pub name: String,
    pub inode: u64,
    pub mode: u32,
}

impl Dentry {
    pub fn new(parent_id: u64, name: impl Into<String>, inode: u64, mode: u32) -> Self {
        Self {
            parent_id,
            name: name.into(),
            inode,
            mode,
        }
    }
}

impl StoreItem for Dentry {
    type Key = DentryKey;
    const TREE_TYPE: TreeType = TreeType::Dentry;

    fn key(&self) -> DentryKey {
        DentryKey::new(self.parent_id, self.name.clone())
    }

    fn marshal(&self) -> Result<Vec<u8>> {
        encode(self)
    }

    fn unmarshal(bytes: &[u8]) -> Result<Self> {
        decode(bytes)
    }
}

// ---- Extend ----

/// Extended attribute set of one inode
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extend {
    pub inode: u64,
    pub attrs: BTreeMap<String, Vec<u8>>,
}

impl Extend {
    #[must_use]
    pub fn new(inode: u64) -> Self {
        Self {
            inode,
            attrs: BTreeMap::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.attrs.get(name).map(Vec::as_slice)
    }

    pub fn put(&mut self, name: impl Into<String>, value: impl Into<Vec<u8>>) {
        self.attrs.insert(name.into(), value.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<Vec<u8>> {
        self.attrs.remove(name)
    }
}

impl StoreItem for Extend {
    type Key = u64;
    const TREE_TYPE: TreeType = TreeType::Extend;

    fn key(&self) -> u64 {
        self.inode
    }

    fn marshal(&self) -> Result<Vec<u8>> {
        encode(self)
    }

    fn unmarshal(bytes: &[u8]) -> Result<Self> {
        decode(bytes)
    }
}

// ---- Multipart ----

/// Ordering key of a multipart upload: object key, then upload ID
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
#[display("{key}#{id}")]
pub struct MultipartKey {
    pub key: String,
    pub id: String,
}

impl MultipartKey {
    pub fn new(key: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            id: id.into(),
        }
    }
}

/// One uploaded part of a multipart upload
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    pub id: u16,
    pub upload_time: i64,
    pub md5: String,
    pub size: u64,
    pub inode: u64,
}

/// In-progress multipart upload
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Multipart {
    pub key: String,
    pub id: String,
    pub init_time: i64,
    pub parts: Vec<Part>,
    pub extend: BTreeMap<String, String>,
}

impl Multipart {
    pub fn new(key: impl Into<String>, id: impl Into<String>, init_time: i64) -> Self {
        Self {
            key: key.into(),
            id: id.into(),
            init_time,
            ..Default::default()
        }
    }

    /// Record a part, replacing any earlier upload of the same part ID.
    /// Parts stay sorted by ID. Returns the replaced part.
    pub fn insert_part(&mut self, part: Part) -> Option<Part> {
        match self.parts.binary_search_by_key(&part.id, |p| p.id) {
            Ok(pos) => Some(std::mem::replace(&mut self.parts[pos], part)),
            Err(pos) => {
                self.parts.insert(pos, part);
                None
            }
        }
    }

    /// Total size of all recorded parts
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.parts.iter().map(|p| p.size).sum()
    }
}

impl StoreItem for Multipart {
    type Key = MultipartKey;
    const TREE_TYPE: TreeType = TreeType::Multipart;

    fn key(&self) -> MultipartKey {
        MultipartKey::new(self.key.clone(), self.id.clone())
    }

    fn marshal(&self) -> Result<Vec<u8>> {
        encode(self)
    }

    fn unmarshal(bytes: &[u8]) -> Result<Self> {
        decode(bytes)
    }
}
