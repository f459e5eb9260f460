//! Core type definitions for the metadata store
//!
//! The set of entity kinds is closed: every tree held by a metadata
//! node is one of the four [`TreeType`] variants.

use crate::error::Error;
use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Kind of metadata tree (one per entity type)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display)]
#[repr(u8)]
pub enum TreeType {
    /// Inode attributes, keyed by inode ID
    #[display("inode")]
    Inode = 0,
    /// Directory entries, keyed by (parent ID, name)
    #[display("dentry")]
    Dentry = 1,
    /// Extended attributes, keyed by owning inode ID
    #[display("extend")]
    Extend = 2,
    /// Multipart upload bookkeeping, keyed by (object key, upload ID)
    #[display("multipart")]
    Multipart = 3,
}

impl TreeType {
    /// All tree types in tag order
    pub const ALL: [Self; 4] = [Self::Inode, Self::Dentry, Self::Extend, Self::Multipart];

    /// Wire tag of this tree type
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for TreeType {
    type Error = Error;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        match tag {
            0 => Ok(Self::Inode),
            1 => Ok(Self::Dentry),
            2 => Ok(Self::Extend),
            3 => Ok(Self::Multipart),
            other => Err(Error::InvalidEntityType(other)),
        }
    }
}

impl From<TreeType> for u8 {
    fn from(tp: TreeType) -> Self {
        tp.as_u8()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tree_type_tags() {
        for tp in TreeType::ALL {
            assert_eq!(TreeType::try_from(tp.as_u8()).unwrap(), tp);
        }
        assert_eq!(u8::from(TreeType::Multipart), 3);
    }

    #[test]
    fn test_tree_type_invalid_tag() {
        let err = TreeType::try_from(4).unwrap_err();
        assert!(matches!(err, Error::InvalidEntityType(4)));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_tree_type_display() {
        assert_eq!(TreeType::Inode.to_string(), "inode");
        assert_eq!(TreeType::Dentry.to_string(), "dentry");
        assert_eq!(TreeType::Extend.to_string(), "extend");
        assert_eq!(TreeType::Multipart.to_string(), "multipart");
    }
}
