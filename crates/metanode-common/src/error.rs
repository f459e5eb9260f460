//! Error types for the metadata store
//!
//! This module defines the common error types used by the metadata trees.

use crate::types::TreeType;
use thiserror::Error;

/// Common result type for metadata store operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for metadata store operations
#[derive(Debug, Error)]
pub enum Error {
    // Tree errors
    #[error("{tree} already exists: {key}")]
    DuplicateKey { tree: TreeType, key: String },

    #[error("invalid entity type tag: {0}")]
    InvalidEntityType(u8),

    // Codec errors
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("deserialization error: {0}")]
    Deserialization(String),

    // Internal errors
    #[error("not implemented: {0}")]
    NotImplemented(String),

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl Error {
    /// Create a duplicate key error for the given tree
    pub fn duplicate_key(tree: TreeType, key: impl Into<String>) -> Self {
        Self::DuplicateKey {
            tree,
            key: key.into(),
        }
    }

    /// Create a not implemented error
    pub fn not_implemented(feature: impl Into<String>) -> Self {
        Self::NotImplemented(feature.into())
    }

    /// Create a configuration error
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Check if this is a duplicate key error
    #[must_use]
    pub const fn is_duplicate_key(&self) -> bool {
        matches!(self, Self::DuplicateKey { .. })
    }

    /// Check if this error signals a programming error.
    ///
    /// The caller passed an out-of-domain tree tag or used the wrong
    /// layer; it must not carry on as if the call had been a no-op.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::InvalidEntityType(_) | Self::NotImplemented(_))
    }
}
