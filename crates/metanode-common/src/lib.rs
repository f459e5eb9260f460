//! Metanode Common - Shared types and utilities
//!
//! This crate provides the error type, the entity tree tag and the
//! configuration structures shared by the metadata store crates.

pub mod config;
pub mod error;
pub mod types;

pub use crate::config::MetaTreeConfig;
pub use error::{Error, Result};
pub use types::*;
