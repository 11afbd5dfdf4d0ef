//! Core stash types and traits.
//!
//! This crate defines the capability every object store backend provides to
//! the rest of the workspace: a flat, key-addressed namespace of opaque byte
//! blobs with `put`, `stat`, prefix `list`, `copy` and `delete`.
//!
//! Backends live in their own crates (`stash_store_memory`,
//! `stash_store_s3`); the virtual filesystem built on top of this trait lives
//! in `stash_fs`.

pub mod store;

// Test utilities (behind feature flag)
#[cfg(feature = "testutil")]
pub mod testutil;

pub use store::{
    ByteStream, ListStream, ObjectInfo, Store, StoreError, StoreFeatures, StoreResult,
};
