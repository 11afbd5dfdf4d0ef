use bytes::Bytes;
use futures::TryStreamExt;
use stash_core::{ByteStream, ObjectInfo, Store, StoreResult};
use std::sync::Arc;

use crate::path::BackendKey;

/// Content type recorded for directory markers.
pub const MARKER_CONTENT_TYPE: &str = "application/octet-stream";

/// How far below a prefix a listing descends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Traversal {
    /// Direct children only; deeper keys collapse into their first segment.
    Direct,
    Recursive,
}

/// Keyed access to the object store for the rest of the crate.
///
/// Only accepts canonical [`BackendKey`]s, so nothing reaches the store
/// without going through the path module first.
#[derive(Debug, Clone)]
pub struct ObjectStore {
    store: Arc<Box<dyn Store + 'static>>,
}

impl ObjectStore {
    pub fn new<S>(store: S) -> Self
    where
        S: Store + 'static,
    {
        Self::new_boxed(Box::new(store))
    }

    pub fn new_boxed(store: Box<dyn Store + 'static>) -> Self {
        Self {
            store: Arc::new(store),
        }
    }

    /// Writes the zero-byte marker that makes a folder exist.
    pub async fn put_marker(&self, key: &BackendKey) -> StoreResult<()> {
        debug_assert!(key.is_dir(), "markers are directory keys");
        self.store
            .put_bytes(key.as_str(), Bytes::new(), MARKER_CONTENT_TYPE)
            .await
    }

    pub async fn put_stream(
        &self,
        key: &BackendKey,
        stream: ByteStream,
        content_type: &str,
    ) -> StoreResult<()> {
        self.store.put_stream(key.as_str(), stream, content_type).await
    }

    pub async fn stat(&self, key: &BackendKey) -> StoreResult<ObjectInfo> {
        self.store.stat(key.as_str()).await
    }

    /// True if at least one key starts with `prefix`.
    pub async fn has_any_with_prefix(&self, prefix: &BackendKey) -> StoreResult<bool> {
        let mut stream = self.store.list(prefix.as_str(), true, Some(1)).await?;
        Ok(stream.try_next().await?.is_some())
    }

    /// Collects a listing below `prefix`. Order is whatever the store yields.
    pub async fn list_all(
        &self,
        prefix: &BackendKey,
        traversal: Traversal,
    ) -> StoreResult<Vec<ObjectInfo>> {
        let recursive = traversal == Traversal::Recursive;
        let stream = self.store.list(prefix.as_str(), recursive, None).await?;
        stream.try_collect().await
    }

    pub async fn open_read_stream(&self, key: &BackendKey) -> StoreResult<ByteStream> {
        self.store.open_read_stream(key.as_str()).await
    }

    pub async fn copy(&self, from: &BackendKey, to: &BackendKey) -> StoreResult<()> {
        self.store.copy(from.as_str(), to.as_str()).await
    }

    pub async fn delete(&self, key: &BackendKey) -> StoreResult<()> {
        self.store.delete(key.as_str()).await
    }
}
