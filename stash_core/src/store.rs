use async_trait::async_trait;
use bytes::Bytes;
use futures_core::Stream;

/// A stream of object payload chunks.
pub type ByteStream =
    Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send + Unpin + 'static>;

/// A stream of listing entries, in store-defined order.
pub type ListStream = Box<dyn Stream<Item = StoreResult<ObjectInfo>> + Send + Unpin + 'static>;

pub type StoreResult<T, E = StoreError> = std::result::Result<T, E>;

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    /// The store has no object under the requested key.
    #[error("no such key")]
    NotFound,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound)
    }
}

/// A single key reported by [`Store::stat`] or [`Store::list`].
///
/// Keys ending in `/` are directory markers or, for non-recursive listings,
/// collapsed common prefixes; their `size` is always zero.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectInfo {
    pub key: String,
    pub size: u64,
}

impl ObjectInfo {
    pub fn new(key: impl Into<String>, size: u64) -> Self {
        Self {
            key: key.into(),
            size,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.key.ends_with('/')
    }
}

/// Flat, key-addressed object storage.
///
/// Every `put` is atomic from the caller's point of view; there is no
/// atomicity across keys. Listing matches keys by exact string prefix.
#[async_trait]
pub trait Store: std::fmt::Debug + Send + Sync + 'static {
    async fn put_stream(
        &self,
        key: &str,
        stream: ByteStream,
        content_type: &str,
    ) -> StoreResult<()>;

    async fn put_bytes(&self, key: &str, bytes: Bytes, content_type: &str) -> StoreResult<()>;

    fn features(&self) -> StoreFeatures;

    /// Returns the metadata of the object stored exactly at `key`,
    /// or [`StoreError::NotFound`].
    async fn stat(&self, key: &str) -> StoreResult<ObjectInfo>;

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        match self.stat(key).await {
            Ok(_) => Ok(true),
            Err(StoreError::NotFound) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Lists keys starting with `prefix`.
    ///
    /// With `recursive == false` only direct children are reported: keys
    /// containing a further `/` after the prefix are collapsed into a single
    /// `<prefix><segment>/` entry. The prefix key itself is reported if it
    /// exists. `limit` caps the number of entries yielded.
    async fn list(
        &self,
        prefix: &str,
        recursive: bool,
        limit: Option<usize>,
    ) -> StoreResult<ListStream>;

    async fn open_read_stream(&self, key: &str) -> StoreResult<ByteStream>;

    async fn copy(&self, src_key: &str, dst_key: &str) -> StoreResult<()>;

    async fn delete(&self, key: &str) -> StoreResult<()>;
}

pub struct StoreFeatures {
    pub case_sensitive: bool,
    /// Maximum number of keys a single listing request returns.
    pub max_list_page_size: usize,
}

#[async_trait]
impl<S: Store + ?Sized> Store for std::sync::Arc<S> {
    async fn put_stream(
        &self,
        key: &str,
        stream: ByteStream,
        content_type: &str,
    ) -> StoreResult<()> {
        (**self).put_stream(key, stream, content_type).await
    }

    async fn put_bytes(&self, key: &str, bytes: Bytes, content_type: &str) -> StoreResult<()> {
        (**self).put_bytes(key, bytes, content_type).await
    }

    fn features(&self) -> StoreFeatures {
        (**self).features()
    }

    async fn stat(&self, key: &str) -> StoreResult<ObjectInfo> {
        (**self).stat(key).await
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        (**self).exists(key).await
    }

    async fn list(
        &self,
        prefix: &str,
        recursive: bool,
        limit: Option<usize>,
    ) -> StoreResult<ListStream> {
        (**self).list(prefix, recursive, limit).await
    }

    async fn open_read_stream(&self, key: &str) -> StoreResult<ByteStream> {
        (**self).open_read_stream(key).await
    }

    async fn copy(&self, src_key: &str, dst_key: &str) -> StoreResult<()> {
        (**self).copy(src_key, dst_key).await
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        (**self).delete(key).await
    }
}
