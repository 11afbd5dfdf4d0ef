use bytes::Bytes;
use dashmap::DashMap;
use futures::stream::{self, TryStreamExt};
use stash_core::store::{
    ByteStream, ListStream, ObjectInfo, StoreError, StoreFeatures, StoreResult,
};

use std::collections::BTreeMap;

#[derive(Debug, Clone)]
struct StoredObject {
    bytes: Bytes,
    content_type: String,
}

#[derive(Debug)]
pub struct MemoryStore {
    objects: DashMap<String, StoredObject>,
}

impl MemoryStore {
    /// Creates a new, empty `MemoryStore`.
    pub fn new() -> Self {
        Self {
            objects: DashMap::new(),
        }
    }

    /// Number of objects currently stored, markers included.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Returns the content type recorded for `key`, if the object exists.
    pub fn content_type(&self, key: &str) -> Option<String> {
        self.objects.get(key).map(|obj| obj.content_type.clone())
    }

    /// Snapshot of all keys in lexicographic order.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl stash_core::store::Store for MemoryStore {
    /// Consumes a stream of bytes and stores the concatenated result under the given key.
    async fn put_stream(
        &self,
        key: &str,
        stream: ByteStream,
        content_type: &str,
    ) -> StoreResult<()> {
        let chunks: Vec<Bytes> = stream.try_collect().await?;
        let bytes = Bytes::from(chunks.concat());
        self.put_bytes(key, bytes, content_type).await
    }

    /// Stores a `Bytes` object under the given key.
    async fn put_bytes(&self, key: &str, bytes: Bytes, content_type: &str) -> StoreResult<()> {
        self.objects.insert(
            key.to_string(),
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    /// Returns the features supported by this store.
    fn features(&self) -> StoreFeatures {
        StoreFeatures {
            case_sensitive: true,
            max_list_page_size: usize::MAX,
        }
    }

    async fn stat(&self, key: &str) -> StoreResult<ObjectInfo> {
        let obj = self.objects.get(key).ok_or(StoreError::NotFound)?;
        Ok(ObjectInfo::new(key, obj.bytes.len() as u64))
    }

    /// Lists keys under `prefix` in lexicographic order.
    ///
    /// Non-recursive listings fold every key with a further `/` after the
    /// prefix into its first child segment, mirroring a delimiter listing.
    async fn list(
        &self,
        prefix: &str,
        recursive: bool,
        limit: Option<usize>,
    ) -> StoreResult<ListStream> {
        let mut entries: BTreeMap<String, u64> = BTreeMap::new();
        for entry in self.objects.iter() {
            let Some(rest) = entry.key().strip_prefix(prefix) else {
                continue;
            };
            let size = entry.value().bytes.len() as u64;
            match rest.find('/') {
                Some(idx) if !recursive && idx + 1 < rest.len() => {
                    let child = format!("{}{}", prefix, &rest[..=idx]);
                    entries.entry(child).or_insert(0);
                }
                _ => {
                    entries.insert(entry.key().clone(), size);
                }
            }
        }

        let limit = limit.unwrap_or(usize::MAX);
        let items: Vec<StoreResult<ObjectInfo>> = entries
            .into_iter()
            .take(limit)
            .map(|(key, size)| Ok(ObjectInfo::new(key, size)))
            .collect();
        Ok(Box::new(stream::iter(items)))
    }

    /// Returns a stream that yields the bytes of the object under the given key.
    async fn open_read_stream(&self, key: &str) -> StoreResult<ByteStream> {
        let bytes = self
            .objects
            .get(key)
            .map(|obj| obj.bytes.clone())
            .ok_or(StoreError::NotFound)?;
        let stream = stream::once(async move { Ok::<_, std::io::Error>(bytes) });
        Ok(Box::new(Box::pin(stream)))
    }

    async fn copy(&self, src_key: &str, dst_key: &str) -> StoreResult<()> {
        let obj = self
            .objects
            .get(src_key)
            .map(|obj| obj.value().clone())
            .ok_or(StoreError::NotFound)?;
        self.objects.insert(dst_key.to_string(), obj);
        Ok(())
    }

    /// Deletes the object under the given key. Deleting a missing key is a no-op.
    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.objects.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stash_core::Store;
    use stash_core::testutil::StoreTests;

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemoryStore::new();
        StoreTests::new(&store).run_all().await.unwrap();
        assert!(store.is_empty(), "suite should clean up after itself");
    }

    #[tokio::test]
    async fn records_content_type() {
        let store = MemoryStore::new();
        store
            .put_bytes("a.txt", Bytes::from_static(b"hi"), "text/plain")
            .await
            .unwrap();
        assert_eq!(store.content_type("a.txt").as_deref(), Some("text/plain"));
        assert_eq!(store.content_type("b.txt"), None);
    }

    #[tokio::test]
    async fn non_recursive_list_reports_prefix_key_itself() {
        let store = MemoryStore::new();
        for key in ["docs/", "docs/a.txt", "docs/x/y/z.txt", "docsy.txt"] {
            store.put_bytes(key, Bytes::new(), "").await.unwrap();
        }
        let keys: Vec<String> = store
            .list("docs/", false, None)
            .await
            .unwrap()
            .map_ok(|info| info.key)
            .try_collect()
            .await
            .unwrap();
        assert_eq!(keys, vec!["docs/", "docs/a.txt", "docs/x/"]);
    }
}
