//! Test utilities for `Store` implementations.
//!
//! This module provides a conformance suite that can be run against any
//! `Store` implementation to verify it honours the contract the virtual
//! filesystem relies on: exact-key `stat`, prefix listing with and without
//! delimiter collapsing, and server-side `copy`.
//!
//! # Usage
//!
//! In your store crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! stash_core = { workspace = true, features = ["testutil"] }
//! ```
//!
//! In your test file:
//!
//! ```ignore
//! use stash_core::testutil::StoreTests;
//!
//! #[tokio::test]
//! async fn test_my_store() {
//!     let store = MyStore::new(...);
//!     StoreTests::new(&store).run_all().await.unwrap();
//! }
//! ```

use crate::store::{ByteStream, ObjectInfo, Store, StoreError, StoreResult};
use bytes::Bytes;
use futures::{StreamExt, TryStreamExt};
use rand::Rng;

const CONTENT_TYPE: &str = "application/octet-stream";

/// Test suite for `Store` implementations.
pub struct StoreTests<'a, S> {
    store: &'a S,
    /// Prefix for test keys to avoid conflicts
    prefix: String,
}

impl<'a, S: Store> StoreTests<'a, S> {
    /// Create a new test suite for the given store.
    pub fn new(store: &'a S) -> Self {
        let prefix = format!("_test_{}/", rand::rng().random::<u32>());
        Self { store, prefix }
    }

    /// Create a new test suite with a custom prefix.
    pub fn with_prefix(store: &'a S, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into(),
        }
    }

    fn key(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }

    /// Run all tests.
    pub async fn run_all(&self) -> StoreResult<()> {
        self.test_put_get_bytes().await?;
        self.test_put_get_stream().await?;
        self.test_exists().await?;
        self.test_stat().await?;
        self.test_stat_not_found().await?;
        self.test_delete().await?;
        self.test_list_recursive().await?;
        self.test_list_collapses_children().await?;
        self.test_list_limit().await?;
        self.test_copy().await?;
        self.test_overwrite().await?;

        if self.store.features().case_sensitive {
            self.test_case_sensitive_keys().await?;
        }

        // Cleanup
        self.cleanup().await?;

        Ok(())
    }

    /// Test basic put and get with bytes.
    pub async fn test_put_get_bytes(&self) -> StoreResult<()> {
        let key = self.key("bytes_test.bin");
        let data = Bytes::from_static(b"hello, world!");

        self.store.put_bytes(&key, data.clone(), CONTENT_TYPE).await?;

        let retrieved = read_all(self.store.open_read_stream(&key).await?).await?;
        assert_eq!(retrieved, data, "retrieved data should match original");

        Ok(())
    }

    /// Test put and get with streams.
    pub async fn test_put_get_stream(&self) -> StoreResult<()> {
        let key = self.key("stream_test.bin");
        let data = random_bytes(1024 * 10);

        let chunks: Vec<Result<Bytes, std::io::Error>> =
            vec![Ok(data.slice(..4096)), Ok(data.slice(4096..))];
        self.store
            .put_stream(&key, Box::new(futures::stream::iter(chunks)), CONTENT_TYPE)
            .await?;

        let retrieved = read_all(self.store.open_read_stream(&key).await?).await?;
        assert_eq!(
            retrieved.len(),
            data.len(),
            "stream data length should match"
        );
        assert_eq!(retrieved, data, "stream data should match");

        Ok(())
    }

    /// Test exists check.
    pub async fn test_exists(&self) -> StoreResult<()> {
        let key = self.key("exists_test.bin");

        assert!(
            !self.store.exists(&key).await?,
            "object should not exist before creation"
        );

        self.store
            .put_bytes(&key, Bytes::from_static(b"test"), CONTENT_TYPE)
            .await?;

        assert!(
            self.store.exists(&key).await?,
            "object should exist after creation"
        );

        Ok(())
    }

    /// Test stat on files and zero-byte directory markers.
    pub async fn test_stat(&self) -> StoreResult<()> {
        let key = self.key("stat_test.bin");
        let marker = self.key("stat_dir/");

        self.store
            .put_bytes(&key, Bytes::from(vec![42u8; 12345]), CONTENT_TYPE)
            .await?;
        self.store.put_bytes(&marker, Bytes::new(), CONTENT_TYPE).await?;

        let info = self.store.stat(&key).await?;
        assert_eq!(info, ObjectInfo::new(key.clone(), 12345));

        let info = self.store.stat(&marker).await?;
        assert_eq!(info.size, 0, "directory marker should be empty");
        assert!(info.is_dir());

        Ok(())
    }

    /// A missing key must surface as the distinguished not-found error.
    pub async fn test_stat_not_found(&self) -> StoreResult<()> {
        let key = self.key("never_written.bin");

        match self.store.stat(&key).await {
            Err(StoreError::NotFound) => {}
            other => panic!("expected NotFound for missing key, got {other:?}"),
        }

        Ok(())
    }

    /// Test object deletion.
    pub async fn test_delete(&self) -> StoreResult<()> {
        let key = self.key("delete_test.bin");

        self.store
            .put_bytes(&key, Bytes::from_static(b"to be deleted"), CONTENT_TYPE)
            .await?;
        self.store.delete(&key).await?;

        assert!(
            !self.store.exists(&key).await?,
            "object should not exist after delete"
        );

        Ok(())
    }

    /// Recursive listing reports every key under the prefix.
    pub async fn test_list_recursive(&self) -> StoreResult<()> {
        let keys = [
            "tree/",
            "tree/a.bin",
            "tree/sub/",
            "tree/sub/b.bin",
            "tree/sub/deeper/c.bin",
        ];
        for key in &keys {
            self.put_small(key).await?;
        }

        let found = self.list_keys("tree/", true, None).await?;
        let mut expected: Vec<String> = keys.iter().map(|k| self.key(k)).collect();
        expected.sort();
        assert_eq!(found, expected, "recursive list should report all keys");

        Ok(())
    }

    /// Non-recursive listing collapses nested keys into one entry per child.
    pub async fn test_list_collapses_children(&self) -> StoreResult<()> {
        let keys = [
            "flat/",
            "flat/a.bin",
            "flat/sub/",
            "flat/sub/b.bin",
            "flat/implicit/c.bin",
        ];
        for key in &keys {
            self.put_small(key).await?;
        }

        let found = self.list_keys("flat/", false, None).await?;
        let mut expected: Vec<String> = ["flat/", "flat/a.bin", "flat/implicit/", "flat/sub/"]
            .iter()
            .map(|k| self.key(k))
            .collect();
        expected.sort();
        assert_eq!(found, expected, "list should only report direct children");

        Ok(())
    }

    /// Test that `limit` caps the number of reported entries.
    pub async fn test_list_limit(&self) -> StoreResult<()> {
        for key in ["limit/a.bin", "limit/b.bin", "limit/c.bin"] {
            self.put_small(key).await?;
        }

        let found = self.list_keys("limit/", true, Some(1)).await?;
        assert_eq!(found.len(), 1, "limit should cap the listing");

        let found = self.list_keys("limit_missing/", true, Some(1)).await?;
        assert!(found.is_empty(), "missing prefix should list nothing");

        Ok(())
    }

    /// Test server side copy.
    pub async fn test_copy(&self) -> StoreResult<()> {
        let src = self.key("copy_src.bin");
        let dst = self.key("copy_dst.bin");

        self.store
            .put_bytes(&src, Bytes::from_static(b"copy me"), CONTENT_TYPE)
            .await?;
        self.store.copy(&src, &dst).await?;

        assert!(
            self.store.exists(&src).await?,
            "source should still exist after copy"
        );
        let content = read_all(self.store.open_read_stream(&dst).await?).await?;
        assert_eq!(content.as_ref(), b"copy me", "copy should preserve content");

        Ok(())
    }

    /// Test overwriting existing objects.
    pub async fn test_overwrite(&self) -> StoreResult<()> {
        let key = self.key("overwrite_test.bin");

        self.store
            .put_bytes(&key, Bytes::from_static(b"original content"), CONTENT_TYPE)
            .await?;
        self.store
            .put_bytes(&key, Bytes::from_static(b"new content"), CONTENT_TYPE)
            .await?;

        let retrieved = read_all(self.store.open_read_stream(&key).await?).await?;
        assert_eq!(
            retrieved.as_ref(),
            b"new content",
            "overwritten content should be new"
        );

        Ok(())
    }

    /// Keys differing only in case are distinct objects.
    pub async fn test_case_sensitive_keys(&self) -> StoreResult<()> {
        let lower = self.key("case.bin");
        let upper = self.key("CASE.bin");

        self.store
            .put_bytes(&lower, Bytes::from_static(b"lower"), CONTENT_TYPE)
            .await?;

        assert!(
            !self.store.exists(&upper).await?,
            "keys should be case sensitive"
        );

        Ok(())
    }

    /// Clean up test objects.
    pub async fn cleanup(&self) -> StoreResult<()> {
        let mut stream = self.store.list(&self.prefix, true, None).await?;

        while let Some(result) = stream.next().await {
            let info = result?;
            let _ = self.store.delete(&info.key).await;
        }

        Ok(())
    }

    async fn put_small(&self, name: &str) -> StoreResult<()> {
        let key = self.key(name);
        let bytes = if key.ends_with('/') {
            Bytes::new()
        } else {
            Bytes::from_static(b"list test")
        };
        self.store.put_bytes(&key, bytes, CONTENT_TYPE).await
    }

    async fn list_keys(
        &self,
        name: &str,
        recursive: bool,
        limit: Option<usize>,
    ) -> StoreResult<Vec<String>> {
        let stream = self.store.list(&self.key(name), recursive, limit).await?;
        let mut keys: Vec<String> = stream.map_ok(|info| info.key).try_collect().await?;
        keys.sort();
        Ok(keys)
    }
}

/// Drains a payload stream into a single buffer.
pub async fn read_all(stream: ByteStream) -> StoreResult<Bytes> {
    let chunks: Vec<Bytes> = stream.try_collect().await?;
    Ok(Bytes::from(chunks.concat()))
}

/// Generate random bytes for testing.
pub fn random_bytes(len: usize) -> Bytes {
    let mut data = vec![0u8; len];
    rand::rng().fill(&mut data[..]);
    Bytes::from(data)
}
