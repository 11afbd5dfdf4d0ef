#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use stash_core::{ByteStream, ListStream, ObjectInfo, Store, StoreError, StoreFeatures, StoreResult};
use stash_fs::{ObjectStore, ResourceService, UploadFile, UserId};
use stash_store_memory::MemoryStore;

pub const USER: UserId = UserId(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Put,
    Stat,
    List,
    Read,
    /// The read opens, then the body fails on its first chunk.
    ReadBody,
    Copy,
    Delete,
}

/// One store call as seen by [`FaultyStore`]. For copies `key` is the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub op: Op,
    pub key: String,
}

/// Memory store that records every call and fails the ones it was told to.
#[derive(Debug, Default)]
pub struct FaultyStore {
    inner: MemoryStore,
    calls: Mutex<Vec<Call>>,
    faults: Mutex<Vec<(Op, String)>>,
}

impl FaultyStore {
    /// Makes every `op` on exactly `key` fail from now on.
    pub fn fail(&self, op: Op, key: &str) {
        self.faults.lock().unwrap().push((op, key.to_string()));
    }

    pub fn heal(&self) {
        self.faults.lock().unwrap().clear();
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_of(&self, op: Op) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|call| call.op == op)
            .map(|call| call.key)
            .collect()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn keys(&self) -> Vec<String> {
        self.inner.keys()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.keys().iter().any(|k| k == key)
    }

    fn is_faulty(&self, op: Op, key: &str) -> bool {
        self.faults
            .lock()
            .unwrap()
            .iter()
            .any(|(fault_op, fault_key)| *fault_op == op && fault_key == key)
    }

    fn check(&self, op: Op, key: &str) -> StoreResult<()> {
        self.calls.lock().unwrap().push(Call {
            op,
            key: key.to_string(),
        });
        if self.is_faulty(op, key) {
            Err(StoreError::Other(anyhow::anyhow!(
                "injected {op:?} failure on {key}"
            )))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Store for FaultyStore {
    async fn put_stream(
        &self,
        key: &str,
        stream: ByteStream,
        content_type: &str,
    ) -> StoreResult<()> {
        self.check(Op::Put, key)?;
        self.inner.put_stream(key, stream, content_type).await
    }

    async fn put_bytes(&self, key: &str, bytes: Bytes, content_type: &str) -> StoreResult<()> {
        self.check(Op::Put, key)?;
        self.inner.put_bytes(key, bytes, content_type).await
    }

    fn features(&self) -> StoreFeatures {
        self.inner.features()
    }

    async fn stat(&self, key: &str) -> StoreResult<ObjectInfo> {
        self.check(Op::Stat, key)?;
        self.inner.stat(key).await
    }

    async fn list(
        &self,
        prefix: &str,
        recursive: bool,
        limit: Option<usize>,
    ) -> StoreResult<ListStream> {
        self.check(Op::List, prefix)?;
        self.inner.list(prefix, recursive, limit).await
    }

    async fn open_read_stream(&self, key: &str) -> StoreResult<ByteStream> {
        self.check(Op::Read, key)?;
        if self.is_faulty(Op::ReadBody, key) {
            let chunks: Vec<Result<Bytes, std::io::Error>> =
                vec![Err(std::io::Error::other("injected body failure"))];
            return Ok(Box::new(futures::stream::iter(chunks)));
        }
        self.inner.open_read_stream(key).await
    }

    async fn copy(&self, src_key: &str, dst_key: &str) -> StoreResult<()> {
        self.check(Op::Copy, src_key)?;
        self.inner.copy(src_key, dst_key).await
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.check(Op::Delete, key)?;
        self.inner.delete(key).await
    }
}

/// A service over a fresh store with [`USER`] already provisioned.
pub async fn fixture() -> (ResourceService, Arc<FaultyStore>) {
    let store = Arc::new(FaultyStore::default());
    let service = ResourceService::new(ObjectStore::new(store.clone()));
    service.provision_user(USER).await.unwrap();
    store.clear_calls();
    (service, store)
}

pub fn file(name: &str, content: &'static str) -> UploadFile {
    UploadFile::from_bytes(name, Bytes::from_static(content.as_bytes()))
}

/// Uploads `content` to the user-relative file path `path`.
pub async fn put(service: &ResourceService, path: &str, content: &'static str) {
    let (dir, name) = match path.rfind('/') {
        Some(idx) => path.split_at(idx + 1),
        None => ("", path),
    };
    service
        .upload(USER, dir, vec![file(name, content)])
        .await
        .unwrap();
}

pub fn key(relative: &str) -> String {
    format!("user-{USER}-files/{relative}")
}

pub fn sorted_paths(resources: &[stash_fs::Resource]) -> Vec<String> {
    let mut paths: Vec<String> = resources.iter().map(|r| r.path()).collect();
    paths.sort();
    paths
}
