//! Folder existence on top of a store that has no folders.
//!
//! A folder exists as soon as any key starts with its prefix; a file exists
//! only under its exact key. Every check is a fresh store probe, so a folder
//! at depth `n` costs `n` listings and the answer can be stale by the time
//! the caller acts on it.

use crate::{
    error::{FsError, FsResult},
    path::BackendKey,
    store::ObjectStore,
};

#[derive(Debug, Clone)]
pub struct DirectoryEmulator {
    store: ObjectStore,
}

impl DirectoryEmulator {
    pub fn new(store: ObjectStore) -> Self {
        Self { store }
    }

    /// Prefix probe on the directory form of `key`.
    pub async fn folder_exists(&self, key: &BackendKey) -> FsResult<bool> {
        let prefix = key.as_dir();
        let found = self
            .store
            .has_any_with_prefix(&prefix)
            .await
            .map_err(|e| FsError::storage(format!("object listing error: {prefix}"), e))?;
        tracing::debug!("folder probe {prefix}: {found}");
        Ok(found)
    }

    /// Exact-key probe.
    pub async fn object_exists(&self, key: &BackendKey) -> FsResult<bool> {
        match self.store.stat(key).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(FsError::storage(format!("object stat error: {key}"), e)),
        }
    }

    /// Whether `key` is taken.
    ///
    /// Directory keys use the prefix probe, file keys the exact probe. Each
    /// is also taken by the other kind under the same name, so a file and a
    /// folder never share a name.
    pub async fn exists(&self, key: &BackendKey) -> FsResult<bool> {
        if key.is_dir() {
            return Ok(self.folder_exists(key).await? || self.shadowed_by_file(key).await?);
        }
        Ok(self.object_exists(key).await? || self.folder_exists(key).await?)
    }

    /// True if a file is stored under the name of directory key `dir`.
    pub async fn shadowed_by_file(&self, dir: &BackendKey) -> FsResult<bool> {
        let file = dir.as_file();
        // The user root has no file form.
        if !file.as_str().contains('/') {
            return Ok(false);
        }
        self.object_exists(&file).await
    }

    /// Walks the ancestors of `key` from the user root downward and reports
    /// `false` at the first one that does not exist. The user root itself
    /// is provisioned with the account and is not probed.
    pub async fn parent_chain_exists(&self, key: &BackendKey) -> FsResult<bool> {
        for ancestor in key.ancestors() {
            if !self.folder_exists(&ancestor).await? {
                tracing::debug!("missing ancestor {ancestor} of {key}");
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Ancestor directory markers of `key` that are not stored yet, ordered
    /// from the root downward.
    pub async fn missing_markers(&self, key: &BackendKey) -> FsResult<Vec<BackendKey>> {
        let mut missing = Vec::new();
        for ancestor in key.ancestors() {
            if !self.object_exists(&ancestor).await? {
                missing.push(ancestor);
            }
        }
        Ok(missing)
    }
}
