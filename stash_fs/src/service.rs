//! The per-user resource operations.
//!
//! Every call is a one-shot pipeline: canonicalize the path, probe the store,
//! then mutate it. Checks and mutations are separate store calls, so two
//! callers racing on the same path can both pass a check; nothing here
//! serializes them.

use bytes::Bytes;
use stash_core::{ByteStream, StoreError};

use crate::{
    archive::{ArchiveDownload, Download, FileDownload},
    emulator::DirectoryEmulator,
    error::{FsError, FsResult},
    path::{self, BackendKey, UserId},
    resource::Resource,
    store::{ObjectStore, Traversal},
};

/// Content type used when an upload does not declare one.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Archive name used when downloading the whole user root.
pub const ROOT_ARCHIVE_NAME: &str = "files.zip";

/// One entry of an upload batch.
pub struct UploadFile {
    /// Original filename; may contain sub-folders. Blank entries are skipped.
    pub filename: Option<String>,
    pub content_type: Option<String>,
    /// Declared payload length, reported back in the resulting [`Resource`].
    pub size: u64,
    pub body: ByteStream,
}

impl UploadFile {
    pub fn new(filename: impl Into<String>, size: u64, body: ByteStream) -> Self {
        Self {
            filename: Some(filename.into()),
            content_type: None,
            size,
            body,
        }
    }

    /// An in-memory payload.
    pub fn from_bytes(filename: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        let bytes = bytes.into();
        let size = bytes.len() as u64;
        let body: ByteStream =
            Box::new(futures::stream::iter([Ok::<_, std::io::Error>(bytes)]));
        Self::new(filename, size, body)
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct ResourceService {
    store: ObjectStore,
    dirs: DirectoryEmulator,
}

impl ResourceService {
    pub fn new(store: ObjectStore) -> Self {
        let dirs = DirectoryEmulator::new(store.clone());
        Self { store, dirs }
    }

    pub fn store(&self) -> &ObjectStore {
        &self.store
    }

    pub fn directories(&self) -> &DirectoryEmulator {
        &self.dirs
    }

    /// Creates the user's root marker if it is missing. Idempotent.
    pub async fn provision_user(&self, user: UserId) -> FsResult<BackendKey> {
        let root = path::user_root(user);
        if !self.dirs.object_exists(&root).await? {
            self.store
                .put_marker(&root)
                .await
                .map_err(|e| FsError::storage(format!("root folder creation error: {root}"), e))?;
            tracing::info!("provisioned {root}");
        }
        Ok(root)
    }

    /// Creates an empty folder below an existing parent.
    pub async fn create_folder(&self, user: UserId, path: &str) -> FsResult<Resource> {
        let key = path::format_path_for_backend(path, user)?;
        if !key.is_dir() {
            return Err(FsError::bad_path("folder name must end with /"));
        }
        if key.is_user_root() {
            return Err(FsError::FolderAlreadyExists("/".to_string()));
        }
        if self.dirs.exists(&key).await? {
            return Err(FsError::FolderAlreadyExists(key.relative().to_string()));
        }
        if !self.dirs.parent_chain_exists(&key).await? {
            return Err(FsError::NoParentFolder(key.relative().to_string()));
        }

        self.store
            .put_marker(&key)
            .await
            .map_err(|e| FsError::storage(format!("folder creation error: {key}"), e))?;
        tracing::info!("created folder {key}");
        Resource::from_key(key.as_str(), 0)
    }

    /// Direct children of a folder, in store order.
    pub async fn list(&self, user: UserId, path: &str) -> FsResult<Vec<Resource>> {
        let key = path::format_path_for_backend(path, user)?.as_dir();
        self.require_folder(&key).await?;

        let entries = self
            .store
            .list_all(&key, Traversal::Direct)
            .await
            .map_err(|e| FsError::storage(format!("object listing error: {key}"), e))?;

        entries
            .iter()
            .filter(|entry| entry.key != key.as_str())
            .map(|entry| Resource::from_key(&entry.key, entry.size))
            .collect()
    }

    /// Everything below a folder whose name contains `query`, ignoring case.
    pub async fn search(&self, user: UserId, path: &str, query: &str) -> FsResult<Vec<Resource>> {
        let key = path::format_path_for_backend(path, user)?.as_dir();
        self.require_folder(&key).await?;

        let entries = self
            .store
            .list_all(&key, Traversal::Recursive)
            .await
            .map_err(|e| FsError::storage(format!("object listing error: {key}"), e))?;

        let needle = query.to_lowercase();
        let mut found = Vec::new();
        for entry in entries.iter().filter(|entry| entry.key != key.as_str()) {
            let resource = Resource::from_key(&entry.key, entry.size)?;
            if resource.name.to_lowercase().contains(&needle) {
                found.push(resource);
            }
        }
        Ok(found)
    }

    /// Metadata of the object stored exactly at `path`.
    pub async fn get_resource(&self, user: UserId, path: &str) -> FsResult<Resource> {
        let key = path::format_path_for_backend(path, user)?;
        let info = self.stat_existing(&key).await?;
        Resource::from_key(key.as_str(), info.size)
    }

    /// Uploads a batch of files into the folder at `path`.
    ///
    /// Missing intermediate folders are created on the way. The first
    /// failure aborts the batch; files stored before it stay in place.
    pub async fn upload(
        &self,
        user: UserId,
        path: &str,
        files: Vec<UploadFile>,
    ) -> FsResult<Vec<Resource>> {
        let dir = path::format_path_for_backend(path, user)?;
        let mut uploaded = Vec::with_capacity(files.len());
        let mut skipped = 0usize;

        for file in files {
            let Some(filename) = file.filename.filter(|name| !name.trim().is_empty()) else {
                skipped += 1;
                tracing::warn!("skipping upload entry without a filename");
                continue;
            };

            let key = path::append_name(&dir, &filename)?;
            if key.is_dir() {
                return Err(FsError::bad_path(format!(
                    "file name must not end with /: {filename}"
                )));
            }
            if self.dirs.exists(&key).await? {
                return Err(FsError::FolderAlreadyExists(key.relative().to_string()));
            }

            let markers = self.dirs.missing_markers(&key).await?;
            for marker in &markers {
                if self.dirs.shadowed_by_file(marker).await? {
                    return Err(FsError::FolderAlreadyExists(
                        marker.as_file().relative().to_string(),
                    ));
                }
            }
            for marker in markers {
                self.store
                    .put_marker(&marker)
                    .await
                    .map_err(|source| FsError::UploadError {
                        key: marker.relative().to_string(),
                        source,
                    })?;
                tracing::debug!("created intermediate folder {marker}");
            }

            let content_type = file
                .content_type
                .as_deref()
                .unwrap_or(DEFAULT_CONTENT_TYPE);
            self.store
                .put_stream(&key, file.body, content_type)
                .await
                .map_err(|source| FsError::UploadError {
                    key: key.relative().to_string(),
                    source,
                })?;
            tracing::info!("uploaded {key} ({} bytes)", file.size);

            uploaded.push(Resource::from_key(key.as_str(), file.size)?);
        }

        if skipped > 0 {
            tracing::info!("upload to {dir}: {skipped} entries without a filename skipped");
        }
        Ok(uploaded)
    }

    /// Opens a file for streaming, or prepares a zip archive of a folder.
    pub async fn download(&self, user: UserId, path: &str) -> FsResult<Download> {
        let key = path::format_path_for_backend(path, user)?;

        if key.is_dir() {
            self.require_folder(&key).await?;
            let entries = self
                .store
                .list_all(&key, Traversal::Recursive)
                .await
                .map_err(|e| FsError::storage(format!("object listing error: {key}"), e))?;
            let filename = if key.is_user_root() {
                ROOT_ARCHIVE_NAME.to_string()
            } else {
                format!("{}.zip", key.name().trim_end_matches('/'))
            };
            tracing::debug!("archiving {} keys below {key}", entries.len());
            return Ok(Download::Archive(ArchiveDownload::new(
                filename,
                self.store.clone(),
                entries,
            )));
        }

        let info = self.stat_existing(&key).await?;
        let body = self
            .store
            .open_read_stream(&key)
            .await
            .map_err(|e| not_found_or(e, &key, "object read error"))?;
        Ok(Download::File(FileDownload {
            filename: key.name().to_string(),
            size: info.size,
            body,
        }))
    }

    /// Deletes a file, or a folder with everything below it.
    ///
    /// Folder deletion removes keys one by one with no rollback; a failure
    /// part-way leaves the remaining keys in place.
    pub async fn delete(&self, user: UserId, path: &str) -> FsResult<()> {
        let key = path::format_path_for_backend(path, user)?;
        if key.is_user_root() {
            return Err(FsError::bad_path("the root folder cannot be deleted"));
        }

        if !key.is_dir() {
            if !self.dirs.object_exists(&key).await? {
                return Err(FsError::NotFound(key.relative().to_string()));
            }
            self.store
                .delete(&key)
                .await
                .map_err(|e| FsError::storage(format!("removing has ended: {key}"), e))?;
            tracing::info!("deleted {key}");
            return Ok(());
        }

        let entries = self
            .store
            .list_all(&key, Traversal::Recursive)
            .await
            .map_err(|e| FsError::storage(format!("object listing error: {key}"), e))?;
        if entries.is_empty() {
            return Err(FsError::NoParentFolder(key.relative().to_string()));
        }

        for entry in &entries {
            let entry_key = BackendKey::from_store(entry.key.as_str());
            self.store.delete(&entry_key).await.map_err(|e| {
                tracing::error!("folder delete of {key} stopped at {entry_key}: {e}");
                FsError::storage(format!("removing has ended: {entry_key}"), e)
            })?;
        }
        tracing::info!("deleted folder {key} ({} keys)", entries.len());
        Ok(())
    }

    /// Moves or renames a file or a folder.
    ///
    /// Source and destination must be of the same kind. Objects are copied
    /// first and only deleted once every copy succeeded.
    pub async fn move_or_rename(&self, user: UserId, from: &str, to: &str) -> FsResult<Resource> {
        let from = path::format_path_for_backend(from, user)?;
        let to = path::format_path_for_backend(to, user)?;
        if from.is_user_root() || to.is_user_root() {
            return Err(FsError::bad_path("the root folder cannot be moved or replaced"));
        }

        match (from.is_dir(), to.is_dir()) {
            (false, false) => self.move_file(&from, &to).await,
            (true, true) => self.move_folder(&from, &to).await,
            _ => Err(FsError::bad_path(
                "source and destination must both be files or both be folders",
            )),
        }
    }

    async fn move_file(&self, from: &BackendKey, to: &BackendKey) -> FsResult<Resource> {
        let info = match self.store.stat(from).await {
            Ok(info) => info,
            Err(e) if e.is_not_found() => {
                return Err(FsError::NoParentFolder(from.relative().to_string()));
            }
            Err(e) => return Err(FsError::storage(format!("object stat error: {from}"), e)),
        };
        if !self.dirs.parent_chain_exists(to).await? {
            return Err(FsError::NoParentFolder(to.relative().to_string()));
        }

        let to = keep_extension(from, to);
        if self.dirs.exists(&to).await? {
            return Err(FsError::FolderAlreadyExists(to.relative().to_string()));
        }

        self.store
            .copy(from, &to)
            .await
            .map_err(|e| FsError::storage(format!("object copy error: {from} -> {to}"), e))?;
        self.store.delete(from).await.map_err(|e| {
            tracing::warn!("{from} copied to {to} but the source could not be removed: {e}");
            FsError::storage(format!("removing has ended: {from}"), e)
        })?;

        tracing::info!("moved {from} -> {to}");
        Resource::from_key(to.as_str(), info.size)
    }

    async fn move_folder(&self, from: &BackendKey, to: &BackendKey) -> FsResult<Resource> {
        if from == to {
            return Err(FsError::FolderAlreadyExists(to.relative().to_string()));
        }
        // Covers every case of the per-entry check below, which stays as a
        // redundant guard.
        if to.is_strict_descendant_of(from) {
            return Err(FsError::bad_path(format!(
                "cannot move {} into its own subfolder {}",
                from.relative(),
                to.relative()
            )));
        }
        if !self.dirs.folder_exists(from).await? {
            return Err(FsError::NoParentFolder(from.relative().to_string()));
        }
        if !self.dirs.parent_chain_exists(to).await? {
            return Err(FsError::NoParentFolder(to.relative().to_string()));
        }
        if self.dirs.exists(to).await? {
            return Err(FsError::FolderAlreadyExists(to.relative().to_string()));
        }

        let entries = self
            .store
            .list_all(from, Traversal::Recursive)
            .await
            .map_err(|e| FsError::storage(format!("object listing error: {from}"), e))?;

        let mut plan = Vec::with_capacity(entries.len());
        for entry in &entries {
            let source = BackendKey::from_store(entry.key.as_str());
            let Some(target) = source.rebase(from, to) else {
                continue;
            };
            if target.is_strict_descendant_of(&source) {
                return Err(FsError::bad_path(format!(
                    "cannot move {} into its own subfolder",
                    from.relative()
                )));
            }
            plan.push((source, target));
        }

        // Phase one: copy everything, remembering what was copied.
        let mut copied = Vec::with_capacity(plan.len());
        for (source, target) in &plan {
            self.store.copy(source, target).await.map_err(|e| {
                tracing::warn!("folder move {from} -> {to} aborted before any delete: {e}");
                FsError::storage(format!("object copy error: {source} -> {target}"), e)
            })?;
            copied.push(source);
        }
        if !plan.iter().any(|(_, target)| target == to) {
            self.store
                .put_marker(to)
                .await
                .map_err(|e| FsError::storage(format!("folder creation error: {to}"), e))?;
        }

        // Phase two: only now drop the sources.
        for source in copied {
            self.store.delete(source).await.map_err(|e| {
                tracing::error!(
                    "folder move {from} -> {to} copied completely, stale source {source} left: {e}"
                );
                FsError::storage(format!("removing has ended: {source}"), e)
            })?;
        }

        tracing::info!("moved folder {from} -> {to} ({} keys)", plan.len());
        Resource::from_key(to.as_str(), 0)
    }

    async fn require_folder(&self, key: &BackendKey) -> FsResult<()> {
        if key.is_user_root() || self.dirs.folder_exists(key).await? {
            Ok(())
        } else {
            Err(FsError::NoParentFolder(key.relative().to_string()))
        }
    }

    async fn stat_existing(&self, key: &BackendKey) -> FsResult<stash_core::ObjectInfo> {
        self.store
            .stat(key)
            .await
            .map_err(|e| not_found_or(e, key, "object stat error"))
    }
}

/// Carries the source's extension over to an extension-less destination.
fn keep_extension(from: &BackendKey, to: &BackendKey) -> BackendKey {
    let to_name = to.name();
    match (path::extension(from.name()), path::extension(to_name)) {
        (Some(ext), None) if !to_name.ends_with(&format!(".{ext}")) => {
            to.with_name(&format!("{to_name}.{ext}"))
        }
        _ => to.clone(),
    }
}

fn not_found_or(e: StoreError, key: &BackendKey, context: &str) -> FsError {
    if e.is_not_found() {
        FsError::NotFound(key.relative().to_string())
    } else {
        FsError::storage(format!("{context}: {key}"), e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(raw: &str) -> BackendKey {
        path::format_path_for_backend(raw, UserId(3)).unwrap()
    }

    #[test]
    fn extension_is_carried_over() {
        assert_eq!(keep_extension(&key("a.txt"), &key("b")), key("b.txt"));
        assert_eq!(keep_extension(&key("a.txt"), &key("b.md")), key("b.md"));
        assert_eq!(keep_extension(&key("a"), &key("b")), key("b"));
        assert_eq!(
            keep_extension(&key("docs/a.tar.gz"), &key("other/archive")),
            key("other/archive.gz")
        );
    }
}
