//! Downloads: single files as raw byte streams, folders as zip archives.
//!
//! Archives are written entry by entry while the objects are read, so only
//! one object is in flight at any time regardless of the folder's size.

use async_zip::{Compression, ZipEntryBuilder, base::write::ZipFileWriter};
use futures::{TryStreamExt, io::AsyncWriteExt as _};
use stash_core::{ByteStream, ObjectInfo};
use tokio::io::AsyncWrite;

use crate::{
    error::{FsError, FsResult},
    path::BackendKey,
    store::ObjectStore,
};

/// Result of a download request.
pub enum Download {
    File(FileDownload),
    Archive(ArchiveDownload),
}

impl Download {
    /// Filename hint for the caller's content disposition.
    pub fn filename(&self) -> &str {
        match self {
            Download::File(file) => &file.filename,
            Download::Archive(archive) => &archive.filename,
        }
    }
}

/// A single object, streamed as-is.
pub struct FileDownload {
    pub filename: String,
    pub size: u64,
    pub body: ByteStream,
}

/// A folder, packed into a zip archive on demand.
pub struct ArchiveDownload {
    filename: String,
    store: ObjectStore,
    entries: Vec<ObjectInfo>,
}

impl ArchiveDownload {
    pub(crate) fn new(filename: String, store: ObjectStore, entries: Vec<ObjectInfo>) -> Self {
        Self {
            filename,
            store,
            entries,
        }
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Number of keys that end up in the archive.
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Streams the archive into `sink` and hands the sink back.
    ///
    /// Entries are named by their path relative to the user root; folder
    /// markers become directory entries.
    pub async fn write_to<W>(self, sink: W) -> FsResult<W>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let mut writer = ZipFileWriter::with_tokio(sink);

        for entry in &self.entries {
            let key = BackendKey::from_store(entry.key.as_str());
            let name = key.relative().to_string();
            if name.is_empty() {
                continue;
            }

            if key.is_dir() {
                let builder = ZipEntryBuilder::new(name.into(), Compression::Stored);
                writer
                    .write_entry_whole(builder, &[])
                    .await
                    .map_err(zip_err)?;
                continue;
            }

            let mut body = self
                .store
                .open_read_stream(&key)
                .await
                .map_err(|e| FsError::storage(format!("object read error: {key}"), e))?;

            let builder = ZipEntryBuilder::new(name.into(), Compression::Deflate);
            let mut entry_writer = writer.write_entry_stream(builder).await.map_err(zip_err)?;
            while let Some(chunk) = body
                .try_next()
                .await
                .map_err(|e| FsError::storage(format!("object read error: {key}"), e.into()))?
            {
                entry_writer.write_all(&chunk).await?;
            }
            entry_writer.close().await.map_err(zip_err)?;
            tracing::debug!("zipped {key}");
        }

        let sink = writer.close().await.map_err(zip_err)?;
        Ok(sink.into_inner())
    }
}

fn zip_err(e: async_zip::error::ZipError) -> FsError {
    FsError::Io(std::io::Error::other(e))
}
