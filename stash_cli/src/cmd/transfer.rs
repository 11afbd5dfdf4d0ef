use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use stash_core::ByteStream;
use stash_fs::{Download, ResourceService, UploadFile, UserId};
use tokio::io::AsyncWriteExt;
use tokio_util::io::{ReaderStream, StreamReader};
use tracing::info;

use super::util::Output;

pub async fn run_upload(
    service: &ResourceService,
    user: UserId,
    to: &str,
    files: Vec<PathBuf>,
    content_type: Option<String>,
    out: &Output,
) -> Result<()> {
    let mut batch = Vec::with_capacity(files.len());
    for path in &files {
        let mut upload = open_upload(path).await?;
        upload.content_type = content_type.clone();
        batch.push(upload);
    }

    let uploaded = service.upload(user, to, batch).await?;
    info!("uploaded {} of {} files", uploaded.len(), files.len());
    out.resources(&uploaded)
}

async fn open_upload(path: &Path) -> Result<UploadFile> {
    let file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("could not open {path:?}"))?;
    let size = file.metadata().await?.len();
    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .map(str::to_owned);
    let body: ByteStream = Box::new(ReaderStream::new(file));
    Ok(UploadFile {
        filename,
        content_type: None,
        size,
        body,
    })
}

pub async fn run_download(
    service: &ResourceService,
    user: UserId,
    path: &str,
    out: Option<PathBuf>,
) -> Result<()> {
    let download = service.download(user, path).await?;
    let target = out.unwrap_or_else(|| PathBuf::from(download.filename()));
    let mut file = tokio::fs::File::create(&target)
        .await
        .with_context(|| format!("could not create {target:?}"))?;

    match download {
        Download::File(download) => {
            let mut reader = StreamReader::new(download.body);
            let written = tokio::io::copy(&mut reader, &mut file).await?;
            file.flush().await?;
            info!("wrote {written} of {} bytes to {target:?}", download.size);
        }
        Download::Archive(archive) => {
            let entries = archive.entry_count();
            let mut file = archive.write_to(file).await?;
            file.flush().await?;
            info!("wrote archive with {entries} entries to {target:?}");
        }
    }
    Ok(())
}
