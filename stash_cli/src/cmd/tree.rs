use anyhow::Result;
use stash_fs::{ResourceService, UserId};
use tracing::info;

use super::util::Output;

pub async fn run_mkdir(
    service: &ResourceService,
    user: UserId,
    path: &str,
    out: &Output,
) -> Result<()> {
    let folder = service.create_folder(user, path).await?;
    out.resource(&folder)
}

pub async fn run_ls(
    service: &ResourceService,
    user: UserId,
    path: &str,
    out: &Output,
) -> Result<()> {
    let mut entries = service.list(user, path).await?;
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    out.resources(&entries)
}

pub async fn run_search(
    service: &ResourceService,
    user: UserId,
    path: &str,
    query: &str,
    out: &Output,
) -> Result<()> {
    let mut hits = service.search(user, path, query).await?;
    hits.sort_by_key(|hit| hit.path());
    info!("{} matches for {query:?}", hits.len());
    out.resources(&hits)
}

pub async fn run_stat(
    service: &ResourceService,
    user: UserId,
    path: &str,
    out: &Output,
) -> Result<()> {
    let resource = service.get_resource(user, path).await?;
    out.resource(&resource)
}

pub async fn run_rm(service: &ResourceService, user: UserId, path: &str) -> Result<()> {
    service.delete(user, path).await?;
    info!("deleted {path}");
    Ok(())
}

pub async fn run_mv(
    service: &ResourceService,
    user: UserId,
    from: &str,
    to: &str,
    out: &Output,
) -> Result<()> {
    let moved = service.move_or_rename(user, from, to).await?;
    out.resource(&moved)
}
