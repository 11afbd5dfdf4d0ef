use std::path::PathBuf;

use anyhow::{Context, Result};
use stash_fs::{ResourceService, UserId};

use crate::{
    Commands, FsCmd, Target,
    config::{StashConfig, create_store},
};

mod transfer;
mod tree;
mod util;

pub async fn run_command(config_file: PathBuf, target: Target, cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Config { cmd } => cmd.run(&config_file),
        Commands::Fs(cmd) => {
            let config = StashConfig::load(&config_file)?;
            let store = create_store(config.store(&target.store)?).await?;
            let service = ResourceService::new(store);
            let user = UserId(target.user.context("--user is required for this command")?);
            run_fs(&service, user, cmd, &util::Output::new(target.json)).await
        }
    }
}

async fn run_fs(
    service: &ResourceService,
    user: UserId,
    cmd: FsCmd,
    out: &util::Output,
) -> Result<()> {
    match cmd {
        FsCmd::Provision => {
            let root = service.provision_user(user).await?;
            println!("{root}");
            Ok(())
        }
        FsCmd::Mkdir { path } => tree::run_mkdir(service, user, &path, out).await,
        FsCmd::Ls { path } => tree::run_ls(service, user, &path, out).await,
        FsCmd::Search { query, path } => {
            tree::run_search(service, user, &path, &query, out).await
        }
        FsCmd::Stat { path } => tree::run_stat(service, user, &path, out).await,
        FsCmd::Rm { path } => tree::run_rm(service, user, &path).await,
        FsCmd::Mv { from, to } => tree::run_mv(service, user, &from, &to, out).await,
        FsCmd::Upload {
            files,
            to,
            content_type,
        } => transfer::run_upload(service, user, &to, files, content_type, out).await,
        FsCmd::Download { path, out: file } => {
            transfer::run_download(service, user, &path, file).await
        }
    }
}
