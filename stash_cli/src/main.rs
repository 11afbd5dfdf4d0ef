use crate::init_config::CmdConfig;
use anyhow::Context;
use clap::{ArgAction, Args, Parser, Subcommand};
use clap_verbosity_flag::InfoLevel;
use directories::ProjectDirs;
use std::path::PathBuf;

mod cmd;
mod config;
mod init_config;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// which config profile this command should use
    #[arg(short, long, value_name = "NAME", default_value = "local")]
    profile: String,

    #[command(flatten)]
    target: Target,

    #[command(flatten)]
    verbosity: clap_verbosity_flag::Verbosity<InfoLevel>,

    #[command(subcommand)]
    cmd: Commands,
}

/// Whose files, in which store.
#[derive(Args)]
struct Target {
    /// numeric id of the user whose folder tree is addressed
    #[arg(short, long, value_name = "ID", global = true)]
    user: Option<u64>,

    /// name of the store in the config file
    #[arg(
        short,
        long,
        value_name = "STORE_NAME",
        default_value = "default",
        global = true
    )]
    store: String,

    /// print resources as JSON lines
    #[arg(long, action = ArgAction::SetTrue, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Modify the config file of the selected profile
    Config {
        #[command(subcommand)]
        cmd: CmdConfig,
    },
    #[command(flatten)]
    Fs(FsCmd),
}

/// Operations on one user's folder tree.
#[derive(Subcommand)]
enum FsCmd {
    /// Create the user's root folder if it is missing
    Provision,
    /// Create an empty folder; the path must end with `/`
    Mkdir { path: String },
    /// List the direct children of a folder
    Ls {
        #[arg(default_value = "")]
        path: String,
    },
    /// Find files and folders whose name contains QUERY, ignoring case
    Search {
        query: String,
        /// folder to search below
        #[arg(long, value_name = "PATH", default_value = "")]
        path: String,
    },
    /// Show a single file or folder marker
    Stat { path: String },
    /// Upload local files into a folder, creating missing folders on the way
    Upload {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// destination folder
        #[arg(long, value_name = "PATH", default_value = "")]
        to: String,
        /// content type recorded for every uploaded file
        #[arg(long, value_name = "MIME")]
        content_type: Option<String>,
    },
    /// Download a file, or a folder as a zip archive
    Download {
        path: String,
        /// output file; defaults to the suggested filename in the current directory
        #[arg(short, long, value_name = "FILE")]
        out: Option<PathBuf>,
    },
    /// Delete a file, or a folder with everything below it
    Rm { path: String },
    /// Move or rename a file or folder
    Mv { from: String, to: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity)
        .init();

    // Configs live under ~/.config/stash/<profile>.toml
    let dirs =
        ProjectDirs::from("", "", "stash").context("failed to determine config directory path")?;
    let config_file = dirs
        .config_dir()
        .join(&cli.profile)
        .with_extension("toml");

    cmd::run_command(config_file, cli.target, cli.cmd).await
}
