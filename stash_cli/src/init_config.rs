use std::{fs, io::Write, path::Path};

use anyhow::Context;
use clap::Subcommand;
use toml_edit::{DocumentMut, Item, Table};
use tracing::info;

#[derive(Subcommand)]
pub enum CmdConfig {
    /// Creates the config file if it doesn't exist and adds a `default`
    /// store pointing at a local MinIO
    Init,
}

impl CmdConfig {
    pub fn run(self, config_file: &Path) -> anyhow::Result<()> {
        let mut doc = if config_file.exists() {
            fs::read_to_string(config_file)?
        } else {
            if let Some(parent) = config_file.parent() {
                fs::create_dir_all(parent)?;
            }
            "".to_owned()
        }
        .parse::<DocumentMut>()
        .context("could not parse config file")?;

        match self {
            Self::Init => {
                if !insert_default_store(&mut doc)? {
                    info!("store \"default\" already configured, leaving it untouched");
                }
            }
        }

        info!("writing to config file {config_file:?}");
        write_atomically(config_file, &doc.to_string())
    }
}

/// Adds `[store.default]` unless a store of that name exists.
fn insert_default_store(doc: &mut DocumentMut) -> anyhow::Result<bool> {
    let stores = doc
        .entry("store")
        .or_insert(Item::Table(Table::new()))
        .as_table_mut()
        .context("`store` in config file is not a table")?;
    if stores.contains_key("default") {
        return Ok(false);
    }

    let mut default_store = Table::new();
    default_store.insert("type", "s3".into());
    default_store.insert("endpoint", "http://localhost:9000".into());
    default_store.insert("region", "".into());
    default_store.insert("bucket_name", "user-files".into());
    default_store.insert("access_key", "minioadmin".into());
    default_store.insert("secret_key", "minioadmin".into());
    default_store.insert("create_bucket", true.into());
    stores.insert("default", default_store.into());
    Ok(true)
}

fn write_atomically(path: &Path, contents: &str) -> anyhow::Result<()> {
    let tmp_path = path.with_extension("tmp");
    let mut tmp = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&tmp_path)?;
    tmp.write_all(contents.as_bytes())?;
    tmp.sync_all()?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{StashConfig, StoreConfig};

    #[test]
    fn init_creates_loadable_config() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("nested").join("local.toml");

        CmdConfig::Init.run(&file).unwrap();

        let config = StashConfig::load(&file).unwrap();
        let StoreConfig::S3(s3) = config.store("default").unwrap() else {
            panic!("expected an s3 store");
        };
        assert_eq!(s3.endpoint, "http://localhost:9000");
        assert!(s3.create_bucket);
        assert!(!file.with_extension("tmp").exists());
    }

    #[test]
    fn init_keeps_existing_edits() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("local.toml");
        fs::write(
            &file,
            "# my stores\n[store.default]\ntype = \"memory\"\n\n[store.other]\ntype = \"memory\"\n",
        )
        .unwrap();

        CmdConfig::Init.run(&file).unwrap();

        let written = fs::read_to_string(&file).unwrap();
        assert!(written.starts_with("# my stores"));
        let config = StashConfig::load(&file).unwrap();
        assert_eq!(config.store("default").unwrap(), StoreConfig::Memory);
        assert_eq!(config.store.len(), 2);
    }
}
