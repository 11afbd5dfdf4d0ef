use std::{collections::BTreeMap, path::Path};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use stash_core::Store;
use stash_fs::ObjectStore;
use stash_store_memory::MemoryStore;
use stash_store_s3::{S3Store, S3StoreConfig};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StashConfig {
    #[serde(default)]
    pub store: BTreeMap<String, StoreConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
#[serde(rename_all = "snake_case")]
pub enum StoreConfig {
    S3(S3StoreConfig),
    /// Process-local and empty on every start; useful for dry runs.
    Memory,
}

impl StashConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path).with_context(|| {
            format!("could not read config file {path:?}, run `stash config init` first")
        })?;
        toml::from_str(&content).with_context(|| format!("could not parse config file {path:?}"))
    }

    pub fn store(&self, name: &str) -> anyhow::Result<StoreConfig> {
        self.store
            .get(name)
            .cloned()
            .with_context(|| format!("store with name \"{name}\" not present in config"))
    }
}

pub async fn create_store(config: StoreConfig) -> anyhow::Result<ObjectStore> {
    let store: Box<dyn Store + 'static> = match config {
        StoreConfig::S3(config) => Box::new(S3Store::open(config).await?),
        StoreConfig::Memory => Box::new(MemoryStore::new()),
    };
    Ok(ObjectStore::new_boxed(store))
}
