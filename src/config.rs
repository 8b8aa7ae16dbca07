use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::core::{CoreError, JsonFileStore};

pub const DATA_DIR_ENV: &str = "AITRAIT_DATA_DIR";

#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
}

impl Config {
    pub fn new(data_dir: Option<PathBuf>) -> Result<Self> {
        let from_env = || std::env::var_os(DATA_DIR_ENV).map(PathBuf::from);
        let data_dir = match data_dir.or_else(from_env) {
            Some(dir) => dir,
            None => dirs::config_dir()
                .ok_or_else(|| CoreError::Config("Could not find config directory".to_string()))?
                .join("aitrait"),
        };

        if data_dir.exists() && !data_dir.is_dir() {
            return Err(CoreError::Config(format!(
                "Data directory {} is not a directory",
                data_dir.display()
            ))
            .into());
        }

        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory {}", data_dir.display()))?;

        Ok(Config { data_dir })
    }

    pub fn store_file(&self) -> PathBuf {
        self.data_dir.join("store.json")
    }

    pub fn open_store(&self) -> Result<JsonFileStore> {
        let path = self.store_file();
        JsonFileStore::open(&path)
            .with_context(|| format!("Failed to open store {}", path.display()))
    }
}
