use std::path::{Path, PathBuf};

use anyhow::Context;
use porter_core::upload::DEFAULT_CHUNK_SIZE;
use serde::Deserialize;
use uuid::Uuid;

/// Runtime configuration, loaded from a TOML file with environment
/// overrides for deployment-specific values.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    pub drive: DriveConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 7600,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory task log files are written to.
    pub logs_dir: PathBuf,
    /// Owner recorded on every task this instance creates.
    pub owner_id: Uuid,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            logs_dir: PathBuf::from("logs"),
            owner_id: Uuid::nil(),
        }
    }
}

/// Remote drive endpoint and upload tuning.
#[derive(Debug, Clone, Deserialize)]
pub struct DriveConfig {
    pub base_url: String,
    /// Access token; also the secret the proof code is derived from.
    pub access_token: String,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u64,
    /// Remote folder uploads land in unless a request names another.
    #[serde(default = "default_root_folder")]
    pub root_folder_id: String,
}

fn default_chunk_size() -> u64 {
    DEFAULT_CHUNK_SIZE
}

fn default_root_folder() -> String {
    "root".to_string()
}

impl Config {
    /// Read the TOML file at `path`, then apply environment overrides
    /// (`DATABASE_URL`, `DRIVE_ACCESS_TOKEN`).
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let mut config: Config = toml::from_str(&raw)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        config.apply_env();
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("DATABASE_URL") {
            self.database.url = Some(url);
        }
        if let Ok(token) = std::env::var("DRIVE_ACCESS_TOKEN") {
            self.drive.access_token = token;
        }
    }

    pub fn database_url(&self) -> anyhow::Result<&str> {
        self.database
            .url
            .as_deref()
            .context("no database URL configured; set [database].url or DATABASE_URL")
    }
}
