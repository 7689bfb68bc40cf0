//! Cache configuration management.
//!
//! Holds the namespace, the storage directory and the default TTL preset.
//! Configuration is stored at `~/.config/nely/config.json`; the
//! `NELY_CACHE_DIR` and `NELY_CACHE_NAMESPACE` environment variables take
//! precedence over the file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::cache::{Cache, TtlPreset, DEFAULT_NAMESPACE};
use crate::store::FileStore;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "nely";

/// Config file name
const CONFIG_FILE: &str = "config.json";

const ENV_CACHE_DIR: &str = "NELY_CACHE_DIR";
const ENV_NAMESPACE: &str = "NELY_CACHE_NAMESPACE";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
    #[serde(default)]
    pub default_ttl: Option<TtlPreset>,
}

impl Config {
    /// Load from the standard location, then apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Missing file means defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Apply overrides from a variable lookup (normally the process environment).
    /// Empty values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(dir) = lookup(ENV_CACHE_DIR).filter(|v| !v.is_empty()) {
            self.cache_dir = Some(PathBuf::from(dir));
        }
        if let Some(namespace) = lookup(ENV_NAMESPACE).filter(|v| !v.is_empty()) {
            self.namespace = Some(namespace);
        }
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.cache_dir {
            return Ok(dir.clone());
        }
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    pub fn namespace(&self) -> &str {
        self.namespace.as_deref().unwrap_or(DEFAULT_NAMESPACE)
    }

    pub fn default_ttl(&self) -> TtlPreset {
        self.default_ttl.unwrap_or_default()
    }

    /// Open a file-backed cache in the configured directory and namespace.
    pub fn open_cache(&self) -> Result<Cache<FileStore>> {
        let dir = self.cache_dir()?;
        let store = FileStore::new(&dir)
            .with_context(|| format!("Failed to open cache directory: {}", dir.display()))?;
        Ok(Cache::with_namespace(store, self.namespace()))
    }
}
