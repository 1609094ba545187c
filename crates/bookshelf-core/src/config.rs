//! Application configuration management.
//!
//! This module handles loading and saving the application configuration,
//! which includes the API server, where the session is stored, download
//! retention and the last email used to log in.
//!
//! Configuration is stored at `~/.config/bookshelf/config.json`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::api::client::{DEFAULT_BASE_URL, REQUEST_TIMEOUT_SECS};
use crate::api::ApiClient;
use crate::blob::DEFAULT_RETENTION;
use crate::store::SessionStore;

/// Application name used for config/data directory paths
pub const APP_NAME: &str = "bookshelf";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Environment variable overriding `api_base_url`
pub const API_URL_ENV: &str = "BOOKSHELF_API_URL";

/// Where the session store keeps its entries
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Files under the data directory
    #[default]
    File,
    /// OS keychain
    Keyring,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub store_backend: StoreBackend,
    pub release_delay_secs: u64,
    pub request_timeout_secs: u64,
    pub last_email: Option<String>,
    /// Base URL from `BOOKSHELF_API_URL` or the command line; never saved
    #[serde(skip)]
    api_url_override: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_BASE_URL.to_string(),
            store_backend: StoreBackend::default(),
            release_delay_secs: DEFAULT_RETENTION.as_secs(),
            request_timeout_secs: REQUEST_TIMEOUT_SECS,
            last_email: None,
            api_url_override: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from a specific file, falling back to defaults if it does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", path.display()))
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

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var(API_URL_ENV) {
            self.override_api_url(url);
        }
    }

    /// Use `url` for this run only. Blank values are ignored.
    pub fn override_api_url(&mut self, url: impl Into<String>) {
        let url = url.into();
        if !url.trim().is_empty() {
            self.api_url_override = Some(url);
        }
    }

    /// Base URL in effect: the override if one is set, else `api_base_url`
    pub fn api_url(&self) -> &str {
        self.api_url_override
            .as_deref()
            .unwrap_or(&self.api_base_url)
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory for the file-backed session store
    pub fn data_dir(&self) -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }

    pub fn release_delay(&self) -> Duration {
        Duration::from_secs(self.release_delay_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Build the session store selected by `store_backend`
    pub fn session_store(&self) -> Result<SessionStore> {
        Ok(match self.store_backend {
            StoreBackend::File => SessionStore::file(self.data_dir()?.join("session")),
            StoreBackend::Keyring => SessionStore::keyring(APP_NAME),
        })
    }

    pub fn api_client(&self) -> Result<ApiClient> {
        ApiClient::with_timeout(self.api_url(), self.request_timeout())
            .context("Failed to build HTTP client")
    }
}
