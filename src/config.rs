//! Client configuration, read from a JSON file.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use log::info;
use serde::Deserialize;

use crate::error::ConfigError;
use crate::profile::DEFAULT_PORT;
use crate::store::JsonFileStore;
use crate::transport::{Connector, SuppaConnector};

/// Overrides `store_path` when set.
pub const STORE_PATH_ENV: &str = "FTP_CLIENT_STORE";

const STORE_DIR: &str = "ftp-client";
const STORE_FILE: &str = "connections.json";

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    /// Location of the connection store. Defaults to
    /// `<config dir>/ftp-client/connections.json`.
    pub store_path: Option<PathBuf>,
    pub default_port: u16,
    pub default_passive_mode: bool,
    /// TCP connect timeout. `None` leaves it to the OS.
    pub connect_timeout_secs: Option<u64>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            store_path: None,
            default_port: DEFAULT_PORT,
            default_passive_mode: true,
            connect_timeout_secs: None,
        }
    }
}

impl ClientConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config: ClientConfig = serde_json::from_str(&json)?;
        info!("🔧 Config loaded from {}", path.display());
        Ok(config)
    }

    /// Environment override, then `store_path`, then the platform config dir.
    pub fn store_location(&self) -> PathBuf {
        if let Ok(from_env) = std::env::var(STORE_PATH_ENV) {
            if !from_env.is_empty() {
                return PathBuf::from(from_env);
            }
        }
        if let Some(path) = &self.store_path {
            return path.clone();
        }
        dirs::config_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(std::env::temp_dir)
            .join(STORE_DIR)
            .join(STORE_FILE)
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_secs.map(Duration::from_secs)
    }

    pub fn connector(&self) -> Arc<dyn Connector> {
        match self.connect_timeout() {
            Some(timeout) => Arc::new(SuppaConnector::with_timeout(timeout)),
            None => Arc::new(SuppaConnector::new()),
        }
    }

    pub fn store(&self) -> JsonFileStore {
        JsonFileStore::new(self.store_location())
    }
}
