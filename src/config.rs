use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::app::{
    APP_ID, CONFIG_FILE_NAME, DEFAULT_DEPENDENCY_DIR, DEFAULT_HOST, DEFAULT_INSTALL_COMMAND,
    DEFAULT_PORT, DEFAULT_PROJECTS_FILE, DEFAULT_STATIC_DIR,
};
use crate::error::ConfigError;

/// Server configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerConfig {
    /// Interface to bind
    pub host: String,

    /// Listen port, overridden by `PORT`
    pub port: u16,

    /// Registry snapshot written by the project scanner
    pub projects_file: PathBuf,

    /// Directory the UI assets are served from
    pub static_dir: PathBuf,

    pub supervisor: SupervisorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SupervisorConfig {
    /// Folder inside a project whose presence means dependencies are installed
    pub dependency_dir: String,

    /// Command substituted when a run finds no dependency folder
    pub install_command: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            projects_file: PathBuf::from(DEFAULT_PROJECTS_FILE),
            static_dir: PathBuf::from(DEFAULT_STATIC_DIR),
            supervisor: SupervisorConfig::default(),
        }
    }
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            dependency_dir: DEFAULT_DEPENDENCY_DIR.to_string(),
            install_command: DEFAULT_INSTALL_COMMAND.to_string(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from the config file if present, then apply
    /// environment overrides
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match Self::get_config_path() {
            Some(path) if path.exists() => Self::from_file(&path)?,
            _ => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                warn!("Could not read config {:?}, using defaults: {}", path, e);
                return Ok(Self::default());
            }
        };
        let config = serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Applies `PORT`, `HOST`, `DEVRUNNER_PROJECTS` and `DEVRUNNER_STATIC_DIR`
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT") {
            self.port = port.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: "PORT",
                value: port.clone(),
            })?;
        }
        if let Some(host) = lookup("HOST") {
            self.host = host;
        }
        if let Some(projects) = lookup("DEVRUNNER_PROJECTS") {
            self.projects_file = PathBuf::from(projects);
        }
        if let Some(static_dir) = lookup("DEVRUNNER_STATIC_DIR") {
            self.static_dir = PathBuf::from(static_dir);
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|_| ConfigError::InvalidValue {
                key: "HOST",
                value: self.host.clone(),
            })
    }

    fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_ID).join(CONFIG_FILE_NAME))
    }
}
