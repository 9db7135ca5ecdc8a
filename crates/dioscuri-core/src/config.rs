//! Proxy configuration
//!
//! Defaults, overridden by `<data_dir>/config.toml`, overridden by the
//! command line.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use dioscuri_gemini::ClientOptions;

use crate::Result;

pub const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Holds the database, themes and static files
    pub data_dir: PathBuf,
    /// Address the HTTP proxy listens on
    pub listen: SocketAddr,
    /// Theme directory name under `themes/`
    pub theme: String,
    pub connect_timeout_secs: u64,
    pub read_timeout_secs: u64,
    /// Largest Gemini response body that will be proxied
    pub max_body_bytes: usize,
}

impl Config {
    pub fn new(data_dir: PathBuf) -> Self {
        let client = ClientOptions::default();
        Self {
            data_dir,
            listen: SocketAddr::from(([127, 0, 0, 1], 1965)),
            theme: "modern".to_string(),
            connect_timeout_secs: client.connect_timeout.as_secs(),
            read_timeout_secs: client.read_timeout.as_secs(),
            max_body_bytes: client.max_body_bytes,
        }
    }

    /// `~/.dioscuri`, or `.dioscuri` when there is no home directory
    pub fn default_data_dir() -> PathBuf {
        dirs::home_dir()
            .map(|home| home.join(".dioscuri"))
            .unwrap_or_else(|| PathBuf::from(".dioscuri"))
    }

    /// Load `config.toml` from `data_dir` if present, else use defaults.
    /// The data directory itself always comes from the argument.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(CONFIG_FILE);
        let mut config = if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            let config: Config = toml::from_str(&raw)?;
            tracing::info!(path = %path.display(), "Loaded config file");
            config
        } else {
            Config::default()
        };
        config.data_dir = data_dir.to_path_buf();
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.theme.is_empty() || self.theme.contains(['/', '\\']) || self.theme == ".." {
            return Err(crate::CoreError::Config(format!(
                "theme must be a plain directory name, got {:?}",
                self.theme
            )));
        }
        if self.max_body_bytes == 0 {
            return Err(crate::CoreError::Config(
                "max_body_bytes must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("dioscuri.db")
    }

    pub fn theme_dir(&self) -> PathBuf {
        self.data_dir.join("themes").join(&self.theme)
    }

    pub fn static_dir(&self) -> PathBuf {
        self.data_dir.join("static")
    }

    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            read_timeout: Duration::from_secs(self.read_timeout_secs),
            max_body_bytes: self.max_body_bytes,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(Self::default_data_dir())
    }
}
