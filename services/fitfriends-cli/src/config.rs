//! Configuration types and loading
//!
//! Precedence: CLI flags > env vars > config file > defaults. A missing
//! config file is not an error; every setting has a default.

use std::path::{Path, PathBuf};
use std::time::Duration;

use fitfriends_auth::{DEFAULT_SERVER_URL, REQUEST_TIMEOUT, SERVER_URL_ENV};
use fitfriends_client::ClientConfig;
use interceptor::HeaderInjection;
use serde::Deserialize;

/// Env var naming the config file
pub const CONFIG_PATH_ENV: &str = "FITFRIENDS_CONFIG";

const DEFAULT_CONFIG_FILE: &str = "fitfriends.toml";

/// Root configuration
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub headers: Vec<HeaderInjection>,
}

/// API server settings
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

/// Token persistence settings
#[derive(Debug, Default, Deserialize)]
pub struct SessionConfig {
    /// Token file; defaults to `<data dir>/fitfriends/tokens.json`
    #[serde(default)]
    pub token_file: Option<PathBuf>,
    /// Refresh this many milliseconds before a token's `exp`
    #[serde(default)]
    pub expiry_grace_ms: u64,
}

fn default_url() -> String {
    DEFAULT_SERVER_URL.to_string()
}

fn default_timeout_ms() -> u64 {
    REQUEST_TIMEOUT.as_millis() as u64
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment variables.
    pub fn load(path: &Path) -> common::Result<Self> {
        let mut config: Config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str(&contents)?
        } else {
            Config::default()
        };

        if let Ok(url) = std::env::var(SERVER_URL_ENV) {
            if !url.is_empty() {
                config.server.url = url;
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Replace the server URL (from `--server`) and re-validate.
    pub fn with_server(mut self, url: Option<String>) -> common::Result<Self> {
        if let Some(url) = url {
            self.server.url = url;
            self.validate()?;
        }
        Ok(self)
    }

    fn validate(&self) -> common::Result<()> {
        if !self.server.url.starts_with("http://") && !self.server.url.starts_with("https://") {
            return Err(common::Error::Config(format!(
                "server url must start with http:// or https://, got: {}",
                self.server.url
            )));
        }

        if self.server.timeout_ms == 0 {
            return Err(common::Error::Config(
                "timeout_ms must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Resolve config file path from CLI arg or `FITFRIENDS_CONFIG`.
    pub fn resolve_path(cli_path: Option<&Path>) -> PathBuf {
        if let Some(p) = cli_path {
            return p.to_path_buf();
        }
        if let Ok(p) = std::env::var(CONFIG_PATH_ENV) {
            return PathBuf::from(p);
        }
        PathBuf::from(DEFAULT_CONFIG_FILE)
    }

    /// Token file from config, or the platform data directory.
    pub fn token_file(&self) -> PathBuf {
        if let Some(path) = &self.session.token_file {
            return path.clone();
        }
        match directories::BaseDirs::new() {
            Some(dirs) => dirs.data_dir().join("fitfriends").join("tokens.json"),
            None => PathBuf::from(".fitfriends").join("tokens.json"),
        }
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.server.url.clone(),
            timeout: Duration::from_millis(self.server.timeout_ms),
            expiry_grace: Duration::from_millis(self.session.expiry_grace_ms),
            headers: self.headers.clone(),
        }
    }
}
