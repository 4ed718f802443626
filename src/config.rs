//! Configuration management for the k9 sync client

use anyhow::{Context, Result};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const BASE_URL_ENV: &str = "K9_BASE_URL";
const API_TOKEN_ENV: &str = "K9_API_TOKEN";
const EVENTS_PATH: &str = "ws/events";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Control server connection
    #[serde(default)]
    pub server: ServerConfig,

    /// Event stream reconnection policy
    #[serde(default)]
    pub stream: StreamConfig,

    /// Camera stream URL resolution
    #[serde(default)]
    pub camera: CameraConfig,

    #[serde(default)]
    pub session: SessionConfig,

    /// Path to config file (not serialized)
    #[serde(skip)]
    config_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Base URL of the control server (e.g. "http://pidog.local")
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Value sent as `x-api-key` when the server requires a token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,

    /// Event stream URL; derived from `base_url` when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub events_url: Option<String>,

    /// Timeout for request/response calls (ms)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// First reconnect delay (ms)
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,

    /// Growth factor applied after each failed attempt
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Upper bound on the reconnect delay (ms)
    #[serde(default = "default_max_backoff")]
    pub max_backoff_ms: u64,

    /// Inbound envelopes buffered between the connection and the dispatcher
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CameraConfig {
    /// Page the stream URL is resolved against; defaults to the server base URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Session ID for log correlation (auto-generated if not set)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

// Default value functions
fn default_base_url() -> String {
    "http://localhost".to_string()
}

fn default_request_timeout() -> u64 {
    10_000
}

fn default_initial_backoff() -> u64 {
    1_000
}

fn default_backoff_multiplier() -> f64 {
    1.8
}

fn default_max_backoff() -> u64 {
    10_000
}

fn default_channel_capacity() -> usize {
    256
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_token: None,
            events_url: None,
            request_timeout_ms: default_request_timeout(),
        }
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            initial_backoff_ms: default_initial_backoff(),
            backoff_multiplier: default_backoff_multiplier(),
            max_backoff_ms: default_max_backoff(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            stream: StreamConfig::default(),
            camera: CameraConfig::default(),
            session: SessionConfig::default(),
            config_path: None,
        }
    }
}

impl Config {
    /// Load configuration from the given path, or the default location.
    ///
    /// A missing file is created with defaults. Environment overrides are
    /// applied after the file is read.
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(path) => path,
            None => Self::default_config_path()?,
        };

        let mut config = if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

            toml::from_str::<Config>(&contents)
                .with_context(|| format!("Failed to parse config file: {:?}", config_path))?
        } else {
            let mut config = Config::default();
            config.config_path = Some(config_path.clone());
            config.save()?;
            config
        };

        config.config_path = Some(config_path);
        config.apply_env_overrides();
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let config_path = match &self.config_path {
            Some(path) => path.clone(),
            None => Self::default_config_path()?,
        };

        // Ensure parent directory exists
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(&config_path, contents)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;

        Ok(())
    }

    /// Path the config was loaded from
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// Get default config path
    fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = directories::ProjectDirs::from("dev", "k9", "dashboard")
            .context("Failed to determine config directory")?;

        Ok(proj_dirs.config_dir().join("config.toml"))
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(base_url) = std::env::var(BASE_URL_ENV) {
            if !base_url.trim().is_empty() {
                self.server.base_url = base_url;
            }
        }
        if let Ok(token) = std::env::var(API_TOKEN_ENV) {
            self.server.api_token = Some(token).filter(|t| !t.is_empty());
        }
    }

    /// Get or generate session ID
    pub fn session_id(&self) -> String {
        self.session
            .session_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
    }

    /// Server base URL, normalized to end with '/' so endpoint paths join
    /// underneath any path prefix
    pub fn base_url(&self) -> Result<Url> {
        let mut url = Url::parse(self.server.base_url.trim())
            .with_context(|| format!("Invalid server base URL: {}", self.server.base_url))?;
        if !matches!(url.scheme(), "http" | "https") {
            anyhow::bail!("Server base URL must be http or https: {}", url);
        }
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        url.set_query(None);
        url.set_fragment(None);
        Ok(url)
    }

    /// Event stream URL, from `events_url` or derived from the base URL
    pub fn events_url(&self) -> Result<Url> {
        if let Some(events_url) = &self.server.events_url {
            return Url::parse(events_url.trim())
                .with_context(|| format!("Invalid events URL: {}", events_url));
        }

        let mut url = self
            .base_url()?
            .join(EVENTS_PATH)
            .context("Failed to derive events URL")?;
        let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
        url.set_scheme(scheme)
            .map_err(|_| anyhow::anyhow!("Cannot use {} scheme for {}", scheme, url))?;
        Ok(url)
    }

    /// Page the camera stream URL is resolved against
    pub fn page_url(&self) -> Result<Url> {
        match &self.camera.page_url {
            Some(page_url) => Url::parse(page_url.trim())
                .with_context(|| format!("Invalid camera page URL: {}", page_url)),
            None => self.base_url(),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.server.request_timeout_ms)
    }
}
