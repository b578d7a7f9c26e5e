//! Configuration loaded from `.env` / environment, with an optional
//! `vigil.toml` override file for installs that cannot set env vars.
//!
//! | Env | Default | Description |
//! |-----|---------|-------------|
//! | VIGIL_BACKEND_URL | http://127.0.0.1:3000 | Scoring backend base URL (derives the four endpoints). |
//! | VIGIL_BRIDGE_URL | http://127.0.0.1:4517 | Local browser bridge base URL. |
//! | VIGIL_STORAGE_PATH | ./data/vigil_vault | Sled path for the device identifier. |
//! | VIGIL_STARTUP_DELAY_SECS | 5 | Delay between detection and the first timer period. |
//! | VIGIL_CAPTURE_PERIOD_SECS | 15 | Capture tick period. |
//! | VIGIL_TAB_POLL_SECS | 3 | Bridge tab-list poll period. |

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{VigilError, VigilResult};

const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:3000";
const DEFAULT_BRIDGE_URL: &str = "http://127.0.0.1:4517";
const DEFAULT_STORAGE_PATH: &str = "./data/vigil_vault";
const DEFAULT_STARTUP_DELAY_SECS: u64 = 5;
const DEFAULT_CAPTURE_PERIOD_SECS: u64 = 15;
const DEFAULT_TAB_POLL_SECS: u64 = 3;
const DEFAULT_CONFIG_PATH: &str = "vigil.toml";

/// Runtime configuration for the watcher and dashboard clients.
#[derive(Debug, Clone)]
pub struct VigilConfig {
    pub upload_endpoint: String,
    pub query_endpoint: String,
    pub history_endpoint: String,
    pub health_endpoint: String,
    pub bridge_url: String,
    pub storage_path: String,
    pub startup_delay: Duration,
    pub capture_period: Duration,
    pub tab_poll_period: Duration,
}

impl VigilConfig {
    /// Environment first, then `vigil.toml` overrides when the file exists.
    pub fn load() -> Self {
        let mut config = Self::from_env();
        let path = env_string("VIGIL_CONFIG_PATH", DEFAULT_CONFIG_PATH);
        match FileConfig::load_from_path(Path::new(&path)) {
            Ok(file) => config.apply(file),
            Err(e) => tracing::warn!(path = %path, error = %e, "ignoring unreadable config file"),
        }
        config
    }

    /// Load settings from environment. Unset or invalid => defaults.
    pub fn from_env() -> Self {
        let backend = env_string("VIGIL_BACKEND_URL", DEFAULT_BACKEND_URL);
        let backend = backend.trim_end_matches('/');
        Self {
            upload_endpoint: env_string("VIGIL_UPLOAD_ENDPOINT", &format!("{}/api/images", backend)),
            query_endpoint: env_string("VIGIL_QUERY_ENDPOINT", &format!("{}/api/attention", backend)),
            history_endpoint: env_string(
                "VIGIL_HISTORY_ENDPOINT",
                &format!("{}/api/attention-history", backend),
            ),
            health_endpoint: env_string("VIGIL_HEALTH_ENDPOINT", &format!("{}/api/health", backend)),
            bridge_url: env_string("VIGIL_BRIDGE_URL", DEFAULT_BRIDGE_URL),
            storage_path: env_string("VIGIL_STORAGE_PATH", DEFAULT_STORAGE_PATH),
            startup_delay: Duration::from_secs(env_u64(
                "VIGIL_STARTUP_DELAY_SECS",
                DEFAULT_STARTUP_DELAY_SECS,
            )),
            capture_period: Duration::from_secs(
                env_u64("VIGIL_CAPTURE_PERIOD_SECS", DEFAULT_CAPTURE_PERIOD_SECS).max(1),
            ),
            tab_poll_period: Duration::from_secs(
                env_u64("VIGIL_TAB_POLL_SECS", DEFAULT_TAB_POLL_SECS).max(1),
            ),
        }
    }

    /// Rebase the backend endpoints onto a new base URL.
    pub fn set_backend_url(&mut self, backend: &str) {
        let backend = backend.trim_end_matches('/');
        self.upload_endpoint = format!("{}/api/images", backend);
        self.query_endpoint = format!("{}/api/attention", backend);
        self.history_endpoint = format!("{}/api/attention-history", backend);
        self.health_endpoint = format!("{}/api/health", backend);
    }

    fn apply(&mut self, file: FileConfig) {
        if let Some(backend) = file.backend_url.as_deref() {
            self.set_backend_url(backend);
        }
        if let Some(bridge) = file.bridge_url {
            self.bridge_url = bridge;
        }
        if let Some(storage) = file.storage_path {
            self.storage_path = storage;
        }
    }
}

/// Optional `vigil.toml` contents.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub backend_url: Option<String>,
    #[serde(default)]
    pub bridge_url: Option<String>,
    #[serde(default)]
    pub storage_path: Option<String>,
}

impl FileConfig {
    /// Missing file is not an error; a malformed file is.
    pub fn load_from_path(path: &Path) -> VigilResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| VigilError::Config(e.to_string()))
    }
}

fn env_string(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_u64(name: &str, default: u64) -> u64 {
    match std::env::var(name) {
        Ok(v) => v.trim().parse().unwrap_or(default),
        Err(_) => default,
    }
}
