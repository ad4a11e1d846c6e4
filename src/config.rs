//! Configuration persistence for the EduBridge core.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

use crate::api::ApiConfig;
use crate::storage::FileStore;

pub const ENV_API_URL: &str = "EDUBRIDGE_API_URL";
pub const ENV_USE_MOCK_DATA: &str = "EDUBRIDGE_USE_MOCK_DATA";
pub const ENV_ENABLE_BACKEND_CHECK: &str = "EDUBRIDGE_ENABLE_BACKEND_CHECK";

/// Application configuration that persists between sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Backend base URL.
    pub api_base_url: String,
    /// Serve mock data without touching the network.
    pub use_mock_data: bool,
    /// Probe `/health` before real calls.
    pub enable_backend_check: bool,
    pub request_timeout_secs: u64,
    pub health_timeout_secs: u64,
    /// Where the local store keeps its files.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    /// Hard byte limit for the local store, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quota_bytes: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000".to_string(),
            use_mock_data: true,
            enable_backend_check: false,
            request_timeout_secs: 5,
            health_timeout_secs: 2,
            data_dir: None,
            quota_bytes: None,
        }
    }
}

impl Config {
    /// Get the default config file path.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("edubridge")
            .join("config.toml")
    }

    /// Load config from `path`, falling back to defaults with a warning when
    /// the file cannot be read or parsed.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load_from(path).unwrap_or_else(|e| {
            warn!(error = %format!("{:#}", e), path = ?path, "ignoring unreadable config file");
            Self::default()
        })
    }

    /// Load config from disk, returning default if file doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| "Failed to parse config file")?;

        Ok(config)
    }

    /// Apply `EDUBRIDGE_*` variables looked up through `lookup`.
    ///
    /// Mock mode stays on unless its variable is exactly `false`; the health
    /// check only turns on for exactly `true`.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_API_URL).filter(|u| !u.is_empty()) {
            self.api_base_url = url;
        }
        if let Some(flag) = lookup(ENV_USE_MOCK_DATA) {
            self.use_mock_data = flag != "false";
        }
        if let Some(flag) = lookup(ENV_ENABLE_BACKEND_CHECK) {
            self.enable_backend_check = flag == "true";
        }
    }

    /// Save config to disk.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self)
            .with_context(|| "Failed to serialize config")?;

        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {:?}", path))?;

        Ok(())
    }

    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(FileStore::default_path)
    }

    pub fn api_config(&self) -> ApiConfig {
        ApiConfig {
            base_url: self.api_base_url.clone(),
            use_mock_data: self.use_mock_data,
            enable_backend_check: self.enable_backend_check,
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            health_timeout: Duration::from_secs(self.health_timeout_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn missing_file_gives_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = Config::load_from(&tmp.path().join("config.toml")).unwrap();
        assert_eq!(config, Config::default());
        assert!(config.use_mock_data);
        assert!(!config.enable_backend_check);
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(&path, "use_mock_data = \"sometimes\"\n[[[").unwrap();

        assert!(Config::load_from(&path).is_err());
        assert_eq!(Config::load_or_default(&path), Config::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(&path, "api_base_url = \"http://school.local:9000\"\nuse_mock_data = false\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.api_base_url, "http://school.local:9000");
        assert!(!config.use_mock_data);
        assert_eq!(config.request_timeout_secs, 5);
    }

    #[test]
    fn save_then_load() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("config.toml");
        let config = Config {
            quota_bytes: Some(1024),
            ..Default::default()
        };
        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn environment_overrides_flags() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_API_URL, "http://backend:8000"),
            (ENV_USE_MOCK_DATA, "no"),
            (ENV_ENABLE_BACKEND_CHECK, "TRUE"),
        ]);
        let mut config = Config::default();
        config.apply_overrides(|name| env.get(name).map(|v| v.to_string()));

        assert_eq!(config.api_base_url, "http://backend:8000");
        // Only the literal "false" disables mock mode.
        assert!(config.use_mock_data);
        assert!(!config.enable_backend_check);

        config.apply_overrides(|name| match name {
            ENV_USE_MOCK_DATA => Some("false".to_string()),
            ENV_ENABLE_BACKEND_CHECK => Some("true".to_string()),
            _ => None,
        });
        assert!(!config.use_mock_data);
        assert!(config.enable_backend_check);
    }

    #[test]
    fn api_config_carries_timeouts() {
        let api = Config::default().api_config();
        assert_eq!(api.request_timeout, Duration::from_secs(5));
        assert_eq!(api.health_timeout, Duration::from_secs(2));
    }
}
