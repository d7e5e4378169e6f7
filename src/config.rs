use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::api::ApiConfig;
use crate::error::{ClientError, ClientResult};
use crate::live::LiveConfig;
use crate::metadata::{DEFAULT_BACKEND_URL, DEFAULT_TOPIC, DEFAULT_WS_URL, PKG_NAME};
use crate::store::GroupingSource;
use crate::view::BoardOptions;

/// Client settings, stored as `settings.json` under the user config dir.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub backend_url: String,
    pub ws_url: String,
    pub topic: String,
    pub enable_live_updates: bool,
    pub grouping_source: GroupingSource,
    pub request_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            ws_url: DEFAULT_WS_URL.to_string(),
            topic: DEFAULT_TOPIC.to_string(),
            enable_live_updates: true,
            grouping_source: GroupingSource::Embedded,
            request_timeout_secs: 10,
        }
    }
}

impl Settings {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(PKG_NAME).join("settings.json"))
    }

    /// Read settings from `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> ClientResult<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "no settings file, using defaults");
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Write through a temporary file and an atomic rename.
    pub fn save(&self, path: &Path) -> ClientResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let temp = path.with_extension("tmp");
        let mut f = File::create(&temp)?;
        let content = serde_json::to_string_pretty(self)?;
        f.write_all(content.as_bytes())?;
        f.sync_all()?;
        fs::rename(temp, path)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), String> {
        let host = self
            .backend_url
            .trim()
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .trim_end_matches('/');
        if host.is_empty() {
            return Err("backendUrl cannot be empty".to_string());
        }
        if self.enable_live_updates {
            let ws = self.ws_url.trim();
            if !(ws.starts_with("ws://") || ws.starts_with("wss://")) {
                return Err(format!(
                    "Invalid wsUrl '{}': expected a ws:// or wss:// URL",
                    self.ws_url
                ));
            }
            if !self.topic.starts_with('/') {
                return Err(format!("Invalid topic '{}': must start with '/'", self.topic));
            }
        }
        if self.request_timeout_secs == 0 {
            return Err("requestTimeoutSecs must be at least 1".to_string());
        }
        Ok(())
    }

    pub fn validated(self) -> ClientResult<Self> {
        self.validate().map_err(ClientError::Config)?;
        Ok(self)
    }

    pub fn api_config(&self) -> ApiConfig {
        ApiConfig {
            base_url: self.backend_url.clone(),
            timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }

    pub fn live_config(&self) -> LiveConfig {
        LiveConfig {
            url: self.ws_url.trim().to_string(),
            topic: self.topic.clone(),
        }
    }

    pub fn board_options(&self) -> BoardOptions {
        BoardOptions {
            enable_live_updates: self.enable_live_updates,
            grouping_source: self.grouping_source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let settings = Settings::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(settings, Settings::default());
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn save_then_load_keeps_values() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nodelist").join("settings.json");
        let settings = Settings {
            backend_url: "10.0.0.2:8080".into(),
            grouping_source: GroupingSource::SeparateFetch,
            enable_live_updates: false,
            ..Settings::default()
        };
        settings.save(&path).unwrap();

        assert_eq!(Settings::load(&path).unwrap(), settings);
        assert!(!path.with_extension("tmp").exists());
        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"groupingSource\": \"separate-fetch\""));
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("partial.json");
        fs::write(&path, r#"{ "topic": "/topic/other" }"#).unwrap();

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.topic, "/topic/other");
        assert_eq!(settings.request_timeout_secs, 10);
    }

    #[test]
    fn validation_rejects_bad_values() {
        let bad_ws = Settings {
            ws_url: "http://localhost:8080/websocket".into(),
            ..Settings::default()
        };
        assert!(bad_ws.validate().is_err());

        let bad_ws_without_live = Settings {
            enable_live_updates: false,
            ..bad_ws
        };
        assert!(bad_ws_without_live.validate().is_ok());

        let bad_topic = Settings {
            topic: "topic/tasks".into(),
            ..Settings::default()
        };
        assert!(bad_topic.validate().is_err());

        let no_timeout = Settings {
            request_timeout_secs: 0,
            ..Settings::default()
        };
        assert!(matches!(no_timeout.validated(), Err(ClientError::Config(_))));

        let empty_backend = Settings {
            backend_url: "  ".into(),
            ..Settings::default()
        };
        assert!(empty_backend.validate().is_err());
    }
}
