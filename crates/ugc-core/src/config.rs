//! Dashboard client configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use ugc_session::{SessionConfig, CURRENT_USER_PATH};

use crate::error::CoreError;
use crate::Result;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Backend base URL; endpoint paths are joined onto it
    pub api_base_url: String,
    /// Path to the database file holding the persisted tokens
    pub database_path: PathBuf,
    pub current_user_path: String,
    /// Whole-request timeout for every HTTP call
    pub request_timeout: Duration,
    /// Tighter bound for login, current-user and refresh calls
    pub auth_timeout: Duration,
}

impl Config {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            api_base_url: DEFAULT_API_URL.to_string(),
            database_path: data_dir.join("ugc-dashboard.db"),
            current_user_path: CURRENT_USER_PATH.to_string(),
            request_timeout: Duration::from_secs(30),
            auth_timeout: Duration::from_secs(15),
        }
    }

    pub fn data_dir() -> PathBuf {
        dirs::data_local_dir()
            .map(|d| d.join("UGC Dashboard"))
            .unwrap_or_else(|| PathBuf::from(".ugc-dashboard"))
    }

    /// Defaults overridden by `UGC_API_URL`, `UGC_DATABASE_PATH`,
    /// `UGC_REQUEST_TIMEOUT_SECS` and `UGC_AUTH_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self> {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(url) = lookup("UGC_API_URL") {
            self.api_base_url = url;
        }
        if let Some(path) = lookup("UGC_DATABASE_PATH") {
            self.database_path = PathBuf::from(path);
        }
        if let Some(secs) = lookup("UGC_REQUEST_TIMEOUT_SECS") {
            self.request_timeout = parse_secs("UGC_REQUEST_TIMEOUT_SECS", &secs)?;
        }
        if let Some(secs) = lookup("UGC_AUTH_TIMEOUT_SECS") {
            self.auth_timeout = parse_secs("UGC_AUTH_TIMEOUT_SECS", &secs)?;
        }

        if self.api_base_url.trim().is_empty() {
            return Err(CoreError::Config("API base URL is empty".to_string()));
        }

        Ok(self)
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            current_user_path: self.current_user_path.clone(),
            auth_timeout: self.auth_timeout,
            ..SessionConfig::default()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(Self::data_dir())
    }
}

fn parse_secs(key: &str, value: &str) -> Result<Duration> {
    match value.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(CoreError::Config(format!(
            "{key} must be a positive number of seconds, got {value:?}"
        ))),
    }
}

mod dirs {
    use std::path::PathBuf;

    pub fn data_local_dir() -> Option<PathBuf> {
        #[cfg(target_os = "windows")]
        {
            std::env::var("LOCALAPPDATA").ok().map(PathBuf::from)
        }
        #[cfg(target_os = "macos")]
        {
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join("Library/Application Support"))
        }
        #[cfg(target_os = "linux")]
        {
            std::env::var("XDG_DATA_HOME")
                .ok()
                .map(PathBuf::from)
                .or_else(|| {
                    std::env::var("HOME")
                        .ok()
                        .map(|h| PathBuf::from(h).join(".local/share"))
                })
        }
        #[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
        {
            None
        }
    }
}
