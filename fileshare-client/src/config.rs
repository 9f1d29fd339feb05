//! Client configuration

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Base URL of the backend API
    pub api_base_url: String,

    /// Per-request timeout
    pub request_timeout_secs: u64,

    /// Rows per dashboard page
    pub page_size: u32,

    /// Inactivity delay before typed search text joins the query
    pub search_debounce_ms: u64,

    /// SQLite file holding the persisted token and preferences
    pub store_path: PathBuf,

    /// Directory downloaded files are saved into
    pub download_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:5000".to_string(),
            request_timeout_secs: 30,
            page_size: 10,
            search_debounce_ms: 300,
            store_path: PathBuf::from("fileshare.db"),
            download_dir: PathBuf::from("downloads"),
        }
    }
}

impl Config {
    /// Create config from environment variables
    ///
    /// Every variable is optional and falls back to the default:
    /// - FILESHARE_API_URL
    /// - FILESHARE_TIMEOUT_SECS
    /// - FILESHARE_PAGE_SIZE
    /// - FILESHARE_SEARCH_DEBOUNCE_MS
    /// - FILESHARE_STORE
    /// - FILESHARE_DOWNLOAD_DIR
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|s| !s.trim().is_empty());
        let defaults = Self::default();

        Self {
            api_base_url: get("FILESHARE_API_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_base_url),
            request_timeout_secs: get("FILESHARE_TIMEOUT_SECS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.request_timeout_secs),
            page_size: get("FILESHARE_PAGE_SIZE")
                .and_then(|s| s.parse().ok())
                .filter(|&n| n > 0)
                .unwrap_or(defaults.page_size),
            search_debounce_ms: get("FILESHARE_SEARCH_DEBOUNCE_MS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.search_debounce_ms),
            store_path: get("FILESHARE_STORE")
                .map(PathBuf::from)
                .unwrap_or(defaults.store_path),
            download_dir: get("FILESHARE_DOWNLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.download_dir),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }
}
