use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use serde::Deserialize;

/// Application configuration loaded from TOML config file.
/// Every field has a default, so the config file is optional.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Listings scraper settings.
    pub scraper: ScraperConfig,
    /// Where scrape snapshots are written (overrides XDG default).
    pub snapshot_dir: Option<PathBuf>,
    /// Streaming provider API settings.
    pub provider: ProviderConfig,
}

/// Listings site scraping configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    /// Listing page URL; the page number is appended as `?page=N`.
    pub base_url: String,
    /// Number of pages to scrape, starting from page 1.
    pub pages: u32,
    /// Per-page load timeout in seconds.
    pub page_timeout_secs: u64,
    /// Delay between page loads in milliseconds.
    pub page_delay_ms: u64,
    pub user_agent: String,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.ohmyrockness.com/shows/just-announced".to_string(),
            pages: 5,
            page_timeout_secs: 30,
            page_delay_ms: 500,
            user_agent: format!("{}/{}", crate::APP_NAME, env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ScraperConfig {
    pub fn page_timeout(&self) -> Duration {
        Duration::from_secs(self.page_timeout_secs)
    }

    /// URL of listing page `page` (1-based).
    pub fn page_url(&self, page: u32) -> String {
        let sep = if self.base_url.contains('?') { '&' } else { '?' };
        format!("{}{sep}page={page}", self.base_url)
    }
}

/// Streaming provider API configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub api_base: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.spotify.com/v1".to_string(),
        }
    }
}

impl AppConfig {
    /// Load config from `~/.config/gigmatch/config.toml`.
    /// Returns default config if file doesn't exist.
    /// Logs a warning if the file exists but can't be parsed.
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) if path.exists() => match std::fs::read_to_string(&path) {
                Ok(contents) => match Self::from_toml(&contents) {
                    Ok(config) => {
                        log::info!("Loaded config from {}", path.display());
                        config
                    }
                    Err(e) => {
                        log::warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                        Self::default()
                    }
                },
                Err(e) => {
                    log::warn!("Failed to read {}: {}. Using defaults.", path.display(), e);
                    Self::default()
                }
            },
            _ => {
                log::debug!("No config file found, using defaults");
                Self::default()
            }
        }
    }

    pub fn from_toml(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Resolve snapshot directory: config > XDG data dir.
    pub fn resolve_snapshot_dir(&self) -> PathBuf {
        self.snapshot_dir.clone().unwrap_or_else(default_snapshot_dir)
    }

    /// Get the config file path.
    fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", crate::APP_NAME)
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }
}

/// Resolve the default snapshot directory using XDG data directory.
pub fn default_snapshot_dir() -> PathBuf {
    if let Some(dirs) = ProjectDirs::from("", "", crate::APP_NAME) {
        dirs.data_dir().join("snapshots")
    } else {
        // Fallback: current directory
        PathBuf::from("snapshots")
    }
}
