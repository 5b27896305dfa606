use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// HTTP transport settings shared by every catalog client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Connect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Whole-request timeout in seconds (covers included).
    pub timeout_secs: u64,
    /// User-Agent header sent with every request.
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 10,
            timeout_secs: 10,
            user_agent: concat!("mangashelf/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl HttpConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Base URLs of the catalog APIs. Overridable for mirrors and local testing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointsConfig {
    pub mangadex_api: String,
    pub mangadex_uploads: String,
    pub mangaupdates_api: String,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            mangadex_api: "https://api.mangadex.org".to_string(),
            mangadex_uploads: "https://uploads.mangadex.org".to_string(),
            mangaupdates_api: "https://api.mangaupdates.com/v1".to_string(),
        }
    }
}

/// Cover download pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoversConfig {
    /// Concurrent cover downloads per series (0 = unbounded).
    pub cover_concurrency: usize,
    /// Concurrent series being processed (0 = unbounded).
    pub entry_concurrency: usize,
    /// Minimum spacing between catalog searches in milliseconds (0 = no throttle).
    pub search_interval_ms: u64,
    /// Also download covers when the top search hit is not an exact title match.
    pub download_inexact_matches: bool,
}

impl Default for CoversConfig {
    fn default() -> Self {
        Self {
            cover_concurrency: 5,
            entry_concurrency: 0,
            search_interval_ms: 1000,
            download_inexact_matches: false,
        }
    }
}

/// Publisher lookup pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishersConfig {
    /// Minimum spacing between catalog searches in milliseconds (0 = no throttle).
    pub search_interval_ms: u64,
}

impl Default for PublishersConfig {
    fn default() -> Self {
        Self {
            search_interval_ms: 5000,
        }
    }
}

/// Global configuration loaded from `~/.config/mangashelf/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ShelfConfig {
    pub http: HttpConfig,
    pub endpoints: EndpointsConfig,
    pub covers: CoversConfig,
    pub publishers: PublishersConfig,
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("mangashelf")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<ShelfConfig> {
    load_or_init_at(&config_path()?)
}

/// Like [`load_or_init`] but for an explicit path.
pub fn load_or_init_at(path: &Path) -> Result<ShelfConfig> {
    if !path.exists() {
        let default_cfg = ShelfConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml).with_context(|| format!("write {}", path.display()))?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: ShelfConfig =
        toml::from_str(&data).with_context(|| format!("parse {}", path.display()))?;
    Ok(cfg)
}
