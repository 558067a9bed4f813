use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{GalleryError, Result};
use crate::paths::GalleryPaths;
use crate::theme::Theme;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub account: AccountConfig,
    pub ui: UiConfig,
}

impl Config {
    pub fn load(paths: &GalleryPaths) -> Result<Self> {
        let path = paths.config_file();
        let content = std::fs::read_to_string(&path)
            .map_err(|e| GalleryError::Config(format!("failed to read {}: {e}", path.display())))?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn load_or_default(paths: &GalleryPaths) -> Self {
        Self::load(paths).unwrap_or_default()
    }

    pub fn save(&self, paths: &GalleryPaths) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| GalleryError::Config(format!("failed to serialize config: {e}")))?;
        let path = paths.config_file();
        std::fs::write(&path, content)
            .map_err(|e| GalleryError::Config(format!("failed to write {}: {e}", path.display())))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub base_url: Url,
    /// Where uploaded files are served, relative to `base_url`.
    pub uploads_path: String,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            uploads_path: "static/uploads/".into(),
            timeout_secs: 30,
            user_agent: "gallery/0.1".into(),
        }
    }
}

fn default_base_url() -> Url {
    Url::parse("http://127.0.0.1:5000/").expect("static url is valid")
}

impl ServerConfig {
    /// Base URL with a trailing slash, so relative joins append instead of replacing.
    pub fn base(&self) -> Url {
        let mut base = self.base_url.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        base
    }

    pub fn uploads_url(&self) -> Result<Url> {
        let mut path = self.uploads_path.trim_start_matches('/').to_string();
        if !path.is_empty() && !path.ends_with('/') {
            path.push('/');
        }
        Ok(self.base().join(&path)?)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountConfig {
    pub username: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub theme: Theme,
    pub notice_secs: u64,
    /// 0 recomputes the filter on every keystroke.
    pub search_debounce_ms: u64,
    /// Schedule a wake-up when a notice is due to disappear. One-shot front ends
    /// turn this off so they never wait on it.
    pub auto_dismiss: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            theme: Theme::Light,
            notice_secs: 3,
            search_debounce_ms: 150,
            auto_dismiss: true,
        }
    }
}

impl UiConfig {
    /// Never shorter than one second, so a notice is always seen.
    pub fn notice_ttl(&self) -> Duration {
        Duration::from_secs(self.notice_secs.max(1))
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }
}
