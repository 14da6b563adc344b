use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::types::TrickType;

pub const CONFIG_FILE_NAME: &str = "skatelist.toml";

/// JSON resources the page is built from, relative to the web root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub videos: String,
    pub todo: String,
    /// When `grinds`/`other` are absent the grids are bucketed from `videos` alone.
    pub grinds: Option<String>,
    pub other: Option<String>,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            videos: "json/videos.json".into(),
            todo: "json/todo.json".into(),
            grinds: Some("json/grinds.json".into()),
            other: Some("json/other.json".into()),
        }
    }
}

/// Fallback artwork for tricks without a video, keyed by stance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultImages {
    pub by_type: BTreeMap<String, String>,
    pub unknown: String,
}

impl Default for DefaultImages {
    fn default() -> Self {
        let by_type = [
            ("NORMAL", "./images/normal.jpg"),
            ("NOLLIE", "./images/nollie.jpg"),
            ("FAKIE", "./images/fakie.jpg"),
            ("SWITCH", "./images/switch.jpg"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        Self { by_type, unknown: "./images/unknown.jpg".into() }
    }
}

impl DefaultImages {
    pub fn for_type(&self, t: Option<&TrickType>) -> &str {
        t.and_then(|t| self.by_type.get(t.as_str())).map(String::as_str).unwrap_or(&self.unknown)
    }

    pub fn all(&self) -> impl Iterator<Item = &str> {
        self.by_type.values().map(String::as_str).chain(std::iter::once(self.unknown.as_str()))
    }
}

/// UI timings, all in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timings {
    pub search_debounce_ms: u64,
    pub single_click_ms: u64,
    pub player_start_ms: u64,
    pub title_fade_ms: u64,
    pub overlay_animation_ms: u64,
    pub scroll_delay_ms: u64,
    pub highlight_ms: u64,
    pub banner_ms: u64,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            search_debounce_ms: 250,
            single_click_ms: 200,
            player_start_ms: 50,
            title_fade_ms: 150,
            overlay_animation_ms: 300,
            scroll_delay_ms: 150,
            highlight_ms: 3000,
            banner_ms: 5000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory holding index.html, json/, images/ and the scripts.
    pub root: PathBuf,
    pub environment: String,
    pub rate_limit_window_secs: u64,
    pub rate_limit_max: u32,
    pub compression_level: u32,
    pub compression_threshold: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 3000,
            root: PathBuf::from("."),
            environment: "development".into(),
            rate_limit_window_secs: 15 * 60,
            rate_limit_max: 1000,
            compression_level: 6,
            compression_threshold: 1024,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkateConfig {
    pub endpoints: Endpoints,
    pub youtube_base_url: String,
    pub carousel_featured_count: usize,
    pub default_images: DefaultImages,
    pub timings: Timings,
    pub server: ServerConfig,
}

impl Default for SkateConfig {
    fn default() -> Self {
        Self {
            endpoints: Endpoints::default(),
            youtube_base_url: "https://www.youtube.com/embed/".into(),
            carousel_featured_count: 5,
            default_images: DefaultImages::default(),
            timings: Timings::default(),
            server: ServerConfig::default(),
        }
    }
}

impl SkateConfig {
    /// Read the config file (explicit path, `./skatelist.toml`, or the platform
    /// config dir), then apply environment overrides.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut cfg = match explicit {
            Some(p) => Self::from_file(p)?,
            None => match default_config_path() {
                Some(p) => Self::from_file(&p)?,
                None => Self::default(),
            },
        };
        cfg.apply_env(|k| std::env::var(k).ok());
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file: {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("parsing config file: {}", path.display()))
    }

    /// Overrides take effect only when the variable parses.
    pub fn apply_env<F: Fn(&str) -> Option<String>>(&mut self, get: F) {
        let s = &mut self.server;
        s.port = get("PORT").and_then(|v| v.parse().ok()).unwrap_or(s.port);
        if let Some(host) = get("SKATELIST_HOST").filter(|v| !v.trim().is_empty()) { s.host = host; }
        if let Some(root) = get("SKATELIST_ROOT").filter(|v| !v.trim().is_empty()) { s.root = PathBuf::from(root); }
        if let Some(env) = get("SKATELIST_ENV").or_else(|| get("NODE_ENV")).filter(|v| !v.trim().is_empty()) { s.environment = env; }
        s.rate_limit_max = get("SKATELIST_RATE_LIMIT_MAX").and_then(|v| v.parse().ok()).unwrap_or(s.rate_limit_max);
        s.rate_limit_window_secs = get("SKATELIST_RATE_LIMIT_WINDOW_SECS").and_then(|v| v.parse().ok()).unwrap_or(s.rate_limit_window_secs);
        if let Some(base) = get("SKATELIST_YOUTUBE_BASE_URL").filter(|v| !v.trim().is_empty()) { self.youtube_base_url = base; }
    }
}

fn default_config_path() -> Option<PathBuf> {
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.exists() { return Some(local); }
    let proj = ProjectDirs::from("dev", "skatelist", "skatelist")?;
    let path = proj.config_dir().join(CONFIG_FILE_NAME);
    path.exists().then_some(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_match_the_showcase() {
        let cfg = SkateConfig::default();
        assert_eq!(cfg.carousel_featured_count, 5);
        assert_eq!(cfg.server.port, 3000);
        assert_eq!(cfg.server.rate_limit_max, 1000);
        assert_eq!(cfg.timings.search_debounce_ms, 250);
        assert_eq!(cfg.endpoints.grinds.as_deref(), Some("json/grinds.json"));
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "carousel_featured_count = 3\n[server]\nport = 8080\n").unwrap();
        let cfg = SkateConfig::from_file(&path).unwrap();
        assert_eq!(cfg.carousel_featured_count, 3);
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.server.host, "0.0.0.0");
        assert_eq!(cfg.timings.overlay_animation_ms, 300);
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(SkateConfig::load(Some(&tmp.path().join("nope.toml"))).is_err());
    }

    #[test]
    fn env_overrides_apply_and_ignore_garbage() {
        let vars: HashMap<&str, &str> = [("PORT", "not-a-port"), ("NODE_ENV", "production"), ("SKATELIST_RATE_LIMIT_MAX", "5")].into();
        let mut cfg = SkateConfig::default();
        cfg.apply_env(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(cfg.server.port, 3000);
        assert_eq!(cfg.server.environment, "production");
        assert_eq!(cfg.server.rate_limit_max, 5);
    }

    #[test]
    fn images_fall_back_to_unknown() {
        let imgs = DefaultImages::default();
        assert_eq!(imgs.for_type(Some(&TrickType::Nollie)), "./images/nollie.jpg");
        assert_eq!(imgs.for_type(Some(&TrickType::Grind)), "./images/unknown.jpg");
        assert_eq!(imgs.for_type(None), "./images/unknown.jpg");
        assert_eq!(imgs.all().count(), 5);
    }
}
