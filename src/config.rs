//! TOML-based configuration system.
//!
//! Every struct implements `Default` with the browser's fixed constants (home
//! page, search template, user agent, ...), so a missing or partial config
//! file behaves exactly like no file at all.
//!
//! ## Config file search order
//!
//! 1. `B2B_CONFIG` environment variable (explicit override)
//! 2. Next to the executable (`<exe_dir>/config.toml`)
//! 3. Platform config directory (`%APPDATA%\B2B\config.toml` on Windows,
//!    `$XDG_CONFIG_HOME/b2b/config.toml` elsewhere)
//! 4. Current working directory (`./config.toml`)
//! 5. No file found → `Config::default()`

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::address::{Classifier, DEFAULT_SEARCH_TEMPLATE, DEFAULT_TLDS};
use crate::error::Result;

/// Desktop Edge UA sent by the reachability probe and the engine.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/58.0.3029.110 Safari/537.36 Edge/16.16299";

// ─────────────────────────────────────────────────────────────────────────────
// Config structs
// ─────────────────────────────────────────────────────────────────────────────

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    pub window: WindowConfig,
    pub chrome: ChromeConfig,
    pub search: SearchConfig,
    pub probe: ProbeConfig,
    pub privacy: PrivacyConfig,
    pub network: NetworkConfig,
    pub servo: ServoConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub home_url: String,
    pub window_title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub width: u32,
    pub height: u32,
}

/// Toolbar appearance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChromeConfig {
    pub height: u32,
    pub font_size: f32,
    /// Width of each toolbar button in pixels.
    pub button_width: f32,
    pub text_left_pad: f32,
    pub bar_margin: f32,
    /// Font file, relative to the resources directory.
    pub font_path: String,
    pub colors: ChromeColors,
}

/// RGBA colors for the toolbar (values 0.0–1.0).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChromeColors {
    pub background: [f32; 4],
    pub background_focused: [f32; 4],
    pub text: [f32; 4],
    pub cursor: [f32; 4],
    pub bar_background: [f32; 4],
    pub bar_border: [f32; 4],
    pub button: [f32; 4],
    pub privacy_on: [f32; 4],
    pub privacy_off: [f32; 4],
}

/// Address classification and search target.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// The `+`-joined query is appended to this URL.
    pub engine_url: String,
    /// Substrings that make input count as a URL.
    pub url_tlds: Vec<String>,
}

/// Reachability probe.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// 0 = no timeout.
    pub timeout_secs: u64,
    pub follow_redirects: bool,
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PrivacyConfig {
    /// Privacy Mode state at startup.
    pub start_enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Certificate errors are suppressed at the engine boundary. This weakens
    /// TLS and is kept on by default for parity.
    pub ignore_certificate_errors: bool,
}

/// Servo engine tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServoConfig {
    /// Maximum layout threads. 0 = auto-detect from CPU count.
    pub layout_threads: i64,
    /// HTTP cache size in bytes.
    pub cache_size: i64,
    /// Engine user-agent. Empty = same as the probe.
    pub user_agent: String,
    pub precache_shaders: bool,
}

// ─────────────────────────────────────────────────────────────────────────────
// Default impls
// ─────────────────────────────────────────────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            home_url: "http://duckduckgo.com".to_string(),
            window_title: "B2B".to_string(),
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 800,
        }
    }
}

impl Default for ChromeConfig {
    fn default() -> Self {
        Self {
            height: 40,
            font_size: 16.0,
            button_width: 40.0,
            text_left_pad: 12.0,
            bar_margin: 6.0,
            font_path: "fonts/Inter-Regular.ttf".to_string(),
            colors: ChromeColors::default(),
        }
    }
}

impl Default for ChromeColors {
    fn default() -> Self {
        Self {
            background: [0.17, 0.17, 0.17, 1.0],
            background_focused: [0.23, 0.23, 0.23, 1.0],
            text: [0.93, 0.93, 0.93, 1.0],
            cursor: [1.0, 1.0, 1.0, 1.0],
            bar_background: [0.13, 0.13, 0.13, 1.0],
            bar_border: [0.3, 0.3, 0.3, 1.0],
            button: [0.25, 0.25, 0.25, 1.0],
            privacy_on: [0.2, 0.45, 0.25, 1.0],
            privacy_off: [0.5, 0.2, 0.2, 1.0],
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            engine_url: DEFAULT_SEARCH_TEMPLATE.to_string(),
            url_tlds: DEFAULT_TLDS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            follow_redirects: false,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl Default for PrivacyConfig {
    fn default() -> Self {
        Self {
            start_enabled: true,
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            ignore_certificate_errors: true,
        }
    }
}

impl Default for ServoConfig {
    fn default() -> Self {
        Self {
            layout_threads: 0,
            cache_size: 50_000,
            user_agent: String::new(),
            precache_shaders: true,
        }
    }
}

impl SearchConfig {
    pub fn classifier(&self) -> Classifier {
        Classifier::new(self.url_tlds.clone(), self.engine_url.clone())
    }
}

impl ProbeConfig {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

impl ServoConfig {
    /// Engine UA, falling back to the probe's.
    pub fn effective_user_agent<'a>(&'a self, probe: &'a ProbeConfig) -> &'a str {
        if self.user_agent.is_empty() {
            &probe.user_agent
        } else {
            &self.user_agent
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Config loading and saving
// ─────────────────────────────────────────────────────────────────────────────

impl Config {
    /// Loads configuration from the first config file found. Never fails:
    /// returns defaults if no file is found or if it cannot be parsed.
    pub fn load() -> Self {
        match find_config_path() {
            Some(path) => match Self::load_from(&path) {
                Ok(config) => {
                    info!(path = %path.display(), "Configuration loaded");
                    config
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Invalid config, using defaults");
                    Config::default()
                }
            },
            None => {
                info!("No config file found, using defaults");
                Config::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Saves configuration to the platform config directory.
    pub fn save(&self) -> Result<PathBuf> {
        let path = save_path();
        self.save_to(&path)?;
        info!(path = %path.display(), "Configuration saved");
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }
}

fn find_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("B2B_CONFIG") {
        let p = PathBuf::from(path);
        if p.is_file() {
            return Some(p);
        }
    }

    if let Ok(exe) = std::env::current_exe()
        && let Some(dir) = exe.parent()
    {
        let p = dir.join("config.toml");
        if p.is_file() {
            return Some(p);
        }
    }

    if let Some(dir) = platform_config_dir() {
        let p = dir.join("config.toml");
        if p.is_file() {
            return Some(p);
        }
    }

    let p = PathBuf::from("config.toml");
    p.is_file().then_some(p)
}

fn save_path() -> PathBuf {
    platform_config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("config.toml")
}

fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(windows)]
    {
        std::env::var("APPDATA")
            .ok()
            .map(|appdata| PathBuf::from(appdata).join("B2B"))
    }
    #[cfg(not(windows))]
    {
        std::env::var("XDG_CONFIG_HOME")
            .ok()
            .or_else(|| std::env::var("HOME").ok().map(|h| format!("{h}/.config")))
            .map(|dir| PathBuf::from(dir).join("b2b"))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Query param serialization (settings page save)
// ─────────────────────────────────────────────────────────────────────────────

impl Config {
    /// Applies `key=value&...` pairs from the settings page on top of `self`.
    /// Unknown keys and unparsable numbers are ignored.
    pub fn with_query_params(mut self, query: &str) -> Self {
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            let value = value.into_owned();
            match key.as_ref() {
                "home_url" => self.general.home_url = value,
                "window_title" => self.general.window_title = value,
                "window_width" => set_parsed(&mut self.window.width, &value),
                "window_height" => set_parsed(&mut self.window.height, &value),
                "font_size" => set_parsed(&mut self.chrome.font_size, &value),
                "search_engine_url" => self.search.engine_url = value,
                "url_tlds" => {
                    self.search.url_tlds = value
                        .split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(String::from)
                        .collect();
                }
                "probe_timeout_secs" => set_parsed(&mut self.probe.timeout_secs, &value),
                "probe_follow_redirects" => self.probe.follow_redirects = value == "true",
                "user_agent" => self.probe.user_agent = value,
                "privacy_enabled" => self.privacy.start_enabled = value == "true",
                "ignore_certificate_errors" => {
                    self.network.ignore_certificate_errors = value == "true"
                }
                _ => {}
            }
        }
        self
    }
}

fn set_parsed<T: std::str::FromStr>(field: &mut T, value: &str) {
    if let Ok(v) = value.parse() {
        *field = v;
    }
}
