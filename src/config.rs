use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WidgetConfig {
    /// Base URL of the metadata server; endpoint paths are resolved against it.
    pub server_url: String,
    pub info_path: String,
    pub artwork_path: String,
    pub request_timeout_secs: u64,
    pub retry_backoff_ms: u64,
    pub scroll_speed: f64,
    pub pause_time_ms: u64,
    pub edge_fade_ms: u64,
    pub hide_time_ms: u64,
    pub unhide_time_ms: u64,
    pub on_pause_hide_timeout_ms: u64,
    pub crossfade_ms: u64,
    pub text_size_ratio: f64,
    pub max_artwork_bytes: usize,
    // Layout used by the headless renderer
    pub viewport_width: f64,
    pub info_height: f64,
    pub glyph_width_ratio: f64,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:6969/".to_string(),
            info_path: "get-song-info".to_string(),
            artwork_path: "get-song-artwork".to_string(),
            request_timeout_secs: 30,
            retry_backoff_ms: 5000,
            scroll_speed: 1.0,
            pause_time_ms: 4000,
            edge_fade_ms: 250,
            hide_time_ms: 1000,
            unhide_time_ms: 500,
            on_pause_hide_timeout_ms: 5000,
            crossfade_ms: 250,
            text_size_ratio: 0.35,
            max_artwork_bytes: 16 * 1024 * 1024,
            viewport_width: 300.0,
            info_height: 60.0,
            glyph_width_ratio: 0.55,
        }
    }
}

impl WidgetConfig {
    pub fn config_dir() -> AppResult<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| AppError::Config("Cannot find home directory".into()))?;
        Ok(home.join(".nowplaying-overlay"))
    }

    pub fn config_path() -> AppResult<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }

    pub fn load() -> AppResult<Self> {
        let path = Self::config_path()?;
        if !path.exists() {
            return Err(AppError::Config(format!(
                "Config file not found at {}",
                path.display()
            )));
        }
        let content = std::fs::read_to_string(&path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self) -> AppResult<()> {
        let dir = Self::config_dir()?;
        std::fs::create_dir_all(&dir)?;
        let path = Self::config_path()?;
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> AppResult<()> {
        if !(self.scroll_speed > 0.0) {
            return Err(AppError::Config("scroll_speed must be positive".into()));
        }
        if !(self.text_size_ratio > 0.0) {
            return Err(AppError::Config("text_size_ratio must be positive".into()));
        }
        url::Url::parse(&self.server_url)?;
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn pause_time(&self) -> Duration {
        Duration::from_millis(self.pause_time_ms)
    }

    pub fn edge_fade(&self) -> Duration {
        Duration::from_millis(self.edge_fade_ms)
    }

    pub fn hide_time(&self) -> Duration {
        Duration::from_millis(self.hide_time_ms)
    }

    pub fn unhide_time(&self) -> Duration {
        Duration::from_millis(self.unhide_time_ms)
    }

    pub fn on_pause_hide_timeout(&self) -> Duration {
        Duration::from_millis(self.on_pause_hide_timeout_ms)
    }

    pub fn crossfade_window(&self) -> Duration {
        Duration::from_millis(self.crossfade_ms)
    }
}
