use serde::{Deserialize, Serialize};
use tauri::{AppHandle, Runtime};
use tauri_plugin_store::StoreExt;
use tokio::time::Duration;

use crate::error::MonitorError;
use crate::menu::geometry::MenuLayout;
use crate::monitor::MonitorSettings;

pub const STORE_FILE: &str = "config.json";
pub const CONFIG_KEY: &str = "app_config";

const MIN_TIMING_MS: u64 = 10;
const MIN_COOLDOWN_MS: u64 = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub poll_interval_ms: u64,
    pub debounce_ms: u64,
    pub breaker_cooldown_ms: u64,
    pub probe_timeout_ms: u64,
    pub menu_width: f64,
    pub menu_height: f64,
    pub menu_offset_y: f64,
    pub manual_hotkey: String,
    pub translate_url: String,
    pub ask_url: String,
    pub search_url: String,
    pub open_action_urls: bool,
    pub max_text_chars: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 250,
            debounce_ms: 300,
            breaker_cooldown_ms: 5000,
            probe_timeout_ms: 1000,
            menu_width: 220.0,
            menu_height: 48.0,
            menu_offset_y: 16.0,
            manual_hotkey: "Alt+Shift+S".to_string(),
            translate_url: "https://translate.google.com/?sl=auto&tl=en&text={text}&op=translate"
                .to_string(),
            ask_url: "https://chat.openai.com/?q={text}".to_string(),
            search_url: "https://www.bing.com/search?q={text}".to_string(),
            open_action_urls: true,
            max_text_chars: 4000,
        }
    }
}

impl AppConfig {
    /// The probe timeout is kept at two poll intervals or more, so a slow
    /// call skips ticks before it ever counts as a failure.
    pub fn settings(&self) -> MonitorSettings {
        let poll_interval = floor_ms(self.poll_interval_ms, MIN_TIMING_MS);
        MonitorSettings {
            poll_interval,
            debounce: floor_ms(self.debounce_ms, MIN_TIMING_MS),
            breaker_cooldown: floor_ms(self.breaker_cooldown_ms, MIN_COOLDOWN_MS),
            probe_timeout: floor_ms(self.probe_timeout_ms, MIN_TIMING_MS).max(poll_interval * 2),
            max_text_chars: self.max_text_chars,
        }
    }

    /// Menu size in logical pixels. Non-positive or non-finite values fall
    /// back to the defaults.
    pub fn layout(&self) -> MenuLayout {
        let defaults = AppConfig::default();
        MenuLayout {
            width: positive_or(self.menu_width, defaults.menu_width),
            height: positive_or(self.menu_height, defaults.menu_height),
            offset_y: if self.menu_offset_y.is_finite() {
                self.menu_offset_y
            } else {
                defaults.menu_offset_y
            },
        }
    }
}

/// Reads the stored config, writing the defaults back when none is stored.
pub fn load<R: Runtime>(app: &AppHandle<R>) -> Result<AppConfig, MonitorError> {
    let store = app
        .store(STORE_FILE)
        .map_err(|e| MonitorError::Store(e.to_string()))?;

    match store.get(CONFIG_KEY) {
        Some(value) => serde_json::from_value(value).map_err(|e| MonitorError::Store(e.to_string())),
        None => {
            let default_config = AppConfig::default();
            save(app, &default_config)?;
            Ok(default_config)
        }
    }
}

pub fn save<R: Runtime>(app: &AppHandle<R>, config: &AppConfig) -> Result<(), MonitorError> {
    let store = app
        .store(STORE_FILE)
        .map_err(|e| MonitorError::Store(e.to_string()))?;
    let value = serde_json::to_value(config).map_err(|e| MonitorError::Store(e.to_string()))?;
    store.set(CONFIG_KEY, value);
    store.save().map_err(|e| MonitorError::Store(e.to_string()))
}

fn floor_ms(value: u64, min: u64) -> Duration {
    Duration::from_millis(value.max(min))
}

fn positive_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        fallback
    }
}
