//! Tauri-side implementations of the monitor's outward seams.

use std::sync::{Arc, RwLock};

use log::{debug, warn};
use tauri::{AppHandle, Emitter};
use tauri_plugin_clipboard_manager::ClipboardExt;
use tauri_plugin_opener::OpenerExt;
use url::form_urlencoded;

use crate::action::{ActionRequest, ActionSink, ClipboardWriter, MenuAction};
use crate::config::AppConfig;
use crate::menu::geometry::Point;
use crate::monitor::PointerLocator;

pub const ACTION_EVENT: &str = "selection-action";

const TEXT_PLACEHOLDER: &str = "{text}";

/// URL templates used by the default action handler.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionUrls {
    pub translate: String,
    pub ask: String,
    pub search: String,
    pub enabled: bool,
}

impl ActionUrls {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            translate: config.translate_url.clone(),
            ask: config.ask_url.clone(),
            search: config.search_url.clone(),
            enabled: config.open_action_urls,
        }
    }

    pub fn url_for(&self, action: MenuAction, text: &str) -> Option<String> {
        if !self.enabled {
            return None;
        }
        let template = match action {
            MenuAction::Translate => &self.translate,
            MenuAction::Ask => &self.ask,
            MenuAction::Search => &self.search,
            MenuAction::Copy => return None,
        };
        if template.trim().is_empty() {
            return None;
        }
        Some(expand_template(template, text))
    }
}

/// Substitutes every `{text}` in `template` with the form-encoded text.
pub fn expand_template(template: &str, text: &str) -> String {
    let encoded: String = form_urlencoded::byte_serialize(text.as_bytes()).collect();
    template.replace(TEXT_PLACEHOLDER, &encoded)
}

pub type SharedActionUrls = Arc<RwLock<ActionUrls>>;

pub struct TauriClipboard {
    app: AppHandle,
}

impl TauriClipboard {
    pub fn new(app: AppHandle) -> Self {
        Self { app }
    }
}

impl ClipboardWriter for TauriClipboard {
    fn write_text(&self, text: &str) -> anyhow::Result<()> {
        self.app.clipboard().write_text(text.to_string())?;
        Ok(())
    }
}

/// Emits every request to the webviews and then opens the matching URL.
pub struct TauriActionSink {
    app: AppHandle,
    urls: SharedActionUrls,
}

impl TauriActionSink {
    pub fn new(app: AppHandle, urls: SharedActionUrls) -> Self {
        Self { app, urls }
    }
}

impl ActionSink for TauriActionSink {
    fn submit(&self, request: ActionRequest) {
        if let Err(e) = self.app.emit(ACTION_EVENT, &request) {
            warn!("failed to emit {ACTION_EVENT}: {e}");
        }

        let url = match self.urls.read() {
            Ok(urls) => urls.url_for(request.action, &request.text),
            Err(_) => {
                warn!("action URL table is poisoned; skipping default handler");
                None
            }
        };
        let Some(url) = url else {
            return;
        };

        let app = self.app.clone();
        tauri::async_runtime::spawn_blocking(move || {
            debug!("opening {} action URL", request.action.as_str());
            if let Err(e) = app.opener().open_url(url, None::<&str>) {
                warn!("failed to open action URL: {e}");
            }
        });
    }
}

pub struct TauriCursor {
    app: AppHandle,
}

impl TauriCursor {
    pub fn new(app: AppHandle) -> Self {
        Self { app }
    }
}

impl PointerLocator for TauriCursor {
    fn locate(&self) -> Option<Point> {
        match self.app.cursor_position() {
            Ok(position) => Some(Point::new(position.x.round() as i32, position.y.round() as i32)),
            Err(e) => {
                debug!("cursor position unavailable: {e}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn urls() -> ActionUrls {
        ActionUrls::from_config(&AppConfig::default())
    }

    #[test]
    fn test_template_text_is_encoded() {
        assert_eq!(
            expand_template("https://example.com/?q={text}", "fish & chips/100%"),
            "https://example.com/?q=fish+%26+chips%2F100%25"
        );
    }

    #[test]
    fn test_template_encodes_unicode_and_repeats() {
        assert_eq!(
            expand_template("a={text}&b={text}", "é"),
            "a=%C3%A9&b=%C3%A9"
        );
    }

    #[test]
    fn test_default_urls_per_action() {
        let urls = urls();
        assert_eq!(
            urls.url_for(MenuAction::Search, "rust lang").as_deref(),
            Some("https://www.bing.com/search?q=rust+lang")
        );
        assert_eq!(
            urls.url_for(MenuAction::Translate, "hola").as_deref(),
            Some("https://translate.google.com/?sl=auto&tl=en&text=hola&op=translate")
        );
        assert_eq!(
            urls.url_for(MenuAction::Ask, "why").as_deref(),
            Some("https://chat.openai.com/?q=why")
        );
        assert_eq!(urls.url_for(MenuAction::Copy, "x"), None);
    }

    #[test]
    fn test_disabled_or_blank_template_opens_nothing() {
        let mut urls = urls();
        urls.search = "  ".to_string();
        assert_eq!(urls.url_for(MenuAction::Search, "x"), None);

        urls.enabled = false;
        assert_eq!(urls.url_for(MenuAction::Ask, "x"), None);
    }
}
