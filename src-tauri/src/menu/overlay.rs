use log::{debug, warn};
use tauri::{
    AppHandle, Manager, PhysicalPosition, PhysicalSize, WebviewUrl, WebviewWindow,
    WebviewWindowBuilder, WindowEvent,
};
use uuid::Uuid;

use super::geometry::{Point, Size, WorkArea};
use super::{OverlayBackend, OverlaySpec, OverlayWindow};
use crate::error::MonitorError;
use crate::monitor::{MonitorEvent, MonitorSender};

pub const MENU_PAGE: &str = "menu.html";
pub const MENU_LABEL_PREFIX: &str = "menu-";

pub fn menu_label(id: Uuid) -> String {
    format!("{MENU_LABEL_PREFIX}{id}")
}

/// Opens each menu as its own frameless webview window.
pub struct TauriOverlays {
    app: AppHandle,
    events: MonitorSender,
}

impl TauriOverlays {
    pub fn new(app: AppHandle, events: MonitorSender) -> Self {
        Self { app, events }
    }

    fn build(&self, spec: &OverlaySpec<'_>) -> tauri::Result<WebviewWindow> {
        let payload = serde_json::json!({ "menuId": spec.id, "text": spec.text });
        let script = format!("window.__SELECTION_MENU__ = {payload};");

        let window = WebviewWindowBuilder::new(
            &self.app,
            menu_label(spec.id),
            WebviewUrl::App(MENU_PAGE.into()),
        )
        .title("Selection Menu")
        .visible(false)
        .resizable(false)
        .decorations(false)
        .always_on_top(true)
        .skip_taskbar(true)
        .transparent(true)
        .shadow(false)
        .focused(true)
        .initialization_script(&script)
        .build()?;

        window.set_size(PhysicalSize::new(spec.size.width, spec.size.height))?;
        window.set_position(PhysicalPosition::new(spec.position.x, spec.position.y))?;
        window.show()?;
        window.set_focus()?;
        Ok(window)
    }
}

impl OverlayBackend for TauriOverlays {
    fn work_area_at(&self, at: Point) -> Option<WorkArea> {
        let monitor = match self.app.monitor_from_point(f64::from(at.x), f64::from(at.y)) {
            Ok(Some(monitor)) => monitor,
            Ok(None) => self.app.primary_monitor().ok().flatten()?,
            Err(e) => {
                debug!("monitor lookup failed: {e}");
                return None;
            }
        };
        let area = monitor.work_area();
        Some(WorkArea {
            origin: Point::new(area.position.x, area.position.y),
            size: Size {
                width: area.size.width,
                height: area.size.height,
            },
            scale_factor: monitor.scale_factor(),
        })
    }

    fn create(&mut self, spec: &OverlaySpec<'_>) -> Result<Box<dyn OverlayWindow>, MonitorError> {
        let window = match self.build(spec) {
            Ok(window) => window,
            Err(e) => {
                // A half-built window must not linger.
                if let Some(stale) = self.app.get_webview_window(&menu_label(spec.id)) {
                    let _ = stale.destroy();
                }
                return Err(MonitorError::WindowCreateFailed(e.to_string()));
            }
        };

        let menu_id = spec.id;
        let events = self.events.clone();
        window.on_window_event(move |event| {
            let forwarded = match event {
                WindowEvent::Focused(focused) => Some(MonitorEvent::MenuFocusChanged {
                    menu_id,
                    focused: *focused,
                }),
                WindowEvent::Moved(position) => Some(MonitorEvent::MenuDragged {
                    menu_id,
                    position: Point::new(position.x, position.y),
                }),
                WindowEvent::CloseRequested { api, .. } => {
                    api.prevent_close();
                    Some(MonitorEvent::MenuClosed { menu_id })
                }
                _ => None,
            };
            if let Some(event) = forwarded {
                // The monitor may already be gone during shutdown.
                let _ = events.send(event);
            }
        });

        Ok(Box::new(TauriOverlay { window }))
    }
}

struct TauriOverlay {
    window: WebviewWindow,
}

impl OverlayWindow for TauriOverlay {
    fn move_to(&self, position: Point) -> Result<(), MonitorError> {
        self.window
            .set_position(PhysicalPosition::new(position.x, position.y))
            .map_err(|e| MonitorError::Window(e.to_string()))
    }

    fn destroy(self: Box<Self>) {
        if let Err(e) = self.window.destroy() {
            warn!("failed to destroy {}: {e}", self.window.label());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_match_capability_pattern() {
        let id = Uuid::new_v4();
        let label = menu_label(id);
        assert!(label.starts_with("menu-"));
        assert!(label
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-'));
    }
}
