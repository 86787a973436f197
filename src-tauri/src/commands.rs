use tauri::{AppHandle, State};
use uuid::Uuid;

use crate::action::MenuAction;
use crate::config::{self, AppConfig};
use crate::host::ActionUrls;
use crate::menu::geometry::Point;
use crate::monitor::MonitorEvent;
use crate::{permission, MonitorHandle};

// Overlay protocol

#[tauri::command]
pub fn menu_item_clicked(
    state: State<'_, MonitorHandle>,
    menu_id: Uuid,
    action: MenuAction,
    text: String,
) -> Result<(), String> {
    state.send(MonitorEvent::MenuItemClicked {
        menu_id,
        action,
        text,
    })?;
    Ok(())
}

#[tauri::command]
pub fn menu_dragged(
    state: State<'_, MonitorHandle>,
    menu_id: Uuid,
    x: i32,
    y: i32,
) -> Result<(), String> {
    state.send(MonitorEvent::MenuDragged {
        menu_id,
        position: Point::new(x, y),
    })?;
    Ok(())
}

#[tauri::command]
pub fn menu_closed(state: State<'_, MonitorHandle>, menu_id: Uuid) -> Result<(), String> {
    state.send(MonitorEvent::MenuClosed { menu_id })?;
    Ok(())
}

// Settings window

#[tauri::command]
pub async fn load_config(app: AppHandle) -> Result<AppConfig, String> {
    Ok(config::load(&app)?)
}

/// Persists the config. URL templates apply immediately; timings and the
/// menu size apply on the next launch.
#[tauri::command]
pub async fn save_config(
    app: AppHandle,
    state: State<'_, MonitorHandle>,
    config: AppConfig,
) -> Result<(), String> {
    config::save(&app, &config)?;
    state.set_action_urls(ActionUrls::from_config(&config));
    Ok(())
}

#[tauri::command]
pub fn set_monitor_paused(state: State<'_, MonitorHandle>, paused: bool) -> Result<(), String> {
    state.set_paused(paused)?;
    Ok(())
}

#[tauri::command]
pub async fn check_accessibility_permission() -> Result<bool, String> {
    Ok(permission::accessibility_granted().await)
}

#[tauri::command]
pub fn open_accessibility_settings(app: AppHandle) -> Result<(), String> {
    permission::open_accessibility_settings(&app)
}
