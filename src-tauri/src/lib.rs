mod action;
mod commands;
mod config;
mod error;
mod host;
mod logging;
mod menu;
mod monitor;
mod permission;
mod probe;
#[cfg(test)]
mod test_support;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use config::AppConfig;
use error::MonitorError;
use host::{ActionUrls, SharedActionUrls, TauriActionSink, TauriClipboard, TauriCursor};
use log::{error, info, warn};
use menu::overlay::TauriOverlays;
use monitor::{MonitorEvent, MonitorParts, MonitorSender, SelectionMonitor};
use tauri::menu::{Menu, MenuItem};
use tauri::tray::{TrayIconBuilder, TrayIconEvent};
use tauri::{AppHandle, Manager, RunEvent, WindowEvent};
use tokio::sync::Mutex;

const PAUSE_LABEL: &str = "Pause selection menu";
const RESUME_LABEL: &str = "Resume selection menu";

/// Managed state shared by commands, the tray and the hotkey.
pub struct MonitorHandle {
    monitor: Mutex<Option<SelectionMonitor>>,
    sender: MonitorSender,
    urls: SharedActionUrls,
    paused: AtomicBool,
}

impl MonitorHandle {
    fn new(monitor: SelectionMonitor, urls: SharedActionUrls) -> Self {
        Self {
            sender: monitor.sender(),
            monitor: Mutex::new(Some(monitor)),
            urls,
            paused: AtomicBool::new(false),
        }
    }

    pub fn send(&self, event: MonitorEvent) -> Result<(), MonitorError> {
        self.sender.send(event)
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    pub fn set_paused(&self, paused: bool) -> Result<(), MonitorError> {
        self.send(MonitorEvent::SetPaused(paused))?;
        self.paused.store(paused, Ordering::SeqCst);
        Ok(())
    }

    pub fn set_action_urls(&self, urls: ActionUrls) {
        match self.urls.write() {
            Ok(mut current) => *current = urls,
            Err(poisoned) => *poisoned.into_inner() = urls,
        }
    }

    /// Stops the monitor once; later calls do nothing.
    pub async fn shutdown(&self) {
        let monitor = self.monitor.lock().await.take();
        if let Some(mut monitor) = monitor {
            if let Err(e) = monitor.stop().await {
                error!("selection monitor did not shut down cleanly: {e:#}");
            }
        }
    }
}

fn start_monitor(app: &AppHandle, config: &AppConfig, urls: SharedActionUrls) -> SelectionMonitor {
    let probe = probe::select_probe().into_probe();

    let settings = config.settings();
    let layout = config.layout();
    let app = app.clone();

    // The loop spawns onto the ambient runtime.
    tauri::async_runtime::block_on(async move {
        SelectionMonitor::start_with(settings, move |events| MonitorParts {
            probe,
            overlays: Box::new(TauriOverlays::new(app.clone(), events)),
            clipboard: Box::new(TauriClipboard::new(app.clone())),
            sink: Box::new(TauriActionSink::new(app.clone(), urls)),
            pointer: Box::new(TauriCursor::new(app)),
            layout,
        })
    })
}

fn show_main_window(app: &AppHandle) {
    if let Some(window) = app.get_webview_window("main") {
        let _ = window.show();
        let _ = window.set_focus();
    }
}

fn quit(app: &AppHandle) {
    let app = app.clone();
    tauri::async_runtime::spawn(async move {
        app.state::<MonitorHandle>().shutdown().await;
        app.exit(0);
    });
}

#[cfg(desktop)]
fn register_manual_hotkey(app: &AppHandle, hotkey: &str) -> Result<(), MonitorError> {
    use tauri_plugin_global_shortcut::{GlobalShortcutExt, Shortcut, ShortcutState};

    let shortcut: Shortcut = hotkey
        .parse()
        .map_err(|e| MonitorError::Shortcut(format!("failed to parse {hotkey:?}: {e:?}")))?;

    if app.global_shortcut().is_registered(shortcut) {
        warn!("shortcut {hotkey} already registered, re-registering");
        let _ = app.global_shortcut().unregister(shortcut);
    }

    app.global_shortcut()
        .on_shortcut(shortcut, |app, _shortcut, event| {
            if event.state == ShortcutState::Pressed {
                if let Err(e) = app.state::<MonitorHandle>().send(MonitorEvent::ManualTrigger) {
                    warn!("manual trigger dropped: {e}");
                }
            }
        })
        .map_err(|e| MonitorError::Shortcut(e.to_string()))
}

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    let app = tauri::Builder::default()
        .plugin(tauri_plugin_opener::init())
        .plugin(tauri_plugin_global_shortcut::Builder::new().build())
        .plugin(tauri_plugin_clipboard_manager::init())
        .plugin(tauri_plugin_store::Builder::default().build())
        .plugin(tauri_plugin_dialog::init())
        .setup(|app| {
            let log_dir = app.path().app_log_dir().ok();
            logging::init(log_dir.as_deref());
            info!("selection menu starting up");

            let config = config::load(app.handle()).unwrap_or_else(|e| {
                warn!("{e}; using default settings");
                AppConfig::default()
            });

            let urls: SharedActionUrls = Arc::new(RwLock::new(ActionUrls::from_config(&config)));
            let monitor = start_monitor(app.handle(), &config, urls.clone());
            app.manage(MonitorHandle::new(monitor, urls));

            // Setup system tray
            let show = MenuItem::with_id(app, "show", "Show Settings", true, None::<&str>)?;
            let pause = MenuItem::with_id(app, "pause", PAUSE_LABEL, true, None::<&str>)?;
            let quit_item = MenuItem::with_id(app, "quit", "Quit", true, None::<&str>)?;
            let menu = Menu::with_items(app, &[&show, &pause, &quit_item])?;

            let mut tray = TrayIconBuilder::new()
                .menu(&menu)
                .on_menu_event(move |app, event| match event.id.as_ref() {
                    "show" => show_main_window(app),
                    "pause" => {
                        let handle = app.state::<MonitorHandle>();
                        let paused = !handle.is_paused();
                        match handle.set_paused(paused) {
                            Ok(()) => {
                                let label = if paused { RESUME_LABEL } else { PAUSE_LABEL };
                                let _ = pause.set_text(label);
                            }
                            Err(e) => warn!("failed to toggle pause: {e}"),
                        }
                    }
                    "quit" => quit(app),
                    _ => {}
                })
                .on_tray_icon_event(|tray, event| {
                    if let TrayIconEvent::Click { .. } = event {
                        show_main_window(tray.app_handle());
                    }
                });
            if let Some(icon) = app.default_window_icon() {
                tray = tray.icon(icon.clone());
            }
            tray.build(app)?;

            // Handle window close event - minimize to tray instead of closing
            if let Some(window) = app.get_webview_window("main") {
                let window_clone = window.clone();
                window.on_window_event(move |event| {
                    if let WindowEvent::CloseRequested { api, .. } = event {
                        api.prevent_close();
                        let _ = window_clone.hide();
                    }
                });
            }

            #[cfg(desktop)]
            {
                if let Err(e) = register_manual_hotkey(app.handle(), &config.manual_hotkey) {
                    warn!("{e}; the manual shortcut will not work");
                }
            }

            tauri::async_runtime::spawn(permission::prompt_if_needed(app.handle().clone()));

            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            commands::menu_item_clicked,
            commands::menu_dragged,
            commands::menu_closed,
            commands::load_config,
            commands::save_config,
            commands::set_monitor_paused,
            commands::check_accessibility_permission,
            commands::open_accessibility_settings,
        ])
        .build(tauri::generate_context!())
        .expect("error while building tauri application");

    app.run(|app, event| match event {
        // Keep running in the tray once every window is gone.
        RunEvent::ExitRequested { code: None, api, .. } => api.prevent_exit(),
        RunEvent::Exit => {
            if let Some(handle) = app.try_state::<MonitorHandle>() {
                tauri::async_runtime::block_on(handle.shutdown());
            }
        }
        _ => {}
    });
}
