use std::sync::atomic::{AtomicBool, Ordering};

use log::{info, warn};
use tauri::AppHandle;
use tauri_plugin_dialog::{DialogExt, MessageDialogButtons, MessageDialogKind};
use tauri_plugin_opener::OpenerExt;

pub const ACCESSIBILITY_SETTINGS_URL: &str =
    "x-apple.systempreferences:com.apple.preference.security?Privacy_Accessibility";

static PROMPTED: AtomicBool = AtomicBool::new(false);

/// Whether the monitor can read other applications' selections.
pub async fn accessibility_granted() -> bool {
    #[cfg(target_os = "macos")]
    {
        let probe = tokio::process::Command::new("osascript")
            .args([
                "-e",
                "tell application \"System Events\" to get name of first process whose frontmost is true",
            ])
            .kill_on_drop(true)
            .output()
            .await;
        match probe {
            Ok(output) => output.status.success(),
            Err(e) => {
                warn!("osascript unavailable: {e}");
                false
            }
        }
    }

    #[cfg(not(target_os = "macos"))]
    {
        true
    }
}

pub fn open_accessibility_settings(app: &AppHandle) -> Result<(), String> {
    if !cfg!(target_os = "macos") {
        return Err("Accessibility settings are only available on macOS".into());
    }
    app.opener()
        .open_url(ACCESSIBILITY_SETTINGS_URL, None::<&str>)
        .map_err(|e| e.to_string())
}

/// Asks the user to grant access if it is missing. Shown at most once per run.
pub async fn prompt_if_needed(app: AppHandle) {
    if accessibility_granted().await {
        return;
    }
    if PROMPTED.swap(true, Ordering::SeqCst) {
        return;
    }

    info!("accessibility access missing; asking the user");
    let handle = app.clone();
    app.dialog()
        .message(
            "Selection Menu needs Accessibility access to see the text you select. \
             Without it the menu only opens from the keyboard shortcut.",
        )
        .title("Allow Accessibility access")
        .kind(MessageDialogKind::Info)
        .buttons(MessageDialogButtons::OkCancelCustom(
            "Open Settings".to_string(),
            "Later".to_string(),
        ))
        .show(move |open| {
            if open {
                if let Err(e) = open_accessibility_settings(&handle) {
                    warn!("failed to open accessibility settings: {e}");
                }
            }
        });
}
