use thiserror::Error;

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("overlay window could not be created: {0}")]
    WindowCreateFailed(String),

    #[error("overlay window operation failed: {0}")]
    Window(String),

    #[error("config store error: {0}")]
    Store(String),

    #[error("global shortcut error: {0}")]
    Shortcut(String),

    #[error("selection monitor is not running")]
    Channel,
}

// For Tauri command returns
impl From<MonitorError> for String {
    fn from(e: MonitorError) -> Self {
        e.to_string()
    }
}
