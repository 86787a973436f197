use std::fs::{self, File};
use std::path::Path;

use simplelog::{
    ColorChoice, CombinedLogger, ConfigBuilder, LevelFilter, SharedLogger, TermLogger,
    TerminalMode, WriteLogger,
};

pub const LOG_FILE: &str = "selection-menu.log";

/// Installs the terminal logger and, when `log_dir` is writable, a debug
/// level file logger next to it. Calling this twice is harmless.
pub fn init(log_dir: Option<&Path>) {
    let config = ConfigBuilder::new()
        .add_filter_allow_str("selection_menu_lib")
        .build();

    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        LevelFilter::Info,
        config.clone(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )];

    let mut file_error = None;
    if let Some(dir) = log_dir {
        match open_log_file(dir) {
            Ok(file) => loggers.push(WriteLogger::new(LevelFilter::Debug, config, file)),
            Err(err) => file_error = Some(err),
        }
    }

    if CombinedLogger::init(loggers).is_err() {
        return;
    }
    if let Some(err) = file_error {
        log::warn!("file logging disabled: {err}");
    }
}

fn open_log_file(dir: &Path) -> std::io::Result<File> {
    fs::create_dir_all(dir)?;
    File::create(dir.join(LOG_FILE))
}
