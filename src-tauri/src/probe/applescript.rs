//! Scripting-bridge probe: asks System Events for the frontmost process's
//! focused element and reads its `AXSelectedText` attribute.
//!
//! The output parser is platform independent, so the module is built
//! everywhere and only wired up on macOS.
#![cfg_attr(not(target_os = "macos"), allow(dead_code))]

use futures::future::BoxFuture;
use tokio::process::Command;

use super::{ProbeError, SelectionProbe};

/// Prints the frontmost process id on the first line, the selection after it.
const SELECTION_SCRIPT: &str = r#"
tell application "System Events"
    set frontProc to first application process whose frontmost is true
    set procId to unix id of frontProc
    set selectedText to ""
    try
        set focusedElement to value of attribute "AXFocusedUIElement" of frontProc
        set selectedText to value of attribute "AXSelectedText" of focusedElement
    end try
    if selectedText is missing value then set selectedText to ""
end tell
return (procId as text) & linefeed & selectedText
"#;

pub struct ScriptProbe {
    own_pid: u32,
}

impl ScriptProbe {
    pub fn new() -> Self {
        Self {
            own_pid: std::process::id(),
        }
    }
}

impl SelectionProbe for ScriptProbe {
    fn sample(&self) -> BoxFuture<'static, Result<String, ProbeError>> {
        let own_pid = self.own_pid;
        Box::pin(async move {
            // kill_on_drop: a timed-out sample must not leave osascript behind.
            let output = Command::new("osascript")
                .arg("-e")
                .arg(SELECTION_SCRIPT)
                .kill_on_drop(true)
                .output()
                .await
                .map_err(|e| ProbeError::CallFailed(format!("failed to run osascript: {e}")))?;

            interpret_output(
                own_pid,
                output.status.code(),
                &output.stdout,
                &output.stderr,
            )
        })
    }
}

/// Turns one osascript run into a probe result.
fn interpret_output(
    own_pid: u32,
    exit_code: Option<i32>,
    stdout: &[u8],
    stderr: &[u8],
) -> Result<String, ProbeError> {
    let stderr = String::from_utf8_lossy(stderr);
    if exit_code != Some(0) || !stderr.trim().is_empty() {
        let code = exit_code.map_or_else(|| "signal".to_string(), |c| c.to_string());
        return Err(ProbeError::CallFailed(format!(
            "osascript exited with {code}: {}",
            stderr.trim()
        )));
    }

    let stdout = String::from_utf8_lossy(stdout);
    let (pid_line, text) = stdout.split_once('\n').unwrap_or((stdout.as_ref(), ""));
    let pid: u32 = pid_line.trim().parse().map_err(|_| {
        ProbeError::CallFailed(format!("unexpected osascript output: {pid_line:?}"))
    })?;

    // Our own overlay is frontmost; never read selections out of it.
    if pid == own_pid {
        return Err(ProbeError::OwnWindow);
    }

    Ok(text.trim().to_string())
}
