//! Platform selection probes.
//!
//! Each probe answers one question: what text is selected in the foreground
//! application right now. Exactly one implementation is chosen by
//! [`select_probe`] at startup; everything downstream only sees the
//! [`SelectionProbe`] trait.

mod applescript;
#[cfg(target_os = "windows")]
mod uia;
mod worker;

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use log::{error, info};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProbeError {
    /// The focused element has no text-selection capability. Not a failure.
    #[error("focused element exposes no selection")]
    Unavailable,
    /// The focused element belongs to one of our own overlay windows; the
    /// reading is discarded rather than treated as an empty selection.
    #[error("focused element belongs to the selection menu itself")]
    OwnWindow,
    #[error("probe call failed: {0}")]
    CallFailed(String),
    #[error("probe could not be initialised: {0}")]
    InitFailed(String),
}

/// One reading taken from a probe.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionSample {
    pub text: String,
    pub captured_at: DateTime<Utc>,
}

impl SelectionSample {
    pub fn now(text: String) -> Self {
        Self {
            text,
            captured_at: Utc::now(),
        }
    }
}

pub trait SelectionProbe: Send {
    /// Reads the current selection.
    ///
    /// The returned future must not borrow the probe so the caller can run it
    /// off its own loop. Latency is bounded by the caller with a timeout.
    fn sample(&self) -> BoxFuture<'static, Result<String, ProbeError>>;

    /// Releases native handles. Called once during shutdown; `sample` is not
    /// called afterwards.
    fn release(&mut self) {}
}

/// What the current platform supports.
pub enum ProbeMode {
    Continuous(Box<dyn SelectionProbe>),
    /// No reliable introspection: menus only open from the manual hotkey.
    ManualOnly,
}

impl ProbeMode {
    pub fn into_probe(self) -> Option<Box<dyn SelectionProbe>> {
        match self {
            ProbeMode::Continuous(probe) => Some(probe),
            ProbeMode::ManualOnly => None,
        }
    }
}

/// Picks the probe for this platform. Call once, at process start.
pub fn select_probe() -> ProbeMode {
    info!("selecting selection probe for platform '{}'", std::env::consts::OS);

    match native_probe() {
        Ok(Some(probe)) => ProbeMode::Continuous(probe),
        Ok(None) => {
            info!("no selection introspection on this platform; menus open from the manual hotkey only");
            ProbeMode::ManualOnly
        }
        Err(err) => {
            error!("{err}; continuous selection monitoring disabled for this session");
            ProbeMode::ManualOnly
        }
    }
}

#[cfg(target_os = "windows")]
fn native_probe() -> Result<Option<Box<dyn SelectionProbe>>, ProbeError> {
    let probe = uia::UiaProbe::new()?;
    Ok(Some(Box::new(probe)))
}

#[cfg(target_os = "macos")]
fn native_probe() -> Result<Option<Box<dyn SelectionProbe>>, ProbeError> {
    Ok(Some(Box::new(applescript::ScriptProbe::new())))
}

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
fn native_probe() -> Result<Option<Box<dyn SelectionProbe>>, ProbeError> {
    Ok(None)
}
