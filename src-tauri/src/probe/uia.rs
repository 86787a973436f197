//! UI Automation probe.
//!
//! COM objects are apartment bound, so a [`SerialWorker`] thread owns the
//! apartment and the automation root for the probe's whole lifetime.

use futures::future::BoxFuture;
use log::{info, warn};
use windows::Win32::System::Com::{
    CoCreateInstance, CoInitializeEx, CoUninitialize, CLSCTX_INPROC_SERVER, COINIT_MULTITHREADED,
};
use windows::Win32::UI::Accessibility::{
    CUIAutomation, IUIAutomation, IUIAutomationTextPattern, UIA_TextPatternId,
};

use super::worker::{SerialWorker, RELEASE_TIMEOUT};
use super::{ProbeError, SelectionProbe};

pub struct UiaProbe {
    worker: SerialWorker,
}

impl UiaProbe {
    pub fn new() -> Result<Self, ProbeError> {
        let worker = SerialWorker::spawn("uia-probe", UiaSession::open, UiaSession::selected_text)?;
        info!("UI Automation probe ready");
        Ok(Self { worker })
    }
}

impl SelectionProbe for UiaProbe {
    fn sample(&self) -> BoxFuture<'static, Result<String, ProbeError>> {
        self.worker.sample()
    }

    fn release(&mut self) {
        // Dropping the session on the worker releases COM; a hung call is left behind.
        if !self.worker.shutdown(RELEASE_TIMEOUT) {
            warn!("UI Automation session not released cleanly");
        }
    }
}

/// Balances a successful `CoInitializeEx` on the current thread.
struct ComApartment;

impl ComApartment {
    fn enter() -> Result<Self, ProbeError> {
        unsafe { CoInitializeEx(None, COINIT_MULTITHREADED) }
            .ok()
            .map_err(|e| ProbeError::InitFailed(format!("CoInitializeEx failed: {e}")))?;
        Ok(Self)
    }
}

impl Drop for ComApartment {
    fn drop(&mut self) {
        unsafe { CoUninitialize() };
    }
}

struct UiaSession {
    // Field order matters: the automation root is released before the
    // apartment is torn down.
    automation: IUIAutomation,
    own_pid: i32,
    _apartment: ComApartment,
}

impl UiaSession {
    fn open() -> Result<Self, ProbeError> {
        let apartment = ComApartment::enter()?;
        let automation: IUIAutomation =
            unsafe { CoCreateInstance(&CUIAutomation, None, CLSCTX_INPROC_SERVER) }
                .map_err(|e| ProbeError::InitFailed(format!("failed to create IUIAutomation: {e}")))?;
        let own_pid = i32::try_from(std::process::id())
            .map_err(|_| ProbeError::InitFailed("process id out of range".to_string()))?;

        Ok(Self {
            automation,
            own_pid,
            _apartment: apartment,
        })
    }

    /// Every interface acquired here is a COM smart pointer released on
    /// drop, so early returns cannot leak.
    fn selected_text(&self) -> Result<String, ProbeError> {
        unsafe {
            let focused = self
                .automation
                .GetFocusedElement()
                .map_err(call_failed("GetFocusedElement"))?;

            let pid = focused
                .CurrentProcessId()
                .map_err(call_failed("CurrentProcessId"))?;
            if pid == self.own_pid {
                return Err(ProbeError::OwnWindow);
            }

            let pattern = match focused
                .GetCurrentPatternAs::<IUIAutomationTextPattern>(UIA_TextPatternId)
            {
                Ok(pattern) => pattern,
                // A successful HRESULT with a null pointer: no text pattern.
                Err(err) if err.code().is_ok() => return Err(ProbeError::Unavailable),
                Err(err) => return Err(call_failed("GetCurrentPatternAs")(err)),
            };

            let ranges = pattern.GetSelection().map_err(call_failed("GetSelection"))?;
            if ranges.Length().map_err(call_failed("Length"))? < 1 {
                return Ok(String::new());
            }

            let range = ranges.GetElement(0).map_err(call_failed("GetElement"))?;
            let text = range.GetText(-1).map_err(call_failed("GetText"))?;
            Ok(text.to_string().trim().to_string())
        }
    }
}

fn call_failed(call: &'static str) -> impl Fn(windows::core::Error) -> ProbeError {
    move |err| ProbeError::CallFailed(format!("{call}: {err}"))
}
