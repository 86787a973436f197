//! The selection monitor event loop.
//!
//! One tokio task owns every piece of monitor state: the poll ticker, the
//! debouncer, the failure breaker, the menu manager and the dispatcher. Probe
//! calls run as a separate task (at most one at a time) and their results come
//! back through the same `select!`, so no state is ever shared or locked.

pub mod breaker;
pub mod debounce;
pub mod poller;

use anyhow::{Context, Result};
use log::{debug, error, info, trace, warn};
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{self, Duration, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::action::{ActionDispatcher, ActionSink, ClipboardWriter, MenuAction};
use crate::error::MonitorError;
use crate::menu::geometry::{MenuLayout, Point};
use crate::menu::{MenuWindowManager, OverlayBackend, TeardownReason};
use crate::probe::{ProbeError, SelectionProbe, SelectionSample};

use breaker::FailureBreaker;
use debounce::{Debouncer, Settled};
use poller::SelectionState;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonitorSettings {
    pub poll_interval: Duration,
    pub debounce: Duration,
    pub breaker_cooldown: Duration,
    pub probe_timeout: Duration,
    pub max_text_chars: usize,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(250),
            debounce: Duration::from_millis(300),
            breaker_cooldown: Duration::from_secs(5),
            probe_timeout: Duration::from_secs(1),
            max_text_chars: 4000,
        }
    }
}

/// Messages delivered into the monitor loop.
#[derive(Debug, Clone, PartialEq)]
pub enum MonitorEvent {
    MenuItemClicked {
        menu_id: Uuid,
        action: MenuAction,
        text: String,
    },
    MenuDragged {
        menu_id: Uuid,
        position: Point,
    },
    MenuClosed {
        menu_id: Uuid,
    },
    MenuFocusChanged {
        menu_id: Uuid,
        focused: bool,
    },
    /// Global hotkey: open a menu at the cursor without waiting for a probe.
    ManualTrigger,
    SetPaused(bool),
}

pub trait PointerLocator: Send {
    fn locate(&self) -> Option<Point>;
}

/// Collaborators the monitor drives.
pub struct MonitorParts {
    /// `None` on platforms without selection introspection.
    pub probe: Option<Box<dyn SelectionProbe>>,
    pub overlays: Box<dyn OverlayBackend>,
    pub clipboard: Box<dyn ClipboardWriter>,
    pub sink: Box<dyn ActionSink>,
    pub pointer: Box<dyn PointerLocator>,
    pub layout: MenuLayout,
}

#[derive(Clone)]
pub struct MonitorSender(mpsc::UnboundedSender<MonitorEvent>);

impl MonitorSender {
    pub fn send(&self, event: MonitorEvent) -> Result<(), MonitorError> {
        self.0.send(event).map_err(|_| MonitorError::Channel)
    }
}

pub struct SelectionMonitor {
    events: MonitorSender,
    cancel_token: Option<CancellationToken>,
    handle: Option<JoinHandle<()>>,
}

impl SelectionMonitor {
    /// Spawns the monitor loop. Must be called from within a tokio runtime.
    pub fn start(parts: MonitorParts, settings: MonitorSettings) -> Self {
        Self::start_with(settings, |_| parts)
    }

    /// Like [`SelectionMonitor::start`], for parts that need to post events
    /// back into the loop.
    pub fn start_with(
        settings: MonitorSettings,
        build: impl FnOnce(MonitorSender) -> MonitorParts,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let events = MonitorSender(events_tx);
        let parts = build(events.clone());
        let cancel_token = CancellationToken::new();
        let continuous = parts.probe.is_some();

        let worker = MonitorLoop::new(parts, settings);
        let handle = tokio::spawn(worker.run(events_rx, cancel_token.clone()));

        info!(
            "selection monitor started ({}; poll {:?}, settle {:?})",
            if continuous { "continuous" } else { "manual only" },
            settings.poll_interval,
            settings.debounce
        );

        Self {
            events,
            cancel_token: Some(cancel_token),
            handle: Some(handle),
        }
    }

    pub fn sender(&self) -> MonitorSender {
        self.events.clone()
    }

    #[cfg(test)]
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stops polling, cancels pending timers, releases the probe and closes
    /// every open menu, in that order.
    pub async fn stop(&mut self) -> Result<()> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        if let Some(handle) = self.handle.take() {
            handle
                .await
                .context("selection monitor task failed to join")?;
            info!("selection monitor stopped");
        }
        Ok(())
    }
}

type ProbeTasks = JoinSet<Result<String, ProbeError>>;

struct MonitorLoop {
    probe: Option<Box<dyn SelectionProbe>>,
    menus: MenuWindowManager,
    dispatcher: ActionDispatcher,
    pointer: Box<dyn PointerLocator>,
    settings: MonitorSettings,
    state: SelectionState,
    debouncer: Debouncer,
    breaker: FailureBreaker,
    paused: bool,
    focused_menu: Option<Uuid>,
}

impl MonitorLoop {
    fn new(parts: MonitorParts, settings: MonitorSettings) -> Self {
        Self {
            probe: parts.probe,
            menus: MenuWindowManager::new(parts.overlays, parts.layout),
            dispatcher: ActionDispatcher::new(parts.clipboard, parts.sink),
            pointer: parts.pointer,
            settings,
            state: SelectionState::new(settings.max_text_chars),
            debouncer: Debouncer::new(settings.debounce),
            breaker: FailureBreaker::new(settings.breaker_cooldown),
            paused: false,
            focused_menu: None,
        }
    }

    fn ticking(&self) -> bool {
        self.probe.is_some() && !self.paused
    }

    async fn run(
        mut self,
        mut events: mpsc::UnboundedReceiver<MonitorEvent>,
        cancel_token: CancellationToken,
    ) {
        let mut ticker = time::interval(self.settings.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut in_flight = ProbeTasks::new();

        loop {
            let settle_at = self.debouncer.deadline();

            tokio::select! {
                biased;

                _ = cancel_token.cancelled() => break,
                Some(event) = events.recv() => self.handle_event(event, &mut in_flight),
                Some(joined) = in_flight.join_next() => match joined {
                    Ok(result) => self.on_probe_result(result),
                    Err(err) if err.is_cancelled() => trace!("probe call aborted"),
                    Err(err) => self.on_probe_result(Err(ProbeError::CallFailed(format!(
                        "probe task ended abnormally: {err}"
                    )))),
                },
                _ = sleep_until_opt(settle_at) => self.on_settle_deadline(),
                _ = ticker.tick(), if self.ticking() => self.on_tick(&mut in_flight),
            }
        }

        drop(ticker);
        self.shutdown(in_flight).await;
    }

    fn on_tick(&mut self, in_flight: &mut ProbeTasks) {
        if let Some(id) = self.focused_menu {
            if self.menus.contains(id) {
                trace!("own menu has focus; skipping probe");
                return;
            }
            self.focused_menu = None;
        }

        let was_open = self.breaker.resume_at().is_some();
        if !self.breaker.allows_probe(Instant::now()) {
            return;
        }
        if was_open {
            info!("selection probe cool-down elapsed; resuming");
        }

        if !in_flight.is_empty() {
            debug!("previous probe call still running; skipping tick");
            return;
        }

        let Some(probe) = &self.probe else {
            return;
        };
        let call = probe.sample();
        let timeout = self.settings.probe_timeout;
        in_flight.spawn(async move {
            match time::timeout(timeout, call).await {
                Ok(result) => result,
                Err(_) => Err(ProbeError::CallFailed(format!(
                    "probe call exceeded {timeout:?}"
                ))),
            }
        });
    }

    fn on_probe_result(&mut self, result: Result<String, ProbeError>) {
        match result {
            Ok(text) => self.on_sample(SelectionSample::now(text)),
            Err(ProbeError::Unavailable) => self.on_sample(SelectionSample::now(String::new())),
            Err(ProbeError::OwnWindow) => trace!("discarding reading from own overlay"),
            Err(ProbeError::CallFailed(reason)) | Err(ProbeError::InitFailed(reason)) => {
                if self.breaker.record_failure(Instant::now()) {
                    warn!(
                        "selection probe failed, pausing for {:?}: {reason}",
                        self.settings.breaker_cooldown
                    );
                }
            }
        }
    }

    fn on_sample(&mut self, sample: SelectionSample) {
        if self.paused {
            return;
        }
        let captured_at = sample.captured_at;
        if let Some(changed) = self.state.observe(sample) {
            trace!(
                "selection changed at {captured_at} ({} chars)",
                changed.chars().count()
            );
            self.debouncer.on_change(changed, Instant::now());
        }
    }

    fn on_settle_deadline(&mut self) {
        let settled = self
            .debouncer
            .fire(Instant::now(), self.state.last_emitted_text());

        match settled {
            Some(Settled::Show(text)) => {
                let already_open = self
                    .menus
                    .open_menu()
                    .is_some_and(|menu| menu.owner_selection_text == text);
                if !already_open {
                    self.show_menu(text);
                }
            }
            Some(Settled::Hide) => {
                // Teardown first: the emitted text is never empty while a
                // menu is open.
                self.menus.hide_all(TeardownReason::SelectionCleared);
                self.state.mark_emitted("");
            }
            None => {}
        }
    }

    fn show_menu(&mut self, text: String) {
        let at = self.pointer.locate().unwrap_or_else(|| {
            debug!("cursor position unavailable; anchoring menu at origin");
            Point::default()
        });

        match self.menus.show(&text, at) {
            Ok(_) => {
                if !text.is_empty() {
                    self.state.mark_emitted(&text);
                }
            }
            Err(err) => error!("{err}; dropping this selection"),
        }
    }

    fn handle_event(&mut self, event: MonitorEvent, in_flight: &mut ProbeTasks) {
        match event {
            MonitorEvent::MenuItemClicked {
                menu_id,
                action,
                text,
            } => {
                self.dispatcher
                    .dispatch(&mut self.menus, menu_id, action, text);
            }
            MonitorEvent::MenuDragged { menu_id, position } => {
                self.menus.reposition(menu_id, position);
            }
            MonitorEvent::MenuClosed { menu_id } => {
                self.menus.hide(menu_id, TeardownReason::Dismissed);
            }
            MonitorEvent::MenuFocusChanged { menu_id, focused } => {
                if focused {
                    if self.menus.contains(menu_id) {
                        self.focused_menu = Some(menu_id);
                    }
                } else {
                    if self.focused_menu == Some(menu_id) {
                        self.focused_menu = None;
                    }
                    self.menus.hide(menu_id, TeardownReason::FocusLost);
                }
            }
            MonitorEvent::ManualTrigger => {
                // Settled text only; a selection still being dragged is ignored.
                let text = self.state.last_emitted_text().to_string();
                self.show_menu(text);
            }
            MonitorEvent::SetPaused(paused) => {
                if paused == self.paused {
                    return;
                }
                self.paused = paused;
                if paused {
                    in_flight.abort_all();
                    self.debouncer.cancel();
                    self.menus.hide_all(TeardownReason::Dismissed);
                    self.state.mark_emitted("");
                    info!("selection monitor paused");
                } else {
                    info!("selection monitor resumed");
                }
            }
        }
    }

    async fn shutdown(mut self, mut in_flight: ProbeTasks) {
        in_flight.abort_all();
        while in_flight.join_next().await.is_some() {}
        self.debouncer.cancel();
        self.breaker.reset();

        if let Some(mut probe) = self.probe.take() {
            probe.release();
        }

        let closed = self.menus.hide_all(TeardownReason::Shutdown);
        debug!("selection monitor shut down ({closed} menu(s) closed)");
    }
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
