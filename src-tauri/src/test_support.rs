//! Recording fakes shared by the unit tests.

use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::time::Duration;
use uuid::Uuid;

use crate::action::{ActionRequest, ActionSink, ClipboardWriter};
use crate::error::MonitorError;
use crate::menu::geometry::{MenuLayout, Point, Size, WorkArea};
use crate::menu::{OverlayBackend, OverlaySpec, OverlayWindow};
use crate::monitor::PointerLocator;
use crate::probe::{ProbeError, SelectionProbe};

/// Ordered log of every side effect the fakes observe.
#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn record(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn matching(&self, prefix: &str) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|e| e.starts_with(prefix))
            .collect()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.matching(prefix).len()
    }

    /// Ids of every menu created so far, in creation order.
    pub fn created_ids(&self) -> Vec<Uuid> {
        self.matching("create:")
            .iter()
            .filter_map(|e| e.split(':').nth(1))
            .filter_map(|id| Uuid::parse_str(id).ok())
            .collect()
    }
}

pub fn test_layout() -> MenuLayout {
    MenuLayout {
        width: 220.0,
        height: 48.0,
        offset_y: 16.0,
    }
}

pub fn test_work_area() -> WorkArea {
    WorkArea {
        origin: Point::new(0, 0),
        size: Size {
            width: 1920,
            height: 1080,
        },
        scale_factor: 1.0,
    }
}

pub struct FakeBackend {
    journal: Journal,
    fail_create: bool,
}

impl FakeBackend {
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            fail_create: false,
        }
    }

    pub fn failing(mut self) -> Self {
        self.fail_create = true;
        self
    }
}

impl OverlayBackend for FakeBackend {
    fn work_area_at(&self, _at: Point) -> Option<WorkArea> {
        Some(test_work_area())
    }

    fn create(&mut self, spec: &OverlaySpec<'_>) -> Result<Box<dyn OverlayWindow>, MonitorError> {
        if self.fail_create {
            self.journal.record("create-failed");
            return Err(MonitorError::WindowCreateFailed("no display".to_string()));
        }
        self.journal.record(format!("create:{}:{}", spec.id, spec.text));
        Ok(Box::new(FakeWindow {
            id: spec.id,
            journal: self.journal.clone(),
        }))
    }
}

pub struct FakeWindow {
    id: Uuid,
    journal: Journal,
}

impl OverlayWindow for FakeWindow {
    fn move_to(&self, position: Point) -> Result<(), MonitorError> {
        self.journal
            .record(format!("move:{}:{},{}", self.id, position.x, position.y));
        Ok(())
    }

    fn destroy(self: Box<Self>) {
        self.journal.record(format!("destroy:{}", self.id));
    }
}

#[derive(Debug, Clone)]
pub enum Step {
    Text(String),
    Fail,
    Unavailable,
    OwnWindow,
    Slow(Duration, String),
}

impl Step {
    pub fn text(text: &str) -> Self {
        Step::Text(text.to_string())
    }

    pub fn fail() -> Self {
        Step::Fail
    }

    pub fn unavailable() -> Self {
        Step::Unavailable
    }

    pub fn own_window() -> Self {
        Step::OwnWindow
    }

    pub fn slow(delay: Duration, text: &str) -> Self {
        Step::Slow(delay, text.to_string())
    }
}

/// Scripted probe. Plays `steps` in order and then repeats the last one.
pub struct FakeProbe {
    journal: Journal,
    steps: Arc<Mutex<Vec<Step>>>,
}

impl FakeProbe {
    pub fn new(journal: Journal, mut steps: Vec<Step>) -> Self {
        assert!(!steps.is_empty());
        steps.reverse();
        Self {
            journal,
            steps: Arc::new(Mutex::new(steps)),
        }
    }

    fn next_step(&self) -> Step {
        let mut steps = self.steps.lock().unwrap();
        if steps.len() > 1 {
            steps.pop().unwrap()
        } else {
            steps[0].clone()
        }
    }
}

impl SelectionProbe for FakeProbe {
    fn sample(&self) -> BoxFuture<'static, Result<String, ProbeError>> {
        self.journal.record("sample");
        match self.next_step() {
            Step::Text(text) => futures::future::ready(Ok(text)).boxed(),
            Step::Fail => {
                futures::future::ready(Err(ProbeError::CallFailed("scripted".to_string()))).boxed()
            }
            Step::Unavailable => futures::future::ready(Err(ProbeError::Unavailable)).boxed(),
            Step::OwnWindow => futures::future::ready(Err(ProbeError::OwnWindow)).boxed(),
            Step::Slow(delay, text) => async move {
                tokio::time::sleep(delay).await;
                Ok(text)
            }
            .boxed(),
        }
    }

    fn release(&mut self) {
        self.journal.record("release");
    }
}

pub struct FakeClipboard {
    journal: Journal,
}

impl FakeClipboard {
    pub fn new(journal: Journal) -> Self {
        Self { journal }
    }
}

impl ClipboardWriter for FakeClipboard {
    fn write_text(&self, text: &str) -> anyhow::Result<()> {
        self.journal.record(format!("clipboard:{text}"));
        Ok(())
    }
}

pub struct FakeSink {
    journal: Journal,
}

impl FakeSink {
    pub fn new(journal: Journal) -> Self {
        Self { journal }
    }
}

impl ActionSink for FakeSink {
    fn submit(&self, request: ActionRequest) {
        self.journal
            .record(format!("action:{}:{}", request.action.as_str(), request.text));
    }
}

pub struct FixedPointer(pub Point);

impl PointerLocator for FixedPointer {
    fn locate(&self) -> Option<Point> {
        Some(self.0)
    }
}
