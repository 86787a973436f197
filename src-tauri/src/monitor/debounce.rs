use tokio::time::{Duration, Instant};

/// Outcome of a settled selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settled {
    Show(String),
    Hide,
}

struct Pending {
    text: String,
    settle_at: Instant,
}

/// Coalesces bursts of selection changes into one settled value.
///
/// Time is passed in explicitly; the owner sleeps until [`Debouncer::deadline`]
/// and then calls [`Debouncer::fire`].
pub struct Debouncer {
    window: Duration,
    pending: Option<Pending>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: None,
        }
    }

    /// Restarts the settle timer with the latest text.
    pub fn on_change(&mut self, text: String, now: Instant) {
        self.pending = Some(Pending {
            text,
            settle_at: now + self.window,
        });
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|p| p.settle_at)
    }

    #[cfg(test)]
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Emits the settled outcome once the quiet period has elapsed.
    ///
    /// `last_emitted` is the text of the previous settled outcome; an empty
    /// value following an empty one is suppressed.
    pub fn fire(&mut self, now: Instant, last_emitted: &str) -> Option<Settled> {
        if self.pending.as_ref()?.settle_at > now {
            return None;
        }
        let Pending { text, .. } = self.pending.take()?;

        if !text.is_empty() {
            Some(Settled::Show(text))
        } else if !last_emitted.is_empty() {
            Some(Settled::Hide)
        } else {
            None
        }
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }
}
