use crate::probe::SelectionSample;

/// Poller-owned selection bookkeeping.
#[derive(Debug, Default)]
pub struct SelectionState {
    last_text: String,
    last_emitted_text: String,
    max_chars: Option<usize>,
}

impl SelectionState {
    pub fn new(max_chars: usize) -> Self {
        Self {
            max_chars: (max_chars > 0).then_some(max_chars),
            ..Self::default()
        }
    }

    #[cfg(test)]
    pub fn last_text(&self) -> &str {
        &self.last_text
    }

    pub fn last_emitted_text(&self) -> &str {
        &self.last_emitted_text
    }

    /// Returns the new text when the sample differs from the previous one.
    pub fn observe(&mut self, sample: SelectionSample) -> Option<String> {
        let text = match self.max_chars {
            Some(max) => truncate_chars(sample.text, max),
            None => sample.text,
        };
        if text == self.last_text {
            return None;
        }
        self.last_text.clone_from(&text);
        Some(text)
    }

    /// Records the latest settled text. Callers tear down any open menu
    /// before recording an empty value.
    pub fn mark_emitted(&mut self, text: &str) {
        self.last_emitted_text = text.to_string();
    }
}

fn truncate_chars(mut text: String, max: usize) -> String {
    if let Some((idx, _)) = text.char_indices().nth(max) {
        text.truncate(idx);
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(text: &str) -> SelectionSample {
        SelectionSample::now(text.to_string())
    }

    #[test]
    fn test_only_changes_are_forwarded() {
        let mut state = SelectionState::new(0);
        assert_eq!(state.observe(sample("hello")), Some("hello".to_string()));
        assert_eq!(state.observe(sample("hello")), None);
        assert_eq!(state.observe(sample("")), Some(String::new()));
        assert_eq!(state.observe(sample("")), None);
        assert_eq!(state.last_text(), "");
    }

    #[test]
    fn test_initial_empty_reading_is_not_a_change() {
        let mut state = SelectionState::new(0);
        assert_eq!(state.observe(sample("")), None);
    }

    #[test]
    fn test_long_selection_is_truncated_on_char_boundary() {
        let mut state = SelectionState::new(3);
        assert_eq!(state.observe(sample("héllo")), Some("hél".to_string()));
        // Same prefix after truncation means no change.
        assert_eq!(state.observe(sample("hélium")), None);
    }

    #[test]
    fn test_emitted_text_is_tracked_separately() {
        let mut state = SelectionState::new(0);
        state.observe(sample("foo"));
        assert_eq!(state.last_emitted_text(), "");
        state.mark_emitted("foo");
        assert_eq!(state.last_emitted_text(), "foo");
    }
}
