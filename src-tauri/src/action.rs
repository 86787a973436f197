use log::{debug, warn};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::menu::{MenuWindowManager, TeardownReason};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MenuAction {
    Translate,
    Ask,
    Copy,
    Search,
}

impl MenuAction {
    pub fn as_str(self) -> &'static str {
        match self {
            MenuAction::Translate => "translate",
            MenuAction::Ask => "ask",
            MenuAction::Copy => "copy",
            MenuAction::Search => "search",
        }
    }
}

/// Payload delivered to the host for every non-copy action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRequest {
    pub action: MenuAction,
    pub text: String,
}

pub trait ClipboardWriter: Send {
    fn write_text(&self, text: &str) -> anyhow::Result<()>;
}

/// Host-side action channel. Implementations must return without waiting
/// for the host to handle the request.
pub trait ActionSink: Send {
    fn submit(&self, request: ActionRequest);
}

pub struct ActionDispatcher {
    clipboard: Box<dyn ClipboardWriter>,
    sink: Box<dyn ActionSink>,
}

impl ActionDispatcher {
    pub fn new(clipboard: Box<dyn ClipboardWriter>, sink: Box<dyn ActionSink>) -> Self {
        Self { clipboard, sink }
    }

    /// Handles a menu click: copy stays local, everything else goes to the
    /// host. The originating menu is torn down either way.
    pub fn dispatch(
        &self,
        menus: &mut MenuWindowManager,
        menu_id: Uuid,
        action: MenuAction,
        text: String,
    ) {
        debug!("menu {menu_id}: {} ({} chars)", action.as_str(), text.chars().count());

        match action {
            MenuAction::Copy => {
                if let Err(err) = self.clipboard.write_text(&text) {
                    warn!("failed to copy selection to clipboard: {err}");
                }
            }
            MenuAction::Translate | MenuAction::Ask | MenuAction::Search => {
                self.sink.submit(ActionRequest { action, text });
            }
        }

        menus.hide(menu_id, TeardownReason::ActionTaken);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::menu::geometry::Point;
    use crate::test_support::{test_layout, FakeBackend, FakeClipboard, FakeSink, Journal};

    fn setup() -> (ActionDispatcher, MenuWindowManager, Journal) {
        let journal = Journal::default();
        let dispatcher = ActionDispatcher::new(
            Box::new(FakeClipboard::new(journal.clone())),
            Box::new(FakeSink::new(journal.clone())),
        );
        let menus =
            MenuWindowManager::new(Box::new(FakeBackend::new(journal.clone())), test_layout());
        (dispatcher, menus, journal)
    }

    #[test]
    fn test_copy_writes_clipboard_without_host_event() {
        let (dispatcher, mut menus, journal) = setup();
        let id = menus.show("abc", Point::new(0, 0)).unwrap();

        dispatcher.dispatch(&mut menus, id, MenuAction::Copy, "abc".to_string());

        assert_eq!(journal.matching("clipboard:"), vec!["clipboard:abc".to_string()]);
        assert_eq!(journal.count("action:"), 0);
        assert!(menus.is_empty());
    }

    #[test]
    fn test_other_actions_are_forwarded_to_host() {
        let (dispatcher, mut menus, journal) = setup();
        for action in [MenuAction::Translate, MenuAction::Ask, MenuAction::Search] {
            let id = menus.show("abc", Point::new(0, 0)).unwrap();
            dispatcher.dispatch(&mut menus, id, action, "abc".to_string());
            assert!(!menus.contains(id));
        }

        assert_eq!(
            journal.matching("action:"),
            vec![
                "action:translate:abc".to_string(),
                "action:ask:abc".to_string(),
                "action:search:abc".to_string(),
            ]
        );
        assert_eq!(journal.count("clipboard:"), 0);
    }

    #[test]
    fn test_click_on_already_closed_menu_still_dispatches_once() {
        let (dispatcher, mut menus, journal) = setup();
        let id = menus.show("abc", Point::new(0, 0)).unwrap();
        menus.hide(id, TeardownReason::FocusLost);

        dispatcher.dispatch(&mut menus, id, MenuAction::Search, "abc".to_string());

        assert_eq!(journal.count("action:"), 1);
        assert_eq!(journal.count("destroy:"), 1);
    }

    #[test]
    fn test_actions_serialize_lowercase() {
        let request = ActionRequest {
            action: MenuAction::Translate,
            text: "hi".to_string(),
        };
        assert_eq!(
            serde_json::to_string(&request).unwrap(),
            r#"{"action":"translate","text":"hi"}"#
        );
        let parsed: MenuAction = serde_json::from_str(r#""search""#).unwrap();
        assert_eq!(parsed, MenuAction::Search);
    }
}
