//! Messages exchanged between a page's panel controller and the background
//! coordinator.
//!
//! Every message is a JSON object whose `action` field names it, e.g.
//! `{"action":"performSearch","searchText":"hello"}`.

use std::sync::mpsc;

use serde::{Deserialize, Serialize};

use crate::actions::MenuItem;
use crate::theme::ThemePalette;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Message {
    GetSettings,
    GetThemeColors,
    /// Pushed by the background when the theme changes or the extension is
    /// switched on.
    ThemeColors { colors: ThemePalette },
    ExtensionDisabled,
    PerformSearch {
        #[serde(rename = "searchText")]
        search_text: String,
    },
    OpenInBackgroundTab { url: String },
    ToggleExtension { enabled: bool },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsResponse {
    pub enabled_items: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SettingsResponse {
    /// The known menu items, in order. Unknown names are skipped.
    pub fn menu_items(&self) -> Vec<MenuItem> {
        self.enabled_items
            .iter()
            .filter_map(|name| name.parse().ok())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeResponse {
    pub colors: ThemePalette,
}

/// Replies to request messages. Replies carry no `action` tag, so they are
/// told apart by shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    Settings(SettingsResponse),
    Theme(ThemeResponse),
}

/// Outgoing side of the relay.
pub trait MessageSink {
    fn send(&mut self, message: Message);
}

impl MessageSink for Vec<Message> {
    fn send(&mut self, message: Message) {
        self.push(message);
    }
}

impl MessageSink for mpsc::Sender<Message> {
    fn send(&mut self, message: Message) {
        if let Err(err) = mpsc::Sender::send(self, message) {
            tracing::warn!(message = ?err.0, "message dropped, receiver is gone");
        }
    }
}

impl<T: MessageSink + ?Sized> MessageSink for &mut T {
    fn send(&mut self, message: Message) {
        (**self).send(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn messages_carry_action_tag() {
        let search = Message::PerformSearch {
            search_text: "hello world".into(),
        };
        assert_eq!(
            serde_json::to_value(&search).unwrap(),
            json!({"action": "performSearch", "searchText": "hello world"})
        );
        assert_eq!(
            serde_json::to_value(Message::GetSettings).unwrap(),
            json!({"action": "getSettings"})
        );
        let toggle: Message =
            serde_json::from_value(json!({"action": "toggleExtension", "enabled": false}))
                .unwrap();
        assert_eq!(toggle, Message::ToggleExtension { enabled: false });
        let open: Message = serde_json::from_str(
            r#"{"action":"openInBackgroundTab","url":"https://example.com/"}"#,
        )
        .unwrap();
        assert_eq!(
            open,
            Message::OpenInBackgroundTab {
                url: "https://example.com/".into()
            }
        );
    }

    #[test]
    fn theme_push_nests_palette() {
        let msg = Message::ThemeColors {
            colors: ThemePalette::default(),
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["action"], "themeColors");
        assert_eq!(value["colors"]["bgColor"], "#f9f9fa");
    }

    #[test]
    fn responses_are_told_apart_by_shape() {
        let settings: Response =
            serde_json::from_value(json!({"enabledItems": ["copy", "bogus", "search"]})).unwrap();
        let Response::Settings(settings) = settings else {
            panic!("expected settings response");
        };
        assert_eq!(settings.menu_items(), vec![MenuItem::Copy, MenuItem::Search]);
        assert_eq!(settings.error, None);

        let theme: Response = serde_json::from_value(
            json!({"colors": serde_json::to_value(ThemePalette::default()).unwrap()}),
        )
        .unwrap();
        assert!(matches!(theme, Response::Theme(_)));
    }

    #[test]
    fn sender_sink_forwards_messages() {
        let (tx, rx) = mpsc::channel();
        let mut sink = tx;
        MessageSink::send(&mut sink, Message::ExtensionDisabled);
        assert_eq!(rx.try_recv().unwrap(), Message::ExtensionDisabled);
    }
}
